//! ICY protocol metadata probe.
//!
//! Internet radio servers answer a `Icy-MetaData: 1` request with `icy-*`
//! response headers (name, genre, bitrate tag) and, when `icy-metaint` is
//! present, interleave metadata blocks into the body: every `metaint` audio
//! bytes, one length byte (count of 16-byte units) followed by a
//! `StreamTitle='…';` key-value block padded with NULs.

use std::time::Duration;

use reqwest::header::{HeaderMap, USER_AGENT};

use rastation::{or_unknown, IcyTags};

use crate::error::Result;

/// Request header asking the server for in-band metadata.
const ICY_METADATA_REQUEST: &str = "Icy-MetaData";

/// Upper bound accepted for `icy-metaint`; larger offsets would mean
/// downloading megabytes of audio just to reach the first metadata block.
const MAX_METAINT: usize = 256 * 1024;

/// Maximum metadata block size on the wire (length byte is u8, ×16).
const MAX_META_BLOCK: usize = 255 * 16;

/// Probes a stream for ICY station metadata.
#[derive(Debug, Clone)]
pub struct IcyProber {
    client: reqwest::Client,
    user_agent: String,
    timeout: Duration,
    read_inband: bool,
}

impl IcyProber {
    /// Create a prober over a shared HTTP client.
    ///
    /// Some stream servers refuse requests without a browser-ish
    /// User-Agent, so it is sent explicitly on every probe.
    pub fn new(client: reqwest::Client, user_agent: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            user_agent: user_agent.into(),
            timeout,
            read_inband: true,
        }
    }

    /// Disable reading the in-band `StreamTitle` block (headers only).
    pub fn headers_only(mut self) -> Self {
        self.read_inband = false;
        self
    }

    /// Fetch the station's ICY tags.
    ///
    /// Absent headers yield the `"unknown"` sentinel. A malformed or
    /// truncated in-band block never fails the probe; only transport errors
    /// are returned, for the retry policy to handle.
    pub async fn probe(&self, url: &str) -> Result<IcyTags> {
        let response = self
            .client
            .get(url)
            .header(ICY_METADATA_REQUEST, "1")
            .header(USER_AGENT, &self.user_agent)
            .timeout(self.timeout)
            .send()
            .await?;

        let headers = response.headers();
        let mut tags = IcyTags {
            bitrate: or_unknown(header_str(headers, "icy-br")),
            description: or_unknown(header_str(headers, "icy-description")),
            genre: or_unknown(header_str(headers, "icy-genre")),
            name: or_unknown(header_str(headers, "icy-name")),
            publisher: or_unknown(header_str(headers, "icy-pub")),
            ..IcyTags::default()
        };

        let metaint = header_str(headers, "icy-metaint")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|m| (1..=MAX_METAINT).contains(m));

        if self.read_inband {
            if let Some(metaint) = metaint {
                if let Some(title) = self.read_inband_title(response, metaint).await {
                    tags.title = title;
                }
            }
        }

        Ok(tags)
    }

    /// Read up to the first metadata block and extract `StreamTitle`.
    ///
    /// Any shortfall — connection drop, zero-length block, malformed
    /// key-value text — yields `None` and the title stays unknown.
    async fn read_inband_title(
        &self,
        mut response: reqwest::Response,
        metaint: usize,
    ) -> Option<String> {
        let read = async {
            let mut buf: Vec<u8> = Vec::with_capacity(metaint + 1);
            loop {
                if let Some(block) = extract_meta_block(&buf, metaint) {
                    return parse_stream_title(&String::from_utf8_lossy(block));
                }
                // Stop growing once the largest possible block must be in
                if buf.len() >= metaint + 1 + MAX_META_BLOCK {
                    return None;
                }
                match response.chunk().await {
                    Ok(Some(chunk)) => buf.extend_from_slice(&chunk),
                    // EOF or transport error mid-body: give up on the title
                    Ok(None) | Err(_) => return None,
                }
            }
        };

        tokio::time::timeout(self.timeout, read).await.ok().flatten()
    }
}

/// Slice out the first complete metadata block, if the buffer holds one.
fn extract_meta_block(buf: &[u8], metaint: usize) -> Option<&[u8]> {
    if buf.len() <= metaint {
        return None;
    }
    let block_len = buf[metaint] as usize * 16;
    if block_len == 0 {
        // Declared-empty block: nothing is playing, or the server pads
        return Some(&[]);
    }
    let start = metaint + 1;
    buf.get(start..start + block_len)
}

/// Extract the title from a `StreamTitle='…';` key-value block.
fn parse_stream_title(block: &str) -> Option<String> {
    const KEY: &str = "StreamTitle='";
    let start = block.find(KEY)? + KEY.len();
    let rest = &block[start..];
    let end = rest.find("';")?;
    let title = rest[..end].trim_matches(char::from(0)).trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

/// Read a response header as a UTF-8 string.
fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}
