//! Media probe: audio stream characteristics via ffprobe.

use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tokio::process::Command;

use rastation::{or_unknown, UNKNOWN};

use crate::error::{ProbeError, Result};

/// Entries requested from ffprobe, audio streams only.
const FFPROBE_ENTRIES: &str =
    "stream=codec_name,sample_rate,bit_rate,channels,channel_layout,codec_type";

/// Stderr is truncated to this many characters in error messages.
const MAX_STDERR: usize = 512;

/// Audio characteristics of the first audio stream.
///
/// Every field defaults to the `"unknown"` sentinel; a stream with no audio
/// at all yields the default value rather than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioStreamInfo {
    pub codec: String,
    pub sample_rate: String,
    pub bitrate: String,
    pub channels: String,
    pub channel_layout: String,
}

impl Default for AudioStreamInfo {
    fn default() -> Self {
        Self {
            codec: UNKNOWN.to_string(),
            sample_rate: UNKNOWN.to_string(),
            bitrate: UNKNOWN.to_string(),
            channels: UNKNOWN.to_string(),
            channel_layout: UNKNOWN.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

/// One stream entry as ffprobe reports it. Numeric-looking fields arrive as
/// strings except `channels`, which is a JSON number.
#[derive(Debug, Default, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    sample_rate: Option<String>,
    bit_rate: Option<String>,
    channels: Option<u64>,
    channel_layout: Option<String>,
}

/// Invokes the external media inspection tool on a stream URL.
#[derive(Debug, Clone)]
pub struct MediaProber {
    ffprobe: String,
    timeout: Duration,
}

impl MediaProber {
    /// Create a prober using the given ffprobe binary and overall time
    /// budget per invocation.
    pub fn new(ffprobe: impl Into<String>, timeout: Duration) -> Self {
        Self {
            ffprobe: ffprobe.into(),
            timeout,
        }
    }

    /// Probe the stream and return the first audio stream's metadata.
    ///
    /// A non-zero exit, a timeout or malformed JSON is a retryable failure;
    /// valid output without any audio stream is a successful probe with
    /// every field unknown.
    pub async fn probe(&self, url: &str) -> Result<AudioStreamInfo> {
        let mut cmd = Command::new(&self.ffprobe);
        cmd.args([
            "-v",
            "error",
            "-select_streams",
            "a",
            "-show_entries",
            FFPROBE_ENTRIES,
            "-of",
            "json",
        ])
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| ProbeError::Timeout(self.timeout))??;

        if !output.status.success() {
            let stderr: String = String::from_utf8_lossy(&output.stderr)
                .chars()
                .take(MAX_STDERR)
                .collect();
            return Err(ProbeError::Subprocess {
                tool: self.ffprobe.clone(),
                status: output.status,
                stderr,
            });
        }

        parse_output(&output.stdout)
    }
}

/// Parse ffprobe's JSON document into [`AudioStreamInfo`].
fn parse_output(stdout: &[u8]) -> Result<AudioStreamInfo> {
    let parsed: FfprobeOutput = serde_json::from_slice(stdout)?;

    let audio = parsed
        .streams
        .into_iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(match audio {
        Some(stream) => AudioStreamInfo {
            codec: or_unknown(stream.codec_name),
            sample_rate: or_unknown(stream.sample_rate),
            bitrate: or_unknown(stream.bit_rate),
            channels: or_unknown(stream.channels.map(|c| c.to_string())),
            channel_layout: or_unknown(stream.channel_layout),
        },
        None => AudioStreamInfo::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_audio_stream() {
        let doc = json!({
            "streams": [{
                "codec_name": "mp3",
                "sample_rate": "44100",
                "bit_rate": "128000",
                "channels": 2,
                "channel_layout": "stereo",
                "codec_type": "audio"
            }]
        });
        let info = parse_output(doc.to_string().as_bytes()).unwrap();
        assert_eq!(info.codec, "mp3");
        assert_eq!(info.sample_rate, "44100");
        assert_eq!(info.bitrate, "128000");
        assert_eq!(info.channels, "2");
        assert_eq!(info.channel_layout, "stereo");
    }

    #[test]
    fn test_first_audio_stream_wins() {
        let doc = json!({
            "streams": [
                { "codec_type": "video", "codec_name": "mjpeg" },
                { "codec_type": "audio", "codec_name": "aac", "channels": 2 },
                { "codec_type": "audio", "codec_name": "mp3" }
            ]
        });
        let info = parse_output(doc.to_string().as_bytes()).unwrap();
        assert_eq!(info.codec, "aac");
        assert_eq!(info.channels, "2");
        // Fields the stream did not report stay unknown
        assert_eq!(info.sample_rate, UNKNOWN);
    }

    #[test]
    fn test_no_audio_stream_is_all_unknown() {
        let doc = json!({ "streams": [{ "codec_type": "video", "codec_name": "h264" }] });
        let info = parse_output(doc.to_string().as_bytes()).unwrap();
        assert_eq!(info, AudioStreamInfo::default());
    }

    #[test]
    fn test_empty_document_is_all_unknown() {
        let info = parse_output(b"{}").unwrap();
        assert_eq!(info, AudioStreamInfo::default());
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(matches!(
            parse_output(b"not json at all"),
            Err(ProbeError::Json(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_binary_is_an_error() {
        let prober = MediaProber::new("ffprobe-does-not-exist", Duration::from_secs(1));
        let result = prober.probe("http://example.com/stream").await;
        assert!(matches!(result, Err(ProbeError::Io(_))));
    }
}
