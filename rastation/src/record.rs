//! Station records and the delimited row format.
//!
//! The output store is an append-only delimited text table with a fixed
//! column order. The delimiter defaults to a character that cannot occur in
//! station names, genres or codec tags, so rows need no quoting; field
//! values are sanitized before writing to keep every row single-line.

use serde::{Deserialize, Serialize};

use crate::UNKNOWN;

/// Default field delimiter for the input and output stores.
///
/// Chosen (by the original dataset) to never collide with tag content —
/// station names and ICY descriptions routinely contain commas, semicolons
/// and pipes.
pub const DEFAULT_DELIMITER: char = '\u{1F648}';

/// Fixed output column set, in wire order.
///
/// The header row is written exactly once, when the store is created.
pub const COLUMNS: &[&str] = &[
    "name",
    "url",
    "availability",
    "country",
    "country_code",
    "latitude",
    "longitude",
    "codec",
    "sample_rate",
    "bitrate",
    "channels",
    "channel_layout",
    "icy-br",
    "icy-description",
    "icy-genre",
    "icy-name",
    "icy-pub",
    "icy-title",
];

// ============================================================================
// StationInput
// ============================================================================

/// One station from the input list.
///
/// Uniqueness is not required on input; duplicates are filtered by the
/// pipeline controller against the dedup ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct StationInput {
    /// Display name of the station
    pub name: String,
    /// Stream URL under test
    pub url: String,
}

impl StationInput {
    /// Create a new input record
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// The dedup key for this station
    pub fn key(&self) -> (String, String) {
        (self.name.clone(), self.url.clone())
    }
}

// ============================================================================
// IcyTags
// ============================================================================

/// ICY protocol metadata read from stream response headers.
///
/// Internet radio servers convey station metadata through custom `icy-*`
/// response headers and, optionally, in-band metadata blocks. Every field
/// defaults to the [`UNKNOWN`] sentinel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IcyTags {
    /// Advertised bitrate tag (`icy-br`)
    pub bitrate: String,
    /// Station description (`icy-description`)
    pub description: String,
    /// Genre tag (`icy-genre`)
    pub genre: String,
    /// Station name as the server reports it (`icy-name`)
    pub name: String,
    /// Publisher / public flag (`icy-pub`)
    pub publisher: String,
    /// Currently playing title from the in-band metadata block, when the
    /// server supports `icy-metaint`
    pub title: String,
}

impl Default for IcyTags {
    fn default() -> Self {
        Self {
            bitrate: UNKNOWN.to_string(),
            description: UNKNOWN.to_string(),
            genre: UNKNOWN.to_string(),
            name: UNKNOWN.to_string(),
            publisher: UNKNOWN.to_string(),
            title: UNKNOWN.to_string(),
        }
    }
}

// ============================================================================
// StationRecord
// ============================================================================

/// The enrichment result for one station — one output row.
///
/// Coordinates are kept as opaque decimal-string tokens exactly as the
/// geolocation service returned them; [`UNKNOWN`] (not absence) represents
/// "not determined".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StationRecord {
    pub name: String,
    pub url: String,
    pub available: bool,
    pub country: String,
    pub country_code: String,
    pub latitude: String,
    pub longitude: String,
    pub codec: String,
    pub sample_rate: String,
    pub bitrate: String,
    pub channels: String,
    pub channel_layout: String,
    pub icy: IcyTags,
}

impl StationRecord {
    /// A record with every enrichment field at [`UNKNOWN`].
    ///
    /// This is both the starting point for enrichment and the terminal
    /// record for stations whose liveness probe failed.
    pub fn unavailable(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            available: false,
            country: UNKNOWN.to_string(),
            country_code: UNKNOWN.to_string(),
            latitude: UNKNOWN.to_string(),
            longitude: UNKNOWN.to_string(),
            codec: UNKNOWN.to_string(),
            sample_rate: UNKNOWN.to_string(),
            bitrate: UNKNOWN.to_string(),
            channels: UNKNOWN.to_string(),
            channel_layout: UNKNOWN.to_string(),
            icy: IcyTags::default(),
        }
    }

    /// The dedup key for this record
    pub fn key(&self) -> (String, String) {
        (self.name.clone(), self.url.clone())
    }

    /// Format the header row for a newly created store.
    pub fn header_row(delimiter: char) -> String {
        COLUMNS.join(delimiter.to_string().as_str())
    }

    /// Format this record as one delimited row.
    ///
    /// Every field is sanitized so the row stays single-line and splits
    /// back into exactly [`COLUMNS`] fields.
    pub fn to_row(&self, delimiter: char) -> String {
        let fields = [
            self.name.as_str(),
            self.url.as_str(),
            if self.available { "1" } else { "0" },
            self.country.as_str(),
            self.country_code.as_str(),
            self.latitude.as_str(),
            self.longitude.as_str(),
            self.codec.as_str(),
            self.sample_rate.as_str(),
            self.bitrate.as_str(),
            self.channels.as_str(),
            self.channel_layout.as_str(),
            self.icy.bitrate.as_str(),
            self.icy.description.as_str(),
            self.icy.genre.as_str(),
            self.icy.name.as_str(),
            self.icy.publisher.as_str(),
            self.icy.title.as_str(),
        ];

        fields
            .iter()
            .map(|f| sanitize_field(f, delimiter))
            .collect::<Vec<_>>()
            .join(delimiter.to_string().as_str())
    }

    /// Parse a full row back into a record.
    ///
    /// Returns `None` when the line does not carry the full fixed column
    /// set (a corrupt or foreign line).
    pub fn from_row(line: &str, delimiter: char) -> Option<Self> {
        let fields: Vec<&str> = line.split(delimiter).collect();
        if fields.len() != COLUMNS.len() {
            return None;
        }

        Some(Self {
            name: fields[0].to_string(),
            url: fields[1].to_string(),
            available: fields[2] == "1",
            country: fields[3].to_string(),
            country_code: fields[4].to_string(),
            latitude: fields[5].to_string(),
            longitude: fields[6].to_string(),
            codec: fields[7].to_string(),
            sample_rate: fields[8].to_string(),
            bitrate: fields[9].to_string(),
            channels: fields[10].to_string(),
            channel_layout: fields[11].to_string(),
            icy: IcyTags {
                bitrate: fields[12].to_string(),
                description: fields[13].to_string(),
                genre: fields[14].to_string(),
                name: fields[15].to_string(),
                publisher: fields[16].to_string(),
                title: fields[17].to_string(),
            },
        })
    }

    /// Extract just the dedup key from a stored row.
    ///
    /// Tolerant of rows written by older column sets: only the first two
    /// fields are required.
    pub fn key_of_row(line: &str, delimiter: char) -> Option<(String, String)> {
        let mut fields = line.split(delimiter);
        let name = fields.next()?;
        let url = fields.next()?;
        Some((name.to_string(), url.to_string()))
    }
}

/// Replace characters that would break the row format.
///
/// The delimiter and line breaks become spaces; everything else passes
/// through untouched.
pub fn sanitize_field(value: &str, delimiter: char) -> String {
    value
        .chars()
        .map(|c| {
            if c == delimiter || c == '\n' || c == '\r' {
                ' '
            } else {
                c
            }
        })
        .collect()
}
