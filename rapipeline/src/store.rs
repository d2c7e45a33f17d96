//! Delimited input/output stores and the claim journal.
//!
//! The output store is append-only: one fully formatted row per completed
//! station, written and flushed under a lock as a single append, so a crash
//! can lose at most in-flight stations — never corrupt an existing row.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info, warn};

use rastation::{sanitize_field, StationInput, StationRecord};

use crate::error::{PipelineError, Result};

// ============================================================================
// Input store
// ============================================================================

/// Read the full input list into memory.
///
/// The first line is a header naming the columns; `name` and `url` must
/// both be present (any extra columns are ignored). Rows missing either
/// field are skipped with a warning rather than failing the run.
pub fn read_input(path: &Path, delimiter: char) -> Result<Vec<StationInput>> {
    let text = fs::read_to_string(path)?;
    let mut lines = text.lines();

    let header = lines.next().unwrap_or_default();
    let columns: Vec<&str> = header.split(delimiter).map(str::trim).collect();
    let name_idx = columns.iter().position(|c| *c == "name").ok_or_else(|| {
        PipelineError::MalformedInputHeader {
            path: path.display().to_string(),
            missing: "name",
        }
    })?;
    let url_idx = columns.iter().position(|c| *c == "url").ok_or_else(|| {
        PipelineError::MalformedInputHeader {
            path: path.display().to_string(),
            missing: "url",
        }
    })?;

    let mut stations = Vec::new();
    for (line_no, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(delimiter).collect();
        match (fields.get(name_idx), fields.get(url_idx)) {
            (Some(name), Some(url)) if !url.trim().is_empty() => {
                stations.push(StationInput::new(name.trim(), url.trim()));
            }
            _ => warn!(
                "Skipping malformed input row {} in {}",
                line_no + 2,
                path.display()
            ),
        }
    }

    info!("Read {} station(s) from {}", stations.len(), path.display());
    Ok(stations)
}

// ============================================================================
// Output store
// ============================================================================

/// The append-only result store.
pub struct OutputStore {
    path: PathBuf,
    delimiter: char,
    writer: Mutex<File>,
}

impl OutputStore {
    /// Open (or create) the store and replay its dedup keys.
    ///
    /// Parent directories are created as needed. The header row is written
    /// exactly once, only when the file is new or empty. The returned keys
    /// are the `(name, url)` pairs of every row already present — the seed
    /// for the dedup ledger.
    pub fn open(path: &Path, delimiter: char) -> Result<(Self, Vec<(String, String)>)> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let existing = replay_keys(path, delimiter)?;
        if !existing.is_empty() {
            info!(
                "Resuming: {} station(s) already present in {}",
                existing.len(),
                path.display()
            );
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let needs_header = file.metadata()?.len() == 0;

        let store = Self {
            path: path.to_path_buf(),
            delimiter,
            writer: Mutex::new(file),
        };

        if needs_header {
            debug!("Writing header row to new store {}", path.display());
            store.write_line(&StationRecord::header_row(delimiter))?;
        }

        Ok((store, existing))
    }

    /// Append one completed station, immediately and atomically.
    ///
    /// The row is fully formatted before the lock is taken; the lock covers
    /// a single write-and-flush so concurrent appends can never interleave.
    pub fn append(&self, record: &StationRecord) -> std::io::Result<()> {
        let row = record.to_row(self.delimiter);
        let mut writer = self.writer.lock().unwrap();
        writer.write_all(row.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&self, line: &str) -> std::io::Result<()> {
        let mut writer = self.writer.lock().unwrap();
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()
    }
}

/// Replay the dedup keys from an existing store file.
fn replay_keys(path: &Path, delimiter: char) -> std::io::Result<Vec<(String, String)>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let text = fs::read_to_string(path)?;
    Ok(text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| StationRecord::key_of_row(line, delimiter))
        .filter(|key| key != &("name".to_string(), "url".to_string()))
        .collect())
}

// ============================================================================
// Claim journal
// ============================================================================

/// Sidecar journal of claimed keys, for strict at-most-once across runs.
///
/// When enabled, every claim is appended here *before* the station is
/// processed; replaying the journal at startup means a claimed-but-crashed
/// station is never retried. Without the journal only completed rows are
/// replayed, and such stations are retried on the next run.
pub struct ClaimJournal {
    delimiter: char,
    writer: Mutex<File>,
}

impl ClaimJournal {
    /// Conventional journal path for an output store.
    pub fn path_for(output: &Path) -> PathBuf {
        let mut path = output.as_os_str().to_owned();
        path.push(".claims");
        PathBuf::from(path)
    }

    /// Open (or create) the journal and replay its keys.
    pub fn open(path: &Path, delimiter: char) -> Result<(Self, Vec<(String, String)>)> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let existing = if path.exists() {
            let text = fs::read_to_string(path)?;
            text.lines()
                .filter(|line| !line.trim().is_empty())
                .filter_map(|line| StationRecord::key_of_row(line, delimiter))
                .collect()
        } else {
            Vec::new()
        };

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok((
            Self {
                delimiter,
                writer: Mutex::new(file),
            },
            existing,
        ))
    }

    /// Record a claim, durably, before its station is processed.
    pub fn record(&self, name: &str, url: &str) -> std::io::Result<()> {
        let line = format!(
            "{}{}{}\n",
            sanitize_field(name, self.delimiter),
            self.delimiter,
            sanitize_field(url, self.delimiter)
        );
        let mut writer = self.writer.lock().unwrap();
        writer.write_all(line.as_bytes())?;
        writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rastation::DEFAULT_DELIMITER;
    use tempfile::TempDir;

    fn input_file(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("input.csv");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_read_input() {
        let dir = tempfile::tempdir().unwrap();
        let d = DEFAULT_DELIMITER;
        let path = input_file(
            &dir,
            &format!("name{d}url\nRadio A{d}http://a.example/stream\nRadio B{d}http://b.example\n"),
        );

        let stations = read_input(&path, d).unwrap();
        assert_eq!(stations.len(), 2);
        assert_eq!(stations[0], StationInput::new("Radio A", "http://a.example/stream"));
        assert_eq!(stations[1].name, "Radio B");
    }

    #[test]
    fn test_read_input_skips_malformed_rows() {
        let dir = tempfile::tempdir().unwrap();
        let d = DEFAULT_DELIMITER;
        let path = input_file(&dir, &format!("name{d}url\nonly-a-name\n\nRadio B{d}http://b\n"));

        let stations = read_input(&path, d).unwrap();
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].name, "Radio B");
    }

    #[test]
    fn test_read_input_requires_header_columns() {
        let dir = tempfile::tempdir().unwrap();
        let d = DEFAULT_DELIMITER;
        let path = input_file(&dir, &format!("name{d}stream\nRadio A{d}http://a\n"));

        match read_input(&path, d) {
            Err(PipelineError::MalformedInputHeader { missing, .. }) => {
                assert_eq!(missing, "url")
            }
            other => panic!("expected MalformedInputHeader, got {other:?}"),
        }
    }

    #[test]
    fn test_read_input_missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_input(&dir.path().join("nope.csv"), DEFAULT_DELIMITER);
        assert!(matches!(result, Err(PipelineError::Io(_))));
    }

    #[test]
    fn test_new_store_gets_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/results.csv");

        let (store, existing) = OutputStore::open(&path, DEFAULT_DELIMITER).unwrap();
        assert!(existing.is_empty());
        store
            .append(&StationRecord::unavailable("A", "http://a"))
            .unwrap();
        drop(store);

        // Re-open: the header must not be duplicated
        let (store, existing) = OutputStore::open(&path, DEFAULT_DELIMITER).unwrap();
        assert_eq!(existing, vec![("A".to_string(), "http://a".to_string())]);
        store
            .append(&StationRecord::unavailable("B", "http://b"))
            .unwrap();
        drop(store);

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], StationRecord::header_row(DEFAULT_DELIMITER));
        // Every data row parses with the full fixed column set
        for line in &lines[1..] {
            assert!(StationRecord::from_row(line, DEFAULT_DELIMITER).is_some());
        }
    }

    #[test]
    fn test_replay_ignores_header_and_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let d = DEFAULT_DELIMITER;

        let record = StationRecord::unavailable("A", "http://a");
        fs::write(
            &path,
            format!(
                "{}\n{}\n\n",
                StationRecord::header_row(d),
                record.to_row(d)
            ),
        )
        .unwrap();

        let (_store, existing) = OutputStore::open(&path, d).unwrap();
        assert_eq!(existing, vec![("A".to_string(), "http://a".to_string())]);
    }

    #[test]
    fn test_claim_journal_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv.claims");
        let d = DEFAULT_DELIMITER;

        let (journal, existing) = ClaimJournal::open(&path, d).unwrap();
        assert!(existing.is_empty());
        journal.record("A", "http://a").unwrap();
        journal.record("B", "http://b").unwrap();
        drop(journal);

        let (_journal, existing) = ClaimJournal::open(&path, d).unwrap();
        assert_eq!(
            existing,
            vec![
                ("A".to_string(), "http://a".to_string()),
                ("B".to_string(), "http://b".to_string()),
            ]
        );
    }

    #[test]
    fn test_journal_path_for() {
        assert_eq!(
            ClaimJournal::path_for(Path::new("output/results.csv")),
            PathBuf::from("output/results.csv.claims")
        );
    }

    #[test]
    fn test_concurrent_appends_do_not_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let (store, _) = OutputStore::open(&path, DEFAULT_DELIMITER).unwrap();
        let store = std::sync::Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for j in 0..25 {
                        let record = StationRecord::unavailable(
                            format!("station-{i}-{j}"),
                            format!("http://{i}.example/{j}"),
                        );
                        store.append(&record).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1 + 8 * 25);
        for line in &lines[1..] {
            assert!(
                StationRecord::from_row(line, DEFAULT_DELIMITER).is_some(),
                "corrupt row: {line}"
            );
        }
    }
}
