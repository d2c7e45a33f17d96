//! The dedup ledger: which `(name, url)` pairs are already spoken for.

use std::collections::HashSet;
use std::sync::Mutex;

/// Set of claimed station keys, shared by every station task.
///
/// Seeded once at startup from the output store (and the claim journal,
/// when enabled), then mutated exactly once per station at claim time. The
/// lock guards only the in-memory test-and-insert.
#[derive(Debug, Default)]
pub struct ProcessedLedger {
    keys: Mutex<HashSet<(String, String)>>,
}

impl ProcessedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replay previously processed keys into the ledger.
    pub fn seed(&self, keys: impl IntoIterator<Item = (String, String)>) {
        self.keys.lock().unwrap().extend(keys);
    }

    /// Atomically claim a station for processing.
    ///
    /// Returns `true` when the key was newly inserted — the caller now owns
    /// it — and `false` when the station was already claimed or previously
    /// completed.
    pub fn claim(&self, name: &str, url: &str) -> bool {
        self.keys
            .lock()
            .unwrap()
            .insert((name.to_string(), url.to_string()))
    }

    /// Number of claimed keys.
    pub fn len(&self) -> usize {
        self.keys.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
