//! # RadioAtlas Pipeline
//!
//! The concurrent station enrichment pipeline:
//! - [`Orchestrator`]: runs the per-station probe sequence and assembles
//!   one normalized [`rastation::StationRecord`]
//! - [`Controller`]: bounded-concurrency fan-out over the input set, dedup
//!   against the [`ProcessedLedger`], crash-safe incremental appends to the
//!   [`store::OutputStore`]
//!
//! ## Processing model
//!
//! Stations are claimed in the ledger *before* dispatch (claim-then-process):
//! within one run every `(name, url)` pair is processed at most once, and a
//! station that crashes mid-flight is not retried in that run. Across runs
//! the default policy retries such stations (only completed rows are
//! replayed); the optional claim journal makes at-most-once hold across
//! restarts too.
//!
//! Rows are appended and flushed the moment a station finishes, so partial
//! progress always survives a crash. Completion order across stations is
//! unordered; within one station the probe sequence is strict.

pub mod controller;
pub mod error;
pub mod ledger;
pub mod orchestrator;
pub mod store;

pub use controller::{Controller, PipelineOptions, RunSummary};
pub use error::{PipelineError, Result};
pub use ledger::ProcessedLedger;
pub use orchestrator::{Orchestrator, RetrySet};
pub use store::{read_input, ClaimJournal, OutputStore};
