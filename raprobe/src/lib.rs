//! # RadioAtlas Probes
//!
//! The per-station enrichment checks:
//! - [`LivenessProber`]: bounded-timeout GET, status line only
//! - [`resolve_host`]: URL → first resolved IP address
//! - [`MediaProber`]: ffprobe subprocess, first audio stream's metadata
//! - [`IcyProber`]: ICY response headers plus the optional in-band
//!   `StreamTitle` block
//! - [`retry`] / [`RetryPolicy`]: exponential backoff with jitter, yielding
//!   `None` instead of an error once attempts are exhausted
//!
//! Probes return [`ProbeError`] for transient failures; the orchestrator
//! wraps them in [`retry`] and downgrades exhaustion to the `"unknown"`
//! sentinel. No probe error escapes past that boundary.

pub mod error;
pub mod icy;
pub mod liveness;
pub mod media;
pub mod resolver;
pub mod retry;

pub use error::{ProbeError, Result};
pub use icy::IcyProber;
pub use liveness::LivenessProber;
pub use media::{AudioStreamInfo, MediaProber};
pub use resolver::resolve_host;
pub use retry::{retry, RetryPolicy};
