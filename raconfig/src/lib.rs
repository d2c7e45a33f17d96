//! # RadioAtlas Configuration Module
//!
//! Configuration management for the enrichment pipeline:
//! - Embedded default configuration, always valid
//! - Optional YAML file overriding the defaults (`RADIOATLAS_CONFIG` or
//!   `radioatlas.yaml` in the working directory)
//! - Environment variable overrides for secrets and paths
//! - Typed accessors for every tunable
//!
//! The [`Config`] is constructed once at startup and passed by reference
//! into the components that need it — there is no process-wide singleton.
//!
//! ## Usage
//!
//! ```no_run
//! let config = raconfig::Config::load()?;
//! let concurrency = config.pipeline.concurrency;
//! let timeout = config.probe.liveness_timeout();
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Embedded default configuration, compiled into the binary.
const DEFAULT_CONFIG: &str = include_str!("radioatlas.yaml");

/// Environment variable naming an alternative configuration file.
const ENV_CONFIG_PATH: &str = "RADIOATLAS_CONFIG";

/// Default configuration file looked up in the working directory.
const DEFAULT_CONFIG_FILE: &str = "radioatlas.yaml";

// ============================================================================
// Config sections
// ============================================================================

/// Input store settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Delimited list of stations to probe (columns: name, url)
    pub path: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: "input/radio_urls.csv".to_string(),
        }
    }
}

/// Output store settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Append-only result store consumed by the map renderer
    pub path: String,
    /// Field delimiter; only the first character is used
    pub delimiter: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "output/radio_results.csv".to_string(),
            delimiter: "\u{1F648}".to_string(),
        }
    }
}

impl OutputConfig {
    /// The delimiter as a single character.
    pub fn delimiter_char(&self) -> char {
        self.delimiter.chars().next().unwrap_or('\u{1F648}')
    }
}

/// Concurrency and resume policy
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum stations in flight at once
    pub concurrency: usize,
    /// Delay between successive dispatches (milliseconds)
    pub pacing_ms: u64,
    /// Journal claims before processing so a claimed-but-crashed station is
    /// never retried across restarts
    pub strict_at_most_once: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 50,
            pacing_ms: 10,
            strict_at_most_once: false,
        }
    }
}

impl PipelineConfig {
    /// Pacing delay between dispatches.
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

/// IP-geolocation service settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeoConfig {
    /// Base URL of the geolocation API
    pub api_base: String,
    /// Static access token (or `RADIOATLAS_GEO_TOKEN`)
    pub token: String,
    pub timeout_secs: u64,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            api_base: "https://ipinfo.io".to_string(),
            token: String::new(),
            timeout_secs: 5,
        }
    }
}

impl GeoConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The token, when one is configured.
    pub fn token_opt(&self) -> Option<&str> {
        if self.token.is_empty() {
            None
        } else {
            Some(&self.token)
        }
    }
}

/// Reverse-geocoding service settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    /// Base URL of a Nominatim-compatible reverse geocoder
    pub api_base: String,
    /// Identifying User-Agent (required by Nominatim's usage policy)
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            api_base: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: "RadioAtlas/0.1 (reverse geocoder)".to_string(),
            timeout_secs: 10,
        }
    }
}

impl GeocoderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Stream probe settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// User-Agent presented to stream servers
    pub user_agent: String,
    pub liveness_timeout_secs: u64,
    pub media_timeout_secs: u64,
    /// Path to the media inspection tool
    pub ffprobe_path: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (compatible; RadioAtlas/0.1)".to_string(),
            liveness_timeout_secs: 10,
            media_timeout_secs: 20,
            ffprobe_path: "ffprobe".to_string(),
        }
    }
}

impl ProbeConfig {
    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_secs(self.liveness_timeout_secs)
    }

    pub fn media_timeout(&self) -> Duration {
        Duration::from_secs(self.media_timeout_secs)
    }
}

/// Logging settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// tracing filter used when `RUST_LOG` is not set
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

// ============================================================================
// Config
// ============================================================================

/// Full RadioAtlas configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub output: OutputConfig,
    pub pipeline: PipelineConfig,
    pub geo: GeoConfig,
    pub geocoder: GeocoderConfig,
    pub probe: ProbeConfig,
    pub log: LogConfig,
}

impl Config {
    /// Load the configuration.
    ///
    /// Resolution order, later entries winning:
    /// 1. Embedded defaults
    /// 2. `RADIOATLAS_CONFIG` file, or `radioatlas.yaml` in the working
    ///    directory when present
    /// 3. Environment overrides (`RADIOATLAS_INPUT`, `RADIOATLAS_OUTPUT`,
    ///    `RADIOATLAS_GEO_TOKEN`, `RADIOATLAS_CONCURRENCY`)
    pub fn load() -> Result<Self> {
        let mut config = match env::var(ENV_CONFIG_PATH) {
            Ok(path) => Self::load_file(Path::new(&path))
                .with_context(|| format!("loading configuration from {path}"))?,
            Err(_) if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::load_file(Path::new(DEFAULT_CONFIG_FILE))
                    .with_context(|| format!("loading configuration from {DEFAULT_CONFIG_FILE}"))?
            }
            Err(_) => Self::embedded_defaults()?,
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse a configuration file.
    pub fn load_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config =
            serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// The compiled-in defaults.
    pub fn embedded_defaults() -> Result<Self> {
        serde_yaml::from_str(DEFAULT_CONFIG).context("parsing embedded default configuration")
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = env::var("RADIOATLAS_INPUT") {
            self.input.path = path;
        }
        if let Ok(path) = env::var("RADIOATLAS_OUTPUT") {
            self.output.path = path;
        }
        if let Ok(token) = env::var("RADIOATLAS_GEO_TOKEN") {
            self.geo.token = token;
        }
        if let Ok(value) = env::var("RADIOATLAS_CONCURRENCY") {
            match value.parse() {
                Ok(n) => self.pipeline.concurrency = n,
                Err(_) => {
                    tracing::warn!("Ignoring invalid RADIOATLAS_CONCURRENCY: {value}")
                }
            }
        }
    }
}
