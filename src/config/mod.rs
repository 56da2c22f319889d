//! Configuration management.
//!
//! Settings are resolved once, by the binary, and handed to each source at
//! construction time. A TOML file can supply any section; environment
//! variables prefixed with `LITHARVEST_` override it.
//!
//! # Configuration File Format
//!
//! ```toml
//! [api_keys]
//! wos = "your-clarivate-key"
//! ncbi = "your-ncbi-key"
//!
//! [queries]
//! pubmed = "(indoor) AND (sensing OR sensor)"
//!
//! [fetch]
//! page_delay_ms = 1000
//! acm_page_size = 50
//! wos_page_size = 100
//! pubmed_batch_size = 1000
//! timeout_secs = 30
//! contact_email = "you@example.org"
//!
//! [output]
//! directory = "literature"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "litharvest.toml";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// API keys for the sources that need them
    #[serde(default)]
    pub api_keys: ApiKeys,

    /// Default query per source
    #[serde(default)]
    pub queries: Queries,

    /// Pagination and transport settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// API keys for external services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeys {
    /// Clarivate Web of Science Lite key (required for the wos source)
    #[serde(default)]
    pub wos: Option<String>,

    /// NCBI E-utilities key (optional, for higher rate limits)
    #[serde(default)]
    pub ncbi: Option<String>,
}

impl Default for ApiKeys {
    fn default() -> Self {
        Self {
            wos: std::env::var("WOS_API_KEY").ok(),
            ncbi: std::env::var("NCBI_API_KEY").ok(),
        }
    }
}

/// Default search expressions, one per source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Queries {
    #[serde(default)]
    pub acm: Option<String>,

    #[serde(default)]
    pub wos: Option<String>,

    #[serde(default)]
    pub pubmed: Option<String>,
}

impl Default for Queries {
    fn default() -> Self {
        Self {
            acm: std::env::var("ACM_QUERY").ok(),
            wos: std::env::var("WOS_QUERY").ok(),
            pubmed: std::env::var("PUBMED_QUERY").ok(),
        }
    }
}

/// Fetch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Fixed pause between ACM result pages (in milliseconds)
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    /// Results per ACM page
    #[serde(default = "default_acm_page_size")]
    pub acm_page_size: u32,

    /// Records per Web of Science page
    #[serde(default = "default_wos_page_size")]
    pub wos_page_size: u32,

    /// Ids per PubMed enumeration request
    #[serde(default = "default_pubmed_batch_size")]
    pub pubmed_batch_size: usize,

    /// Per-request timeout (in seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Contact address sent to NCBI with every request
    #[serde(default = "default_contact_email")]
    pub contact_email: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_delay_ms: default_page_delay_ms(),
            acm_page_size: default_acm_page_size(),
            wos_page_size: default_wos_page_size(),
            pubmed_batch_size: default_pubmed_batch_size(),
            timeout_secs: default_timeout_secs(),
            contact_email: default_contact_email(),
        }
    }
}

fn default_page_delay_ms() -> u64 {
    1000
}

fn default_acm_page_size() -> u32 {
    50
}

fn default_wos_page_size() -> u32 {
    100
}

fn default_pubmed_batch_size() -> usize {
    1000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_contact_email() -> Option<String> {
    std::env::var("NCBI_EMAIL").ok()
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory CSV files are written to
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("literature")
}

impl Config {
    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Load error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Serialize error: {0}")]
    Serialize(String),
}

/// Load configuration from a file, with `LITHARVEST_*` environment overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(
            config::Environment::with_prefix("LITHARVEST")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Find a configuration file in the default locations
///
/// Checks `./litharvest.toml`, then `<config dir>/litharvest/config.toml`.
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("litharvest").join("config.toml"))
        .filter(|path| path.is_file())
}

/// Default location for a newly written configuration file
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("litharvest").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}

/// Get the default configuration (from env vars or defaults)
pub fn get_config() -> Config {
    Config::default()
}
