//! Application configuration for roomscout.
//!
//! User config lives at `~/.roomscout/roomscout.toml`.
//! CLI flags override config file values, which override defaults.
//! The loaded [`AppConfig`] is passed explicitly to the pipeline; there is no
//! process-wide config instance.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, RoomscoutError};
use crate::types::Locale;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "roomscout.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".roomscout";

// ---------------------------------------------------------------------------
// Config structs (matching roomscout.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where listings and detail pages come from.
    #[serde(default)]
    pub source: SourceSection,

    /// Worker pool and failure policies.
    #[serde(default)]
    pub crawl: CrawlSection,

    /// Search index connection.
    #[serde(default)]
    pub index: IndexSection,
}

/// `[source]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSection {
    /// Site root that detail paths are joined onto.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// The single listing page to crawl.
    #[serde(default = "default_listing_url")]
    pub listing_url: String,

    /// Path prefix of detail pages, e.g. `/hotel/ru/`.
    #[serde(default = "default_detail_path")]
    pub detail_path: String,

    /// Locales to fetch, in fetch order.
    #[serde(default = "default_locales")]
    pub locales: Vec<Locale>,

    /// Locale whose detail URL carries no locale suffix.
    #[serde(default = "default_primary_locale")]
    pub primary_locale: Locale,
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            listing_url: default_listing_url(),
            detail_path: default_detail_path(),
            locales: default_locales(),
            primary_locale: default_primary_locale(),
        }
    }
}

fn default_base_url() -> String {
    "https://www.booking.com".into()
}
fn default_listing_url() -> String {
    "https://www.booking.com/searchresults.html?dest_id=-2874130;dest_type=city".into()
}
fn default_detail_path() -> String {
    "/hotel/ru/".into()
}
fn default_locales() -> Vec<Locale> {
    vec![Locale::new("en"), Locale::new("ru")]
}
fn default_primary_locale() -> Locale {
    Locale::new("en")
}

/// What to do with an identifier when some of its locales fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocalePolicy {
    /// Keep the locales that succeeded and report the rest.
    #[default]
    Partial,
    /// Any failed locale fails the whole identifier.
    Strict,
}

/// What to do when extracted coordinates are out of range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GeoPolicy {
    /// Index the records without a location.
    #[default]
    DropCoordinates,
    /// Fail the whole identifier.
    RejectIdentifier,
}

/// `[crawl]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSection {
    /// Number of crawl workers.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Capacity of the work queue and of the outcome stream.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Deadline for a single detail-page fetch.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    #[serde(default)]
    pub locale_policy: LocalePolicy,

    #[serde(default)]
    pub geo_policy: GeoPolicy,
}

impl Default for CrawlSection {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            queue_capacity: default_queue_capacity(),
            fetch_timeout_secs: default_fetch_timeout(),
            locale_policy: LocalePolicy::default(),
            geo_policy: GeoPolicy::default(),
        }
    }
}

fn default_concurrency() -> usize {
    4
}
fn default_queue_capacity() -> usize {
    16
}
fn default_fetch_timeout() -> u64 {
    30
}

/// Which search index implementation to write to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndexBackend {
    /// An Elasticsearch-compatible HTTP endpoint.
    #[default]
    Elastic,
    /// A local libSQL database file.
    Local,
}

/// `[index]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSection {
    #[serde(default)]
    pub backend: IndexBackend,

    /// Elasticsearch node URLs.
    #[serde(default = "default_nodes")]
    pub nodes: Vec<String>,

    /// Index name prefix.
    #[serde(default = "default_index_name")]
    pub name: String,

    /// Drop and recreate the index on startup.
    #[serde(default)]
    pub drop_on_startup: bool,

    /// Database file for the local backend.
    #[serde(default = "default_local_path")]
    pub local_path: String,
}

impl Default for IndexSection {
    fn default() -> Self {
        Self {
            backend: IndexBackend::default(),
            nodes: default_nodes(),
            name: default_index_name(),
            drop_on_startup: false,
            local_path: default_local_path(),
        }
    }
}

fn default_nodes() -> Vec<String> {
    vec!["http://127.0.0.1:9200".into()]
}
fn default_index_name() -> String {
    "booking".into()
}
fn default_local_path() -> String {
    "roomscout-index.db".into()
}

impl AppConfig {
    /// Reject configurations the pipeline cannot run with.
    pub fn verify(&self) -> Result<()> {
        let source = &self.source;
        if source.locales.is_empty() {
            return Err(RoomscoutError::config("no locales configured"));
        }
        if !source.locales.contains(&source.primary_locale) {
            return Err(RoomscoutError::config(format!(
                "primary locale '{}' is not in locales",
                source.primary_locale
            )));
        }
        Url::parse(&source.base_url)
            .map_err(|e| RoomscoutError::config(format!("invalid base_url: {e}")))?;
        Url::parse(&source.listing_url)
            .map_err(|e| RoomscoutError::config(format!("invalid listing_url: {e}")))?;

        if self.crawl.concurrency == 0 {
            return Err(RoomscoutError::config("crawl.concurrency must be positive"));
        }
        if self.crawl.queue_capacity == 0 {
            return Err(RoomscoutError::config(
                "crawl.queue_capacity must be positive",
            ));
        }
        if self.crawl.fetch_timeout_secs == 0 {
            return Err(RoomscoutError::config(
                "crawl.fetch_timeout_secs must be positive",
            ));
        }

        if self.index.backend == IndexBackend::Elastic && self.index.nodes.is_empty() {
            return Err(RoomscoutError::config("no index nodes specified"));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Crawl config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime crawl configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub listing_url: String,
    pub base_url: String,
    pub detail_path: String,
    /// Fetch order; the first locale performs coordinate extraction.
    pub locales: Vec<Locale>,
    pub primary_locale: Locale,
    pub concurrency: usize,
    pub queue_capacity: usize,
    pub fetch_timeout: Duration,
    pub locale_policy: LocalePolicy,
    pub geo_policy: GeoPolicy,
}

impl From<&AppConfig> for CrawlConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            listing_url: config.source.listing_url.clone(),
            base_url: config.source.base_url.clone(),
            detail_path: config.source.detail_path.clone(),
            locales: config.source.locales.clone(),
            primary_locale: config.source.primary_locale.clone(),
            concurrency: config.crawl.concurrency,
            queue_capacity: config.crawl.queue_capacity,
            fetch_timeout: Duration::from_secs(config.crawl.fetch_timeout_secs),
            locale_policy: config.crawl.locale_policy,
            geo_policy: config.crawl.geo_policy,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.roomscout/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| RoomscoutError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.roomscout/roomscout.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| RoomscoutError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| RoomscoutError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| RoomscoutError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| RoomscoutError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| RoomscoutError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("listing_url"));
        assert!(toml_str.contains("drop-coordinates"));
    }

    #[test]
    fn default_config_verifies() {
        AppConfig::default().verify().expect("defaults are valid");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let toml_str = r#"
[source]
locales = ["ru", "en"]

[crawl]
concurrency = 8
locale_policy = "strict"

[index]
backend = "local"
local_path = "/tmp/hotels.db"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.source.locales[0].as_str(), "ru");
        assert_eq!(config.source.primary_locale.as_str(), "en");
        assert_eq!(config.crawl.concurrency, 8);
        assert_eq!(config.crawl.queue_capacity, 16);
        assert_eq!(config.crawl.locale_policy, LocalePolicy::Strict);
        assert_eq!(config.index.backend, IndexBackend::Local);
        config.verify().expect("valid");
    }

    #[test]
    fn verify_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.source.primary_locale = Locale::new("de");
        assert!(config.verify().is_err());

        let mut config = AppConfig::default();
        config.crawl.concurrency = 0;
        assert!(config.verify().is_err());

        let mut config = AppConfig::default();
        config.crawl.fetch_timeout_secs = 0;
        let err = config.verify().unwrap_err();
        assert!(matches!(err, RoomscoutError::Config { .. }));
        assert!(err.to_string().contains("fetch_timeout_secs"));

        let mut config = AppConfig::default();
        config.index.nodes.clear();
        let err = config.verify().unwrap_err();
        assert!(err.to_string().contains("no index nodes"));

        // The local backend does not need nodes.
        config.index.backend = IndexBackend::Local;
        assert!(config.verify().is_ok());
    }

    #[test]
    fn crawl_config_from_app_config() {
        let app = AppConfig::default();
        let crawl = CrawlConfig::from(&app);
        assert_eq!(crawl.concurrency, 4);
        assert_eq!(crawl.fetch_timeout, Duration::from_secs(30));
        assert_eq!(crawl.locales.len(), 2);
        assert_eq!(crawl.locale_policy, LocalePolicy::Partial);
    }
}
