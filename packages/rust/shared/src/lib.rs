//! Shared types, error model, and configuration for roomscout.
//!
//! This crate is the foundation depended on by all other roomscout crates.
//! It provides:
//! - [`RoomscoutError`] — the unified error type
//! - Domain types ([`Identifier`], [`Locale`], [`LocaleDocument`], [`Record`])
//! - Configuration ([`AppConfig`], [`CrawlConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CrawlConfig, CrawlSection, GeoPolicy, IndexBackend, IndexSection, LocalePolicy,
    SourceSection, config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{Result, RoomscoutError};
pub use types::{Coordinates, GeoPoint, Identifier, Locale, LocaleDocument, Record, Room};
