//! Error types for roomscout.
//!
//! Library crates use [`RoomscoutError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all roomscout operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomscoutError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error outside a per-document fetch (listing page, client setup).
    #[error("network error: {0}")]
    Network(String),

    /// HTML parsing or content extraction error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// The listing page yielded no identifiers.
    #[error("listing page yielded no identifiers")]
    EmptyCatalog,

    /// Transport or parse failure for one (identifier, locale) fetch.
    #[error("fetch failed for {id} ({locale}): {cause}")]
    Fetch {
        id: String,
        locale: String,
        cause: String,
    },

    /// Coordinates outside the valid latitude/longitude range.
    #[error("invalid coordinates: lat={lat}, lon={lon}")]
    InvalidGeo { lat: f64, lon: f64 },

    /// Search index write, read, or bootstrap error.
    #[error("index error: {0}")]
    Index(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The crawl pool stopped before the identifier could be queued.
    #[error("crawl pool has stopped; {id} not queued")]
    PoolClosed { id: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RoomscoutError>;

impl RoomscoutError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a fetch error for one (identifier, locale) pair.
    pub fn fetch(
        id: impl std::fmt::Display,
        locale: impl std::fmt::Display,
        cause: impl Into<String>,
    ) -> Self {
        Self::Fetch {
            id: id.to_string(),
            locale: locale.to_string(),
            cause: cause.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = RoomscoutError::config("no locales configured");
        assert_eq!(err.to_string(), "config error: no locales configured");

        let err = RoomscoutError::fetch("abc-def", "ru", "HTTP 503");
        assert_eq!(err.to_string(), "fetch failed for abc-def (ru): HTTP 503");

        let err = RoomscoutError::InvalidGeo {
            lat: 91.0,
            lon: 0.0,
        };
        assert!(err.to_string().contains("lat=91"));

        let err = RoomscoutError::PoolClosed {
            id: "abzakovo-park".into(),
        };
        assert_eq!(
            err.to_string(),
            "crawl pool has stopped; abzakovo-park not queued"
        );
    }
}
