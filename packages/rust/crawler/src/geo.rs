//! Coordinate extraction from inline page scripts.
//!
//! Coordinates are not in the visible DOM; the page assigns them to script
//! globals. They do not vary by locale, so they are extracted once per
//! identifier through a [`CoordinateCache`] and reused by the other locales.

use std::sync::{LazyLock, OnceLock};

use regex::Regex;
use roomscout_shared::Coordinates;

static LAT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"booking\.env\.b_map_center_latitude\s*=\s*(-?[0-9]+(?:\.[0-9]+)?)\s*;")
        .expect("latitude regex")
});

static LON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"booking\.env\.b_map_center_longitude\s*=\s*(-?[0-9]+(?:\.[0-9]+)?)\s*;")
        .expect("longitude regex")
});

/// Find the coordinate assignments in raw page markup.
///
/// Both values must be present and numeric; no range check happens here.
pub fn extract_coordinates(raw: &str) -> Option<Coordinates> {
    let lat = capture_f64(&LAT_RE, raw)?;
    let lon = capture_f64(&LON_RE, raw)?;
    Some(Coordinates { lat, lon })
}

fn capture_f64(re: &Regex, raw: &str) -> Option<f64> {
    re.captures(raw)?.get(1)?.as_str().parse().ok()
}

/// Per-identifier, compute-once holder for coordinates.
///
/// The first caller of [`get_or_extract`](Self::get_or_extract) runs the
/// extraction; concurrent callers wait for it, later callers get the stored
/// result (including "no coordinates found"). One cache is created per
/// identifier, so identifiers never wait on each other.
#[derive(Debug, Default)]
pub struct CoordinateCache {
    cell: OnceLock<Option<Coordinates>>,
}

impl CoordinateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached pair, extracting it from `raw` on first use.
    pub fn get_or_extract(&self, raw: &str) -> Option<Coordinates> {
        *self.cell.get_or_init(|| extract_coordinates(raw))
    }

    /// Whether some fetch has already performed the extraction.
    pub fn is_resolved(&self) -> bool {
        self.cell.get().is_some()
    }
}
