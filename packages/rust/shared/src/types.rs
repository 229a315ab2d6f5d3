//! Core domain types for crawled hotel records.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RoomscoutError};

// ---------------------------------------------------------------------------
// Identifier / Locale
// ---------------------------------------------------------------------------

/// Opaque token naming one catalog entry (e.g. `guest-house-snezhny-bars-abzakovo`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A language variant of a detail document (`en`, `ru`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locale(String);

impl Locale {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Index partition holding this locale's records (`hotel-<locale>`).
    pub fn partition(&self) -> String {
        format!("hotel-{}", self.0)
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Locale {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// A raw latitude/longitude pair as found in page scripts. Not validated.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// A latitude/longitude pair known to be inside the valid range.
///
/// The range is open: `-90 < lat < 90` and `-180 < lon < 180`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Coordinates")]
pub struct GeoPoint {
    lat: f64,
    lon: f64,
}

impl GeoPoint {
    /// Validate a pair, failing with [`RoomscoutError::InvalidGeo`] when out of range.
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        // NaN fails both comparisons and is rejected too.
        let lat_ok = lat > -90.0 && lat < 90.0;
        let lon_ok = lon > -180.0 && lon < 180.0;
        if lat_ok && lon_ok {
            Ok(Self { lat, lon })
        } else {
            Err(RoomscoutError::InvalidGeo { lat, lon })
        }
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }
}

impl TryFrom<Coordinates> for GeoPoint {
    type Error = RoomscoutError;

    fn try_from(c: Coordinates) -> Result<Self> {
        Self::new(c.lat, c.lon)
    }
}

// ---------------------------------------------------------------------------
// LocaleDocument / Record
// ---------------------------------------------------------------------------

/// One room type offered by a hotel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Display name of the room type.
    pub name: String,
    /// Occupancy, counted from the occupancy icons in the rooms table.
    pub max_people: u32,
}

/// Fields extracted from one fetched detail page for one (identifier, locale).
#[derive(Debug, Clone, PartialEq)]
pub struct LocaleDocument {
    pub name: String,
    pub address: String,
    pub summary: String,
    pub amenities: Vec<String>,
    pub rooms: Vec<Room>,
    /// Shared across all locales of an identifier; see the crawler's coordinate cache.
    pub coordinates: Option<Coordinates>,
}

/// The indexed document for one (identifier, locale).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: Identifier,
    pub locale: Locale,
    pub name: String,
    pub address: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub rooms: Vec<Room>,
}

impl Record {
    /// Index partition this record belongs to.
    pub fn partition(&self) -> String {
        self.locale.partition()
    }
}
