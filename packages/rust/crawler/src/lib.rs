//! Detail-page fetching and field extraction.
//!
//! This crate provides:
//! - [`fetcher`] — the [`DocumentFetcher`] seam and its HTTP implementation
//! - [`detail`] — structured field extraction from a detail page
//! - [`geo`] — coordinate extraction and the per-identifier [`CoordinateCache`]

pub mod detail;
pub mod fetcher;
pub mod geo;

pub use detail::parse_detail;
pub use fetcher::{DocumentFetcher, HttpFetcher};
pub use geo::{CoordinateCache, extract_coordinates};
