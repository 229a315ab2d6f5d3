//! Catalog listing fetch and identifier extraction.
//!
//! The crawl starts from one listing page. We fetch it, walk the primary
//! results region, and reduce each hotel link to an [`Identifier`]. Pagination
//! is not followed.

mod parser;

use std::time::Duration;

use reqwest::Client;
use roomscout_shared::{Identifier, Result, RoomscoutError};
use tracing::{info, instrument};
use url::Url;

pub use parser::extract;

/// Maximum number of redirects to follow when fetching the listing.
const MAX_REDIRECTS: usize = 5;

/// Default timeout in seconds for fetching the listing.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User-Agent string for listing requests.
const USER_AGENT: &str = concat!("roomscout/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Listing options
// ---------------------------------------------------------------------------

/// Configuration for fetching a listing page.
#[derive(Debug, Clone)]
pub struct ListingOptions {
    /// Timeout for the HTTP request in seconds.
    pub timeout_secs: u64,
}

impl Default for ListingOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

// ---------------------------------------------------------------------------
// Main entry points
// ---------------------------------------------------------------------------

/// Fetch the listing at `url` and extract its identifiers.
///
/// A listing that cannot be fetched is a [`RoomscoutError::Network`] error;
/// one that yields nothing is [`RoomscoutError::EmptyCatalog`].
#[instrument(skip_all, fields(url = %url))]
pub async fn discover(url: &Url, opts: &ListingOptions) -> Result<Vec<Identifier>> {
    let html = fetch_listing(url, opts).await?;
    let ids = parser::extract(&html)?;

    info!(identifiers = ids.len(), "listing parsed");
    Ok(ids)
}

/// Fetch the raw markup of a listing page.
pub async fn fetch_listing(url: &Url, opts: &ListingOptions) -> Result<String> {
    let client = build_client(opts)?;

    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| RoomscoutError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(RoomscoutError::Network(format!("{url}: HTTP {status}")));
    }

    response
        .text()
        .await
        .map_err(|e| RoomscoutError::Network(format!("{url}: failed to read body: {e}")))
}

/// Build a reqwest client with appropriate settings.
fn build_client(opts: &ListingOptions) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(Duration::from_secs(opts.timeout_secs))
        .build()
        .map_err(|e| RoomscoutError::Network(format!("failed to build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_discover_with_mock_server() {
        let server = wiremock::MockServer::start().await;

        let listing = std::fs::read_to_string("../../../fixtures/html/listing.html")
            .expect("read listing fixture");

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/searchresults.html"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(listing))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/searchresults.html?dest_id=-1", server.uri())).unwrap();
        let ids = discover(&url, &ListingOptions::default()).await.unwrap();

        assert_eq!(ids.len(), 4);
        assert_eq!(ids[0].as_str(), "guest-house-snezhny-bars-abzakovo");
        assert_eq!(ids[3].as_str(), "novoabzakovo-cottage");
    }

    #[tokio::test]
    async fn test_discover_http_error_is_network() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/searchresults.html"))
            .respond_with(wiremock::ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/searchresults.html", server.uri())).unwrap();
        let err = discover(&url, &ListingOptions::default()).await.unwrap_err();
        assert!(matches!(err, RoomscoutError::Network(_)));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_discover_empty_listing() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/searchresults.html"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_string("<html><body>No results</body></html>"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/searchresults.html", server.uri())).unwrap();
        let err = discover(&url, &ListingOptions::default()).await.unwrap_err();
        assert!(matches!(err, RoomscoutError::EmptyCatalog));
    }
}
