//! Detail-page fetching.
//!
//! [`DocumentFetcher`] is the seam the crawl scheduler drives; [`HttpFetcher`]
//! is the production implementation that downloads one page per
//! (identifier, locale) and extracts its fields.

use std::future::Future;

use reqwest::Client;
use roomscout_shared::{
    CrawlConfig, Identifier, Locale, LocaleDocument, Result, RoomscoutError,
};
use tracing::{debug, instrument};
use url::Url;

use crate::detail;
use crate::geo::CoordinateCache;

/// User-Agent string for detail requests.
const USER_AGENT: &str = concat!("roomscout/", env!("CARGO_PKG_VERSION"));

/// Suffix of every detail page path.
const DETAIL_SUFFIX: &str = ".html";

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Fetches and parses one detail document.
///
/// Implementations must report every failure as an error; a failed locale
/// never comes back as a document with empty fields. `geo` is shared by all
/// locales of `id`: call [`CoordinateCache::get_or_extract`] only after the
/// page was fetched successfully.
pub trait DocumentFetcher: Send + Sync + 'static {
    fn fetch(
        &self,
        id: &Identifier,
        locale: &Locale,
        geo: &CoordinateCache,
    ) -> impl Future<Output = Result<LocaleDocument>> + Send;
}

// ---------------------------------------------------------------------------
// HttpFetcher
// ---------------------------------------------------------------------------

/// Fetches detail pages over HTTP.
pub struct HttpFetcher {
    client: Client,
    base_url: Url,
    detail_path: String,
    primary_locale: Locale,
}

impl HttpFetcher {
    /// Create a fetcher from the runtime crawl configuration.
    ///
    /// The client timeout equals the per-fetch deadline so a stalled
    /// connection is abandoned even outside the scheduler.
    pub fn new(config: &CrawlConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| RoomscoutError::config(format!("invalid base_url: {e}")))?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(config.fetch_timeout)
            .build()
            .map_err(|e| RoomscoutError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            detail_path: config.detail_path.clone(),
            primary_locale: config.primary_locale.clone(),
        })
    }

    /// URL of the detail page for `id` in `locale`.
    ///
    /// The primary locale has no suffix (`<id>.html`); others do (`<id>.<locale>.html`).
    pub fn detail_url(&self, id: &Identifier, locale: &Locale) -> Result<Url> {
        let file = if *locale == self.primary_locale {
            format!("{id}{DETAIL_SUFFIX}")
        } else {
            format!("{id}.{locale}{DETAIL_SUFFIX}")
        };
        let path = format!("{}{file}", self.detail_path);

        self.base_url
            .join(&path)
            .map_err(|e| RoomscoutError::fetch(id, locale, format!("bad detail URL {path}: {e}")))
    }

    async fn download(&self, id: &Identifier, locale: &Locale, url: &Url) -> Result<String> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| RoomscoutError::fetch(id, locale, format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RoomscoutError::fetch(id, locale, format!("{url}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| RoomscoutError::fetch(id, locale, format!("{url}: body read failed: {e}")))
    }
}

impl DocumentFetcher for HttpFetcher {
    #[instrument(skip_all, fields(id = %id, locale = %locale))]
    async fn fetch(
        &self,
        id: &Identifier,
        locale: &Locale,
        geo: &CoordinateCache,
    ) -> Result<LocaleDocument> {
        let url = self.detail_url(id, locale)?;
        debug!(%url, "fetching detail page");

        let body = self.download(id, locale, &url).await?;

        let mut document = detail::parse_detail(&body)
            .map_err(|e| RoomscoutError::fetch(id, locale, e.to_string()))?;
        document.coordinates = geo.get_or_extract(&body);

        debug!(
            rooms = document.rooms.len(),
            amenities = document.amenities.len(),
            has_coordinates = document.coordinates.is_some(),
            "detail page parsed"
        );
        Ok(document)
    }
}
