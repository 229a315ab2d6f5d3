//! Listing page parser.
//!
//! A listing page renders the primary search results first, then a
//! `.sr_separator` marker, then "properties nearby" that belong to other
//! destinations. Only anchors before the marker are catalog entries:
//! - Anchors: `a.hotel_name_link.url`
//! - Href: `/hotel/ru/<identifier>.html?<query>#<fragment>`

use std::borrow::Cow;
use std::sync::LazyLock;

use roomscout_shared::{Identifier, Result, RoomscoutError};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

// ---------------------------------------------------------------------------
// Selectors (compiled once)
// ---------------------------------------------------------------------------

/// Hotel name links in the results list.
static ANCHOR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.hotel_name_link.url").expect("anchor selector"));

/// Marker preceding the "nearby" region.
static SEPARATOR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".sr_separator").expect("separator selector"));

/// Relative hrefs are resolved against this before taking the last segment.
static HREF_BASE: LazyLock<Url> =
    LazyLock::new(|| Url::parse("https://listing.invalid/").expect("href base"));

/// Suffix removed from the final path segment.
const DETAIL_SUFFIX: &str = ".html";

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Extract identifiers from a listing page, in document order.
///
/// Duplicates are kept. Fails with [`RoomscoutError::EmptyCatalog`] when no
/// anchor before the separator yields an identifier.
pub fn extract(listing_html: &str) -> Result<Vec<Identifier>> {
    let doc = Html::parse_document(listing_html);
    let mut ids = Vec::new();

    for node in doc.root_element().descendants() {
        let Some(el) = ElementRef::wrap(node) else {
            continue;
        };

        if SEPARATOR_SEL.matches(&el) {
            debug!(collected = ids.len(), "reached nearby separator");
            break;
        }

        if !ANCHOR_SEL.matches(&el) {
            continue;
        }

        let Some(href) = el.value().attr("href") else {
            debug!("hotel link without href, skipping");
            continue;
        };

        match identifier_from_href(href) {
            Some(id) => ids.push(id),
            None => debug!(href, "no identifier in hotel link, skipping"),
        }
    }

    if ids.is_empty() {
        return Err(RoomscoutError::EmptyCatalog);
    }

    Ok(ids)
}

/// Reduce a hotel link to its identifier: last path segment minus `.html`.
///
/// The segment is percent-decoded, so a non-ASCII slug yields its readable
/// form. A segment that does not decode to UTF-8 is kept as written.
pub(crate) fn identifier_from_href(href: &str) -> Option<Identifier> {
    let url = HREF_BASE.join(href.trim()).ok()?;
    let raw = url.path_segments()?.next_back()?;
    let last = urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw));
    let id = last.strip_suffix(DETAIL_SUFFIX).unwrap_or(&*last);

    if id.is_empty() {
        None
    } else {
        Some(Identifier::new(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(html: &str) -> Vec<String> {
        extract(html)
            .expect("extract")
            .into_iter()
            .map(|id| id.to_string())
            .collect()
    }

    #[test]
    fn strips_path_query_and_suffix() {
        let id = identifier_from_href("/x/y/abc-def.html").unwrap();
        assert_eq!(id.as_str(), "abc-def");

        let id = identifier_from_href(
            "/hotel/ru/guest-house-snezhny-bars-abzakovo.html?dest_type=city;dest_id=-2874130#hotelTmpl",
        )
        .unwrap();
        assert_eq!(id.as_str(), "guest-house-snezhny-bars-abzakovo");

        let id = identifier_from_href("https://www.booking.com/hotel/ru/park.html").unwrap();
        assert_eq!(id.as_str(), "park");
    }

    #[test]
    fn non_ascii_slug_is_decoded() {
        let id = identifier_from_href("/hotel/ru/%D0%B1%D0%B0%D1%80%D1%81.html").unwrap();
        assert_eq!(id.as_str(), "барс");

        // A raw non-ASCII href is encoded by the URL parser and decoded back.
        let id = identifier_from_href("/hotel/ru/снежный-барс.html?x=1").unwrap();
        assert_eq!(id.as_str(), "снежный-барс");

        // Invalid UTF-8 after decoding keeps the encoded form.
        let id = identifier_from_href("/hotel/ru/bad%FF.html").unwrap();
        assert_eq!(id.as_str(), "bad%FF");
    }

    #[test]
    fn empty_segment_is_not_an_identifier() {
        assert!(identifier_from_href("/hotel/ru/").is_none());
        assert!(identifier_from_href("/").is_none());
    }

    #[test]
    fn fixture_stops_at_nearby_separator() {
        let html = std::fs::read_to_string("../../../fixtures/html/listing.html")
            .expect("read listing fixture");
        assert_eq!(
            ids(&html),
            vec![
                "guest-house-snezhny-bars-abzakovo",
                "abzakovo-park",
                "lesnaya-skazka",
                "novoabzakovo-cottage",
            ]
        );
    }

    #[test]
    fn three_nearby_anchors_are_excluded() {
        let html = r#"<html><body>
            <div><a class="hotel_name_link url" href="/hotel/ru/one.html">1</a></div>
            <div><a class="hotel_name_link url" href="/hotel/ru/two.html">2</a></div>
            <div class="sr_separator"></div>
            <div><a class="hotel_name_link url" href="/hotel/ru/near-a.html">a</a></div>
            <div><a class="hotel_name_link url" href="/hotel/ru/near-b.html">b</a></div>
            <div><a class="hotel_name_link url" href="/hotel/ru/near-c.html">c</a></div>
        </body></html>"#;
        assert_eq!(ids(html), vec!["one", "two"]);
    }

    #[test]
    fn without_separator_all_anchors_count() {
        let html = r#"<html><body>
            <a class="hotel_name_link url" href="/hotel/ru/one.html">1</a>
            <a class="hotel_name_link url" href="/hotel/ru/two.html">2</a>
        </body></html>"#;
        assert_eq!(ids(html), vec!["one", "two"]);
    }

    #[test]
    fn duplicates_are_preserved_in_order() {
        let html = r#"<html><body>
            <a class="hotel_name_link url" href="/hotel/ru/b.html">b</a>
            <a class="hotel_name_link url" href="/hotel/ru/a.html">a</a>
            <a class="hotel_name_link url" href="/hotel/ru/b.html?x=1">b again</a>
        </body></html>"#;
        assert_eq!(ids(html), vec!["b", "a", "b"]);
    }

    #[test]
    fn other_links_are_ignored() {
        let html = r#"<html><body>
            <a class="hotel_name_link" href="/hotel/ru/no-url-class.html">x</a>
            <a class="sr_item_photo_link" href="/hotel/ru/photo.html">x</a>
            <a class="hotel_name_link url">missing href</a>
            <a class="hotel_name_link url" href="/hotel/ru/real.html">ok</a>
        </body></html>"#;
        assert_eq!(ids(html), vec!["real"]);
    }

    #[test]
    fn empty_catalog() {
        let html = "<html><body><p>No properties found</p></body></html>";
        assert!(matches!(extract(html), Err(RoomscoutError::EmptyCatalog)));

        // Everything after the separator does not count either.
        let html = r#"<html><body>
            <div class="sr_separator"></div>
            <a class="hotel_name_link url" href="/hotel/ru/near.html">near</a>
        </body></html>"#;
        assert!(matches!(extract(html), Err(RoomscoutError::EmptyCatalog)));
    }
}
