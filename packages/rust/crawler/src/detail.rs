//! Field extraction from a hotel detail page.
//!
//! The page repeats some content (amenities appear in a teaser block and in
//! the facilities block), so each field is read from one fixed region.

use std::sync::LazyLock;

use roomscout_shared::{LocaleDocument, Result, RoomscoutError, Room};
use scraper::{ElementRef, Html, Selector};

/// Row class marking expansion rows of the rooms table (details, not room types).
const EXTENDED_ROW_CLASS: &str = "extendedRow";

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector {css:?}: {e}"))
}

static NAME_SEL: LazyLock<Selector> = LazyLock::new(|| selector("h2.hp__hotel-name"));
static ADDRESS_SEL: LazyLock<Selector> = LazyLock::new(|| selector("span.hp_address_subtitle"));
static SUMMARY_SEL: LazyLock<Selector> = LazyLock::new(|| selector("#summary"));
static FACILITIES_SEL: LazyLock<Selector> =
    LazyLock::new(|| selector(".facilities-sliding-keep"));
static AMENITY_SEL: LazyLock<Selector> = LazyLock::new(|| selector(".important_facility"));
static ROOMS_BODY_SEL: LazyLock<Selector> = LazyLock::new(|| selector(".roomstable tbody"));
static OCCUPANCY_SEL: LazyLock<Selector> = LazyLock::new(|| selector("i.bicon-occupancy"));
static ROOM_NAME_SEL: LazyLock<Selector> = LazyLock::new(|| selector("a.togglelink"));

/// Parse a detail page into a [`LocaleDocument`] without coordinates.
///
/// The hotel name is required; a page without one is a parse error rather
/// than a document with an empty name. Address and summary are empty when
/// the page has no such element.
pub fn parse_detail(html: &str) -> Result<LocaleDocument> {
    let doc = Html::parse_document(html);

    let name = first_text(&doc, &NAME_SEL)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| RoomscoutError::parse("hotel name element not found"))?;

    Ok(LocaleDocument {
        name,
        address: first_text(&doc, &ADDRESS_SEL).unwrap_or_default(),
        summary: first_text(&doc, &SUMMARY_SEL).unwrap_or_default(),
        amenities: extract_amenities(&doc),
        rooms: extract_rooms(&doc),
        coordinates: None,
    })
}

fn extract_amenities(doc: &Html) -> Vec<String> {
    let Some(region) = doc.select(&FACILITIES_SEL).next() else {
        return Vec::new();
    };

    region
        .select(&AMENITY_SEL)
        .map(trimmed_text)
        .filter(|amenity| !amenity.is_empty())
        .collect()
}

fn extract_rooms(doc: &Html) -> Vec<Room> {
    let Some(body) = doc.select(&ROOMS_BODY_SEL).next() else {
        return Vec::new();
    };

    body.children()
        .filter_map(ElementRef::wrap)
        .filter(|row| row.value().name() == "tr")
        .filter(|row| !row.value().classes().any(|c| c == EXTENDED_ROW_CLASS))
        .map(|row| Room {
            name: row
                .select(&ROOM_NAME_SEL)
                .next()
                .map(trimmed_text)
                .unwrap_or_default(),
            max_people: u32::try_from(row.select(&OCCUPANCY_SEL).count()).unwrap_or(u32::MAX),
        })
        .collect()
}

fn first_text(doc: &Html, sel: &Selector) -> Option<String> {
    doc.select(sel).next().map(trimmed_text)
}

fn trimmed_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}
