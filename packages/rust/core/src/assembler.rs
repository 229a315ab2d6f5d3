//! Merges one identifier's per-locale documents into indexable records.
//!
//! Coordinates are locale-invariant: the first pair found (in locale order)
//! is validated once and attached to every record of the identifier.

use std::collections::BTreeMap;

use roomscout_shared::{
    GeoPoint, GeoPolicy, Identifier, Locale, LocaleDocument, Record, Result,
};
use tracing::warn;

/// Assemble with the default [`GeoPolicy::DropCoordinates`].
pub fn assemble(
    id: &Identifier,
    documents: BTreeMap<Locale, LocaleDocument>,
) -> Result<BTreeMap<Locale, Record>> {
    assemble_with(id, documents, GeoPolicy::DropCoordinates)
}

/// Build one [`Record`] per locale present in `documents`.
///
/// An out-of-range coordinate pair never reaches a record: under
/// `DropCoordinates` every record is built without a location, under
/// `RejectIdentifier` the whole identifier fails with `InvalidGeo`.
pub fn assemble_with(
    id: &Identifier,
    documents: BTreeMap<Locale, LocaleDocument>,
    policy: GeoPolicy,
) -> Result<BTreeMap<Locale, Record>> {
    let location = match documents.values().find_map(|doc| doc.coordinates) {
        None => None,
        Some(coords) => match GeoPoint::try_from(coords) {
            Ok(point) => Some(point),
            Err(e) => match policy {
                GeoPolicy::DropCoordinates => {
                    warn!(%id, lat = coords.lat, lon = coords.lon, "dropping invalid coordinates");
                    None
                }
                GeoPolicy::RejectIdentifier => return Err(e),
            },
        },
    };

    let records = documents
        .into_iter()
        .map(|(locale, doc)| {
            let record = Record {
                id: id.clone(),
                locale: locale.clone(),
                name: doc.name,
                address: doc.address,
                summary: doc.summary,
                location,
                amenities: doc.amenities,
                rooms: doc.rooms,
            };
            (locale, record)
        })
        .collect();

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomscout_shared::{Coordinates, Room, RoomscoutError};

    fn doc(name: &str, coordinates: Option<Coordinates>) -> LocaleDocument {
        LocaleDocument {
            name: name.into(),
            address: "Abzakovo".into(),
            summary: String::new(),
            amenities: vec!["Sauna".into()],
            rooms: vec![Room {
                name: "Double".into(),
                max_people: 2,
            }],
            coordinates,
        }
    }

    fn documents(coords: Option<Coordinates>) -> BTreeMap<Locale, LocaleDocument> {
        BTreeMap::from([
            (Locale::new("en"), doc("Snow Leopard", coords)),
            (Locale::new("ru"), doc("Снежный Барс", None)),
        ])
    }

    #[test]
    fn shares_coordinates_across_locales() {
        let id = Identifier::new("snezhny-bars");
        let coords = Coordinates {
            lat: 53.81,
            lon: 58.63,
        };

        let records = assemble(&id, documents(Some(coords))).unwrap();

        assert_eq!(records.len(), 2);
        let en = &records[&Locale::new("en")];
        let ru = &records[&Locale::new("ru")];
        assert_eq!(en.location, ru.location);
        assert_eq!(en.location.unwrap().lat(), 53.81);
        assert_eq!(ru.name, "Снежный Барс");
        assert_eq!(ru.locale, Locale::new("ru"));
        assert_eq!(ru.id, id);
    }

    #[test]
    fn no_coordinates_means_no_location() {
        let records = assemble(&Identifier::new("x"), documents(None)).unwrap();
        assert!(records.values().all(|r| r.location.is_none()));
    }

    #[test]
    fn invalid_coordinates_dropped_by_default() {
        let bad = Coordinates { lat: 90.0, lon: 0.0 };
        let records = assemble(&Identifier::new("x"), documents(Some(bad))).unwrap();

        assert_eq!(records.len(), 2);
        assert!(records.values().all(|r| r.location.is_none()));
        assert_eq!(records[&Locale::new("en")].name, "Snow Leopard");
    }

    #[test]
    fn invalid_coordinates_rejected_on_request() {
        let bad = Coordinates {
            lat: 0.0,
            lon: -180.0,
        };
        let err = assemble_with(
            &Identifier::new("x"),
            documents(Some(bad)),
            GeoPolicy::RejectIdentifier,
        )
        .unwrap_err();

        assert!(matches!(err, RoomscoutError::InvalidGeo { .. }));
    }

    #[test]
    fn empty_input_yields_no_records() {
        let records = assemble(&Identifier::new("x"), BTreeMap::new()).unwrap();
        assert!(records.is_empty());
    }
}
