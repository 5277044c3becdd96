//! External links for a card
//!
//! Each builder takes only the fields it needs and returns `None` when
//! they are missing. The URLs are opaque to the rest of the crate.

use serde::Serialize;
use super::card::CardRecord;

/// Static map image service
pub const STATIC_MAP_BASE_URL: &str = "https://staticmap.openstreetmap.de/staticmap.php";

/// Map search deep link
pub const MAP_SEARCH_BASE_URL: &str = "https://www.google.com/maps/search/";

/// Municipality lookup by JIS code
pub const REGISTRY_BASE_URL: &str = "https://www.e-stat.go.jp/municipalities/cities/areacode";

/// Host serving catalog images given as relative paths
pub const CARD_IMAGE_BASE_URL: &str = "https://ekikaramanhole.whitebeach.org/ext/manholecard/";

const STATIC_MAP_ZOOM: u8 = 15;
const STATIC_MAP_SIZE: &str = "400x300";

fn valid_coordinates(latitude: Option<f64>, longitude: Option<f64>) -> Option<(f64, f64)> {
    let (lat, lon) = (latitude?, longitude?);
    let in_range = lat.is_finite() && lon.is_finite() && lat.abs() <= 90.0 && lon.abs() <= 180.0;
    in_range.then_some((lat, lon))
}

/// Static map image centred on the coordinates with a marker
pub fn static_map_url(latitude: Option<f64>, longitude: Option<f64>) -> Option<String> {
    let (lat, lon) = valid_coordinates(latitude, longitude)?;
    Some(format!(
        "{STATIC_MAP_BASE_URL}?center={lat},{lon}&zoom={STATIC_MAP_ZOOM}&size={STATIC_MAP_SIZE}&markers={lat},{lon},red-pushpin"
    ))
}

/// Map search for the coordinates
pub fn map_search_url(latitude: Option<f64>, longitude: Option<f64>) -> Option<String> {
    let (lat, lon) = valid_coordinates(latitude, longitude)?;
    Some(format!("{MAP_SEARCH_BASE_URL}?api=1&query={lat},{lon}"))
}

/// Map search for a place name
pub fn place_search_url(place: &str) -> Option<String> {
    let place = place.trim();
    if place.is_empty() {
        return None;
    }
    Some(format!("{MAP_SEARCH_BASE_URL}?api=1&query={}", urlencoding::encode(place)))
}

/// Registry page of a municipality
pub fn registry_url(jis_code: &str) -> Option<String> {
    let code = jis_code.trim();
    if code.is_empty() {
        return None;
    }
    Some(format!("{REGISTRY_BASE_URL}?code={}", urlencoding::encode(code)))
}

/// Absolute image URL; relative catalog paths are resolved against the image host
pub fn image_url(image: &str) -> Option<String> {
    let image = image.trim();
    if image.is_empty() {
        return None;
    }
    if image.starts_with("http://") || image.starts_with("https://") {
        return Some(image.to_string());
    }
    Some(format!("{CARD_IMAGE_BASE_URL}{}", image.trim_start_matches('/')))
}

/// Every link available for a card
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardLinks {
    pub static_map: Option<String>,
    pub map_search: Option<String>,
    pub place_search: Option<String>,
    pub registry: Option<String>,
    pub image: Option<String>,
}

impl CardLinks {
    pub fn for_card(card: &CardRecord) -> Self {
        Self {
            static_map: static_map_url(card.latitude, card.longitude),
            map_search: map_search_url(card.latitude, card.longitude),
            place_search: place_search_url(&card.distribution_place),
            registry: registry_url(&card.jis_code),
            image: image_url(&card.image_url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::business::card::tests::card;

    #[test]
    fn test_map_urls() {
        assert_eq!(
            map_search_url(Some(43.8), Some(143.9)).as_deref(),
            Some("https://www.google.com/maps/search/?api=1&query=43.8,143.9")
        );
        let url = static_map_url(Some(43.8), Some(143.9)).unwrap();
        assert!(url.starts_with(STATIC_MAP_BASE_URL));
        assert!(url.contains("center=43.8,143.9"));
        assert!(url.contains("markers=43.8,143.9"));
    }

    #[test]
    fn test_missing_coordinates() {
        assert!(static_map_url(None, Some(143.9)).is_none());
        assert!(map_search_url(Some(43.8), None).is_none());
        assert!(map_search_url(Some(f64::NAN), Some(143.9)).is_none());
        assert!(map_search_url(Some(95.0), Some(143.9)).is_none());
    }

    #[test]
    fn test_place_search_is_encoded() {
        assert_eq!(
            place_search_url("北見市役所 1F").as_deref(),
            Some("https://www.google.com/maps/search/?api=1&query=%E5%8C%97%E8%A6%8B%E5%B8%82%E5%BD%B9%E6%89%80%201F")
        );
        assert!(place_search_url("  ").is_none());
    }

    #[test]
    fn test_registry_url() {
        assert_eq!(
            registry_url("01208").as_deref(),
            Some("https://www.e-stat.go.jp/municipalities/cities/areacode?code=01208")
        );
        assert!(registry_url("").is_none());
    }

    #[test]
    fn test_image_url() {
        assert_eq!(
            image_url("img/01-208-A001.jpg").as_deref(),
            Some("https://ekikaramanhole.whitebeach.org/ext/manholecard/img/01-208-A001.jpg")
        );
        assert_eq!(image_url("https://example.org/a.jpg").as_deref(), Some("https://example.org/a.jpg"));
        assert!(image_url("").is_none());
    }

    #[test]
    fn test_card_links() {
        let mut c = card("01-208-A001", "北海道", "北見市", "第２弾");
        assert_eq!(CardLinks::for_card(&c), CardLinks::default());

        c.latitude = Some(43.8);
        c.longitude = Some(143.9);
        c.jis_code = "01208".to_string();
        let links = CardLinks::for_card(&c);
        assert!(links.static_map.is_some());
        assert!(links.map_search.is_some());
        assert!(links.registry.is_some());
        assert!(links.place_search.is_none());
    }
}
