//! Spatial-reference policy and the Web Mercator ⇄ WGS84 transforms.
//!
//! Only two systems are understood. Unrecognised identifiers fail closed to
//! "already WGS84" rather than guessing at a projection.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use geo::Coord;
use serde_json::Value;

const EARTH_RADIUS_METRES: f64 = 6_378_137.0;
const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_779_806_6;

/// Well-known ids recognised as WGS84 geographic coordinates.
const WGS84_WKIDS: [i64; 1] = [4326];
/// Well-known ids recognised as spherical Web Mercator.
const WEB_MERCATOR_WKIDS: [i64; 2] = [3857, 102_100];

/// A caller-declared coordinate system, reduced to what this service can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpatialReference {
    /// Geographic longitude/latitude degrees.
    Wgs84,
    /// Spherical Web Mercator metres.
    WebMercator,
    /// Any other well-known id; treated as WGS84.
    Unknown(i64),
}

impl SpatialReference {
    /// Classify a well-known id.
    #[must_use]
    pub fn from_wkid(wkid: i64) -> Self {
        if WGS84_WKIDS.contains(&wkid) {
            Self::Wgs84
        } else if WEB_MERCATOR_WKIDS.contains(&wkid) {
            Self::WebMercator
        } else {
            Self::Unknown(wkid)
        }
    }

    /// Parse an `inSR`/`outSR` style parameter: either a bare id (`"3857"`)
    /// or a spatial-reference object (`{"wkid":102100,"latestWkid":3857}`).
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Ok(wkid) = trimmed.parse::<i64>() {
            return Some(Self::from_wkid(wkid));
        }
        serde_json::from_str::<Value>(trimmed)
            .ok()
            .as_ref()
            .and_then(Self::from_json)
    }

    /// Read a spatial-reference object, preferring `latestWkid` over `wkid`.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        ["latestWkid", "wkid"]
            .into_iter()
            .find_map(|key| value.get(key).and_then(Value::as_i64))
            .map(Self::from_wkid)
    }

    /// The EPSG code output coordinates are declared in.
    #[must_use]
    pub const fn epsg_code(self) -> i64 {
        match self {
            Self::WebMercator => 3857,
            Self::Wgs84 | Self::Unknown(_) => 4326,
        }
    }
}

/// Inverse spherical Mercator: metres to degrees.
#[must_use]
#[expect(clippy::float_arithmetic, reason = "map projection math")]
pub fn mercator_to_wgs84(coord: Coord<f64>) -> Coord<f64> {
    let longitude = (coord.x / EARTH_RADIUS_METRES).to_degrees();
    let latitude = 2.0f64
        .mul_add(-(-coord.y / EARTH_RADIUS_METRES).exp().atan(), FRAC_PI_2)
        .to_degrees();
    Coord {
        x: longitude,
        y: latitude,
    }
}

/// Forward spherical Mercator: degrees to metres. Latitudes are clamped to
/// the projection's valid band.
#[must_use]
#[expect(clippy::float_arithmetic, reason = "map projection math")]
pub fn wgs84_to_mercator(coord: Coord<f64>) -> Coord<f64> {
    let latitude = coord
        .y
        .clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE)
        .to_radians();
    Coord {
        x: EARTH_RADIUS_METRES * coord.x.to_radians(),
        y: EARTH_RADIUS_METRES * latitude.mul_add(0.5, FRAC_PI_4).tan().ln(),
    }
}

#[cfg(test)]
#[expect(
    clippy::float_arithmetic,
    reason = "projection assertions compare within a tolerance"
)]
mod tests {
    //! Spatial-reference classification and projection round-trips.

    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("4326", Some(SpatialReference::Wgs84))]
    #[case("3857", Some(SpatialReference::WebMercator))]
    #[case(" 102100 ", Some(SpatialReference::WebMercator))]
    #[case("2229", Some(SpatialReference::Unknown(2229)))]
    #[case(r#"{"wkid":102100,"latestWkid":3857}"#, Some(SpatialReference::WebMercator))]
    #[case(r#"{"wkid":4326}"#, Some(SpatialReference::Wgs84))]
    #[case("", None)]
    #[case("mercator", None)]
    fn parses_spatial_reference_parameters(
        #[case] raw: &str,
        #[case] expected: Option<SpatialReference>,
    ) {
        assert_eq!(SpatialReference::parse(raw), expected);
    }

    #[test]
    fn latest_wkid_takes_precedence() {
        let value = json!({ "wkid": 4326, "latestWkid": 3857 });
        assert_eq!(
            SpatialReference::from_json(&value),
            Some(SpatialReference::WebMercator)
        );
    }

    #[test]
    fn origin_maps_to_origin() {
        let coord = mercator_to_wgs84(Coord { x: 0.0, y: 0.0 });
        assert!(coord.x.abs() < 1e-12);
        assert!(coord.y.abs() < 1e-12);
    }

    #[test]
    fn mercator_round_trip_preserves_san_diego() {
        let degrees = Coord {
            x: -117.1611,
            y: 32.7157,
        };
        let metres = wgs84_to_mercator(degrees);
        assert!((metres.x + 13_042_314.0).abs() < 1.0, "x = {}", metres.x);
        assert!((metres.y - 3_857_628.4).abs() < 1.0, "y = {}", metres.y);

        let back = mercator_to_wgs84(metres);
        assert!((back.x - degrees.x).abs() < 1e-9);
        assert!((back.y - degrees.y).abs() < 1e-9);
    }

    #[test]
    fn unknown_references_declare_wgs84() {
        assert_eq!(SpatialReference::Unknown(2229).epsg_code(), 4326);
        assert_eq!(SpatialReference::WebMercator.epsg_code(), 3857);
    }
}
