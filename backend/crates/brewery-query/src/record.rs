//! Brewery records as returned by the upstream directory and as served to
//! feature-query callers.
//!
//! Upstream rows carry opaque string identifiers and decimal-string
//! coordinates. [`NormalizedRecord`] pairs the same attributes with numeric
//! coordinates and the stable integer identifier the calling protocol needs.

use serde::{Deserialize, Serialize};

/// Closed set of brewery categories published by the upstream directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreweryType {
    /// Produces fewer than 15,000 barrels per year.
    Micro,
    /// An extremely small brewery distributing locally.
    Nano,
    /// A regional location of an expanded brewery.
    Regional,
    /// A beer-focused restaurant brewing on site.
    Brewpub,
    /// A very large brewery.
    Large,
    /// A brewery in planning.
    Planning,
    /// A contract brewing arrangement.
    Contract,
    /// A brewery renting space to other brewers.
    Proprietor,
    /// A location that has closed.
    Closed,
}

impl BreweryType {
    /// Every known type, in the order the layer metadata advertises them.
    pub const ALL: [Self; 9] = [
        Self::Micro,
        Self::Nano,
        Self::Regional,
        Self::Brewpub,
        Self::Large,
        Self::Planning,
        Self::Contract,
        Self::Proprietor,
        Self::Closed,
    ];

    /// Wire label used by the upstream API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Micro => "micro",
            Self::Nano => "nano",
            Self::Regional => "regional",
            Self::Brewpub => "brewpub",
            Self::Large => "large",
            Self::Planning => "planning",
            Self::Contract => "contract",
            Self::Proprietor => "proprietor",
            Self::Closed => "closed",
        }
    }
}

/// Descriptive attributes shared by raw and normalised records.
///
/// `brewery_type` stays a plain string: the upstream occasionally publishes
/// labels outside [`BreweryType::ALL`] and one unknown label must not fail a
/// whole page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BreweryAttributes {
    /// Opaque upstream identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Category label, normally one of [`BreweryType::ALL`].
    #[serde(default)]
    pub brewery_type: String,
    /// First address line.
    #[serde(default)]
    pub address_1: Option<String>,
    /// Second address line.
    #[serde(default)]
    pub address_2: Option<String>,
    /// Third address line.
    #[serde(default)]
    pub address_3: Option<String>,
    /// City name.
    #[serde(default)]
    pub city: Option<String>,
    /// State or province name.
    #[serde(default)]
    pub state_province: Option<String>,
    /// Postal code.
    #[serde(default)]
    pub postal_code: Option<String>,
    /// Country name.
    #[serde(default)]
    pub country: Option<String>,
    /// Contact phone number.
    #[serde(default)]
    pub phone: Option<String>,
    /// Website address.
    #[serde(default)]
    pub website_url: Option<String>,
    /// Legacy state field.
    #[serde(default)]
    pub state: Option<String>,
    /// Legacy street field.
    #[serde(default)]
    pub street: Option<String>,
}

/// A coordinate as the upstream ships it: usually a decimal string,
/// occasionally a bare number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCoordinate {
    /// Numeric JSON value.
    Number(f64),
    /// Decimal string, possibly empty or garbage.
    Text(String),
}

impl RawCoordinate {
    /// Coerce to degrees; anything unparseable becomes `NaN`.
    #[must_use]
    pub fn degrees(&self) -> f64 {
        match self {
            Self::Number(value) => *value,
            Self::Text(text) => text.trim().parse().unwrap_or(f64::NAN),
        }
    }
}

/// One raw upstream row.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BreweryRecord {
    /// Descriptive attributes.
    #[serde(flatten)]
    pub attributes: BreweryAttributes,
    /// Latitude in WGS84, when published.
    #[serde(default)]
    pub latitude: Option<RawCoordinate>,
    /// Longitude in WGS84, when published.
    #[serde(default)]
    pub longitude: Option<RawCoordinate>,
}

impl BreweryRecord {
    /// Opaque upstream identifier.
    #[must_use]
    pub fn opaque_id(&self) -> &str {
        self.attributes.id.as_str()
    }

    /// Attach the registry-assigned identifier and coerce coordinates.
    #[must_use]
    pub fn normalize(self, object_id: u64) -> NormalizedRecord {
        NormalizedRecord {
            object_id,
            latitude: coordinate_degrees(self.latitude.as_ref()),
            longitude: coordinate_degrees(self.longitude.as_ref()),
            attributes: self.attributes,
        }
    }
}

fn coordinate_degrees(raw: Option<&RawCoordinate>) -> f64 {
    raw.map_or(f64::NAN, RawCoordinate::degrees)
}

/// A record ready to be served: numeric coordinates plus a stable integer id.
///
/// Non-finite coordinates serialise as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    /// Process-stable integer identifier.
    #[serde(rename = "OBJECTID")]
    pub object_id: u64,
    /// Descriptive attributes.
    #[serde(flatten)]
    pub attributes: BreweryAttributes,
    /// Latitude in WGS84 or `NaN`.
    pub latitude: f64,
    /// Longitude in WGS84 or `NaN`.
    pub longitude: f64,
}

#[cfg(test)]
#[expect(
    clippy::float_arithmetic,
    reason = "coordinate assertions compare within a tolerance"
)]
mod tests {
    //! Decoding and coercion coverage for upstream rows.

    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(json!("32.7157"), 32.7157)]
    #[case(json!(" -117.16 "), -117.16)]
    #[case(json!(45.5), 45.5)]
    fn coerces_numeric_coordinates(#[case] raw: serde_json::Value, #[case] expected: f64) {
        let coordinate: RawCoordinate = serde_json::from_value(raw).expect("coordinate decodes");
        assert!((coordinate.degrees() - expected).abs() < 1e-9);
    }

    #[rstest]
    #[case(json!(""))]
    #[case(json!("n/a"))]
    fn unparseable_coordinates_become_nan(#[case] raw: serde_json::Value) {
        let coordinate: RawCoordinate = serde_json::from_value(raw).expect("coordinate decodes");
        assert!(coordinate.degrees().is_nan());
    }

    #[test]
    fn decodes_upstream_row_with_null_and_missing_fields() {
        let row = json!({
            "id": "5128df48-79fc-4f0f-8b52-d06be54d0cec",
            "name": "(405) Brewing Co",
            "brewery_type": "micro",
            "address_1": "1716 Topeka St",
            "address_2": null,
            "city": "Norman",
            "state_province": "Oklahoma",
            "postal_code": "73069-8224",
            "country": "United States",
            "longitude": "-97.46818222",
            "latitude": null,
            "phone": "4058160490",
            "website_url": "http://www.405brewing.com",
            "state": "Oklahoma",
            "street": "1716 Topeka St"
        });

        let record: BreweryRecord = serde_json::from_value(row).expect("row decodes");
        assert_eq!(record.opaque_id(), "5128df48-79fc-4f0f-8b52-d06be54d0cec");
        assert_eq!(record.attributes.address_2, None);
        assert_eq!(record.attributes.address_3, None);

        let normalized = record.normalize(7);
        assert_eq!(normalized.object_id, 7);
        assert!(normalized.latitude.is_nan());
        assert!((normalized.longitude + 97.468_182_22).abs() < 1e-9);
    }

    #[test]
    fn normalized_record_serialises_object_id_and_null_coordinates() {
        let record = BreweryRecord {
            attributes: BreweryAttributes {
                id: "abc".to_owned(),
                name: "Test".to_owned(),
                brewery_type: BreweryType::Nano.as_str().to_owned(),
                ..BreweryAttributes::default()
            },
            latitude: Some(RawCoordinate::Text("bogus".to_owned())),
            longitude: Some(RawCoordinate::Number(-1.5)),
        };

        let value = serde_json::to_value(record.normalize(3)).expect("serialises");
        assert_eq!(value["OBJECTID"], json!(3));
        assert_eq!(value["id"], json!("abc"));
        assert_eq!(value["brewery_type"], json!("nano"));
        assert_eq!(value["latitude"], serde_json::Value::Null);
        assert_eq!(value["longitude"], json!(-1.5));
    }
}
