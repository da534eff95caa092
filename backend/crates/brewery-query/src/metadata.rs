//! Static description of the served brewery layer.

use serde::Serialize;
use serde_json::{Value, json};

use crate::MAX_RECORD_COUNT;
use crate::record::BreweryType;

/// Name of the integer identifier field.
pub const OBJECT_ID_FIELD: &str = "OBJECTID";

/// Attribute fields and their display aliases, in advertised order.
const STRING_FIELDS: [(&str, &str); 14] = [
    ("id", "Open Brewery ID"),
    ("name", "Name"),
    ("brewery_type", "Brewery Type"),
    ("address_1", "Address 1"),
    ("address_2", "Address 2"),
    ("address_3", "Address 3"),
    ("city", "City"),
    ("state_province", "State Province"),
    ("postal_code", "Postal Code"),
    ("country", "Country"),
    ("phone", "Phone Number"),
    ("website_url", "Website"),
    ("state", "State"),
    ("street", "Street"),
];

/// Field storage types used by the layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldType {
    /// Integer object identifier.
    #[serde(rename = "esriFieldTypeOID")]
    ObjectId,
    /// Free text.
    #[serde(rename = "esriFieldTypeString")]
    String,
}

/// One permitted value of a coded-value domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodedValue {
    /// Display name.
    pub name: &'static str,
    /// Stored value.
    pub code: &'static str,
}

/// A closed list of permitted field values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodedValueDomain {
    /// Always `codedValue`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Domain name.
    pub name: &'static str,
    /// Permitted values.
    pub coded_values: Vec<CodedValue>,
}

/// One advertised attribute field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    /// Property name on each feature.
    pub name: &'static str,
    /// Human-readable label.
    pub alias: &'static str,
    /// Storage type.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Permitted values, when restricted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<CodedValueDomain>,
}

/// Spatial reference advertised by the layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerSpatialReference {
    /// Legacy well-known id.
    pub wkid: i64,
    /// Current well-known id.
    pub latest_wkid: i64,
}

/// Rendering hints for map clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawingInfo {
    /// Renderer definition.
    pub renderer: Value,
}

/// Layer definition served on the layer endpoint and embedded in every
/// query response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerMetadata {
    /// Layer name.
    pub name: &'static str,
    /// Layer description.
    pub description: &'static str,
    /// Always `esriGeometryPoint`.
    pub geometry_type: &'static str,
    /// Field shown as a feature's title.
    pub display_field: &'static str,
    /// Integer identifier field.
    pub id_field: &'static str,
    /// Integer identifier field, under its feature-service key.
    pub object_id_field: &'static str,
    /// Most records one query returns.
    pub max_record_count: u32,
    /// Native spatial reference.
    pub spatial_reference: LayerSpatialReference,
    /// Advertised fields.
    pub fields: Vec<FieldDescriptor>,
    /// Default renderer.
    pub drawing_info: DrawingInfo,
}

impl LayerMetadata {
    /// The brewery point layer.
    #[must_use]
    pub fn breweries() -> Self {
        let mut fields = vec![FieldDescriptor {
            name: OBJECT_ID_FIELD,
            alias: OBJECT_ID_FIELD,
            field_type: FieldType::ObjectId,
            domain: None,
        }];
        fields.extend(STRING_FIELDS.into_iter().map(|(name, alias)| FieldDescriptor {
            name,
            alias,
            field_type: FieldType::String,
            domain: (name == "brewery_type").then(brewery_type_domain),
        }));

        Self {
            name: "Open Brewery DB",
            description: "Features from the Open Brewery API",
            geometry_type: "esriGeometryPoint",
            display_field: "name",
            id_field: OBJECT_ID_FIELD,
            object_id_field: OBJECT_ID_FIELD,
            max_record_count: MAX_RECORD_COUNT,
            spatial_reference: LayerSpatialReference {
                wkid: 102_100,
                latest_wkid: 3857,
            },
            fields,
            drawing_info: DrawingInfo {
                renderer: default_renderer(),
            },
        }
    }
}

fn brewery_type_domain() -> CodedValueDomain {
    CodedValueDomain {
        kind: "codedValue",
        name: "brewery_type",
        coded_values: BreweryType::ALL
            .iter()
            .map(|kind| CodedValue {
                name: kind.as_str(),
                code: kind.as_str(),
            })
            .collect(),
    }
}

/// Orange circle markers with a thin white outline.
fn default_renderer() -> Value {
    json!({
        "type": "simple",
        "symbol": {
            "type": "esriSMS",
            "color": [233, 115, 0, 255],
            "angle": 0,
            "xoffset": 0,
            "yoffset": 0,
            "size": 12,
            "style": "esriSMSCircle",
            "outline": {
                "type": "esriSLS",
                "color": [255, 255, 255, 255],
                "width": 0.75,
                "style": "esriSLSSolid"
            }
        }
    })
}
