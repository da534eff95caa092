//! Turns fetched records into the feature collection returned to callers.

use geo::Point;
use serde::Serialize;
use tracing::info;

use crate::MAX_RECORD_COUNT;
use crate::fetch::FetchOutcome;
use crate::geometry::{
    Located, SpatialReference, containment_filter, parse_spatial_filter, project_output,
};
use crate::metadata::LayerMetadata;
use crate::query::FeatureQuery;
use crate::record::NormalizedRecord;
use crate::translate::TranslationFlags;

/// Seconds callers may cache a response.
pub const RESPONSE_TTL_SECS: u32 = 60 * 60;

/// GeoJSON point geometry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointGeometry {
    /// Always `Point`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// `[x, y]` in the collection's declared reference system.
    pub coordinates: [f64; 2],
}

/// One brewery as a GeoJSON feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointFeature {
    /// Always `Feature`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Record attributes, identifier and WGS84 coordinates.
    pub properties: NormalizedRecord,
    /// Point geometry.
    pub geometry: PointGeometry,
}

impl PointFeature {
    /// Feature located at the record's longitude/latitude.
    #[must_use]
    pub const fn from_record(properties: NormalizedRecord) -> Self {
        Self {
            kind: "Feature",
            geometry: PointGeometry {
                kind: "Point",
                coordinates: [properties.longitude, properties.latitude],
            },
            properties,
        }
    }

    fn project(mut self, out_sr: SpatialReference) -> Self {
        let [x, y] = self.geometry.coordinates;
        let projected = project_output(Point::new(x, y), out_sr);
        self.geometry.coordinates = [projected.x(), projected.y()];
        self
    }
}

impl Located for PointFeature {
    fn position(&self) -> Point<f64> {
        Point::new(self.properties.longitude, self.properties.latitude)
    }
}

/// Layer metadata plus per-response counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionMetadata {
    /// Static layer description.
    #[serde(flatten)]
    pub layer: LayerMetadata,
    /// Matching records, corrected after local spatial filtering.
    pub total: u64,
    /// Whether more records match than were returned.
    pub limit_exceeded: bool,
}

/// Caller concerns this response already satisfies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FiltersApplied {
    /// `resultRecordCount` honoured.
    pub limit: bool,
    /// `resultOffset` honoured.
    pub offset: bool,
    /// A `where` fragment was applied upstream.
    #[serde(rename = "where")]
    pub where_clause: bool,
    /// Features were filtered against the geometry.
    pub geometry: bool,
    /// Coordinates are already in the requested `outSR`.
    pub projection: bool,
}

/// Named coordinate reference system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrsDeclaration {
    /// Always `name`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// The name itself.
    pub properties: CrsName,
}

/// Payload of a [`CrsDeclaration`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrsName {
    /// OGC URN such as `urn:ogc:def:crs:EPSG::4326`.
    pub name: String,
}

impl CrsDeclaration {
    /// Declaration for an EPSG code.
    #[must_use]
    pub fn epsg(code: i64) -> Self {
        Self {
            kind: "name",
            properties: CrsName {
                name: format!("urn:ogc:def:crs:EPSG::{code}"),
            },
        }
    }
}

/// The response body of a feature query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureCollection {
    /// Always `FeatureCollection`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Matching features in upstream order.
    pub features: Vec<PointFeature>,
    /// Cache lifetime in seconds.
    pub ttl: u32,
    /// Layer metadata and counts.
    pub metadata: CollectionMetadata,
    /// Concerns already handled.
    pub filters_applied: FiltersApplied,
    /// Reference system of the feature coordinates.
    pub crs: CrsDeclaration,
}

/// Builds a [`FeatureCollection`] for one caller query.
#[derive(Debug, Clone, Copy)]
pub struct ResultAssembler<'q> {
    query: &'q FeatureQuery,
    flags: TranslationFlags,
}

impl<'q> ResultAssembler<'q> {
    /// Assembler for `query`, given what translation already handled.
    #[must_use]
    pub const fn new(query: &'q FeatureQuery, flags: TranslationFlags) -> Self {
        Self { query, flags }
    }

    /// Filter, count and project the fetched records.
    ///
    /// When the containment test removed features and fewer than
    /// [`MAX_RECORD_COUNT`] remain, the reported total becomes the kept
    /// count so callers do not assume truncation.
    #[must_use]
    pub fn assemble(&self, outcome: FetchOutcome) -> FeatureCollection {
        let fetched: Vec<PointFeature> = outcome
            .records
            .into_iter()
            .map(PointFeature::from_record)
            .collect();
        let fetched_count = fetched.len();

        let shape = self.query.geometry.as_deref().and_then(|raw| {
            parse_spatial_filter(raw, self.query.in_sr.as_deref())
        });
        let filtered = containment_filter(fetched, shape.as_ref());

        let kept = u64::try_from(filtered.features.len()).unwrap_or(u64::MAX);
        let mut total = outcome.meta.total;
        if filtered.applied {
            info!(kept, fetched = fetched_count, "filtered features by geometry");
            if filtered.features.len() < fetched_count && kept < u64::from(MAX_RECORD_COUNT) {
                total = kept;
            }
        }
        let limit_exceeded = total > kept;

        let out_sr = self.query.out_reference();
        let output = out_sr.unwrap_or(SpatialReference::Wgs84);
        let features = filtered
            .features
            .into_iter()
            .map(|feature| feature.project(output))
            .collect();

        FeatureCollection {
            kind: "FeatureCollection",
            features,
            ttl: RESPONSE_TTL_SECS,
            metadata: CollectionMetadata {
                layer: LayerMetadata::breweries(),
                total,
                limit_exceeded,
            },
            filters_applied: FiltersApplied {
                limit: self.flags.limit,
                offset: self.flags.offset,
                where_clause: self.flags.where_clause,
                geometry: filtered.applied,
                projection: matches!(
                    out_sr,
                    Some(SpatialReference::Wgs84 | SpatialReference::WebMercator)
                ),
            },
            crs: CrsDeclaration::epsg(output.epsg_code()),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Feature projection, total correction and declared filters.

    use super::*;
    use crate::ports::PageMeta;
    use crate::record::BreweryAttributes;
    use rstest::{fixture, rstest};
    use serde_json::json;

    fn record(object_id: u64, longitude: f64, latitude: f64) -> NormalizedRecord {
        NormalizedRecord {
            object_id,
            attributes: BreweryAttributes {
                id: format!("opaque-{object_id}"),
                name: format!("Brewery {object_id}"),
                brewery_type: "micro".to_owned(),
                ..BreweryAttributes::default()
            },
            latitude,
            longitude,
        }
    }

    #[fixture]
    fn outcome() -> FetchOutcome {
        FetchOutcome {
            records: vec![
                record(1, 0.5, 0.5),
                record(2, 5.0, 5.0),
                record(3, 0.25, 0.75),
                record(4, f64::NAN, f64::NAN),
            ],
            meta: PageMeta {
                total: 40,
                per_page: 200,
                page: 1,
            },
        }
    }

    const UNIT_SQUARE: &str = r#"{"rings":[[[0,0],[0,1],[1,1],[1,0],[0,0]]]}"#;

    #[rstest]
    fn polygon_filter_corrects_total(outcome: FetchOutcome) {
        let query = FeatureQuery {
            geometry: Some(UNIT_SQUARE.to_owned()),
            ..FeatureQuery::default()
        };
        let collection =
            ResultAssembler::new(&query, TranslationFlags::default()).assemble(outcome);

        let ids: Vec<u64> = collection
            .features
            .iter()
            .map(|feature| feature.properties.object_id)
            .collect();
        assert_eq!(ids, [1, 3]);
        assert_eq!(collection.metadata.total, 2);
        assert!(!collection.metadata.limit_exceeded);
        assert!(collection.filters_applied.geometry);
    }

    #[rstest]
    fn unfiltered_result_reports_upstream_total(outcome: FetchOutcome) {
        let query = FeatureQuery::default();
        let flags = TranslationFlags {
            limit: true,
            where_clause: true,
            ..TranslationFlags::default()
        };
        let collection = ResultAssembler::new(&query, flags).assemble(outcome);

        assert_eq!(collection.features.len(), 4);
        assert_eq!(collection.metadata.total, 40);
        assert!(collection.metadata.limit_exceeded);
        assert_eq!(
            collection.filters_applied,
            FiltersApplied {
                limit: true,
                where_clause: true,
                ..FiltersApplied::default()
            }
        );
    }

    #[rstest]
    fn point_filter_is_not_applied(outcome: FetchOutcome) {
        let query = FeatureQuery {
            geometry: Some("0.5,0.5".to_owned()),
            ..FeatureQuery::default()
        };
        let collection =
            ResultAssembler::new(&query, TranslationFlags::default()).assemble(outcome);
        assert_eq!(collection.features.len(), 4);
        assert!(!collection.filters_applied.geometry);
        assert_eq!(collection.metadata.total, 40);
    }

    #[rstest]
    fn broken_geometry_degrades_to_no_filter(outcome: FetchOutcome) {
        let query = FeatureQuery {
            geometry: Some("{\"rings\":".to_owned()),
            ..FeatureQuery::default()
        };
        let collection =
            ResultAssembler::new(&query, TranslationFlags::default()).assemble(outcome);
        assert_eq!(collection.features.len(), 4);
        assert!(!collection.filters_applied.geometry);
    }

    #[rstest]
    #[expect(
        clippy::float_arithmetic,
        reason = "projected coordinates compared within a tolerance"
    )]
    fn web_mercator_output_is_projected_and_declared(outcome: FetchOutcome) {
        let query = FeatureQuery {
            out_sr: Some("102100".to_owned()),
            ..FeatureQuery::default()
        };
        let collection =
            ResultAssembler::new(&query, TranslationFlags::default()).assemble(outcome);

        let second = collection.features.get(1).expect("second feature");
        assert!((second.geometry.coordinates[0] - 556_597.45).abs() < 0.1);
        assert!((second.properties.longitude - 5.0).abs() < f64::EPSILON);
        assert_eq!(collection.crs, CrsDeclaration::epsg(3857));
        assert!(collection.filters_applied.projection);
    }

    #[rstest]
    fn serialises_envelope_keys(outcome: FetchOutcome) {
        let collection =
            ResultAssembler::new(&FeatureQuery::default(), TranslationFlags::default())
                .assemble(outcome);
        let value = serde_json::to_value(&collection).expect("serialises");

        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["ttl"], 3600);
        assert_eq!(value["crs"]["properties"]["name"], "urn:ogc:def:crs:EPSG::4326");
        assert_eq!(value["metadata"]["limitExceeded"], true);
        assert_eq!(value["metadata"]["displayField"], "name");
        assert_eq!(
            value["filtersApplied"],
            json!({"limit": false, "offset": false, "where": false, "geometry": false, "projection": false})
        );
        let feature = &value["features"][0];
        assert_eq!(feature["type"], "Feature");
        assert_eq!(feature["geometry"], json!({"type": "Point", "coordinates": [0.5, 0.5]}));
        assert_eq!(feature["properties"]["OBJECTID"], 1);
        assert_eq!(value["features"][3]["geometry"]["coordinates"], json!([null, null]));
    }
}
