//! OpenAPI schema definitions for core response types.
//!
//! The query core stays free of utoipa. These wrappers mirror the serialised
//! shape of its types so the generated document describes real payloads.

use utoipa::ToSchema;

/// Which caller concerns a response already satisfies.
#[derive(ToSchema)]
#[schema(as = brewery_query::assemble::FiltersApplied)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct FiltersAppliedSchema {
    /// `resultRecordCount` was honoured.
    limit: bool,
    /// `resultOffset` was honoured.
    offset: bool,
    /// A `where` fragment was applied upstream.
    #[schema(rename = "where")]
    where_clause: bool,
    /// Features were filtered against the request geometry.
    geometry: bool,
    /// Coordinates are already in the requested `outSR`.
    projection: bool,
}

/// GeoJSON feature collection returned by the query endpoint.
#[derive(ToSchema)]
#[schema(as = brewery_query::FeatureCollection)]
#[schema(rename_all = "camelCase")]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct FeatureCollectionSchema {
    /// Always `FeatureCollection`.
    #[schema(rename = "type", example = "FeatureCollection")]
    kind: String,
    /// Point features; properties carry `OBJECTID`, every record field and
    /// numeric `latitude`/`longitude`.
    #[schema(value_type = Vec<Object>)]
    features: Vec<serde_json::Value>,
    /// Cache lifetime in seconds.
    #[schema(example = 3600)]
    ttl: u32,
    /// Layer metadata plus `total` and `limitExceeded`.
    #[schema(value_type = Object)]
    metadata: serde_json::Value,
    /// Concerns already handled.
    filters_applied: FiltersAppliedSchema,
    /// Named coordinate reference system of the feature coordinates.
    #[schema(value_type = Object)]
    crs: serde_json::Value,
}
