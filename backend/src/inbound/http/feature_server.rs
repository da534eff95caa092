//! Feature-server endpoints for the brewery layer.
//!
//! ```text
//! GET /open-brewery/FeatureServer/0
//! GET /open-brewery/FeatureServer/0/query
//! ```

use actix_web::http::header::{CacheControl, CacheDirective};
use actix_web::{HttpResponse, get, web};
use brewery_query::FeatureQuery;
use brewery_query::assemble::RESPONSE_TTL_SECS;
use brewery_query::metadata::LayerMetadata;
use serde::Deserialize;
use tracing::debug;
use utoipa::IntoParams;

use crate::domain::Error;
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::FeatureCollectionSchema;
use crate::inbound::http::state::HttpState;

/// Mount point of the feature service.
pub const SERVICE_SCOPE: &str = "/open-brewery";

/// Query-string parameters of the query endpoint.
///
/// Values arrive as text and are interpreted leniently: numbers that do not
/// parse are treated as absent rather than rejected.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct FeatureQueryParams {
    /// SQL-like attribute filter, e.g. `city = 'San Diego'`.
    #[serde(rename = "where")]
    #[param(example = "brewery_type = 'micro'")]
    pub where_clause: Option<String>,
    /// ArcGIS JSON geometry, `x,y` or `xmin,ymin,xmax,ymax`.
    pub geometry: Option<String>,
    /// Spatial reference of `geometry` as a wkid or JSON object.
    #[serde(rename = "inSR")]
    pub in_sr: Option<String>,
    /// Spatial reference of the returned coordinates.
    #[serde(rename = "outSR")]
    pub out_sr: Option<String>,
    /// Comma-separated `<field> [ASC|DESC]` list.
    pub order_by_fields: Option<String>,
    /// Maximum number of features to return.
    pub result_record_count: Option<String>,
    /// Number of features to skip.
    pub result_offset: Option<String>,
    /// Comma-separated integer feature ids.
    pub object_ids: Option<String>,
}

impl FeatureQueryParams {
    /// Convert to the core query, dropping unusable numbers.
    #[must_use]
    pub fn into_feature_query(self) -> FeatureQuery {
        FeatureQuery {
            result_record_count: lenient_count("resultRecordCount", self.result_record_count),
            result_offset: lenient_count("resultOffset", self.result_offset),
            where_clause: self.where_clause,
            geometry: self.geometry,
            in_sr: self.in_sr,
            out_sr: self.out_sr,
            order_by_fields: self.order_by_fields,
            object_ids: self.object_ids,
        }
    }
}

/// Leading decimal digits of `raw`, so `"10.5"` reads as ten.
fn lenient_count(name: &str, raw: Option<String>) -> Option<u32> {
    let raw = raw?;
    let trimmed = raw.trim().trim_start_matches('+');
    let digits_end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let parsed = trimmed.get(..digits_end).and_then(|digits| digits.parse().ok());
    if parsed.is_none() {
        debug!(parameter = name, value = %raw, "ignoring non-numeric parameter");
    }
    parsed
}

fn cache_for_ttl() -> CacheControl {
    CacheControl(vec![
        CacheDirective::Public,
        CacheDirective::MaxAge(RESPONSE_TTL_SECS),
    ])
}

/// Map query-string extraction failures onto the domain error envelope.
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| Error::invalid_request(err.to_string()).into())
}

/// Describe the brewery layer.
#[utoipa::path(
    get,
    path = "/open-brewery/FeatureServer/0",
    description = "Static description of the brewery point layer: fields, coded-value domains, renderer and limits.",
    responses(
        (status = 200, description = "Layer metadata", content_type = "application/json")
    ),
    tags = ["feature-server"],
    operation_id = "getBreweryLayer"
)]
#[get("/FeatureServer/0")]
pub async fn layer_metadata() -> HttpResponse {
    HttpResponse::Ok()
        .insert_header(cache_for_ttl())
        .json(LayerMetadata::breweries())
}

/// Query brewery features.
#[utoipa::path(
    get,
    path = "/open-brewery/FeatureServer/0/query",
    description = "Translate a feature-service query into upstream directory requests and return a GeoJSON feature collection.",
    params(FeatureQueryParams),
    responses(
        (status = 200, description = "Matching features", body = FeatureCollectionSchema),
        (status = 400, description = "Invalid request", body = Error),
        (status = 502, description = "Upstream answered with an unusable body", body = Error),
        (status = 503, description = "Upstream unavailable", body = Error)
    ),
    tags = ["feature-server"],
    operation_id = "queryBreweryFeatures"
)]
#[get("/FeatureServer/0/query")]
pub async fn query_features(
    state: web::Data<HttpState>,
    params: web::Query<FeatureQueryParams>,
) -> ApiResult<HttpResponse> {
    let query = params.into_inner().into_feature_query();
    let collection = state.features.query(&query).await?;
    Ok(HttpResponse::Ok()
        .insert_header(cache_for_ttl())
        .json(collection))
}

/// Register the feature-server routes under [`SERVICE_SCOPE`].
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope(SERVICE_SCOPE)
            .app_data(query_config())
            .service(layer_metadata)
            .service(query_features),
    );
}
