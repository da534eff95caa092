//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers the feature-server paths, the error envelope and the
//! schema wrappers for core response types. The document backs Swagger UI in
//! debug builds and is exported by `cargo run --bin openapi-dump`.

use utoipa::OpenApi;

use crate::domain::{Error, ErrorCode};
use crate::inbound::http::schemas::{FeatureCollectionSchema, FiltersAppliedSchema};

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Open Brewery feature server",
        description = "Feature-service facade translating layer queries into Open Brewery DB requests.",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::feature_server::layer_metadata,
        crate::inbound::http::feature_server::query_features,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        FeatureCollectionSchema,
        FiltersAppliedSchema,
        Error,
        ErrorCode
    )),
    tags(
        (name = "feature-server", description = "Brewery point layer and its query operation"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
