//! Server construction and middleware wiring.

use std::sync::Arc;

use actix_web::body::MessageBody;
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use brewery_query::{BreweryQueryService, IdentityRegistry};
use thiserror::Error;
use tracing::info;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

use crate::config::ServerSettings;
#[cfg(debug_assertions)]
use crate::doc::ApiDoc;
use crate::inbound::http::error::route_not_found;
use crate::inbound::http::feature_server;
use crate::inbound::http::health::{HealthState, live, ready};
use crate::inbound::http::state::HttpState;
use crate::middleware::Trace;
use crate::outbound::open_brewery::OpenBreweryHttpSource;

/// Failures while assembling the server from its settings.
#[derive(Debug, Error)]
pub enum StartupError {
    /// The configured upstream URL does not parse.
    #[error("invalid upstream url: {0}")]
    UpstreamUrl(#[from] url::ParseError),
    /// The upstream adapter could not be constructed.
    #[error("failed to build upstream client: {0}")]
    UpstreamClient(#[from] brewery_query::ports::UpstreamSourceError),
    /// Binding or starting the listener failed.
    #[error("failed to start http server: {0}")]
    Io(#[from] std::io::Error),
}

/// Build the query service over the configured upstream.
///
/// One identity registry is created here and shared by every worker.
///
/// # Errors
///
/// Returns [`StartupError`] when the upstream URL or client is unusable.
pub fn build_query_service(settings: &ServerSettings) -> Result<BreweryQueryService, StartupError> {
    let source = OpenBreweryHttpSource::new(
        settings.upstream_url()?,
        settings.upstream_timeout(),
        settings.user_agent.clone(),
    )?;
    Ok(BreweryQueryService::new(
        Arc::new(source),
        Arc::new(IdentityRegistry::new()),
    ))
}

/// Assemble the application for one worker.
pub fn build_app(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(Trace)
        .configure(feature_server::configure)
        .service(ready)
        .service(live)
        .default_service(web::to(route_not_found));

    #[cfg(debug_assertions)]
    let app = app.service(
        SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    app
}

/// Construct the HTTP server from settings.
///
/// The returned [`Server`] must be awaited to drive the listener.
///
/// # Errors
///
/// Returns [`StartupError`] when the upstream cannot be configured or the
/// socket cannot be bound.
pub fn create_server(
    health_state: web::Data<HealthState>,
    settings: &ServerSettings,
) -> Result<Server, StartupError> {
    let http_state = web::Data::new(HttpState::new(build_query_service(settings)?));
    let server_health_state = health_state.clone();
    let server = HttpServer::new(move || build_app(server_health_state.clone(), http_state.clone()))
        .bind(settings.bind_addr())?
        .run();

    info!(bind_addr = settings.bind_addr(), "feature server listening");
    health_state.mark_ready();
    Ok(server)
}
