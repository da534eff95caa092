//! Backend entry-point: loads settings, wires the upstream adapter and serves
//! the feature-server endpoints.

use actix_web::web;
use ortho_config::OrthoConfig;
use tracing::{error, warn};
use tracing_subscriber::{EnvFilter, fmt};

use brewery_backend::config::ServerSettings;
use brewery_backend::inbound::http::health::HealthState;
use brewery_backend::server::create_server;

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = ServerSettings::load().map_err(|e| {
        error!(error = %e, "failed to load configuration");
        std::io::Error::other(e.to_string())
    })?;

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state, &settings).map_err(|e| {
        error!(error = %e, "failed to start server");
        std::io::Error::other(e.to_string())
    })?;
    server.await
}
