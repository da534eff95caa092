//! Shared HTTP adapter state.
//!
//! Handlers receive this through `web::Data` and only talk to the query
//! service, so they stay testable against an in-memory upstream.

use brewery_query::BreweryQueryService;

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Feature-query pipeline shared by all workers.
    pub features: BreweryQueryService,
}

impl HttpState {
    /// Construct state around a query service.
    #[must_use]
    pub const fn new(features: BreweryQueryService) -> Self {
        Self { features }
    }
}
