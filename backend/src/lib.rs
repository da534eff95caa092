//! Feature-server facade over the Open Brewery DB directory.
//!
//! The query semantics live in `brewery_query`; this crate hosts them: the
//! reqwest upstream adapter, the actix HTTP surface, configuration and the
//! error envelope.

pub mod config;
pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod server;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::Trace;
