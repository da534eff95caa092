//! Feature-query translation over the Open Brewery DB directory.
//!
//! Feature-service clients ask for attribute predicates, spatial filters,
//! sort orders, paging windows and coordinate systems. The upstream directory
//! only understands a handful of exact-match filters and page/per-page
//! paging, and identifies rows with opaque strings. This crate bridges the
//! two:
//!
//! - [`where_clause`] pulls the supported predicates out of a `where` string.
//! - [`geometry`] decodes caller geometries into WGS84 and filters points
//!   against them.
//! - [`identity`] hands out process-stable integer ids.
//! - [`translate`] builds upstream parameters and the record window.
//! - [`fetch`] fans out page requests through the [`ports::UpstreamSource`]
//!   port.
//! - [`assemble`] produces the feature collection.
//!
//! [`BreweryQueryService`] wires them together.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use brewery_query::ports::InMemoryUpstreamSource;
//! use brewery_query::{BreweryQueryService, FeatureQuery, IdentityRegistry};
//!
//! # tokio_test_block(async {
//! let service = BreweryQueryService::new(
//!     Arc::new(InMemoryUpstreamSource::default()),
//!     Arc::new(IdentityRegistry::new()),
//! );
//! let collection = service
//!     .query(&FeatureQuery::default())
//!     .await
//!     .expect("empty upstream answers");
//! assert!(collection.features.is_empty());
//! assert_eq!(collection.metadata.total, 0);
//! # });
//! # fn tokio_test_block<F: std::future::Future<Output = ()>>(future: F) {
//! #     tokio::runtime::Builder::new_current_thread()
//! #         .build()
//! #         .expect("runtime builds")
//! #         .block_on(future);
//! # }
//! ```

pub mod assemble;
pub mod fetch;
pub mod geometry;
pub mod identity;
pub mod metadata;
pub mod ports;
pub mod query;
pub mod record;
pub mod service;
pub mod translate;
pub mod where_clause;

/// Most records a single feature query returns.
pub const MAX_RECORD_COUNT: u32 = 1000;

/// Largest page the upstream directory serves.
pub const UPSTREAM_PAGE_LIMIT: u32 = 200;

pub use assemble::FeatureCollection;
pub use identity::IdentityRegistry;
pub use query::FeatureQuery;
pub use service::{BreweryQueryService, FeatureQueryError};
