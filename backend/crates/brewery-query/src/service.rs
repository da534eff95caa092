//! Query pipeline entry point: translate, fetch, assemble.

use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use crate::assemble::{FeatureCollection, ResultAssembler};
use crate::fetch::PaginatedFetcher;
use crate::identity::IdentityRegistry;
use crate::ports::{UpstreamSource, UpstreamSourceError};
use crate::query::FeatureQuery;
use crate::translate::QueryTranslator;

/// Failure of a whole feature query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeatureQueryError {
    /// The upstream directory could not be read.
    #[error(transparent)]
    Upstream(#[from] UpstreamSourceError),
}

/// Answers feature queries from the upstream directory.
///
/// Cheap to clone; clones share the source and the identity registry.
#[derive(Clone)]
pub struct BreweryQueryService {
    source: Arc<dyn UpstreamSource>,
    registry: Arc<IdentityRegistry>,
}

impl BreweryQueryService {
    /// Service over `source`, numbering records through `registry`.
    #[must_use]
    pub const fn new(source: Arc<dyn UpstreamSource>, registry: Arc<IdentityRegistry>) -> Self {
        Self { source, registry }
    }

    /// Run one feature query end to end.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureQueryError::Upstream`] when the metadata call or any
    /// page request fails. Unusable filter fragments never fail the query.
    #[instrument(
        skip(self, query),
        fields(where_clause = ?query.where_clause, has_geometry = query.geometry.is_some())
    )]
    pub async fn query(
        &self,
        query: &FeatureQuery,
    ) -> Result<FeatureCollection, FeatureQueryError> {
        let translated = QueryTranslator::new(&self.registry).translate(query);
        let outcome = PaginatedFetcher::new(self.source.as_ref(), &self.registry)
            .fetch(&translated.params, translated.window)
            .await?;
        Ok(ResultAssembler::new(query, translated.flags).assemble(outcome))
    }
}
