//! Translation of a [`FeatureQuery`] into upstream parameters plus the
//! record window the fetcher must honour.
//!
//! Nothing here is fatal: fragments the upstream cannot express are logged
//! and dropped, and the returned flags say which caller concerns were
//! handled.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::geometry::centroid_of;
use crate::identity::IdentityRegistry;
use crate::ports::UpstreamParameters;
use crate::query::FeatureQuery;
use crate::where_clause::{did_apply_where_filter, extract_where_params};
use crate::{MAX_RECORD_COUNT, UPSTREAM_PAGE_LIMIT};

/// A caller fragment the translator could not use.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslationError {
    /// An `objectIds` entry that is not a positive integer.
    #[error("object id `{token}` is not a positive integer")]
    InvalidObjectId {
        /// Offending token.
        token: String,
    },
    /// An `orderByFields` entry that is not `<field> [asc|desc]`.
    #[error("sort token `{token}` is not `<field> [asc|desc]`")]
    MalformedSort {
        /// Offending token.
        token: String,
    },
}

/// Which rows of the fetched pages the caller actually asked for.
///
/// Pages start on page-size boundaries, so an offset inside a page leaves
/// `leading_skip` rows to discard before taking `record_budget` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordWindow {
    /// Rows to drop from the front of the first fetched page.
    pub leading_skip: u32,
    /// Maximum rows to keep.
    pub record_budget: u32,
}

impl Default for RecordWindow {
    fn default() -> Self {
        Self {
            leading_skip: 0,
            record_budget: MAX_RECORD_COUNT,
        }
    }
}

/// Caller concerns satisfied during translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TranslationFlags {
    /// `resultRecordCount` was honoured.
    pub limit: bool,
    /// `resultOffset` was honoured.
    pub offset: bool,
    /// A recognised `where` fragment was pushed upstream.
    pub where_clause: bool,
    /// The geometry centroid was pushed upstream as a proximity sort.
    pub proximity: bool,
}

/// Output of [`QueryTranslator::translate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedQuery {
    /// Parameters for the upstream directory, including the start page and
    /// page size.
    pub params: UpstreamParameters,
    /// Rows to keep from the fetched pages.
    pub window: RecordWindow,
    /// Concerns already handled.
    pub flags: TranslationFlags,
}

/// Builds upstream parameters from feature queries.
#[derive(Debug, Clone, Copy)]
pub struct QueryTranslator<'r> {
    registry: &'r IdentityRegistry,
}

impl<'r> QueryTranslator<'r> {
    /// Translator resolving object ids through `registry`.
    #[must_use]
    pub const fn new(registry: &'r IdentityRegistry) -> Self {
        Self { registry }
    }

    /// Translate `query`.
    ///
    /// The page size is `resultRecordCount` capped at
    /// [`UPSTREAM_PAGE_LIMIT`]. A `resultOffset` starts at page
    /// `offset / page_size + 1` and skips `offset % page_size` rows of it.
    #[must_use]
    pub fn translate(&self, query: &FeatureQuery) -> TranslatedQuery {
        let where_params = query
            .where_clause
            .as_deref()
            .map(extract_where_params)
            .unwrap_or_default();
        let mut params = UpstreamParameters {
            by_city: where_params.by_city,
            by_state: where_params.by_state,
            by_postal: where_params.by_postal,
            by_type: where_params.by_type,
            ..UpstreamParameters::default()
        };

        params.by_ids = query
            .object_ids
            .as_deref()
            .and_then(|raw| self.resolve_object_ids(raw));
        params.sort = query.order_by_fields.as_deref().and_then(rewrite_sort);
        params.by_dist = query.geometry.as_deref().and_then(|raw| {
            centroid_of(raw, query.in_sr.as_deref())
                .inspect_err(|error| warn!(%error, "geometry unusable for proximity sort"))
                .ok()
                .map(|point| format!("{},{}", point.y(), point.x()))
        });

        let page_size = query
            .record_count()
            .map_or(UPSTREAM_PAGE_LIMIT, |count| count.min(UPSTREAM_PAGE_LIMIT));
        params.per_page = Some(page_size);
        let mut window = RecordWindow {
            record_budget: query
                .record_count()
                .map_or(MAX_RECORD_COUNT, |count| count.min(MAX_RECORD_COUNT)),
            ..RecordWindow::default()
        };
        if let Some(offset) = query.offset() {
            let (page, leading_skip) = page_for_offset(offset, page_size);
            params.page = Some(page);
            window.leading_skip = leading_skip;
        }

        let flags = TranslationFlags {
            limit: query.record_count().is_some(),
            offset: query.offset().is_some(),
            where_clause: did_apply_where_filter(query.where_clause.as_deref()),
            proximity: params.by_dist.is_some(),
        };
        info!(?params, ?window, ?flags, "translated feature query");
        TranslatedQuery {
            params,
            window,
            flags,
        }
    }

    /// Map caller integer ids back to opaque ids. Unknown ids are dropped;
    /// `None` when no id tokens were supplied at all.
    fn resolve_object_ids(&self, raw: &str) -> Option<Vec<String>> {
        let tokens: Vec<&str> = raw
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .collect();
        if tokens.is_empty() {
            return None;
        }

        let resolved = tokens
            .into_iter()
            .filter_map(|token| {
                token
                    .parse::<u64>()
                    .map_err(|_| TranslationError::InvalidObjectId {
                        token: token.to_owned(),
                    })
                    .inspect_err(|error| debug!(%error, "dropping object id"))
                    .ok()
                    .and_then(|object_id| self.registry.resolve(object_id))
            })
            .collect();
        Some(resolved)
    }
}

/// One-based page holding row `offset`, and the rows to skip within it.
///
/// The page saturates at `u32::MAX`; no upstream page exists that far out,
/// so the window comes back empty rather than wrapping to the first page.
#[expect(
    clippy::integer_division,
    clippy::integer_division_remainder_used,
    reason = "page arithmetic truncates by definition"
)]
const fn page_for_offset(offset: u32, page_size: u32) -> (u32, u32) {
    ((offset / page_size).saturating_add(1), offset % page_size)
}

/// Rewrite `"name ASC, city desc"` into the upstream's `"name:asc,city:desc"`.
/// Fields without a direction pass through; malformed tokens are dropped.
fn rewrite_sort(raw: &str) -> Option<String> {
    let tokens: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| {
            sort_token(token)
                .inspect_err(|error| debug!(%error, "dropping sort token"))
                .ok()
        })
        .collect();
    (!tokens.is_empty()).then(|| tokens.join(","))
}

fn sort_token(token: &str) -> Result<String, TranslationError> {
    let mut words = token.split_whitespace();
    match (words.next(), words.next(), words.next()) {
        (Some(field), None, None) => Ok(field.to_owned()),
        (Some(field), Some(direction), None)
            if direction.eq_ignore_ascii_case("asc") || direction.eq_ignore_ascii_case("desc") =>
        {
            Ok(format!("{field}:{}", direction.to_ascii_lowercase()))
        }
        _ => Err(TranslationError::MalformedSort {
            token: token.to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    //! Translation of each caller concern into upstream parameters.

    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn registry() -> IdentityRegistry {
        let registry = IdentityRegistry::new();
        assert_eq!(registry.assign_all(["alpha", "bravo", "charlie"]), [1, 2, 3]);
        registry
    }

    fn translate(registry: &IdentityRegistry, query: &FeatureQuery) -> TranslatedQuery {
        QueryTranslator::new(registry).translate(query)
    }

    #[rstest]
    fn empty_query_requests_full_pages_from_the_start(registry: IdentityRegistry) {
        let translated = translate(&registry, &FeatureQuery::default());
        assert_eq!(
            translated.params,
            UpstreamParameters {
                per_page: Some(UPSTREAM_PAGE_LIMIT),
                ..UpstreamParameters::default()
            }
        );
        assert_eq!(translated.window, RecordWindow::default());
        assert_eq!(translated.flags, TranslationFlags::default());
    }

    #[rstest]
    #[case(100, 250, 3, 50)]
    #[case(100, 200, 3, 0)]
    #[case(100, 99, 1, 99)]
    #[case(500, 450, 3, 50)]
    #[case(1, u32::MAX, u32::MAX, 0)]
    #[case(200, u32::MAX, 21_474_837, 95)]
    fn offset_maps_to_start_page_and_skip(
        registry: IdentityRegistry,
        #[case] count: u32,
        #[case] offset: u32,
        #[case] page: u32,
        #[case] skip: u32,
    ) {
        let query = FeatureQuery {
            result_record_count: Some(count),
            result_offset: Some(offset),
            ..FeatureQuery::default()
        };
        let translated = translate(&registry, &query);
        assert_eq!(translated.params.page, Some(page));
        assert_eq!(translated.window.leading_skip, skip);
        assert!(translated.flags.limit && translated.flags.offset);
    }

    #[rstest]
    #[case(Some(5000), UPSTREAM_PAGE_LIMIT, MAX_RECORD_COUNT)]
    #[case(Some(201), UPSTREAM_PAGE_LIMIT, 201)]
    #[case(Some(25), 25, 25)]
    #[case(Some(0), UPSTREAM_PAGE_LIMIT, MAX_RECORD_COUNT)]
    #[case(None, UPSTREAM_PAGE_LIMIT, MAX_RECORD_COUNT)]
    fn record_count_is_clamped_to_the_page_ceiling(
        registry: IdentityRegistry,
        #[case] count: Option<u32>,
        #[case] per_page: u32,
        #[case] budget: u32,
    ) {
        let query = FeatureQuery {
            result_record_count: count,
            ..FeatureQuery::default()
        };
        let translated = translate(&registry, &query);
        assert_eq!(translated.params.per_page, Some(per_page));
        assert_eq!(translated.window.record_budget, budget);
    }

    #[rstest]
    fn where_predicates_become_upstream_filters(registry: IdentityRegistry) {
        let query = FeatureQuery {
            where_clause: Some("city = 'san diego' AND type = 'micro'".to_owned()),
            ..FeatureQuery::default()
        };
        let translated = translate(&registry, &query);
        assert_eq!(translated.params.by_city.as_deref(), Some("san_diego"));
        assert_eq!(translated.params.by_type.as_deref(), Some("micro"));
        assert!(translated.flags.where_clause);
    }

    #[rstest]
    #[case("1,3", Some(vec!["alpha", "charlie"]))]
    #[case(" 2 , 99, x ", Some(vec!["bravo"]))]
    #[case("42", Some(vec![]))]
    #[case(" , ", None)]
    fn object_ids_resolve_through_the_registry(
        registry: IdentityRegistry,
        #[case] raw: &str,
        #[case] expected: Option<Vec<&str>>,
    ) {
        let query = FeatureQuery {
            object_ids: Some(raw.to_owned()),
            ..FeatureQuery::default()
        };
        let translated = translate(&registry, &query);
        let expected =
            expected.map(|ids| ids.into_iter().map(str::to_owned).collect::<Vec<_>>());
        assert_eq!(translated.params.by_ids, expected);
    }

    #[rstest]
    #[case("name ASC", Some("name:asc"))]
    #[case("name desc, city asc", Some("name:desc,city:asc"))]
    #[case("name", Some("name"))]
    #[case("name sideways, city DESC", Some("city:desc"))]
    #[case("a b c", None)]
    #[case("", None)]
    fn sort_tokens_are_rewritten(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(rewrite_sort(raw).as_deref(), expected);
    }

    #[rstest]
    fn geometry_centroid_becomes_lat_lon_proximity(registry: IdentityRegistry) {
        let query = FeatureQuery {
            geometry: Some(r#"{"x":-117.16,"y":32.71}"#.to_owned()),
            ..FeatureQuery::default()
        };
        let translated = translate(&registry, &query);
        assert_eq!(translated.params.by_dist.as_deref(), Some("32.71,-117.16"));
        assert!(translated.flags.proximity);
    }

    #[rstest]
    #[case("{nope")]
    #[case("NaN,NaN")]
    fn unparseable_geometry_is_ignored(registry: IdentityRegistry, #[case] raw: &str) {
        let query = FeatureQuery {
            geometry: Some(raw.to_owned()),
            ..FeatureQuery::default()
        };
        let translated = translate(&registry, &query);
        assert_eq!(translated.params.by_dist, None);
        assert!(!translated.flags.proximity);
    }
}
