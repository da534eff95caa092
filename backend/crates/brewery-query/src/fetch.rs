//! Concurrent page fan-out against the upstream directory.
//!
//! One metadata call sizes the request, then every needed page is requested
//! at once. The first failing page fails the whole fetch.

use futures_util::future::try_join_all;
use tracing::{debug, info};

use crate::UPSTREAM_PAGE_LIMIT;
use crate::identity::IdentityRegistry;
use crate::ports::{PageMeta, UpstreamParameters, UpstreamSource, UpstreamSourceError};
use crate::record::{BreweryRecord, NormalizedRecord};
use crate::translate::RecordWindow;

/// Records and metadata gathered by one fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    /// Records in page order, trimmed to the requested window.
    pub records: Vec<NormalizedRecord>,
    /// Upstream metadata; `page` is the last page fetched and `per_page` the
    /// page size used.
    pub meta: PageMeta,
}

/// Pages through the upstream and stamps records with stable ids.
pub struct PaginatedFetcher<'a> {
    source: &'a dyn UpstreamSource,
    registry: &'a IdentityRegistry,
}

impl<'a> PaginatedFetcher<'a> {
    /// Fetcher reading from `source` and numbering through `registry`.
    #[must_use]
    pub const fn new(source: &'a dyn UpstreamSource, registry: &'a IdentityRegistry) -> Self {
        Self { source, registry }
    }

    /// Fetch the rows selected by `params` and `window`.
    ///
    /// Paging starts at `params.page` (default 1) using `params.per_page`
    /// (default and ceiling [`UPSTREAM_PAGE_LIMIT`]). Only as many pages are
    /// requested as the reported total and the window need.
    ///
    /// # Errors
    ///
    /// Returns the first [`UpstreamSourceError`] raised by the metadata call
    /// or any page.
    pub async fn fetch(
        &self,
        params: &UpstreamParameters,
        window: RecordWindow,
    ) -> Result<FetchOutcome, UpstreamSourceError> {
        let page_size = params
            .per_page
            .filter(|size| *size > 0)
            .map_or(UPSTREAM_PAGE_LIMIT, |size| size.min(UPSTREAM_PAGE_LIMIT));
        let start_page = params.page.unwrap_or(1).max(1);

        if params.matches_nothing() {
            debug!("no requested object id is known; skipping upstream");
            return Ok(FetchOutcome {
                records: Vec::new(),
                meta: PageMeta {
                    total: 0,
                    per_page: page_size,
                    page: start_page,
                },
            });
        }

        let mut meta = self.source.fetch_meta(params).await?;
        let pages = page_count(meta.total, start_page, page_size, window);
        info!(total = meta.total, start_page, pages, page_size, "fetching upstream pages");

        let requests: Vec<UpstreamParameters> = (0..pages)
            .map(|offset| params.for_page(start_page.saturating_add(offset), page_size))
            .collect();
        let results = try_join_all(
            requests
                .iter()
                .map(|page_params| self.source.fetch_page(page_params)),
        )
        .await?;

        let rows: Vec<_> = results
            .into_iter()
            .flatten()
            .skip(usize::try_from(window.leading_skip).unwrap_or(usize::MAX))
            .take(usize::try_from(window.record_budget).unwrap_or(usize::MAX))
            .collect();
        let object_ids = self
            .registry
            .assign_all(rows.iter().map(BreweryRecord::opaque_id));
        let records = rows
            .into_iter()
            .zip(object_ids)
            .map(|(record, object_id)| record.normalize(object_id))
            .collect();

        meta.per_page = page_size;
        if pages > 0 {
            meta.page = start_page.saturating_add(pages - 1);
        }
        Ok(FetchOutcome { records, meta })
    }
}

/// Pages needed to cover `min(remaining, skip + budget)` rows, where
/// `remaining` is what the upstream holds from `start_page` on.
fn page_count(total: u64, start_page: u32, page_size: u32, window: RecordWindow) -> u32 {
    let rows_per_page = u64::from(page_size.max(1));
    let already_passed = u64::from(start_page.saturating_sub(1)) * rows_per_page;
    let wanted = u64::from(window.leading_skip) + u64::from(window.record_budget);
    let rows = total.saturating_sub(already_passed).min(wanted);
    u32::try_from(rows.div_ceil(rows_per_page)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    //! Page planning, ordering and failure propagation.

    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use mockall::{mock, predicate::always};
    use rstest::rstest;

    use super::*;
    use crate::MAX_RECORD_COUNT;
    use crate::record::BreweryAttributes;

    mock! {
        Upstream {}

        #[async_trait]
        impl UpstreamSource for Upstream {
            async fn fetch_meta(
                &self,
                params: &UpstreamParameters,
            ) -> Result<PageMeta, UpstreamSourceError>;
            async fn fetch_page(
                &self,
                params: &UpstreamParameters,
            ) -> Result<Vec<BreweryRecord>, UpstreamSourceError>;
        }
    }

    fn record(id: String) -> BreweryRecord {
        BreweryRecord {
            attributes: BreweryAttributes {
                id,
                ..BreweryAttributes::default()
            },
            ..BreweryRecord::default()
        }
    }

    /// Serves `total` synthetic rows and answers later pages first.
    struct SlowFirstPages {
        total: u32,
        requested: Mutex<Vec<(u32, u32)>>,
    }

    #[async_trait]
    impl UpstreamSource for SlowFirstPages {
        async fn fetch_meta(
            &self,
            _params: &UpstreamParameters,
        ) -> Result<PageMeta, UpstreamSourceError> {
            Ok(PageMeta {
                total: u64::from(self.total),
                per_page: 20,
                page: 1,
            })
        }

        async fn fetch_page(
            &self,
            params: &UpstreamParameters,
        ) -> Result<Vec<BreweryRecord>, UpstreamSourceError> {
            let page = params.page.unwrap_or(1);
            let per_page = params.per_page.unwrap_or(UPSTREAM_PAGE_LIMIT);
            self.requested
                .lock()
                .expect("request log lock")
                .push((page, per_page));
            tokio::time::sleep(Duration::from_millis(u64::from(10 - page.min(10)))).await;
            let first = (page - 1) * per_page;
            let last = (first + per_page).min(self.total);
            Ok((first..last).map(|n| record(format!("row-{n}"))).collect())
        }
    }

    fn slow_source(total: u32) -> SlowFirstPages {
        SlowFirstPages {
            total,
            requested: Mutex::default(),
        }
    }

    #[rstest]
    #[case(450, 1, 200, RecordWindow::default(), 3)]
    #[case(0, 1, 200, RecordWindow::default(), 0)]
    #[case(5000, 1, 200, RecordWindow::default(), 5)]
    #[case(450, 3, 100, RecordWindow { leading_skip: 50, record_budget: 100 }, 2)]
    #[case(450, 5, 100, RecordWindow { leading_skip: 50, record_budget: 100 }, 1)]
    #[case(450, 9, 100, RecordWindow::default(), 0)]
    #[case(8000, u32::MAX, 1, RecordWindow { leading_skip: 0, record_budget: 1 }, 0)]
    fn plans_pages_from_total_and_window(
        #[case] total: u64,
        #[case] start_page: u32,
        #[case] page_size: u32,
        #[case] window: RecordWindow,
        #[case] expected: u32,
    ) {
        assert_eq!(page_count(total, start_page, page_size, window), expected);
    }

    #[tokio::test]
    async fn total_of_450_issues_three_pages_merged_in_order() {
        let source = slow_source(450);
        let registry = IdentityRegistry::new();
        let outcome = PaginatedFetcher::new(&source, &registry)
            .fetch(
                &UpstreamParameters::default().for_page(1, UPSTREAM_PAGE_LIMIT),
                RecordWindow::default(),
            )
            .await
            .expect("fetch succeeds");

        let mut requested = source.requested.lock().expect("lock").clone();
        requested.sort_unstable();
        assert_eq!(requested, [(1, 200), (2, 200), (3, 200)]);
        assert_eq!(outcome.records.len(), 450);
        assert_eq!(outcome.records[0].attributes.id, "row-0");
        assert_eq!(outcome.records[449].attributes.id, "row-449");
        let object_ids: Vec<u64> = outcome.records.iter().map(|r| r.object_id).collect();
        assert_eq!(object_ids, (1..=450).collect::<Vec<u64>>());
        assert_eq!(outcome.meta.page, 3);
        assert_eq!(outcome.meta.per_page, 200);
    }

    #[tokio::test]
    async fn window_trims_leading_rows_and_caps_budget() {
        let source = slow_source(450);
        let registry = IdentityRegistry::new();
        let params = UpstreamParameters {
            page: Some(3),
            per_page: Some(100),
            ..UpstreamParameters::default()
        };
        let outcome = PaginatedFetcher::new(&source, &registry)
            .fetch(
                &params,
                RecordWindow {
                    leading_skip: 50,
                    record_budget: 100,
                },
            )
            .await
            .expect("fetch succeeds");

        let ids: Vec<&str> = outcome
            .records
            .iter()
            .map(|r| r.attributes.id.as_str())
            .collect();
        assert_eq!(ids.len(), 100);
        assert_eq!(ids.first(), Some(&"row-250"));
        assert_eq!(ids.last(), Some(&"row-349"));
        assert_eq!(outcome.meta.page, 4);
    }

    #[tokio::test]
    async fn repeated_rows_keep_their_object_id() {
        let registry = IdentityRegistry::new();
        assert_eq!(registry.assign("row-1"), 1);
        let source = slow_source(3);
        let outcome = PaginatedFetcher::new(&source, &registry)
            .fetch(&UpstreamParameters::default(), RecordWindow::default())
            .await
            .expect("fetch succeeds");
        let object_ids: Vec<u64> = outcome.records.iter().map(|r| r.object_id).collect();
        assert_eq!(object_ids, [2, 1, 3]);
    }

    #[tokio::test]
    async fn zero_total_requests_no_pages() {
        let mut source = MockUpstream::new();
        source.expect_fetch_meta().times(1).returning(|_| {
            Ok(PageMeta {
                total: 0,
                per_page: 50,
                page: 1,
            })
        });
        source.expect_fetch_page().never();
        let registry = IdentityRegistry::new();

        let outcome = PaginatedFetcher::new(&source, &registry)
            .fetch(&UpstreamParameters::default(), RecordWindow::default())
            .await
            .expect("fetch succeeds");
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.meta.total, 0);
    }

    #[tokio::test]
    async fn start_page_beyond_the_directory_returns_nothing() {
        let mut source = MockUpstream::new();
        source.expect_fetch_meta().times(1).returning(|_| {
            Ok(PageMeta {
                total: 8000,
                per_page: 50,
                page: 1,
            })
        });
        source.expect_fetch_page().never();
        let registry = IdentityRegistry::new();
        let params = UpstreamParameters {
            page: Some(u32::MAX),
            per_page: Some(1),
            ..UpstreamParameters::default()
        };

        let outcome = PaginatedFetcher::new(&source, &registry)
            .fetch(
                &params,
                RecordWindow {
                    leading_skip: 0,
                    record_budget: 1,
                },
            )
            .await
            .expect("fetch succeeds");
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.meta.total, 8000);
    }

    #[tokio::test]
    async fn unresolved_id_filter_skips_upstream() {
        let mut source = MockUpstream::new();
        source.expect_fetch_meta().never();
        source.expect_fetch_page().never();
        let registry = IdentityRegistry::new();
        let params = UpstreamParameters {
            by_ids: Some(Vec::new()),
            ..UpstreamParameters::default()
        };

        let outcome = PaginatedFetcher::new(&source, &registry)
            .fetch(&params, RecordWindow::default())
            .await
            .expect("fetch succeeds");
        assert!(outcome.records.is_empty());
    }

    #[tokio::test]
    async fn one_failing_page_fails_the_fetch() {
        let mut source = MockUpstream::new();
        source.expect_fetch_meta().returning(|_| {
            Ok(PageMeta {
                total: u64::from(MAX_RECORD_COUNT),
                per_page: 200,
                page: 1,
            })
        });
        source
            .expect_fetch_page()
            .with(always())
            .returning(|params| match params.page {
                Some(4) => Err(UpstreamSourceError::status("503 Service Unavailable")),
                _ => Ok(vec![record("ok".to_owned())]),
            });
        let registry = IdentityRegistry::new();

        let error = PaginatedFetcher::new(&source, &registry)
            .fetch(&UpstreamParameters::default(), RecordWindow::default())
            .await
            .expect_err("fetch fails");
        assert_eq!(error, UpstreamSourceError::status("503 Service Unavailable"));
    }

    #[tokio::test]
    async fn metadata_failure_is_fatal() {
        let mut source = MockUpstream::new();
        source
            .expect_fetch_meta()
            .returning(|_| Err(UpstreamSourceError::timeout("meta")));
        source.expect_fetch_page().never();
        let registry = IdentityRegistry::new();

        let error = PaginatedFetcher::new(&source, &registry)
            .fetch(&UpstreamParameters::default(), RecordWindow::default())
            .await
            .expect_err("fetch fails");
        assert!(matches!(error, UpstreamSourceError::Timeout { .. }));
    }
}
