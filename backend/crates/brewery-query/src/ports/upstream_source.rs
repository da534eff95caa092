//! Driven port for the upstream brewery directory.
//!
//! The core owns the parameter shape and the response contract; outbound
//! adapters only own transport concerns (URLs, HTTP status mapping, body
//! decoding).

use std::sync::Mutex;

use async_trait::async_trait;

use super::define_port_error;
use crate::UPSTREAM_PAGE_LIMIT;
use crate::record::BreweryRecord;

/// Upstream-facing query parameters. Absent fields leave that dimension
/// unfiltered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamParameters {
    /// Exact city match; words separated by underscores.
    pub by_city: Option<String>,
    /// Exact state or province match.
    pub by_state: Option<String>,
    /// Postal code match.
    pub by_postal: Option<String>,
    /// Country match.
    pub by_country: Option<String>,
    /// Brewery type match.
    pub by_type: Option<String>,
    /// Opaque identifiers to restrict to. `Some(vec![])` matches nothing.
    pub by_ids: Option<Vec<String>>,
    /// Proximity sort origin formatted as `"lat,lon"`.
    pub by_dist: Option<String>,
    /// Comma-joined `field:asc|desc` tokens.
    pub sort: Option<String>,
    /// One-based page number.
    pub page: Option<u32>,
    /// Rows per page, at most [`UPSTREAM_PAGE_LIMIT`].
    pub per_page: Option<u32>,
}

impl UpstreamParameters {
    /// Copy of these parameters addressing one page.
    #[must_use]
    pub fn for_page(&self, page: u32, per_page: u32) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page.min(UPSTREAM_PAGE_LIMIT)),
            ..self.clone()
        }
    }

    /// Whether an id filter was requested but nothing resolved into it.
    #[must_use]
    pub fn matches_nothing(&self) -> bool {
        self.by_ids.as_ref().is_some_and(Vec::is_empty)
    }

    /// Render as query-string pairs in a stable order.
    ///
    /// # Examples
    ///
    /// ```
    /// use brewery_query::ports::UpstreamParameters;
    ///
    /// let params = UpstreamParameters {
    ///     by_city: Some("san_diego".to_owned()),
    ///     by_ids: Some(vec!["a".to_owned(), "b".to_owned()]),
    ///     per_page: Some(50),
    ///     ..UpstreamParameters::default()
    /// };
    /// assert_eq!(
    ///     params.to_query_pairs(),
    ///     vec![
    ///         ("by_city", "san_diego".to_owned()),
    ///         ("by_ids", "a,b".to_owned()),
    ///         ("per_page", "50".to_owned()),
    ///     ]
    /// );
    /// ```
    #[must_use]
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let text_fields = [
            ("by_city", &self.by_city),
            ("by_state", &self.by_state),
            ("by_postal", &self.by_postal),
            ("by_country", &self.by_country),
            ("by_type", &self.by_type),
        ];
        let mut pairs: Vec<(&'static str, String)> = text_fields
            .into_iter()
            .filter_map(|(key, value)| value.clone().map(|text| (key, text)))
            .collect();
        if let Some(ids) = &self.by_ids {
            pairs.push(("by_ids", ids.join(",")));
        }
        if let Some(origin) = &self.by_dist {
            pairs.push(("by_dist", origin.clone()));
        }
        if let Some(sort) = &self.sort {
            pairs.push(("sort", sort.clone()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(per_page) = self.per_page {
            pairs.push(("per_page", per_page.to_string()));
        }
        pairs
    }
}

/// Result-set metadata reported by the upstream `/meta` endpoint.
///
/// `total` is authoritative only before local spatial filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageMeta {
    /// Number of records matching the filter.
    pub total: u64,
    /// Page size the numbers refer to.
    pub per_page: u32,
    /// Current (after a fetch: last fetched) page.
    pub page: u32,
}

define_port_error! {
    /// Errors surfaced while calling the upstream directory. Always fatal for
    /// the query that triggered them.
    pub enum UpstreamSourceError {
        /// Network transport failed before a response arrived.
        Transport { message: String } =>
            "upstream transport failed: {message}",
        /// The call exceeded its timeout.
        Timeout { message: String } =>
            "upstream timeout: {message}",
        /// The upstream throttled the request.
        RateLimited { message: String } =>
            "upstream rate limited request: {message}",
        /// The upstream answered with a non-success status.
        Status { message: String } =>
            "upstream returned an error status: {message}",
        /// The body could not be decoded.
        Decode { message: String } =>
            "upstream response decode failed: {message}",
        /// The adapter could not build the request.
        InvalidRequest { message: String } =>
            "upstream request invalid: {message}",
    }
}

/// Port for reading the upstream brewery directory.
#[async_trait]
pub trait UpstreamSource: Send + Sync {
    /// Fetch metadata (total match count) for the given filter.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamSourceError`] when the request fails or the body
    /// cannot be decoded.
    async fn fetch_meta(
        &self,
        params: &UpstreamParameters,
    ) -> Result<PageMeta, UpstreamSourceError>;

    /// Fetch one page of records for the given filter.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamSourceError`] when the request fails or the body
    /// cannot be decoded.
    async fn fetch_page(
        &self,
        params: &UpstreamParameters,
    ) -> Result<Vec<BreweryRecord>, UpstreamSourceError>;
}

/// In-memory upstream serving a fixed record list.
///
/// Honours the exact-match and id filters (case-insensitive, underscores
/// treated as spaces) and page windows; ignores sort and proximity. Every
/// request is recorded so callers can inspect what was asked for.
#[derive(Debug, Default)]
pub struct InMemoryUpstreamSource {
    records: Vec<BreweryRecord>,
    requests: Mutex<Vec<UpstreamParameters>>,
}

impl InMemoryUpstreamSource {
    /// Serve the given records.
    #[must_use]
    pub fn new(records: Vec<BreweryRecord>) -> Self {
        Self {
            records,
            requests: Mutex::default(),
        }
    }

    /// Page requests received so far, in arrival order. Metadata requests are
    /// not included.
    #[must_use]
    pub fn page_requests(&self) -> Vec<UpstreamParameters> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn matching(&self, params: &UpstreamParameters) -> Vec<&BreweryRecord> {
        self.records
            .iter()
            .filter(|record| record_matches(record, params))
            .collect()
    }
}

fn record_matches(record: &BreweryRecord, params: &UpstreamParameters) -> bool {
    let attributes = &record.attributes;
    let text_filters = [
        (&params.by_city, attributes.city.as_deref()),
        (&params.by_state, attributes.state_province.as_deref()),
        (&params.by_postal, attributes.postal_code.as_deref()),
        (&params.by_country, attributes.country.as_deref()),
        (&params.by_type, Some(attributes.brewery_type.as_str())),
    ];
    let text_ok = text_filters.into_iter().all(|(wanted, actual)| {
        wanted
            .as_deref()
            .is_none_or(|expected| actual.is_some_and(|found| same_words(expected, found)))
    });
    let ids_ok = params
        .by_ids
        .as_ref()
        .is_none_or(|ids| ids.iter().any(|id| id == &attributes.id));
    text_ok && ids_ok
}

fn same_words(wanted: &str, actual: &str) -> bool {
    wanted.replace('_', " ").eq_ignore_ascii_case(&actual.replace('_', " "))
}

#[async_trait]
impl UpstreamSource for InMemoryUpstreamSource {
    async fn fetch_meta(
        &self,
        params: &UpstreamParameters,
    ) -> Result<PageMeta, UpstreamSourceError> {
        Ok(PageMeta {
            total: u64::try_from(self.matching(params).len()).unwrap_or(u64::MAX),
            per_page: params.per_page.unwrap_or(UPSTREAM_PAGE_LIMIT),
            page: params.page.unwrap_or(1),
        })
    }

    async fn fetch_page(
        &self,
        params: &UpstreamParameters,
    ) -> Result<Vec<BreweryRecord>, UpstreamSourceError> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(params.clone());

        let per_page = usize::try_from(params.per_page.unwrap_or(UPSTREAM_PAGE_LIMIT))
            .unwrap_or(usize::MAX);
        let preceding_pages = usize::try_from(params.page.unwrap_or(1).max(1) - 1)
            .unwrap_or(usize::MAX);
        Ok(self
            .matching(params)
            .into_iter()
            .skip(preceding_pages.saturating_mul(per_page))
            .take(per_page)
            .cloned()
            .collect())
    }
}
