//! Reqwest-backed Open Brewery DB source adapter.
//!
//! This adapter owns transport details only: URL building, timeout and HTTP
//! error mapping, and body decoding into core records.

use std::time::Duration;

use async_trait::async_trait;
use brewery_query::UPSTREAM_PAGE_LIMIT;
use brewery_query::ports::{PageMeta, UpstreamParameters, UpstreamSource, UpstreamSourceError};
use brewery_query::record::BreweryRecord;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, USER_AGENT};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::dto::MetaDto;

const DEFAULT_USER_AGENT: &str = "brewery-backend/0.1";

/// Open Brewery DB adapter issuing GET requests below one base URL.
pub struct OpenBreweryHttpSource {
    client: Client,
    base: Url,
    meta: Url,
    user_agent: String,
}

impl OpenBreweryHttpSource {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    ///
    /// `base` is the breweries collection, e.g.
    /// `https://api.openbrewerydb.org/v1/breweries`; metadata is read from
    /// `<base>/meta`.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamSourceError::InvalidRequest`] when `base` cannot be
    /// extended with `/meta`, or [`UpstreamSourceError::Transport`] when the
    /// reqwest client cannot be constructed.
    pub fn new(
        base: Url,
        timeout: Duration,
        user_agent: Option<String>,
    ) -> Result<Self, UpstreamSourceError> {
        let meta = meta_url(&base)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| UpstreamSourceError::transport(error.to_string()))?;
        Ok(Self {
            client,
            base,
            meta,
            user_agent: user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned()),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        params: &UpstreamParameters,
    ) -> Result<T, UpstreamSourceError> {
        let pairs = params.to_query_pairs();
        debug!(%url, ?pairs, "open brewery request");
        let response = self
            .client
            .get(url.clone())
            .query(&pairs)
            .header(USER_AGENT, self.user_agent.as_str())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        decode_body(&headers, body.as_ref())
    }
}

fn meta_url(base: &Url) -> Result<Url, UpstreamSourceError> {
    let mut meta = base.clone();
    meta.path_segments_mut()
        .map_err(|()| UpstreamSourceError::invalid_request(format!("{base} cannot be a base URL")))?
        .pop_if_empty()
        .push("meta");
    Ok(meta)
}

#[async_trait]
impl UpstreamSource for OpenBreweryHttpSource {
    async fn fetch_meta(
        &self,
        params: &UpstreamParameters,
    ) -> Result<PageMeta, UpstreamSourceError> {
        let dto: MetaDto = self.get_json(&self.meta, params).await?;
        dto.into_page_meta(params.per_page.unwrap_or(UPSTREAM_PAGE_LIMIT))
            .map_err(UpstreamSourceError::decode)
    }

    async fn fetch_page(
        &self,
        params: &UpstreamParameters,
    ) -> Result<Vec<BreweryRecord>, UpstreamSourceError> {
        self.get_json(&self.base, params).await
    }
}

/// Decode by content type. A JSON content type must decode; a missing one is
/// tried as JSON; anything else is reported with a body preview.
fn decode_body<T: DeserializeOwned>(
    headers: &HeaderMap,
    body: &[u8],
) -> Result<T, UpstreamSourceError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_ascii_lowercase);
    match content_type {
        Some(kind) if !kind.contains("json") => Err(UpstreamSourceError::decode(format!(
            "expected JSON, got {kind}: {}",
            body_preview(body)
        ))),
        _ => serde_json::from_slice(body).map_err(|error| {
            UpstreamSourceError::decode(format!(
                "invalid JSON payload ({error}): {}",
                body_preview(body)
            ))
        }),
    }
}

fn map_transport_error(error: reqwest::Error) -> UpstreamSourceError {
    if error.is_timeout() {
        UpstreamSourceError::timeout(error.to_string())
    } else if error.is_decode() {
        UpstreamSourceError::decode(error.to_string())
    } else {
        UpstreamSourceError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> UpstreamSourceError {
    let body_preview = body_preview(body);
    let message = if body_preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), body_preview)
    };

    match status {
        StatusCode::TOO_MANY_REQUESTS => UpstreamSourceError::rate_limited(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            UpstreamSourceError::timeout(message)
        }
        _ => UpstreamSourceError::status(message),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
