//! Prismic REST API (v2) client

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::{ContentClient, PreviewLookup, Query};
use crate::config::PrismicConfig;
use crate::content::{ApiInfo, ApiResponse};
use crate::error::{Error, Result};

/// Query parameter carrying the repository access token
pub const ACCESS_TOKEN_PARAM: &str = "access_token";

/// HTTP client for one Prismic repository
pub struct PrismicClient {
    client: Client,
    endpoint: String,
    base: Url,
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PreviewSessionResponse {
    #[serde(rename = "mainDocument", default)]
    main_document: Option<String>,
}

impl PrismicClient {
    /// Create a client for `endpoint` (e.g. `https://repo.cdn.prismic.io/api/v2`)
    pub fn new(
        endpoint: &str,
        access_token: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let endpoint = endpoint.trim().trim_end_matches('/').to_string();
        let base = match Url::parse(&endpoint) {
            Ok(base) if is_web_url(&base) => base,
            _ => anyhow::bail!(
                "Prismic API endpoint is not configured.\n\n\
                Set prismic.api_endpoint in _config.yml or the PRISMIC_API_ENDPOINT \
                environment variable, e.g. https://your-repo.cdn.prismic.io/api/v2"
            ),
        };

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint,
            base,
            access_token: access_token.filter(|t| !t.is_empty()),
        })
    }

    pub fn from_config(config: &PrismicConfig) -> anyhow::Result<Self> {
        Self::new(
            &config.api_endpoint,
            config.access_token.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.query(&[(ACCESS_TOKEN_PARAM, token.as_str())]),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            return Err(Error::Fetch(format!(
                "content store returned {} - {}",
                status, error_text
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| Error::Fetch(format!("failed to parse content store response: {}", e)))
    }

    /// Current ref of published content
    async fn master_ref(&self) -> Result<String> {
        let info: ApiInfo = self
            .get_json(self.authorize(self.client.get(&self.endpoint)))
            .await?;

        info.master_ref()
            .map(str::to_string)
            .ok_or_else(|| Error::Fetch("content store reported no master ref".to_string()))
    }

    /// Cursors must point back at this repository's API
    fn owns_cursor(&self, cursor: &Url) -> bool {
        let api_path = format!("{}/", self.base.path().trim_end_matches('/'));
        is_web_url(cursor)
            && cursor.scheme() == self.base.scheme()
            && same_host(cursor, &self.base)
            && cursor.port_or_known_default() == self.base.port_or_known_default()
            && cursor.path().starts_with(&api_path)
    }

    /// Preview tokens are issued by the repository host (with or without `.cdn`)
    fn issued_preview_token(&self, token: &str) -> bool {
        let Ok(token) = Url::parse(token) else {
            return false;
        };
        if !is_web_url(&token)
            || token.port_or_known_default() != self.base.port_or_known_default()
        {
            return false;
        }
        let (Some(token_host), Some(api_host)) = (token.host_str(), self.base.host_str()) else {
            return false;
        };
        let token_host = token_host.to_ascii_lowercase();
        let api_host = api_host.to_ascii_lowercase();
        token_host == api_host || token_host == api_host.replacen(".cdn.", ".", 1)
    }
}

#[async_trait]
impl ContentClient for PrismicClient {
    async fn query(&self, query: &Query) -> Result<ApiResponse> {
        query.validate()?;

        let reference = match &query.reference {
            Some(reference) => reference.clone(),
            None => self.master_ref().await?,
        };

        tracing::debug!("Querying {} (page size {})", query.q(), query.page_size);

        let request = self
            .client
            .get(format!("{}/documents/search", self.endpoint))
            .query(&[("ref", reference.as_str())])
            .query(&query.to_params());

        self.get_json(self.authorize(request)).await
    }

    async fn fetch_page(&self, cursor: &str) -> Result<ApiResponse> {
        let url = match Url::parse(cursor) {
            Ok(url) if self.owns_cursor(&url) => url,
            _ => {
                return Err(Error::InvalidQuery(format!(
                    "cursor does not belong to {}",
                    self.endpoint
                )))
            }
        };

        tracing::debug!("Fetching page {}", url.path());

        let authorized = url.query_pairs().any(|(name, _)| name == ACCESS_TOKEN_PARAM);
        let request = self.client.get(url);
        let request = if authorized {
            request
        } else {
            self.authorize(request)
        };

        self.get_json(request).await
    }

    async fn preview_lookup(&self, token: &str) -> Result<PreviewLookup> {
        if !self.issued_preview_token(token) {
            tracing::warn!("Rejecting preview token from a foreign host");
            return Ok(PreviewLookup::Rejected);
        }

        let response = self.authorize(self.client.get(token)).send().await?;

        let status = response.status();
        if status.is_client_error() {
            return Ok(PreviewLookup::Rejected);
        }
        if !status.is_success() {
            return Err(Error::Fetch(format!("preview lookup returned {}", status)));
        }

        let session: PreviewSessionResponse = response
            .json()
            .await
            .map_err(|e| Error::Fetch(format!("failed to parse preview session: {}", e)))?;

        Ok(PreviewLookup::Accepted {
            main_document: session.main_document.filter(|id| !id.is_empty()),
        })
    }
}

/// An http(s) URL with a host and no credentials
fn is_web_url(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
        && url.host_str().is_some()
        && url.username().is_empty()
        && url.password().is_none()
}

fn same_host(a: &Url, b: &Url) -> bool {
    match (a.host_str(), b.host_str()) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => false,
    }
}
