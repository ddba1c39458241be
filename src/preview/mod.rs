//! Preview mode
//!
//! A preview starts when the CMS redirects an editor to
//! `/api/preview?token=...&documentId=...`. The token is validated with the
//! store, the document being edited is resolved to a site path and the token
//! is kept in a cookie so later page requests query the draft ref.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;
use url::Url;

use crate::client::{ContentClient, PreviewLookup};
use crate::config::PreviewConfig;
use crate::error::{Error, Result};
use crate::helpers::link_resolver;

/// Where to send the editor, and the session to persist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewRedirect {
    pub path: String,
    pub session: PreviewSession,
}

/// An active preview: the draft ref to query with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewSession {
    pub reference: String,
}

impl PreviewSession {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
        }
    }

    /// Cookie that starts the session
    pub fn cookie(&self, config: &PreviewConfig) -> Cookie<'static> {
        let max_age = i64::try_from(config.max_age_secs).unwrap_or(i64::MAX);
        Cookie::build((config.cookie_name.clone(), self.reference.clone()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(max_age))
            .build()
    }

    /// Cookie to hand to [`CookieJar::remove`] to end any session
    pub fn removal_cookie(config: &PreviewConfig) -> Cookie<'static> {
        Cookie::build((config.cookie_name.clone(), "")).path("/").build()
    }

    /// Read the session back from the request cookies
    pub fn from_jar(jar: &CookieJar, cookie_name: &str) -> Option<Self> {
        jar.get(cookie_name)
            .map(|cookie| cookie.value().trim().to_string())
            .filter(|value| !value.is_empty())
            .map(Self::new)
    }
}

/// Validates preview tokens and resolves the page to open
pub struct PreviewResolver {
    client: Arc<dyn ContentClient>,
}

impl PreviewResolver {
    pub fn new(client: Arc<dyn ContentClient>) -> Self {
        Self { client }
    }

    /// Resolve a preview request
    ///
    /// Fails with [`Error::InvalidToken`] when the token is malformed or the
    /// store does not recognise it. A document that cannot be found sends the
    /// editor to the home page.
    pub async fn resolve(&self, token: &str, document_id: Option<&str>) -> Result<PreviewRedirect> {
        let token = token.trim();
        if !is_token_shaped(token) {
            return Err(Error::InvalidToken);
        }

        let main_document = match self.client.preview_lookup(token).await? {
            PreviewLookup::Rejected => return Err(Error::InvalidToken),
            PreviewLookup::Accepted { main_document } => main_document,
        };

        let target = document_id
            .filter(|id| !id.trim().is_empty())
            .map(str::to_string)
            .or(main_document);

        let path = match target {
            Some(id) => match self.client.get_by_id(&id, Some(token)).await? {
                Some(doc) => link_resolver(&doc.doc_type, doc.uid.as_deref()),
                None => {
                    tracing::warn!("Preview document {} not found, opening home", id);
                    "/".to_string()
                }
            },
            None => "/".to_string(),
        };

        tracing::info!("Preview started, redirecting to {}", path);

        Ok(PreviewRedirect {
            path,
            session: PreviewSession::new(token),
        })
    }
}

/// Preview tokens are store URLs
fn is_token_shaped(token: &str) -> bool {
    Url::parse(token).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}
