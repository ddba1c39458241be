//! In-memory content store for tests

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Mutex;
use std::time::Duration;

use super::{ContentClient, PreviewLookup, Query};
use crate::content::{ApiResponse, RawDocument};
use crate::error::{Error, Result};

type Responder = Box<dyn Fn(&Query) -> Result<ApiResponse> + Send + Sync>;

pub(crate) struct InMemoryClient {
    responder: Responder,
    pages: HashMap<String, ApiResponse>,
    documents: Vec<RawDocument>,
    previews: HashMap<String, Option<String>>,
    failing_fetches: AtomicUsize,
    fetch_delay: Option<Duration>,
    fetches: AtomicUsize,
    queries: Mutex<Vec<Query>>,
}

impl InMemoryClient {
    pub fn new() -> Self {
        Self {
            responder: Box::new(|_| Ok(ApiResponse::default())),
            pages: HashMap::new(),
            documents: Vec::new(),
            previews: HashMap::new(),
            failing_fetches: AtomicUsize::new(0),
            fetch_delay: None,
            fetches: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Answer every search with the same response
    pub fn with_listing(self, response: ApiResponse) -> Self {
        self.with_responder(move |_| Ok(response.clone()))
    }

    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&Query) -> Result<ApiResponse> + Send + Sync + 'static,
    {
        self.responder = Box::new(responder);
        self
    }

    pub fn with_page(mut self, cursor: &str, response: ApiResponse) -> Self {
        self.pages.insert(cursor.to_string(), response);
        self
    }

    pub fn with_document(mut self, document: RawDocument) -> Self {
        self.documents.push(document);
        self
    }

    pub fn with_preview(mut self, token: &str, main_document: Option<&str>) -> Self {
        self.previews
            .insert(token.to_string(), main_document.map(str::to_string));
        self
    }

    /// Make the next `n` page fetches fail
    pub fn failing_fetches(self, n: usize) -> Self {
        self.failing_fetches.store(n, AtomicOrdering::SeqCst);
        self
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(AtomicOrdering::SeqCst)
    }

    pub fn queries(&self) -> Vec<Query> {
        self.queries
            .lock()
            .map(|q| q.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ContentClient for InMemoryClient {
    async fn query(&self, query: &Query) -> Result<ApiResponse> {
        query.validate()?;
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.clone());
        }
        (self.responder)(query)
    }

    async fn fetch_page(&self, cursor: &str) -> Result<ApiResponse> {
        self.fetches.fetch_add(1, AtomicOrdering::SeqCst);

        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }

        let failing = self
            .failing_fetches
            .fetch_update(AtomicOrdering::SeqCst, AtomicOrdering::SeqCst, |n| {
                n.checked_sub(1)
            })
            .is_ok();
        if failing {
            return Err(Error::Fetch("simulated outage".to_string()));
        }

        self.pages
            .get(cursor)
            .cloned()
            .ok_or_else(|| Error::Fetch(format!("unknown cursor {}", cursor)))
    }

    async fn preview_lookup(&self, token: &str) -> Result<PreviewLookup> {
        Ok(match self.previews.get(token) {
            Some(main_document) => PreviewLookup::Accepted {
                main_document: main_document.clone(),
            },
            None => PreviewLookup::Rejected,
        })
    }

    async fn get_by_uid(
        &self,
        doc_type: &str,
        uid: &str,
        _reference: Option<&str>,
    ) -> Result<Option<RawDocument>> {
        Ok(self
            .documents
            .iter()
            .find(|d| d.doc_type == doc_type && d.uid.as_deref() == Some(uid))
            .cloned())
    }

    async fn get_by_id(&self, id: &str, _reference: Option<&str>) -> Result<Option<RawDocument>> {
        Ok(self.documents.iter().find(|d| d.id == id).cloned())
    }
}

/// Listing-shaped post document
pub(crate) fn listing_doc(uid: &str, title: &str) -> RawDocument {
    serde_json::from_value(json!({
        "id": format!("id-{}", uid),
        "uid": uid,
        "type": "post",
        "first_publication_date": "2021-03-15T19:25:28+0000",
        "last_publication_date": "2021-03-15T19:25:28+0000",
        "data": {
            "title": title,
            "subtitle": format!("About {}", title),
            "author": "Joseph Oliveira"
        }
    }))
    .unwrap()
}

/// Full post document as a detail page needs it
pub(crate) fn detail_doc(uid: &str, title: &str) -> RawDocument {
    serde_json::from_value(json!({
        "id": format!("id-{}", uid),
        "uid": uid,
        "type": "post",
        "first_publication_date": "2021-03-15T19:25:28+0000",
        "last_publication_date": "2021-03-19T18:49:00+0000",
        "data": {
            "title": title,
            "subtitle": "Pensando em sincronização",
            "author": "Joseph Oliveira",
            "banner": {"url": "https://images.prismic.io/banner.png"},
            "content": [{
                "heading": "Proin et varius",
                "body": [{"type": "paragraph", "text": "Lorem ipsum dolor sit amet", "spans": []}]
            }]
        }
    }))
    .unwrap()
}

pub(crate) fn response(results: Vec<RawDocument>, next_page: Option<&str>) -> ApiResponse {
    ApiResponse {
        results_size: results.len(),
        results,
        next_page: next_page.map(str::to_string),
        ..ApiResponse::default()
    }
}
