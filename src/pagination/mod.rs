//! Post listing pagination
//!
//! [`PaginationController`] owns the posts loaded so far in a session and the
//! store cursor for the next page. "Load more" is single-flight: the store
//! cursor cannot be reused concurrently, so a second call while one fetch is
//! outstanding is rejected instead of racing to append the same page twice.

mod navigation;

pub use navigation::adjacent_posts;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use url::Url;

use crate::client::query::FIRST_PUBLICATION_DATE;
use crate::client::{ContentClient, Ordering, Query, ACCESS_TOKEN_PARAM};
use crate::content::{Page, Post, PostNormalizer, RawDocument};
use crate::error::{Error, Result};

/// Fields selected for listing pages
pub const LISTING_FIELDS: &[&str] = &["title", "subtitle", "author"];

/// Default timeout for a "load more" fetch
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Session pagination state
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationState {
    /// Loaded posts, append-only
    pub posts: Vec<Post>,
    pub next_page: Option<String>,
    /// 1-based number of the last loaded page
    pub current_page: usize,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self {
            posts: Vec::new(),
            next_page: None,
            current_page: 1,
        }
    }
}

/// Loads the first listing page and appends subsequent pages on demand
pub struct PaginationController {
    client: Arc<dyn ContentClient>,
    normalizer: PostNormalizer,
    state: Mutex<PaginationState>,
    in_flight: AtomicBool,
    timeout: Duration,
    reference: Option<String>,
}

impl PaginationController {
    pub fn new(client: Arc<dyn ContentClient>, normalizer: PostNormalizer) -> Self {
        Self {
            client,
            normalizer,
            state: Mutex::new(PaginationState::default()),
            in_flight: AtomicBool::new(false),
            timeout: DEFAULT_LOAD_TIMEOUT,
            reference: None,
        }
    }

    /// Resume a session from an already-fetched first page
    pub fn from_page(
        client: Arc<dyn ContentClient>,
        normalizer: PostNormalizer,
        page: Page,
    ) -> Self {
        let controller = Self::new(client, normalizer);
        controller.replace_state(PaginationState {
            posts: page.results,
            next_page: page.next_page,
            current_page: 1,
        });
        controller
    }

    /// Timeout applied to each "load more" fetch
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Query a specific content ref (preview) instead of published content
    pub fn with_ref(mut self, reference: Option<String>) -> Self {
        self.reference = reference;
        self
    }

    /// Request the first page and reset the session to it
    pub async fn load_initial(&self, page_size: usize, type_filter: &str) -> Result<Page> {
        let _flight = FlightGuard::acquire(&self.in_flight)?;

        let query = listing_query(type_filter, page_size).with_ref(self.reference.as_deref());
        let response = self.client.query(&query).await?;

        let page = Page {
            results: normalize_results(&self.normalizer, &response.results),
            next_page: response.next_page.as_deref().map(public_cursor),
        };

        tracing::debug!(
            "Loaded first page: {} posts, more: {}",
            page.results.len(),
            page.next_page.is_some()
        );

        self.replace_state(PaginationState {
            posts: dedup(page.results.clone(), &HashSet::new()),
            next_page: page.next_page.clone(),
            current_page: 1,
        });

        Ok(page)
    }

    /// Fetch the page at the stored cursor and append it
    ///
    /// Returns the number of appended posts; 0 when the listing is exhausted.
    /// On failure the state is left untouched and the same cursor can be
    /// retried.
    pub async fn load_next(&self) -> Result<usize> {
        let _flight = FlightGuard::acquire(&self.in_flight)?;

        let cursor = match self.lock().next_page.clone() {
            Some(cursor) => cursor,
            None => return Ok(0),
        };

        let page = tokio::time::timeout(
            self.timeout,
            fetch_listing_page(self.client.as_ref(), &self.normalizer, &cursor),
        )
        .await
        .map_err(|_| Error::Fetch(format!("load more timed out after {:?}", self.timeout)))??;

        let mut state = self.lock();
        let seen: HashSet<String> = state.posts.iter().map(|p| p.uid.clone()).collect();
        let fresh = dedup(page.results, &seen);
        let appended = fresh.len();

        state.posts.extend(fresh);
        state.next_page = page.next_page;
        state.current_page += 1;

        tracing::debug!(
            "Loaded page {}: {} posts appended",
            state.current_page,
            appended
        );

        Ok(appended)
    }

    /// Snapshot of the session state
    pub fn state(&self) -> PaginationState {
        self.lock().clone()
    }

    pub fn posts(&self) -> Vec<Post> {
        self.lock().posts.clone()
    }

    pub fn next_page(&self) -> Option<String> {
        self.lock().next_page.clone()
    }

    pub fn current_page(&self) -> usize {
        self.lock().current_page
    }

    pub fn has_next(&self) -> bool {
        self.lock().next_page.is_some()
    }

    /// Whether a fetch is outstanding
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(AtomicOrdering::SeqCst)
    }

    fn replace_state(&self, state: PaginationState) {
        *self.lock() = state;
    }

    fn lock(&self) -> MutexGuard<'_, PaginationState> {
        // State is only ever replaced wholesale or appended after a fetch, so
        // a poisoned lock still holds a consistent value.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Query for the first listing page of `doc_type`, newest first
pub fn listing_query(doc_type: &str, page_size: usize) -> Query {
    Query::of_type(doc_type)
        .fetch_fields(doc_type, LISTING_FIELDS)
        .page_size(page_size)
        .order_by(Ordering::desc(FIRST_PUBLICATION_DATE))
}

/// Fetch and normalize the page a cursor points at
///
/// Shared by the controller and the stateless "load more" endpoint.
pub async fn fetch_listing_page(
    client: &dyn ContentClient,
    normalizer: &PostNormalizer,
    cursor: &str,
) -> Result<Page> {
    let response = client.fetch_page(cursor).await?;
    Ok(Page {
        results: normalize_results(normalizer, &response.results),
        next_page: response.next_page.as_deref().map(public_cursor),
    })
}

/// A store cursor with the repository access token removed
///
/// Cursors end up in rendered pages and API responses; the client adds the
/// token back when the cursor is fetched.
pub fn public_cursor(cursor: &str) -> String {
    let Ok(mut url) = Url::parse(cursor) else {
        return cursor.to_string();
    };
    if !url.query_pairs().any(|(name, _)| name == ACCESS_TOKEN_PARAM) {
        return cursor.to_string();
    }

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| name != ACCESS_TOKEN_PARAM)
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
    url.to_string()
}

/// Normalize a result list, skipping documents that fail
pub fn normalize_results(normalizer: &PostNormalizer, documents: &[RawDocument]) -> Vec<Post> {
    documents
        .iter()
        .filter_map(|doc| match normalizer.normalize(doc) {
            Ok(post) => Some(post),
            Err(e) => {
                tracing::warn!("Skipping document {}: {}", doc.id, e);
                None
            }
        })
        .collect()
}

/// Drop posts whose uid was already delivered
fn dedup(posts: Vec<Post>, seen: &HashSet<String>) -> Vec<Post> {
    let mut seen = seen.clone();
    posts
        .into_iter()
        .filter(|post| {
            let fresh = seen.insert(post.uid.clone());
            if !fresh {
                tracing::warn!("Dropping duplicate post {}", post.uid);
            }
            fresh
        })
        .collect()
}

/// Holds the in-flight flag for the lifetime of one fetch
struct FlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> FlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, AtomicOrdering::SeqCst, AtomicOrdering::SeqCst)
            .map_err(|_| Error::LoadInFlight)?;
        Ok(Self { flag })
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, AtomicOrdering::SeqCst);
    }
}
