//! Content store client
//!
//! [`ContentClient`] is the seam between the site and the headless CMS. The
//! production implementation is [`PrismicClient`]; everything else in the
//! crate receives an `Arc<dyn ContentClient>` built once at startup.

mod prismic;
pub mod query;
#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;

pub use prismic::{PrismicClient, ACCESS_TOKEN_PARAM};
pub use query::{Ordering, Predicate, Query};

use crate::content::{ApiResponse, RawDocument};
use crate::error::Result;

/// Outcome of validating a preview token with the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewLookup {
    /// The store does not recognise the token
    Rejected,
    /// Token is live; `main_document` is the document the editor was on
    Accepted { main_document: Option<String> },
}

#[async_trait]
pub trait ContentClient: Send + Sync {
    /// Run a search and return one page of results
    async fn query(&self, query: &Query) -> Result<ApiResponse>;

    /// Fetch the page a store-issued `next_page` cursor points at
    async fn fetch_page(&self, cursor: &str) -> Result<ApiResponse>;

    /// Validate a preview token
    async fn preview_lookup(&self, token: &str) -> Result<PreviewLookup>;

    /// Fetch a single document by type and uid
    async fn get_by_uid(
        &self,
        doc_type: &str,
        uid: &str,
        reference: Option<&str>,
    ) -> Result<Option<RawDocument>> {
        let query = Query::of_type(doc_type)
            .predicate(Predicate::at(&format!("my.{}.uid", doc_type), uid))
            .page_size(1)
            .with_ref(reference);
        Ok(self.query(&query).await?.results.into_iter().next())
    }

    /// Fetch a single document by id
    async fn get_by_id(&self, id: &str, reference: Option<&str>) -> Result<Option<RawDocument>> {
        let query = Query::new()
            .predicate(Predicate::at("document.id", id))
            .page_size(1)
            .with_ref(reference);
        Ok(self.query(&query).await?.results.into_iter().next())
    }
}
