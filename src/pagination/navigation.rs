//! Previous/next post lookup

use crate::client::query::FIRST_PUBLICATION_DATE;
use crate::client::{ContentClient, Ordering, Query};
use crate::content::{Adjacent, NavPost, PostNormalizer};
use crate::error::Result;

use super::normalize_results;

/// Resolve the posts published right before and right after `document_id`
///
/// Both neighbours are fetched concurrently as one-document pages starting
/// after the current document: newest-first for the older post, oldest-first
/// for the newer one.
pub async fn adjacent_posts(
    client: &dyn ContentClient,
    doc_type: &str,
    document_id: &str,
    reference: Option<&str>,
) -> Result<Adjacent> {
    let older = neighbour_query(
        doc_type,
        document_id,
        reference,
        Ordering::desc(FIRST_PUBLICATION_DATE),
    );
    let newer = neighbour_query(
        doc_type,
        document_id,
        reference,
        Ordering::asc(FIRST_PUBLICATION_DATE),
    );

    let (previous, next) = tokio::try_join!(
        first_neighbour(client, &older),
        first_neighbour(client, &newer)
    )?;

    Ok(Adjacent { previous, next })
}

fn neighbour_query(
    doc_type: &str,
    document_id: &str,
    reference: Option<&str>,
    ordering: Ordering,
) -> Query {
    Query::of_type(doc_type)
        .fetch_fields(doc_type, &["title"])
        .page_size(1)
        .after(document_id)
        .order_by(ordering)
        .with_ref(reference)
}

async fn first_neighbour(client: &dyn ContentClient, query: &Query) -> Result<Option<NavPost>> {
    let response = client.query(query).await?;
    Ok(normalize_results(&PostNormalizer::listing(), &response.results)
        .into_iter()
        .next()
        .map(|post| NavPost {
            uid: post.uid,
            title: post.data.title,
        }))
}
