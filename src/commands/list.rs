//! List posts from the content store

use anyhow::Result;

use crate::content::{Post, PostNormalizer};
use crate::helpers::format_publication_date;
use crate::pagination::PaginationController;
use crate::Spacetraveling;

/// Walk every listing page, newest first
pub async fn collect_posts(site: &Spacetraveling) -> Result<Vec<Post>> {
    let config = &site.config;
    let pagination = PaginationController::new(site.client.clone(), PostNormalizer::listing())
        .with_timeout(config.load_more.timeout());

    pagination
        .load_initial(config.per_page, &config.document_type)
        .await?;
    while pagination.has_next() {
        let appended = pagination.load_next().await?;
        tracing::debug!(
            "Page {}: {} posts",
            pagination.current_page(),
            appended
        );
    }

    Ok(pagination.posts())
}

/// Print every post
pub async fn run(site: &Spacetraveling) -> Result<()> {
    let posts = collect_posts(site).await?;

    println!("Posts ({}):", posts.len());
    for post in &posts {
        println!("  {}", describe(site, post));
    }

    Ok(())
}

fn describe(site: &Spacetraveling, post: &Post) -> String {
    let config = &site.config;
    let date = post
        .first_publication_date
        .as_deref()
        .and_then(|d| {
            format_publication_date(d, &config.date_format, &config.language, &config.timezone)
        })
        .unwrap_or_else(|| "-".to_string());

    if post.data.author.is_empty() {
        format!("{} - {} [{}]", date, post.data.title, post.uid)
    } else {
        format!(
            "{} - {} by {} [{}]",
            date, post.data.title, post.data.author, post.uid
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::{listing_doc, response, InMemoryClient};
    use crate::config::SiteConfig;
    use std::sync::Arc;

    const PAGE_2: &str = "https://repo.cdn.prismic.io/api/v2/documents/search?page=2";

    fn site(client: InMemoryClient) -> Spacetraveling {
        Spacetraveling::with_client(".", SiteConfig::default(), Arc::new(client))
    }

    #[tokio::test]
    async fn test_collects_every_page() {
        let client = InMemoryClient::new()
            .with_listing(response(
                vec![listing_doc("newest", "Newest"), listing_doc("newer", "Newer")],
                Some(PAGE_2),
            ))
            .with_page(PAGE_2, response(vec![listing_doc("oldest", "Oldest")], None));
        let site = site(client);

        let posts = collect_posts(&site).await.unwrap();
        let uids: Vec<&str> = posts.iter().map(|p| p.uid.as_str()).collect();
        assert_eq!(uids, vec!["newest", "newer", "oldest"]);
    }

    #[tokio::test]
    async fn test_store_failure_is_reported() {
        let client = InMemoryClient::new()
            .with_listing(response(vec![listing_doc("a", "A")], Some(PAGE_2)))
            .with_page(PAGE_2, response(vec![], None))
            .failing_fetches(1);

        assert!(collect_posts(&site(client)).await.is_err());
    }

    #[test]
    fn test_describe() {
        let site = site(InMemoryClient::new());
        let post = PostNormalizer::listing()
            .normalize(&listing_doc("hooks", "Como utilizar Hooks"))
            .unwrap();
        assert_eq!(
            describe(&site, &post),
            "15 mar 2021 - Como utilizar Hooks by Joseph Oliveira [hooks]"
        );
    }
}
