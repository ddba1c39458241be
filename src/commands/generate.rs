//! Generate static files

use anyhow::Result;
use chrono::Utc;
use std::fs;
use std::time::Instant;

use crate::cache::CacheDb;
use crate::client::ContentClient;
use crate::content::{Adjacent, Post, PostNormalizer};
use crate::generator::{self, Generator};
use crate::pagination::{adjacent_posts, PaginationController};
use crate::Spacetraveling;

/// What a generation run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateStats {
    /// Pages written to disk
    pub written: usize,
    /// Pages rendered but identical to the last generated output
    pub unchanged: usize,
    /// Pages younger than their revalidation interval
    pub fresh: usize,
    /// Pages that could not be rendered
    pub failed: usize,
    /// Outputs deleted because their post no longer exists
    pub removed: usize,
}

/// Generate the home page and every post page
///
/// Routes generated more recently than their revalidation interval are
/// skipped unless `force` is set.
pub async fn run(site: &Spacetraveling, force: bool) -> Result<GenerateStats> {
    let start = Instant::now();
    let config = &site.config;

    fs::create_dir_all(&site.public_dir)?;
    let generator = Generator::new(config)?;
    let mut manifest = CacheDb::load(&site.base_dir);
    let now = Utc::now();
    let mut stats = GenerateStats::default();

    // Walk the whole listing: the first page is the home page, the rest
    // only contributes post uids.
    let pagination = PaginationController::new(site.client.clone(), PostNormalizer::listing())
        .with_timeout(config.load_more.timeout());
    let first_page = pagination
        .load_initial(config.per_page, &config.document_type)
        .await?;
    while pagination.has_next() {
        pagination.load_next().await?;
    }
    let posts = pagination.posts();

    tracing::info!("Loaded {} posts", posts.len());

    let mut routes = vec!["/".to_string()];
    if !force && is_current(site, &manifest, "/", config.revalidate.listing(), now) {
        stats.fresh += 1;
    } else {
        let html = generator.render_home(&first_page, false)?;
        save(site, &mut manifest, &mut stats, "/", &html, now)?;
    }

    for listed in &posts {
        let route = format!("/post/{}", listed.uid);
        routes.push(route.clone());

        if !force && is_current(site, &manifest, &route, config.revalidate.post(), now) {
            stats.fresh += 1;
            continue;
        }

        match render_post_page(site, &generator, listed).await {
            Ok(html) => save(site, &mut manifest, &mut stats, &route, &html, now)?,
            Err(e) => {
                tracing::warn!("Failed to generate {}: {}", route, e);
                stats.failed += 1;
            }
        }
    }

    for route in manifest.retain_routes(&routes) {
        let path = generator::output_path(&site.public_dir, &route);
        if path.exists() {
            fs::remove_file(&path)?;
            tracing::info!("Deleted: {:?}", path);
        }
        stats.removed += 1;
    }

    manifest.save(&site.base_dir)?;

    tracing::info!(
        "Generated in {:.2}s: {} written, {} unchanged, {} fresh, {} failed, {} removed",
        start.elapsed().as_secs_f64(),
        stats.written,
        stats.unchanged,
        stats.fresh,
        stats.failed,
        stats.removed
    );

    Ok(stats)
}

async fn render_post_page(
    site: &Spacetraveling,
    generator: &Generator,
    listed: &Post,
) -> Result<String> {
    let doc_type = &site.config.document_type;
    let raw = site
        .client
        .get_by_uid(doc_type, &listed.uid, None)
        .await?
        .ok_or_else(|| crate::Error::NotFound(listed.uid.clone()))?;
    let post = PostNormalizer::detail().normalize(&raw)?;

    let adjacent = match adjacent_posts(site.client.as_ref(), doc_type, &raw.id, None).await {
        Ok(adjacent) => adjacent,
        Err(e) => {
            tracing::warn!("Failed to load neighbours of {}: {}", listed.uid, e);
            Adjacent::default()
        }
    };

    generator.render_post(&post, &adjacent, false)
}

/// Fresh in the manifest and still present on disk
fn is_current(
    site: &Spacetraveling,
    manifest: &CacheDb,
    route: &str,
    max_age: std::time::Duration,
    now: chrono::DateTime<Utc>,
) -> bool {
    manifest.is_fresh(route, max_age, now)
        && generator::output_path(&site.public_dir, route).exists()
}

fn save(
    site: &Spacetraveling,
    manifest: &mut CacheDb,
    stats: &mut GenerateStats,
    route: &str,
    html: &str,
    now: chrono::DateTime<Utc>,
) -> Result<()> {
    let on_disk = generator::output_path(&site.public_dir, route).exists();
    if on_disk && manifest.is_unchanged(route, html) {
        tracing::debug!("Unchanged: {}", route);
        stats.unchanged += 1;
    } else {
        generator::write_page(&site.public_dir, route, html)?;
        stats.written += 1;
    }
    manifest.record(route, html, now);
    Ok(())
}
