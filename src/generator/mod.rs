//! Generator module - renders site pages with the built-in Tera templates
//!
//! Rendering is shared by the HTTP server and the `generate` command: both
//! fetch content through the store client and hand normalized posts here.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

use tera::Context;

use crate::config::SiteConfig;
use crate::content::reading_time::estimate_with_rate;
use crate::content::rich_text::as_html;
use crate::content::{Adjacent, NavPost, Page, Post, SectionBody};
use crate::helpers::{format_publication_date, html_escape, is_local_path, link_resolver, url_for};
use crate::templates::{
    CommentsView, NavView, PostSummaryView, PostView, SectionView, SiteData, TemplateRenderer,
};

/// Seconds before the fallback page retries
const FALLBACK_RETRY_SECS: u32 = 5;

/// Page renderer for one site configuration
pub struct Generator {
    config: SiteConfig,
    renderer: TemplateRenderer,
}

impl Generator {
    /// Create a new generator
    pub fn new(config: &SiteConfig) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            renderer: TemplateRenderer::new(config)?,
        })
    }

    /// Render the home page listing
    pub fn render_home(&self, page: &Page, preview: bool) -> Result<String> {
        let posts: Vec<PostSummaryView> =
            page.results.iter().map(|p| self.summary_view(p)).collect();

        let mut context = self.create_base_context(preview);
        context.insert("posts", &posts);
        context.insert("next_page", &page.next_page);
        context.insert("load_more_url", &url_for(&self.config, "api/posts"));

        self.renderer.render("home.html", &context)
    }

    /// Render a post page with its neighbours
    pub fn render_post(&self, post: &Post, adjacent: &Adjacent, preview: bool) -> Result<String> {
        let view = self.post_view(post);
        let nav = NavData {
            previous: adjacent.previous.as_ref().map(|p| self.nav_view(p)),
            next: adjacent.next.as_ref().map(|p| self.nav_view(p)),
        };

        let mut context = self.create_base_context(preview);
        context.insert("post", &view);
        context.insert("nav", &nav);
        context.insert("comments", &self.comments_view());

        self.renderer.render("post.html", &context)
    }

    /// Render the not-found state
    pub fn render_not_found(&self, preview: bool) -> Result<String> {
        let context = self.create_base_context(preview);
        self.renderer.render("not_found.html", &context)
    }

    /// Render the loading state shown while content cannot be fetched
    pub fn render_fallback(&self) -> Result<String> {
        let mut context = self.create_base_context(false);
        context.insert("retry_secs", &FALLBACK_RETRY_SECS);
        self.renderer.render("fallback.html", &context)
    }

    /// Render the page that sends the editor into a preview
    ///
    /// Only same-site paths are honoured; anything else opens the home page.
    pub fn render_preview_redirect(&self, path: &str) -> Result<String> {
        let location = if is_local_path(path) {
            url_for(&self.config, path)
        } else {
            tracing::warn!("Refusing preview redirect to {}", path);
            url_for(&self.config, "/")
        };

        let mut context = self.create_base_context(true);
        context.insert("location", &location);
        self.renderer.render("preview_redirect.html", &context)
    }

    /// Listing entry for a post
    pub fn summary_view(&self, post: &Post) -> PostSummaryView {
        PostSummaryView {
            uid: post.uid.clone(),
            path: self.post_path(&post.uid),
            title: post.data.title.clone(),
            subtitle: post.data.subtitle.clone(),
            author: post.data.author.clone(),
            first_publication_date: post.first_publication_date.clone(),
            date: post
                .first_publication_date
                .as_deref()
                .and_then(|d| self.format_date(d))
                .unwrap_or_default(),
        }
    }

    /// Detail view for a post
    pub fn post_view(&self, post: &Post) -> PostView {
        let sections = post
            .data
            .content
            .iter()
            .map(|section| SectionView {
                heading: section.heading.clone(),
                html: section_html(&section.body),
            })
            .collect();

        PostView {
            uid: post.uid.clone(),
            path: self.post_path(&post.uid),
            title: post.data.title.clone(),
            subtitle: post.data.subtitle.clone(),
            author: post.data.author.clone(),
            banner_url: post.data.banner.url.clone(),
            first_publication_date: post.first_publication_date.clone(),
            last_publication_date: post.last_publication_date.clone(),
            edited: post.was_edited(),
            reading_time: estimate_with_rate(&post.data.content, self.config.words_per_minute),
            sections,
        }
    }

    fn nav_view(&self, post: &NavPost) -> NavView {
        NavView {
            title: post.title.clone(),
            path: self.post_path(&post.uid),
        }
    }

    fn comments_view(&self) -> Option<CommentsView> {
        let comments = &self.config.comments;
        comments.enabled().then(|| CommentsView {
            repo: comments.repo.clone(),
            issue_term: comments.issue_term.clone(),
            theme: comments.theme.clone(),
        })
    }

    fn post_path(&self, uid: &str) -> String {
        url_for(&self.config, &link_resolver(&self.config.document_type, Some(uid)))
    }

    fn format_date(&self, value: &str) -> Option<String> {
        format_publication_date(
            value,
            &self.config.date_format,
            &self.config.language,
            &self.config.timezone,
        )
    }

    /// Create a base context with common variables
    fn create_base_context(&self, preview: bool) -> Context {
        let site = SiteData {
            title: self.config.title.clone(),
            description: self.config.description.clone(),
            language: self.config.language.clone(),
            root: url_for(&self.config, "/"),
            logo: url_for(&self.config, "Logo.svg"),
        };

        let mut context = Context::new();
        context.insert("site", &site);
        context.insert("preview", &preview);
        context
    }
}

#[derive(serde::Serialize)]
struct NavData {
    previous: Option<NavView>,
    next: Option<NavView>,
}

fn section_html(body: &SectionBody) -> String {
    match body {
        SectionBody::Blocks(blocks) => as_html(blocks),
        SectionBody::Text(text) if text.is_empty() => String::new(),
        SectionBody::Text(text) => format!("<p>{}</p>", html_escape(text)),
    }
}

/// Output file for a site route (`/` -> `index.html`, `/post/x` -> `post/x/index.html`)
pub fn output_path(public_dir: &Path, route: &str) -> PathBuf {
    let clean = route.trim_matches('/');
    if clean.is_empty() {
        public_dir.join("index.html")
    } else {
        public_dir.join(clean).join("index.html")
    }
}

/// Write a rendered page to its output path
pub fn write_page(public_dir: &Path, route: &str, html: &str) -> Result<()> {
    let path = output_path(public_dir, route);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| anyhow::anyhow!("Failed to create dir {:?}: {}", parent, e))?;
    }
    fs::write(&path, html).map_err(|e| anyhow::anyhow!("Failed to write {:?}: {}", path, e))?;
    tracing::debug!("Generated: {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::{detail_doc, listing_doc};
    use crate::content::PostNormalizer;

    fn generator() -> Generator {
        let mut config = SiteConfig::default();
        config.comments.repo = "space/travel".to_string();
        Generator::new(&config).unwrap()
    }

    fn listing_post(uid: &str, title: &str) -> Post {
        PostNormalizer::listing().normalize(&listing_doc(uid, title)).unwrap()
    }

    fn detail_post(uid: &str, title: &str) -> Post {
        PostNormalizer::detail().normalize(&detail_doc(uid, title)).unwrap()
    }

    #[test]
    fn test_home_lists_posts_with_load_more() {
        let page = Page {
            results: vec![listing_post("como-utilizar-hooks", "Como utilizar Hooks")],
            next_page: Some("https://repo.cdn.prismic.io/api/v2/documents/search?page=2".into()),
        };

        let html = generator().render_home(&page, false).unwrap();

        assert!(html.contains("Como utilizar Hooks"));
        assert!(html.contains("href=\"&#x2F;post&#x2F;como-utilizar-hooks\""));
        assert!(html.contains("15 mar 2021"));
        assert!(html.contains("Joseph Oliveira"));
        assert!(html.contains("Carregar mais posts"));
        assert!(!html.contains("Sair do modo Preview"));
    }

    #[test]
    fn test_home_without_next_page_has_no_button() {
        let page = Page {
            results: vec![listing_post("a", "A")],
            next_page: None,
        };
        let html = generator().render_home(&page, true).unwrap();
        assert!(!html.contains("Carregar mais posts"));
        assert!(html.contains("Sair do modo Preview"));
    }

    #[test]
    fn test_post_page() {
        let post = detail_post("como-utilizar-hooks", "Como utilizar Hooks");
        let adjacent = Adjacent {
            previous: Some(NavPost {
                uid: "older".to_string(),
                title: "Older post".to_string(),
            }),
            next: None,
        };

        let html = generator().render_post(&post, &adjacent, false).unwrap();

        assert!(html.contains("<h1>Como utilizar Hooks</h1>"));
        assert!(html.contains("1 min"));
        assert!(html.contains("<p>Lorem ipsum dolor sit amet</p>"));
        assert!(html.contains("* editado em 19 mar 2021, às 15:49"));
        assert!(html.contains("Older post"));
        assert!(!html.contains("Próximo post"));
        assert!(html.contains("utteranc.es"));
    }

    #[test]
    fn test_post_view_reading_time_and_edit() {
        let mut post = detail_post("hooks", "Hooks");
        let view = generator().post_view(&post);
        assert_eq!(view.reading_time, 1);
        assert!(view.edited);

        post.last_publication_date = post.first_publication_date.clone();
        assert!(!generator().post_view(&post).edited);
    }

    #[test]
    fn test_plain_text_sections_are_escaped() {
        assert_eq!(
            section_html(&SectionBody::Text("a < b".to_string())),
            "<p>a &lt; b</p>"
        );
        assert_eq!(section_html(&SectionBody::Text(String::new())), "");
    }

    #[test]
    fn test_preview_redirect_stays_on_site() {
        let generator = generator();
        let html = generator.render_preview_redirect("/post/hooks").unwrap();
        assert!(html.contains("url=&#x2F;post&#x2F;hooks"));

        let html = generator
            .render_preview_redirect("https://evil.example/")
            .unwrap();
        assert!(!html.contains("evil.example"));
    }

    #[test]
    fn test_not_found_and_fallback() {
        let generator = generator();
        assert!(generator
            .render_not_found(false)
            .unwrap()
            .contains("Post não encontrado"));
        assert!(generator.render_fallback().unwrap().contains("Carregando..."));
    }

    #[test]
    fn test_write_page() {
        let dir = tempfile::tempdir().unwrap();

        write_page(dir.path(), "/post/hooks", "<html></html>").unwrap();
        write_page(dir.path(), "/post/hooks", "<html>v2</html>").unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("post/hooks/index.html")).unwrap(),
            "<html>v2</html>"
        );

        write_page(dir.path(), "/", "home").unwrap();
        assert!(dir.path().join("index.html").exists());
    }
}
