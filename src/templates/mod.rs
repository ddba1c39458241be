//! Built-in spacetraveling templates using the Tera template engine
//!
//! Templates are embedded in the binary. Store content is untrusted, so the
//! default HTML autoescaping stays on and only HTML produced by the rich
//! text renderer is marked `safe`.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::config::SiteConfig;
use crate::helpers::{date_xml, format_publication_date, js_string_escape};

/// Template renderer with the embedded spacetraveling theme
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a renderer whose date filter follows the site's locale settings
    pub fn new(config: &SiteConfig) -> Result<Self> {
        let mut tera = Tera::default();

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("spacetraveling/layout.html")),
            ("home.html", include_str!("spacetraveling/home.html")),
            ("post.html", include_str!("spacetraveling/post.html")),
            ("not_found.html", include_str!("spacetraveling/not_found.html")),
            ("fallback.html", include_str!("spacetraveling/fallback.html")),
            (
                "preview_redirect.html",
                include_str!("spacetraveling/preview_redirect.html"),
            ),
            // Partials
            (
                "partials/header.html",
                include_str!("spacetraveling/partials/header.html"),
            ),
            (
                "partials/post_info.html",
                include_str!("spacetraveling/partials/post_info.html"),
            ),
            (
                "partials/comments.html",
                include_str!("spacetraveling/partials/comments.html"),
            ),
        ])?;

        tera.register_filter(
            "pub_date",
            PublicationDateFilter {
                format: config.date_format.clone(),
                language: config.language.clone(),
                timezone: config.timezone.clone(),
            },
        );
        tera.register_filter("date_xml", date_xml_filter);
        tera.register_filter("js_string", js_string_filter);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Tera filter: format a store timestamp for display
///
/// Accepts an optional `format` argument overriding the site's `date_format`.
/// Missing dates render empty; unparseable ones render verbatim.
struct PublicationDateFilter {
    format: String,
    language: String,
    timezone: String,
}

impl tera::Filter for PublicationDateFilter {
    fn filter(
        &self,
        value: &tera::Value,
        args: &HashMap<String, tera::Value>,
    ) -> tera::Result<tera::Value> {
        if value.is_null() {
            return Ok(tera::Value::String(String::new()));
        }
        let s = tera::try_get_value!("pub_date", "value", String, value);
        let format = match args.get("format") {
            Some(val) => tera::try_get_value!("pub_date", "format", String, val),
            None => self.format.clone(),
        };

        let formatted = format_publication_date(&s, &format, &self.language, &self.timezone)
            .unwrap_or(s);
        Ok(tera::Value::String(formatted))
    }
}

/// Tera filter: machine-readable timestamp for `<time datetime>`
fn date_xml_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    if value.is_null() {
        return Ok(tera::Value::String(String::new()));
    }
    let s = tera::try_get_value!("date_xml", "value", String, value);
    Ok(tera::Value::String(date_xml(&s).unwrap_or(s)))
}

/// Tera filter: escape for a single-quoted JavaScript string
fn js_string_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("js_string", "value", String, value);
    Ok(tera::Value::String(js_string_escape(&s)))
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub description: String,
    pub language: String,
    pub root: String,
    pub logo: String,
}

/// One entry of the home page listing (also the load-more JSON shape)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostSummaryView {
    pub uid: String,
    pub path: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub first_publication_date: Option<String>,
    /// Display date, already formatted for the site locale
    pub date: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub uid: String,
    pub path: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub banner_url: String,
    pub first_publication_date: Option<String>,
    pub last_publication_date: Option<String>,
    pub edited: bool,
    pub reading_time: u32,
    pub sections: Vec<SectionView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionView {
    pub heading: String,
    /// Rendered rich text
    pub html: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NavView {
    pub title: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentsView {
    pub repo: String,
    pub issue_term: String,
    pub theme: String,
}
