//! Raw document to [`Post`] normalization

use super::document::{RawContentGroup, RawDocument, RawPostData};
use super::post::{Banner, ContentSection, Post, PostData, SectionBody};
use super::rich_text::as_text;
use crate::error::{Error, Result};

/// How section bodies are represented in the normalized post
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyMode {
    /// Keep rich-text blocks for HTML rendering
    Structured,
    /// Flatten each body to plain text
    PlainText,
}

/// Which fields a consuming page insists on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPolicy {
    /// Listings: absent fields become empty values
    Lenient,
    /// Detail pages: title, banner and content must be present
    Strict,
}

/// Pure transform from [`RawDocument`] to [`Post`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostNormalizer {
    body_mode: BodyMode,
    policy: FieldPolicy,
}

impl PostNormalizer {
    pub fn new(body_mode: BodyMode, policy: FieldPolicy) -> Self {
        Self { body_mode, policy }
    }

    /// Normalizer used by listing pages and "load more"
    pub fn listing() -> Self {
        Self::new(BodyMode::PlainText, FieldPolicy::Lenient)
    }

    /// Normalizer used by post detail pages
    pub fn detail() -> Self {
        Self::new(BodyMode::Structured, FieldPolicy::Strict)
    }

    /// Normalize one document
    pub fn normalize(&self, raw: &RawDocument) -> Result<Post> {
        let uid = raw
            .uid
            .clone()
            .filter(|uid| !uid.is_empty())
            .ok_or_else(|| Error::MissingField("uid".to_string()))?;

        let data: RawPostData = raw
            .post_data()
            .map_err(|e| Error::MissingField(format!("data ({})", e)))?;

        let title = self.field(data.title, "title")?;
        let banner_url = self.field(data.banner.and_then(|b| b.url), "banner.url")?;
        let content = self.field(data.content, "content")?;

        Ok(Post {
            uid,
            first_publication_date: raw.first_publication_date.clone(),
            last_publication_date: raw.last_publication_date.clone(),
            data: PostData {
                title,
                subtitle: data.subtitle.unwrap_or_default(),
                author: data.author.unwrap_or_default(),
                banner: Banner { url: banner_url },
                content: content
                    .into_iter()
                    .map(|group| self.section(group))
                    .collect(),
            },
        })
    }

    /// Required under the strict policy, defaulted under the lenient one
    fn field<T: Default>(&self, value: Option<T>, name: &str) -> Result<T> {
        match (value, self.policy) {
            (Some(value), _) => Ok(value),
            (None, FieldPolicy::Lenient) => Ok(T::default()),
            (None, FieldPolicy::Strict) => Err(Error::MissingField(name.to_string())),
        }
    }

    fn section(&self, group: RawContentGroup) -> ContentSection {
        let blocks = group.body.unwrap_or_default();
        let body = match self.body_mode {
            BodyMode::Structured => SectionBody::Blocks(blocks),
            BodyMode::PlainText => SectionBody::Text(as_text(&blocks)),
        };

        ContentSection {
            heading: group.heading.unwrap_or_default(),
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(data: serde_json::Value) -> RawDocument {
        serde_json::from_value(json!({
            "id": "YEn1",
            "uid": "como-utilizar-hooks",
            "type": "post",
            "first_publication_date": "2021-03-15T19:25:28+0000",
            "last_publication_date": "2021-03-19T18:49:00+0000",
            "data": data
        }))
        .unwrap()
    }

    fn full_data() -> serde_json::Value {
        json!({
            "title": "Como utilizar Hooks",
            "subtitle": "Pensando em sincronização em vez de ciclos de vida",
            "author": "Joseph Oliveira",
            "banner": { "url": "https://images.prismic.io/banner.png", "alt": null },
            "content": [{
                "heading": "Proin et varius",
                "body": [
                    { "type": "paragraph", "text": "Lorem ipsum dolor", "spans": [] },
                    { "type": "paragraph", "text": "sit amet", "spans": [] }
                ]
            }]
        })
    }

    #[test]
    fn test_detail_normalization() {
        let post = PostNormalizer::detail().normalize(&raw(full_data())).unwrap();

        assert_eq!(post.uid, "como-utilizar-hooks");
        assert_eq!(post.first_publication_date.as_deref(), Some("2021-03-15T19:25:28+0000"));
        assert_eq!(post.last_publication_date.as_deref(), Some("2021-03-19T18:49:00+0000"));
        assert_eq!(post.data.title, "Como utilizar Hooks");
        assert_eq!(post.data.banner.url, "https://images.prismic.io/banner.png");
        assert_eq!(post.data.content.len(), 1);
        match &post.data.content[0].body {
            SectionBody::Blocks(blocks) => assert_eq!(blocks.len(), 2),
            other => panic!("expected blocks, got {:?}", other),
        }
    }

    #[test]
    fn test_plain_text_mode_flattens_body() {
        let normalizer = PostNormalizer::new(BodyMode::PlainText, FieldPolicy::Strict);
        let post = normalizer.normalize(&raw(full_data())).unwrap();
        assert_eq!(
            post.data.content[0].body,
            SectionBody::Text("Lorem ipsum dolor sit amet".to_string())
        );
    }

    #[test]
    fn test_detail_requires_banner() {
        let mut data = full_data();
        data["banner"] = json!({});
        let err = PostNormalizer::detail().normalize(&raw(data)).unwrap_err();
        assert_eq!(err, Error::MissingField("banner.url".to_string()));

        let mut data = full_data();
        data.as_object_mut().unwrap().remove("banner");
        let err = PostNormalizer::detail().normalize(&raw(data)).unwrap_err();
        assert_eq!(err, Error::MissingField("banner.url".to_string()));
    }

    #[test]
    fn test_listing_tolerates_missing_fields() {
        let post = PostNormalizer::listing()
            .normalize(&raw(json!({ "title": "Only a title" })))
            .unwrap();

        assert_eq!(post.data.title, "Only a title");
        assert_eq!(post.data.subtitle, "");
        assert_eq!(post.data.author, "");
        assert_eq!(post.data.banner.url, "");
        assert!(post.data.content.is_empty());
    }

    #[test]
    fn test_missing_uid_fails_in_every_mode() {
        let mut doc = raw(full_data());
        doc.uid = None;
        for normalizer in [PostNormalizer::listing(), PostNormalizer::detail()] {
            assert_eq!(
                normalizer.normalize(&doc).unwrap_err(),
                Error::MissingField("uid".to_string())
            );
        }
    }

    #[test]
    fn test_malformed_data_is_missing_field() {
        let err = PostNormalizer::listing()
            .normalize(&raw(json!({ "author": 42 })))
            .unwrap_err();
        assert!(matches!(err, Error::MissingField(field) if field.starts_with("data")));
    }

    #[test]
    fn test_null_fields_are_absent() {
        let post = PostNormalizer::listing()
            .normalize(&raw(json!({ "title": "T", "subtitle": null, "content": [{ "heading": null }] })))
            .unwrap();
        assert_eq!(post.data.subtitle, "");
        assert_eq!(post.data.content[0].heading, "");
        assert_eq!(post.data.content[0].body, SectionBody::Text(String::new()));
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let doc = raw(full_data());
        let normalizer = PostNormalizer::detail();
        assert_eq!(normalizer.normalize(&doc), normalizer.normalize(&doc));
    }
}
