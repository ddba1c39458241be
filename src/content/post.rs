//! Display-ready post models

use serde::{Deserialize, Serialize};

use super::rich_text::RichTextBlock;

/// A blog post, derived from exactly one raw document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Slug, unique within the repository
    pub uid: String,

    /// First publication timestamp (opaque ISO-8601)
    pub first_publication_date: Option<String>,

    /// Last publication timestamp (opaque ISO-8601)
    pub last_publication_date: Option<String>,

    pub data: PostData,
}

impl Post {
    /// Whether the post was republished after its first publication
    pub fn was_edited(&self) -> bool {
        match (&self.first_publication_date, &self.last_publication_date) {
            (Some(first), Some(last)) => first != last,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostData {
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub banner: Banner,
    pub content: Vec<ContentSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Banner {
    pub url: String,
}

/// A heading followed by its body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSection {
    pub heading: String,
    pub body: SectionBody,
}

/// Section body, kept structured for HTML rendering or flattened to text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SectionBody {
    Blocks(Vec<RichTextBlock>),
    Text(String),
}

impl SectionBody {
    /// Text of every body span, in order
    pub fn texts(&self) -> Vec<&str> {
        match self {
            SectionBody::Blocks(blocks) => blocks.iter().map(|b| b.text.as_str()).collect(),
            SectionBody::Text(text) => vec![text.as_str()],
        }
    }
}

/// One page of posts; `next_page == None` means the listing is exhausted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub results: Vec<Post>,
    pub next_page: Option<String>,
}

/// Link to a neighbouring post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavPost {
    pub uid: String,
    pub title: String,
}

/// The posts published right before and right after a given one
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Adjacent {
    /// Older post
    pub previous: Option<NavPost>,
    /// Newer post
    pub next: Option<NavPost>,
}
