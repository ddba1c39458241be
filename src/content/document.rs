//! Raw documents as delivered by the content store

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::rich_text::RichTextBlock;

/// A document returned by the content store
///
/// Only the envelope is typed here; the CMS-defined `data` map is parsed into
/// [`RawPostData`] by the normalizer so that one malformed document cannot
/// poison a whole listing response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    /// Store-assigned document id
    pub id: String,

    /// Human-readable unique id (the post slug)
    #[serde(default)]
    pub uid: Option<String>,

    /// Custom type of the document
    #[serde(rename = "type")]
    pub doc_type: String,

    #[serde(default)]
    pub first_publication_date: Option<String>,

    #[serde(default)]
    pub last_publication_date: Option<String>,

    /// CMS-defined fields
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl RawDocument {
    /// Parse the `data` map into the post schema
    pub fn post_data(&self) -> Result<RawPostData, serde_json::Error> {
        serde_json::from_value(Value::Object(self.data.clone()))
    }
}

/// Typed view of a post document's `data` map
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawPostData {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub author: Option<String>,
    pub banner: Option<RawImage>,
    pub content: Option<Vec<RawContentGroup>>,
}

/// Image field; the store sends `{}` for an empty image
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawImage {
    pub url: Option<String>,
    pub alt: Option<String>,
}

/// One repeatable content group (heading + rich text body)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawContentGroup {
    pub heading: Option<String>,
    pub body: Option<Vec<RichTextBlock>>,
}

/// A search response page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiResponse {
    pub page: usize,
    pub results_per_page: usize,
    pub results_size: usize,
    pub total_results_size: usize,
    pub total_pages: usize,
    pub next_page: Option<String>,
    pub prev_page: Option<String>,
    pub results: Vec<RawDocument>,
}

/// Repository metadata returned by the API root
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiInfo {
    pub refs: Vec<ApiRef>,
}

impl ApiInfo {
    /// The ref pointing at published content
    pub fn master_ref(&self) -> Option<&str> {
        self.refs
            .iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference.as_str())
    }
}

/// A content version identifier
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiRef {
    pub id: String,
    #[serde(rename = "ref")]
    pub reference: String,
    pub label: String,
    #[serde(rename = "isMasterRef")]
    pub is_master_ref: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_search_response() {
        let body = json!({
            "page": 1,
            "results_per_page": 1,
            "results_size": 1,
            "total_results_size": 2,
            "total_pages": 2,
            "next_page": "https://blog.cdn.prismic.io/api/v2/documents/search?page=2",
            "prev_page": null,
            "results": [{
                "id": "YEn1",
                "uid": "como-utilizar-hooks",
                "type": "post",
                "href": "ignored",
                "first_publication_date": "2021-03-15T19:25:28+0000",
                "last_publication_date": "2021-03-15T19:25:28+0000",
                "data": {
                    "title": "Como utilizar Hooks",
                    "banner": {}
                }
            }]
        });

        let response: ApiResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.total_pages, 2);
        assert!(response.next_page.is_some());
        let doc = &response.results[0];
        assert_eq!(doc.uid.as_deref(), Some("como-utilizar-hooks"));
        assert_eq!(doc.doc_type, "post");

        let data = doc.post_data().unwrap();
        assert_eq!(data.title.as_deref(), Some("Como utilizar Hooks"));
        assert_eq!(data.banner, Some(RawImage::default()));
        assert!(data.content.is_none());
    }

    #[test]
    fn test_wrong_shape_is_rejected() {
        let doc: RawDocument = serde_json::from_value(json!({
            "id": "x",
            "type": "post",
            "data": { "title": [{"type": "heading1", "text": "not key text"}] }
        }))
        .unwrap();
        assert!(doc.post_data().is_err());
    }

    #[test]
    fn test_master_ref() {
        let info: ApiInfo = serde_json::from_value(json!({
            "refs": [
                {"id": "release", "ref": "R1", "label": "Release", "isMasterRef": false},
                {"id": "master", "ref": "M1", "label": "Master", "isMasterRef": true}
            ]
        }))
        .unwrap();
        assert_eq!(info.master_ref(), Some("M1"));
    }
}
