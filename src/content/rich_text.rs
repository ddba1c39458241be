//! Prismic structured text and its HTML / plain-text serializers

use serde::{Deserialize, Serialize};

use crate::helpers::{html_escape, link_resolver};

/// One block of structured text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichTextBlock {
    #[serde(rename = "type")]
    pub kind: BlockKind,

    #[serde(default)]
    pub text: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spans: Vec<Span>,

    /// Image source (image blocks only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Image alt text (image blocks only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,

    /// oEmbed payload (embed blocks only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oembed: Option<Embed>,
}

impl RichTextBlock {
    /// Plain paragraph block
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::Paragraph,
            text: text.into(),
            spans: Vec::new(),
            url: None,
            alt: None,
            oembed: None,
        }
    }

    /// Attach an inline span
    pub fn with_span(mut self, span: Span) -> Self {
        self.spans.push(span);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockKind {
    Heading1,
    Heading2,
    Heading3,
    Heading4,
    Heading5,
    Heading6,
    Paragraph,
    Preformatted,
    ListItem,
    OListItem,
    Image,
    Embed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Embed {
    pub html: Option<String>,
}

/// Inline formatting over `[start, end)`, measured in UTF-16 code units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: SpanKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<SpanData>,
}

impl Span {
    pub fn new(kind: SpanKind, start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            kind,
            data: None,
        }
    }

    pub fn link(start: usize, end: usize, url: &str) -> Self {
        Self {
            start,
            end,
            kind: SpanKind::Hyperlink,
            data: Some(SpanData {
                url: Some(url.to_string()),
                ..SpanData::default()
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    Strong,
    Em,
    Hyperlink,
    Label,
    #[serde(other)]
    Unknown,
}

/// Span payload: web links carry `url`, document links `type` + `uid`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

/// Serialize blocks to HTML, grouping consecutive list items
pub fn as_html(blocks: &[RichTextBlock]) -> String {
    let mut html = String::new();
    let mut open_list: Option<&'static str> = None;

    for block in blocks {
        let list_tag = match block.kind {
            BlockKind::ListItem => Some("ul"),
            BlockKind::OListItem => Some("ol"),
            _ => None,
        };

        if open_list != list_tag {
            if let Some(tag) = open_list {
                html.push_str(&format!("</{}>", tag));
            }
            if let Some(tag) = list_tag {
                html.push_str(&format!("<{}>", tag));
            }
            open_list = list_tag;
        }

        html.push_str(&block_html(block));
    }

    if let Some(tag) = open_list {
        html.push_str(&format!("</{}>", tag));
    }

    html
}

/// Serialize blocks to plain text, one space between blocks
pub fn as_text(blocks: &[RichTextBlock]) -> String {
    blocks
        .iter()
        .map(|b| b.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn block_html(block: &RichTextBlock) -> String {
    let heading = |level: u8| {
        format!(
            "<h{level}>{}</h{level}>",
            inline_html(&block.text, &block.spans)
        )
    };

    match block.kind {
        BlockKind::Heading1 => heading(1),
        BlockKind::Heading2 => heading(2),
        BlockKind::Heading3 => heading(3),
        BlockKind::Heading4 => heading(4),
        BlockKind::Heading5 => heading(5),
        BlockKind::Heading6 => heading(6),
        BlockKind::Paragraph => format!("<p>{}</p>", inline_html(&block.text, &block.spans)),
        BlockKind::Preformatted => format!("<pre>{}</pre>", html_escape(&block.text)),
        BlockKind::ListItem | BlockKind::OListItem => {
            format!("<li>{}</li>", inline_html(&block.text, &block.spans))
        }
        BlockKind::Image => match &block.url {
            Some(url) => format!(
                r#"<p class="block-img"><img src="{}" alt="{}" /></p>"#,
                html_escape(url),
                html_escape(block.alt.as_deref().unwrap_or(""))
            ),
            None => String::new(),
        },
        BlockKind::Embed => block
            .oembed
            .as_ref()
            .and_then(|e| e.html.as_deref())
            .map(|h| format!(r#"<div class="block-embed">{}</div>"#, h))
            .unwrap_or_default(),
        BlockKind::Unknown => String::new(),
    }
}

/// Render text with its spans applied
///
/// The text is cut at every span boundary; each segment is wrapped in the
/// tags of all spans covering it, outermost (earliest, longest) first.
fn inline_html(text: &str, spans: &[Span]) -> String {
    let total: usize = text.chars().map(char::len_utf16).sum();

    let mut cuts: Vec<usize> = vec![0, total];
    for span in spans {
        cuts.push(span.start.min(total));
        cuts.push(span.end.min(total));
    }
    cuts.sort_unstable();
    cuts.dedup();

    let mut out = String::with_capacity(text.len());
    for window in cuts.windows(2) {
        let (from, to) = (window[0], window[1]);
        let segment = &text[byte_index(text, from)..byte_index(text, to)];
        if segment.is_empty() {
            continue;
        }

        let mut covering: Vec<&Span> = spans
            .iter()
            .filter(|s| s.start < s.end && s.start <= from && s.end >= to)
            .collect();
        covering.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

        let opened: Vec<(&str, String)> = covering.iter().filter_map(|s| open_tag(s)).collect();
        for (_, open) in &opened {
            out.push_str(open);
        }
        out.push_str(&html_escape(segment).replace('\n', "<br />"));
        for (close, _) in opened.iter().rev() {
            out.push_str(&format!("</{}>", close));
        }
    }

    out
}

/// Returns (closing tag name, opening tag) for a span
fn open_tag(span: &Span) -> Option<(&'static str, String)> {
    let data = span.data.as_ref();
    match span.kind {
        SpanKind::Strong => Some(("strong", "<strong>".to_string())),
        SpanKind::Em => Some(("em", "<em>".to_string())),
        SpanKind::Hyperlink => {
            let data = data?;
            let href = match (&data.url, &data.doc_type, &data.uid) {
                (Some(url), _, _) => url.clone(),
                (None, Some(doc_type), uid) => link_resolver(doc_type, uid.as_deref()),
                _ => return None,
            };
            let target = data
                .target
                .as_ref()
                .map(|t| format!(r#" target="{}" rel="noopener noreferrer""#, html_escape(t)))
                .unwrap_or_default();
            Some(("a", format!(r#"<a href="{}"{}>"#, html_escape(&href), target)))
        }
        SpanKind::Label => {
            let label = data?.label.as_ref()?;
            Some(("span", format!(r#"<span class="{}">"#, html_escape(label))))
        }
        SpanKind::Unknown => None,
    }
}

/// Byte index of a UTF-16 offset, snapped forward to a char boundary
fn byte_index(text: &str, utf16_offset: usize) -> usize {
    let mut units = 0;
    for (idx, ch) in text.char_indices() {
        if units >= utf16_offset {
            return idx;
        }
        units += ch.len_utf16();
    }
    text.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn block(kind: BlockKind, text: &str) -> RichTextBlock {
        RichTextBlock {
            kind,
            ..RichTextBlock::paragraph(text)
        }
    }

    #[test]
    fn test_paragraph_with_spans() {
        let blocks = vec![RichTextBlock::paragraph("Hello bold world")
            .with_span(Span::new(SpanKind::Strong, 6, 10))];
        assert_eq!(as_html(&blocks), "<p>Hello <strong>bold</strong> world</p>");
    }

    #[test]
    fn test_nested_spans() {
        let blocks = vec![RichTextBlock::paragraph("abcdef")
            .with_span(Span::new(SpanKind::Em, 2, 4))
            .with_span(Span::new(SpanKind::Strong, 0, 6))];
        assert_eq!(
            as_html(&blocks),
            "<p><strong>ab</strong><strong><em>cd</em></strong><strong>ef</strong></p>"
        );
    }

    #[test]
    fn test_hyperlink_and_escaping() {
        let blocks = vec![RichTextBlock::paragraph("see <docs> & more")
            .with_span(Span::link(4, 10, "https://example.com/?a=1&b=2"))];
        assert_eq!(
            as_html(&blocks),
            r#"<p>see <a href="https://example.com/?a=1&amp;b=2">&lt;docs&gt;</a> &amp; more</p>"#
        );
    }

    #[test]
    fn test_document_link_uses_link_resolver() {
        let mut span = Span::new(SpanKind::Hyperlink, 0, 4);
        span.data = Some(SpanData {
            doc_type: Some("post".to_string()),
            uid: Some("hooks".to_string()),
            ..SpanData::default()
        });
        let blocks = vec![RichTextBlock::paragraph("next").with_span(span)];
        assert_eq!(as_html(&blocks), r#"<p><a href="/post/hooks">next</a></p>"#);
    }

    #[test]
    fn test_list_grouping() {
        let blocks = vec![
            block(BlockKind::Heading2, "Steps"),
            block(BlockKind::OListItem, "one"),
            block(BlockKind::OListItem, "two"),
            block(BlockKind::ListItem, "bullet"),
            block(BlockKind::Paragraph, "end"),
        ];
        assert_eq!(
            as_html(&blocks),
            "<h2>Steps</h2><ol><li>one</li><li>two</li></ol><ul><li>bullet</li></ul><p>end</p>"
        );
    }

    #[test]
    fn test_utf16_offsets() {
        // The emoji is two UTF-16 units
        let blocks = vec![RichTextBlock::paragraph("🚀 go now")
            .with_span(Span::new(SpanKind::Em, 3, 5))];
        assert_eq!(as_html(&blocks), "<p>🚀 <em>go</em> now</p>");
    }

    #[test]
    fn test_line_breaks() {
        let blocks = vec![RichTextBlock::paragraph("a\nb")];
        assert_eq!(as_html(&blocks), "<p>a<br />b</p>");
    }

    #[test]
    fn test_as_text() {
        let blocks = vec![
            RichTextBlock::paragraph("First paragraph."),
            RichTextBlock::paragraph(""),
            block(BlockKind::ListItem, "item"),
        ];
        assert_eq!(as_text(&blocks), "First paragraph. item");
        assert_eq!(as_text(&[]), "");
    }

    #[test]
    fn test_deserialize_prismic_blocks() {
        let blocks: Vec<RichTextBlock> = serde_json::from_value(json!([
            {"type": "paragraph", "text": "Hi", "spans": [{"start": 0, "end": 2, "type": "strong"}]},
            {"type": "o-list-item", "text": "x", "spans": []},
            {"type": "image", "url": "https://images.prismic.io/a.png", "alt": null},
            {"type": "mystery", "text": "?"}
        ]))
        .unwrap();

        assert_eq!(blocks[0].spans[0].kind, SpanKind::Strong);
        assert_eq!(blocks[1].kind, BlockKind::OListItem);
        assert_eq!(blocks[2].kind, BlockKind::Image);
        assert_eq!(blocks[3].kind, BlockKind::Unknown);
        assert_eq!(
            as_html(&blocks[2..]),
            r#"<p class="block-img"><img src="https://images.prismic.io/a.png" alt="" /></p>"#
        );
    }
}
