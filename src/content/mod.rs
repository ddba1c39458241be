//! Content module - raw documents, normalization, rich text and reading time

mod document;
mod normalize;
mod post;
pub mod reading_time;
pub mod rich_text;

pub use document::{ApiInfo, ApiRef, ApiResponse, RawContentGroup, RawDocument, RawImage, RawPostData};
pub use normalize::{BodyMode, FieldPolicy, PostNormalizer};
pub use post::{Adjacent, Banner, ContentSection, NavPost, Page, Post, PostData, SectionBody};
pub use rich_text::RichTextBlock;
