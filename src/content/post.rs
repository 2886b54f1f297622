//! Post models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A blog post as rendered on its detail page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Route identifier (the document uid)
    pub id: String,

    /// Source-internal document id, used for `after` cursors
    pub document_id: String,

    /// Set once by the content source on first publication
    pub first_publication_date: Option<DateTime<Utc>>,

    /// Updated by the content source on every edit
    pub last_publication_date: Option<DateTime<Utc>>,

    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub banner: Banner,

    /// Ordered content blocks
    pub content: Vec<ContentBlock>,
}

impl Post {
    /// Project this post to its listing summary
    pub fn summary(&self) -> PostSummary {
        PostSummary {
            id: Some(self.id.clone()),
            document_id: self.document_id.clone(),
            first_publication_date: self.first_publication_date,
            title: self.title.clone(),
            subtitle: self.subtitle.clone(),
            author: self.author.clone(),
        }
    }
}

/// Banner image of a post
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Banner {
    /// Image URL, empty when the document has no banner
    pub url: String,
    pub alt: Option<String>,
}

impl Banner {
    pub fn is_empty(&self) -> bool {
        self.url.is_empty()
    }
}

/// A section of a post: a heading followed by rich-text fragments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub heading: String,
    pub body: Vec<TextFragment>,
}

/// One rich-text element (paragraph, list item, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    pub kind: FragmentKind,
    pub text: String,
    /// Inline spans, offsets are character positions in `text`
    #[serde(default)]
    pub spans: Vec<Span>,
}

impl TextFragment {
    /// A plain paragraph without spans
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            kind: FragmentKind::Paragraph,
            text: text.into(),
            spans: Vec::new(),
        }
    }
}

/// Block-level kind of a [`TextFragment`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FragmentKind {
    Paragraph,
    Heading(u8),
    ListItem,
    OrderedListItem,
    Preformatted,
}

/// Inline formatting over a character range of a fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub kind: SpanKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpanKind {
    Strong,
    Em,
    Hyperlink { url: String },
    Label { name: String },
}

/// Listing-page projection of a post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    /// Route identifier, may be missing at listing time
    pub id: Option<String>,
    pub document_id: String,
    pub first_publication_date: Option<DateTime<Utc>>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
}

/// Chronological neighbours of a post
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Adjacent {
    /// Published immediately before
    pub prev: Option<PostSummary>,
    /// Published immediately after
    pub next: Option<PostSummary>,
}
