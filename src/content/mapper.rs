//! Document mapper: raw content documents into [`Post`] and [`PostSummary`]
//!
//! Defaulting rules, applied nowhere else:
//!
//! | field      | when absent                         |
//! |------------|-------------------------------------|
//! | `uid`      | `None` for summaries, error for posts |
//! | `subtitle` | empty string                        |
//! | `banner`   | empty URL, no alt                   |
//! | `title`    | error                               |
//! | `author`   | error                               |
//! | `content`  | error (posts only)                  |
//! | heading    | empty string                        |
//! | body       | no fragments                        |

use super::document::{Document, RawPostData, RawSpan, RawText, RichTextNode};
use super::post::{Banner, ContentBlock, FragmentKind, Post, PostSummary, Span, SpanKind, TextFragment};

/// Mapping failure; the document itself is at fault
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("document {document}: missing required field `{field}`")]
    MissingField {
        document: String,
        field: &'static str,
    },

    #[error("document {document}: malformed data: {source}")]
    Malformed {
        document: String,
        #[source]
        source: serde_json::Error,
    },
}

fn raw_data(doc: &Document) -> Result<RawPostData, MapError> {
    if doc.data.is_null() {
        return Ok(RawPostData::default());
    }
    serde_json::from_value(doc.data.clone()).map_err(|source| MapError::Malformed {
        document: doc.id.clone(),
        source,
    })
}

fn required(doc: &Document, value: Option<RawText>, field: &'static str) -> Result<String, MapError> {
    value.map(RawText::into_plain).ok_or_else(|| MapError::MissingField {
        document: doc.id.clone(),
        field,
    })
}

/// Map a document to a full post
pub fn map_post(doc: &Document) -> Result<Post, MapError> {
    let data = raw_data(doc)?;

    let id = doc.uid.clone().ok_or_else(|| MapError::MissingField {
        document: doc.id.clone(),
        field: "uid",
    })?;
    let title = required(doc, data.title, "title")?;
    let author = required(doc, data.author, "author")?;
    let content = data.content.ok_or_else(|| MapError::MissingField {
        document: doc.id.clone(),
        field: "content",
    })?;

    let banner = data
        .banner
        .map(|img| Banner {
            url: img.url.unwrap_or_default(),
            alt: img.alt,
        })
        .unwrap_or_default();

    let content = content
        .into_iter()
        .map(|block| ContentBlock {
            heading: block.heading.map(RawText::into_plain).unwrap_or_default(),
            body: block
                .body
                .unwrap_or_default()
                .into_iter()
                .map(map_fragment)
                .collect(),
        })
        .collect();

    Ok(Post {
        id,
        document_id: doc.id.clone(),
        first_publication_date: doc.first_publication_date,
        last_publication_date: doc.last_publication_date,
        title,
        subtitle: data.subtitle.map(RawText::into_plain).unwrap_or_default(),
        author,
        banner,
        content,
    })
}

/// Map a document to its listing summary
pub fn map_summary(doc: &Document) -> Result<PostSummary, MapError> {
    let data = raw_data(doc)?;

    Ok(PostSummary {
        id: doc.uid.clone(),
        document_id: doc.id.clone(),
        first_publication_date: doc.first_publication_date,
        title: required(doc, data.title, "title")?,
        subtitle: data.subtitle.map(RawText::into_plain).unwrap_or_default(),
        author: required(doc, data.author, "author")?,
    })
}

/// Map every document of a result page, failing on the first bad one
pub fn map_summaries(docs: &[Document]) -> Result<Vec<PostSummary>, MapError> {
    docs.iter().map(map_summary).collect()
}

fn map_fragment(node: RichTextNode) -> TextFragment {
    let kind = fragment_kind(&node.kind);
    let spans = node
        .spans
        .into_iter()
        .filter_map(|span| map_span(span, &node.text))
        .collect();

    TextFragment {
        kind,
        text: node.text,
        spans,
    }
}

fn fragment_kind(kind: &str) -> FragmentKind {
    match kind {
        "heading1" => FragmentKind::Heading(1),
        "heading2" => FragmentKind::Heading(2),
        "heading3" => FragmentKind::Heading(3),
        "heading4" => FragmentKind::Heading(4),
        "heading5" => FragmentKind::Heading(5),
        "heading6" => FragmentKind::Heading(6),
        "list-item" => FragmentKind::ListItem,
        "o-list-item" => FragmentKind::OrderedListItem,
        "preformatted" => FragmentKind::Preformatted,
        _ => FragmentKind::Paragraph,
    }
}

/// Character index of a UTF-16 code unit offset
///
/// `None` past the end of `text` or between the halves of a surrogate pair.
fn char_index(text: &str, utf16_offset: usize) -> Option<usize> {
    let mut units = 0;
    for (index, c) in text.chars().enumerate() {
        if units == utf16_offset {
            return Some(index);
        }
        if units > utf16_offset {
            return None;
        }
        units += c.len_utf16();
    }
    (units == utf16_offset).then(|| text.chars().count())
}

/// Spans outside the text or of unknown type are dropped
///
/// Source offsets count UTF-16 code units; mapped spans count characters.
fn map_span(span: RawSpan, text: &str) -> Option<Span> {
    let start = char_index(text, span.start)?;
    let end = char_index(text, span.end)?;
    if start >= end {
        return None;
    }

    let kind = match span.kind.as_str() {
        "strong" => SpanKind::Strong,
        "em" => SpanKind::Em,
        "hyperlink" => {
            let url = span
                .data
                .as_ref()
                .and_then(|d| d.get("url"))
                .and_then(|u| u.as_str())?;
            SpanKind::Hyperlink {
                url: url.to_string(),
            }
        }
        "label" => {
            let name = span
                .data
                .as_ref()
                .and_then(|d| d.get("label"))
                .and_then(|l| l.as_str())?;
            SpanKind::Label {
                name: name.to_string(),
            }
        }
        other => {
            tracing::debug!("Dropping unsupported span type: {}", other);
            return None;
        }
    };

    Some(Span { start, end, kind })
}
