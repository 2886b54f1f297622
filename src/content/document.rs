//! Raw content API payloads
//!
//! These mirror the JSON returned by the content API. Document `data` is
//! kept as a loose JSON value; the mapper owns turning it into a [`Post`].
//!
//! [`Post`]: super::Post

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One page of query results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiResponse {
    pub page: u32,
    pub results_per_page: u32,
    pub results_size: u32,
    pub total_results_size: u32,
    pub total_pages: u32,
    /// Complete, directly fetchable URL of the next page
    pub next_page: Option<String>,
    pub prev_page: Option<String>,
    pub results: Vec<Document>,
}

/// A document as stored by the content source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: String,
    #[serde(default, with = "publication_date")]
    pub first_publication_date: Option<DateTime<Utc>>,
    #[serde(default, with = "publication_date")]
    pub last_publication_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Response of the API root, listing the available refs
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiRoot {
    pub refs: Vec<ApiRef>,
}

impl ApiRoot {
    /// The ref of the currently published content
    pub fn master_ref(&self) -> Option<&str> {
        self.refs
            .iter()
            .find(|r| r.is_master)
            .map(|r| r.reference.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiRef {
    pub id: String,
    #[serde(rename = "ref")]
    pub reference: String,
    pub label: String,
    #[serde(rename = "isMasterRef")]
    pub is_master: bool,
}

/// Post fields of `Document::data`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawPostData {
    pub title: Option<RawText>,
    pub subtitle: Option<RawText>,
    pub author: Option<RawText>,
    pub banner: Option<RawImage>,
    pub content: Option<Vec<RawContentBlock>>,
}

/// Text field stored either as a key-text string or as a rich-text array
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawText {
    Plain(String),
    Rich(Vec<RichTextNode>),
}

impl RawText {
    /// Plain text value; rich-text elements are joined with a space
    pub fn into_plain(self) -> String {
        match self {
            Self::Plain(s) => s,
            Self::Rich(nodes) => nodes
                .into_iter()
                .map(|n| n.text)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// Image field; an unset image is serialized as `{}`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawImage {
    pub url: Option<String>,
    pub alt: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawContentBlock {
    pub heading: Option<RawText>,
    pub body: Option<Vec<RichTextNode>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RichTextNode {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    pub spans: Vec<RawSpan>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawSpan {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Option<serde_json::Value>,
}

/// Publication timestamps come as `2021-03-25T19:25:28+0000`, which is not
/// RFC 3339 (no colon in the offset).
pub(crate) mod publication_date {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

    pub fn parse(value: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_str(value, FORMAT)
            .or_else(|_| DateTime::parse_from_rfc3339(value))
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => serializer.serialize_str(&d.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value: Option<String> = Option::deserialize(deserializer)?;
        match value {
            None => Ok(None),
            Some(s) => parse(&s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {s}"))),
        }
    }
}
