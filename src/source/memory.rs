//! In-memory content source
//!
//! Answers queries from a fixed set of documents with the same paging,
//! ordering and cursor behaviour as the remote API. Used for offline
//! fixtures and tests.

use async_trait::async_trait;
use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use anyhow::Context;
use serde::Deserialize;
use url::Url;

use super::query::{belongs_to, Field, Ordering, Predicate, Query};
use super::ContentSource;
use crate::content::{ApiResponse, Document};
use crate::error::BlogError;

const BASE_URL: &str = "http://fixtures.local/api/v2";

/// Documents held in memory
pub struct MemorySource {
    base: Url,
    published: Vec<Document>,
    /// Documents visible only under a preview ref, overriding published ones by id
    revisions: HashMap<String, Vec<Document>>,
    requests: AtomicUsize,
}

/// Fixture file layout: a bare array or a search response
#[derive(Deserialize)]
#[serde(untagged)]
enum FixtureFile {
    Documents(Vec<Document>),
    Response(ApiResponse),
}

impl MemorySource {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            base: Url::parse(BASE_URL).expect("static base URL is valid"),
            published: documents,
            revisions: HashMap::new(),
            requests: AtomicUsize::new(0),
        }
    }

    /// Load documents from a JSON fixture file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixtures {:?}", path))?;
        let documents = match serde_json::from_str::<FixtureFile>(&content)
            .with_context(|| format!("Failed to parse fixtures {:?}", path))?
        {
            FixtureFile::Documents(docs) => docs,
            FixtureFile::Response(resp) => resp.results,
        };
        tracing::info!("Loaded {} fixture documents from {:?}", documents.len(), path);
        Ok(Self::new(documents))
    }

    /// Register draft documents visible under `reference`
    pub fn with_revision(mut self, reference: &str, documents: Vec<Document>) -> Self {
        self.revisions.insert(reference.to_string(), documents);
        self
    }

    /// Number of queries and page fetches answered so far
    pub fn request_count(&self) -> usize {
        self.requests.load(AtomicOrdering::SeqCst)
    }

    fn visible(&self, reference: Option<&str>) -> Result<Vec<&Document>, BlogError> {
        let drafts = match reference {
            None => None,
            Some(r) => Some(self.revisions.get(r).ok_or_else(|| BlogError::Api {
                status: 404,
                message: format!("unknown ref {r}"),
            })?),
        };

        let mut docs: Vec<&Document> = self
            .published
            .iter()
            .filter(|d| {
                drafts
                    .map(|drafts| !drafts.iter().any(|draft| draft.id == d.id))
                    .unwrap_or(true)
            })
            .collect();
        if let Some(drafts) = drafts {
            docs.extend(drafts.iter());
        }
        Ok(docs)
    }

    fn run(&self, query: &Query) -> Result<ApiResponse, BlogError> {
        self.requests.fetch_add(1, AtomicOrdering::SeqCst);

        let mut matched: Vec<&Document> = self
            .visible(query.reference.as_deref())?
            .into_iter()
            .filter(|d| query.predicates.iter().all(|p| matches(d, p)))
            .filter(|d| match &query.lang {
                Some(lang) if lang != "*" => d.lang.as_deref() == Some(lang.as_str()),
                _ => true,
            })
            .collect();

        if let Some(ordering) = &query.ordering {
            matched.sort_by(|a, b| compare(a, b, ordering));
        }

        if let Some(after) = &query.after {
            matched = match matched.iter().position(|d| &d.id == after) {
                Some(pos) => matched.split_off(pos + 1),
                None => Vec::new(),
            };
        }

        let page_size = query.page_size.max(1) as usize;
        let total = matched.len();
        let total_pages = total.div_ceil(page_size);
        let page = query.page.max(1) as usize;
        let results: Vec<Document> = matched
            .into_iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .cloned()
            .collect();

        let cursor = |n: usize| query.clone().page(n as u32).to_url(&self.base).to_string();

        Ok(ApiResponse {
            page: page as u32,
            results_per_page: page_size as u32,
            results_size: results.len() as u32,
            total_results_size: total as u32,
            total_pages: total_pages as u32,
            next_page: (page < total_pages).then(|| cursor(page + 1)),
            prev_page: (page > 1).then(|| cursor(page - 1)),
            results,
        })
    }
}

#[async_trait]
impl ContentSource for MemorySource {
    async fn query(&self, query: &Query) -> Result<ApiResponse, BlogError> {
        self.run(query)
    }

    async fn fetch_page(&self, cursor: &str) -> Result<ApiResponse, BlogError> {
        let url = Url::parse(cursor).map_err(|_| BlogError::InvalidCursor(cursor.to_string()))?;
        if !belongs_to(&url, &self.base) {
            return Err(BlogError::InvalidCursor(cursor.to_string()));
        }
        self.run(&Query::from_url(&url)?)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

fn matches(doc: &Document, predicate: &Predicate) -> bool {
    match &predicate.field {
        Field::DocumentType => doc.doc_type == predicate.value,
        Field::DocumentId => doc.id == predicate.value,
        Field::Uid(doc_type) => {
            &doc.doc_type == doc_type && doc.uid.as_deref() == Some(predicate.value.as_str())
        }
        Field::FirstPublicationDate => doc
            .first_publication_date
            .map(|d| d.to_rfc3339() == predicate.value)
            .unwrap_or(false),
        Field::LastPublicationDate => doc
            .last_publication_date
            .map(|d| d.to_rfc3339() == predicate.value)
            .unwrap_or(false),
    }
}

/// Documents without the date sort first; ties break on id
fn compare(a: &Document, b: &Document, ordering: &Ordering) -> CmpOrdering {
    let primary = match &ordering.field {
        Field::FirstPublicationDate => a.first_publication_date.cmp(&b.first_publication_date),
        Field::LastPublicationDate => a.last_publication_date.cmp(&b.last_publication_date),
        Field::DocumentId => a.id.cmp(&b.id),
        Field::DocumentType => a.doc_type.cmp(&b.doc_type),
        Field::Uid(_) => a.uid.cmp(&b.uid),
    };
    let ord = primary.then_with(|| a.id.cmp(&b.id));
    if ordering.descending {
        ord.reverse()
    } else {
        ord
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    /// `count` posts published one day apart, `post-1` first
    pub(crate) fn timeline(count: usize) -> Vec<Document> {
        (1..=count)
            .map(|i| {
                serde_json::from_value(json!({
                    "id": format!("doc-{i}"),
                    "uid": format!("post-{i}"),
                    "type": "posts",
                    "lang": "pt-br",
                    "first_publication_date": format!("2021-03-{:02}T10:00:00+0000", i),
                    "last_publication_date": format!("2021-04-{:02}T10:00:00+0000", count + 1 - i),
                    "data": {
                        "title": format!("Post {i}"),
                        "subtitle": format!("Subtitle {i}"),
                        "author": "Author",
                        "banner": {"url": format!("https://images.example/{i}.png")},
                        "content": [{"heading": "Intro", "body": [
                            {"type": "paragraph", "text": "one two three", "spans": []}
                        ]}]
                    }
                }))
                .unwrap()
            })
            .collect()
    }

    fn ids(resp: &ApiResponse) -> Vec<&str> {
        resp.results.iter().map(|d| d.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_paging_and_cursor() {
        let source = MemorySource::new(timeline(3));
        let query = Query::documents_of("posts")
            .page_size(2)
            .ordering(Ordering::desc(Field::LastPublicationDate));

        let first = source.query(&query).await.unwrap();
        assert_eq!(ids(&first), vec!["doc-1", "doc-2"]);
        assert_eq!(first.total_pages, 2);
        let cursor = first.next_page.clone().unwrap();
        assert!(cursor.starts_with(BASE_URL));

        let second = source.fetch_page(&cursor).await.unwrap();
        assert_eq!(ids(&second), vec!["doc-3"]);
        assert!(second.next_page.is_none());
        assert_eq!(source.request_count(), 2);
    }

    #[tokio::test]
    async fn test_after_cursor() {
        let source = MemorySource::new(timeline(3));
        let next = Query::documents_of("posts")
            .ordering(Ordering::asc(Field::FirstPublicationDate))
            .after("doc-2");
        assert_eq!(ids(&source.query(&next).await.unwrap()), vec!["doc-3"]);

        let prev = Query::documents_of("posts")
            .ordering(Ordering::desc(Field::FirstPublicationDate))
            .after("doc-2");
        assert_eq!(ids(&source.query(&prev).await.unwrap()), vec!["doc-1"]);

        let unknown = Query::documents_of("posts").after("nope");
        assert!(source.query(&unknown).await.unwrap().results.is_empty());
    }

    #[tokio::test]
    async fn test_uid_lookup_and_type_filter() {
        let mut docs = timeline(2);
        docs[1].doc_type = "pages".to_string();
        let source = MemorySource::new(docs);

        let found = source.first(&Query::by_uid("posts", "post-1")).await.unwrap();
        assert_eq!(found.unwrap().id, "doc-1");
        assert!(source
            .first(&Query::by_uid("posts", "post-2"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_revision_overrides_published() {
        let mut draft = timeline(1).remove(0);
        draft.data["title"] = json!("Draft title");
        let source = MemorySource::new(timeline(2)).with_revision("PREVIEW", vec![draft]);

        let published = source.first(&Query::by_id("doc-1")).await.unwrap().unwrap();
        assert_eq!(published.data["title"], "Post 1");

        let preview = source
            .first(&Query::by_id("doc-1").reference(Some("PREVIEW")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(preview.data["title"], "Draft title");

        let all = source
            .query(&Query::documents_of("posts").reference(Some("PREVIEW")))
            .await
            .unwrap();
        assert_eq!(all.results.len(), 2);

        let err = source
            .query(&Query::documents_of("posts").reference(Some("UNKNOWN")))
            .await
            .unwrap_err();
        assert!(matches!(err, BlogError::Api { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_foreign_cursor_is_refused() {
        let source = MemorySource::new(timeline(1));
        let err = source
            .fetch_page("https://blog.cdn.prismic.io/api/v2/documents/search?page=2")
            .await
            .unwrap_err();
        assert!(matches!(err, BlogError::InvalidCursor(_)));
        assert_eq!(source.request_count(), 0);
    }

    #[test]
    fn test_from_file_accepts_both_layouts() {
        let dir = tempfile::tempdir().unwrap();

        let bare = dir.path().join("bare.json");
        fs::write(&bare, serde_json::to_string(&timeline(2)).unwrap()).unwrap();
        assert_eq!(MemorySource::from_file(&bare).unwrap().published.len(), 2);

        let wrapped = dir.path().join("wrapped.json");
        let response = ApiResponse {
            results: timeline(3),
            ..ApiResponse::default()
        };
        fs::write(&wrapped, serde_json::to_string(&response).unwrap()).unwrap();
        assert_eq!(MemorySource::from_file(&wrapped).unwrap().published.len(), 3);

        assert!(MemorySource::from_file(dir.path().join("missing.json")).is_err());
    }
}
