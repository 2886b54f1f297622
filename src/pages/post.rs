//! Post page data: the document, its neighbours and derived values

use serde::Serialize;

use crate::config::ContentConfig;
use crate::content::{map_post, map_summary, reading_time_minutes, was_edited, Adjacent, Post};
use crate::error::BlogError;
use crate::source::{resolve_ref, ContentSource, Field, Ordering, Query};

/// What a post route renders
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "page", rename_all = "lowercase")]
pub enum RenderState<T> {
    /// Data not resolved yet; the page is being generated
    Loading,
    Ready(T),
}

impl<T> RenderState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

/// Everything the post template needs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostPage {
    pub post: Post,
    pub reading_time: usize,
    pub edited: bool,
    pub adjacent: Adjacent,
    /// Rendered from a preview ref
    pub preview: bool,
}

/// A post by its route identifier; `revision_ref` selects a draft revision
pub async fn fetch_post(
    source: &dyn ContentSource,
    content: &ContentConfig,
    id: &str,
    revision_ref: Option<&str>,
) -> Result<Post, BlogError> {
    let query = Query::by_uid(&content.document_type, id)
        .lang(content.lang.as_deref())
        .reference(revision_ref);

    let doc = source
        .first(&query)
        .await?
        .ok_or_else(|| BlogError::NotFound(id.to_string()))?;

    Ok(map_post(&doc)?)
}

/// Posts published right before and right after `document_id`
pub async fn fetch_adjacent(
    source: &dyn ContentSource,
    content: &ContentConfig,
    document_id: &str,
    revision_ref: Option<&str>,
) -> Result<Adjacent, BlogError> {
    let neighbour = |ordering: Ordering| {
        Query::documents_of(&content.document_type)
            .ordering(ordering)
            .after(document_id)
            .lang(content.lang.as_deref())
            .reference(revision_ref)
    };

    let next = source
        .first(&neighbour(Ordering::asc(Field::FirstPublicationDate)))
        .await?;
    let prev = source
        .first(&neighbour(Ordering::desc(Field::FirstPublicationDate)))
        .await?;

    Ok(Adjacent {
        prev: prev.as_ref().map(map_summary).transpose()?,
        next: next.as_ref().map(map_summary).transpose()?,
    })
}

/// Fetch and derive everything for a post page
///
/// All lookups read one snapshot: the master ref is resolved once up front.
/// Navigation is best effort: a failed neighbour lookup renders the page
/// without prev/next links.
pub async fn load_post_page(
    source: &dyn ContentSource,
    content: &ContentConfig,
    id: &str,
    revision_ref: Option<&str>,
) -> Result<PostPage, BlogError> {
    let reference = resolve_ref(source, revision_ref).await?;
    let reference = reference.as_deref();
    let post = fetch_post(source, content, id, reference).await?;

    let adjacent = match fetch_adjacent(source, content, &post.document_id, reference).await {
        Ok(adjacent) => adjacent,
        Err(e) => {
            tracing::warn!("Navigation for {} unavailable: {}", id, e);
            Adjacent::default()
        }
    };

    Ok(PostPage {
        reading_time: reading_time_minutes(&post),
        edited: was_edited(&post),
        adjacent,
        preview: revision_ref.is_some(),
        post,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ApiResponse;
    use crate::source::{timeline, MemorySource};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::Mutex;

    fn config() -> ContentConfig {
        ContentConfig::default()
    }

    fn uid(summary: &Option<crate::content::PostSummary>) -> Option<&str> {
        summary.as_ref().and_then(|s| s.id.as_deref())
    }

    #[tokio::test]
    async fn test_fetch_post() {
        let source = MemorySource::new(timeline(3));
        let post = fetch_post(&source, &config(), "post-2", None).await.unwrap();
        assert_eq!(post.title, "Post 2");
        assert_eq!(post.document_id, "doc-2");
    }

    #[tokio::test]
    async fn test_unknown_post_is_not_found() {
        let source = MemorySource::new(timeline(3));
        let err = fetch_post(&source, &config(), "nope", None).await.unwrap_err();
        assert!(matches!(err, BlogError::NotFound(id) if id == "nope"));
    }

    #[tokio::test]
    async fn test_fetch_post_with_revision() {
        let mut draft = timeline(2).remove(1);
        draft.data["title"] = json!("Rascunho");
        let source = MemorySource::new(timeline(2)).with_revision("PREVIEW", vec![draft]);

        let published = fetch_post(&source, &config(), "post-2", None).await.unwrap();
        assert_eq!(published.title, "Post 2");
        let preview = fetch_post(&source, &config(), "post-2", Some("PREVIEW"))
            .await
            .unwrap();
        assert_eq!(preview.title, "Rascunho");
    }

    #[tokio::test]
    async fn test_adjacent_in_the_middle() {
        let source = MemorySource::new(timeline(3));
        let adjacent = fetch_adjacent(&source, &config(), "doc-2", None).await.unwrap();
        assert_eq!(uid(&adjacent.prev), Some("post-1"));
        assert_eq!(uid(&adjacent.next), Some("post-3"));
    }

    #[tokio::test]
    async fn test_adjacent_boundaries() {
        let source = MemorySource::new(timeline(3));

        let first = fetch_adjacent(&source, &config(), "doc-1", None).await.unwrap();
        assert!(first.prev.is_none());
        assert_eq!(uid(&first.next), Some("post-2"));

        let last = fetch_adjacent(&source, &config(), "doc-3", None).await.unwrap();
        assert_eq!(uid(&last.prev), Some("post-2"));
        assert!(last.next.is_none());

        let single = MemorySource::new(timeline(1));
        let alone = fetch_adjacent(&single, &config(), "doc-1", None).await.unwrap();
        assert_eq!(alone, Adjacent::default());
    }

    #[tokio::test]
    async fn test_adjacent_uses_first_publication_not_edit_order() {
        // timeline() edits posts in reverse order of publication
        let source = MemorySource::new(timeline(4));
        let adjacent = fetch_adjacent(&source, &config(), "doc-3", None).await.unwrap();
        assert_eq!(uid(&adjacent.prev), Some("post-2"));
        assert_eq!(uid(&adjacent.next), Some("post-4"));
    }

    #[tokio::test]
    async fn test_load_post_page_derives_values() {
        let source = MemorySource::new(timeline(2));
        let page = load_post_page(&source, &config(), "post-1", None).await.unwrap();
        assert_eq!(page.reading_time, 1);
        assert!(page.edited);
        assert!(!page.preview);
        assert!(page.adjacent.prev.is_none());
        assert_eq!(uid(&page.adjacent.next), Some("post-2"));
    }

    /// Serves single documents but fails every listing query
    struct NoNavigation(MemorySource);

    #[async_trait]
    impl ContentSource for NoNavigation {
        async fn query(&self, query: &Query) -> Result<ApiResponse, BlogError> {
            if query.after.is_some() {
                return Err(BlogError::Api {
                    status: 503,
                    message: "unavailable".to_string(),
                });
            }
            self.0.query(query).await
        }

        async fn fetch_page(&self, cursor: &str) -> Result<ApiResponse, BlogError> {
            self.0.fetch_page(cursor).await
        }

        fn name(&self) -> &'static str {
            "no-navigation"
        }
    }

    #[tokio::test]
    async fn test_navigation_failure_degrades() {
        let source = NoNavigation(MemorySource::new(timeline(3)));
        let page = load_post_page(&source, &config(), "post-2", None).await.unwrap();
        assert_eq!(page.post.title, "Post 2");
        assert_eq!(page.adjacent, Adjacent::default());
    }

    /// Pins a master ref and records the ref of every query it answers
    struct Snapshot {
        inner: MemorySource,
        master_lookups: AtomicUsize,
        refs: Mutex<Vec<Option<String>>>,
    }

    impl Snapshot {
        fn new(inner: MemorySource) -> Self {
            Self {
                inner,
                master_lookups: AtomicUsize::new(0),
                refs: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ContentSource for Snapshot {
        async fn query(&self, query: &Query) -> Result<ApiResponse, BlogError> {
            self.refs.lock().unwrap().push(query.reference.clone());
            let mut query = query.clone();
            if query.reference.as_deref() == Some("MASTER") {
                query.reference = None;
            }
            self.inner.query(&query).await
        }

        async fn fetch_page(&self, cursor: &str) -> Result<ApiResponse, BlogError> {
            self.inner.fetch_page(cursor).await
        }

        fn name(&self) -> &'static str {
            "snapshot"
        }

        async fn master_ref(&self) -> Result<Option<String>, BlogError> {
            self.master_lookups.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(Some("MASTER".to_string()))
        }
    }

    #[tokio::test]
    async fn test_post_page_reads_one_snapshot() {
        let source = Snapshot::new(MemorySource::new(timeline(3)));
        let page = load_post_page(&source, &config(), "post-2", None).await.unwrap();
        assert_eq!(uid(&page.adjacent.prev), Some("post-1"));
        assert_eq!(uid(&page.adjacent.next), Some("post-3"));
        assert!(!page.preview);

        assert_eq!(source.master_lookups.load(AtomicOrdering::SeqCst), 1);
        let refs = source.refs.lock().unwrap().clone();
        assert_eq!(refs, vec![Some("MASTER".to_string()); 3]);
    }

    #[tokio::test]
    async fn test_preview_page_skips_master_lookup() {
        let source = Snapshot::new(MemorySource::new(timeline(2)).with_revision("PREVIEW", vec![]));
        let page = load_post_page(&source, &config(), "post-1", Some("PREVIEW"))
            .await
            .unwrap();
        assert!(page.preview);
        assert_eq!(source.master_lookups.load(AtomicOrdering::SeqCst), 0);
        let refs = source.refs.lock().unwrap().clone();
        assert!(refs.iter().all(|r| r.as_deref() == Some("PREVIEW")));
    }

    #[test]
    fn test_render_state_serialization() {
        let loading: RenderState<u8> = RenderState::Loading;
        assert!(loading.is_loading());
        assert_eq!(serde_json::to_value(&loading).unwrap(), json!({"state": "loading"}));
        let ready = RenderState::Ready(3u8);
        assert_eq!(
            serde_json::to_value(&ready).unwrap(),
            json!({"state": "ready", "page": 3})
        );
    }
}
