//! Listing page data: the first page of posts and "load more"

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Mutex;

use crate::config::ContentConfig;
use crate::content::{map_summaries, ApiResponse, PostSummary};
use crate::error::BlogError;
use crate::source::{resolve_ref, ContentSource, Field, Ordering, Query};

/// Posts loaded so far and where the next page is
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaginationState {
    pub results: Vec<PostSummary>,
    /// Source-issued URL of the next page; `None` once everything is loaded
    pub next_page_cursor: Option<String>,
}

impl PaginationState {
    pub fn has_more(&self) -> bool {
        self.next_page_cursor.is_some()
    }

    /// Append a freshly fetched page: results concatenate, the cursor is replaced
    pub fn append(mut self, page: PaginationState) -> Self {
        self.results.extend(page.results);
        self.next_page_cursor = page.next_page_cursor;
        self
    }

    fn from_response(response: ApiResponse) -> Result<Self, BlogError> {
        Ok(Self {
            results: map_summaries(&response.results)?,
            next_page_cursor: response.next_page,
        })
    }
}

/// Query for the listing: posts, most recently modified first
fn listing_query(content: &ContentConfig, page_size: u32) -> Query {
    Query::documents_of(&content.document_type)
        .page_size(page_size)
        .ordering(Ordering::desc(Field::LastPublicationDate))
        .lang(content.lang.as_deref())
}

/// First page of the listing
pub async fn fetch_initial_page(
    source: &dyn ContentSource,
    content: &ContentConfig,
    preview_ref: Option<&str>,
) -> Result<PaginationState, BlogError> {
    fetch_listing(source, content, content.page_size, preview_ref).await
}

/// First page of the listing with an explicit page size
pub async fn fetch_listing(
    source: &dyn ContentSource,
    content: &ContentConfig,
    page_size: u32,
    preview_ref: Option<&str>,
) -> Result<PaginationState, BlogError> {
    let reference = resolve_ref(source, preview_ref).await?;
    let query = listing_query(content, page_size).reference(reference.as_deref());
    let response = source.query(&query).await?;
    tracing::debug!(
        "Fetched {} of {} posts from {}",
        response.results.len(),
        response.total_results_size,
        source.name()
    );
    PaginationState::from_response(response)
}

/// The page a cursor points at, on its own
pub async fn fetch_page_at(
    source: &dyn ContentSource,
    cursor: &str,
) -> Result<PaginationState, BlogError> {
    let response = source.fetch_page(cursor).await?;
    PaginationState::from_response(response)
}

/// Load the next page and append it to `state`
///
/// Without a cursor this returns `state` unchanged and makes no request.
/// On error `state` is left untouched.
pub async fn load_next_page(
    source: &dyn ContentSource,
    state: &PaginationState,
) -> Result<PaginationState, BlogError> {
    let Some(cursor) = state.next_page_cursor.as_deref() else {
        return Ok(state.clone());
    };

    let page = fetch_page_at(source, cursor).await?;
    tracing::debug!(
        "Loaded {} more posts ({} total)",
        page.results.len(),
        state.results.len() + page.results.len()
    );
    Ok(state.clone().append(page))
}

/// A held listing state that loads more pages one at a time
///
/// A second [`LoadMore::load`] while one is running fails with
/// [`BlogError::LoadInProgress`] instead of racing on the state.
pub struct LoadMore {
    state: Mutex<PaginationState>,
    in_flight: AtomicBool,
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, AtomicOrdering::Release);
    }
}

impl LoadMore {
    pub fn new(state: PaginationState) -> Self {
        Self {
            state: Mutex::new(state),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Current state
    pub fn snapshot(&self) -> PaginationState {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn has_more(&self) -> bool {
        self.snapshot().has_more()
    }

    /// Load the next page into the held state and return the new state
    pub async fn load(&self, source: &dyn ContentSource) -> Result<PaginationState, BlogError> {
        if self.in_flight.swap(true, AtomicOrdering::AcqRel) {
            return Err(BlogError::LoadInProgress);
        }
        let _guard = InFlight(&self.in_flight);

        let current = self.snapshot();
        let next = load_next_page(source, &current).await?;

        *self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = next.clone();
        Ok(next)
    }

    pub fn into_state(self) -> PaginationState {
        self.state
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
