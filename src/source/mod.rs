//! Content sources
//!
//! [`ContentSource`] is the seam between the blog and the content
//! repository. [`PrismicClient`] talks to the real API over HTTP,
//! [`MemorySource`] answers from documents held in memory (fixtures, tests).

mod memory;
mod prismic;
pub mod query;

use async_trait::async_trait;

pub use memory::MemorySource;
pub use prismic::PrismicClient;
pub use query::{Field, Ordering, Predicate, Query};

#[cfg(test)]
pub(crate) use memory::tests::timeline;

use crate::content::{ApiResponse, Document};
use crate::error::BlogError;

/// A queryable repository of documents
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Run a search
    async fn query(&self, query: &Query) -> Result<ApiResponse, BlogError>;

    /// Fetch a page from a cursor URL previously returned in `next_page`
    ///
    /// Cursors that do not belong to this source are refused with
    /// [`BlogError::InvalidCursor`] before any request is made.
    async fn fetch_page(&self, cursor: &str) -> Result<ApiResponse, BlogError>;

    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Ref of the current published snapshot
    ///
    /// Pass it to every query of one page so they all read the same
    /// snapshot. `None` when unpinned queries already read a fixed one.
    async fn master_ref(&self) -> Result<Option<String>, BlogError> {
        Ok(None)
    }

    /// First document matching the query, if any
    async fn first(&self, query: &Query) -> Result<Option<Document>, BlogError> {
        let query = query.clone().page_size(1).page(1);
        Ok(self.query(&query).await?.results.into_iter().next())
    }
}

/// The ref a page reads: the preview ref when given, else the master ref
pub async fn resolve_ref(
    source: &dyn ContentSource,
    preview_ref: Option<&str>,
) -> Result<Option<String>, BlogError> {
    match preview_ref {
        Some(reference) => Ok(Some(reference.to_string())),
        None => source.master_ref().await,
    }
}
