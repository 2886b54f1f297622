//! Content module - post models, raw API documents and the mapper between them

pub mod document;
mod mapper;
mod post;
mod reading;

pub use document::{ApiResponse, Document};
pub use mapper::{map_post, map_summaries, map_summary, MapError};
pub use post::{
    Adjacent, Banner, ContentBlock, FragmentKind, Post, PostSummary, Span, SpanKind, TextFragment,
};
pub use reading::{reading_time_minutes, was_edited, word_count, WORDS_PER_MINUTE};
