//! Page data acquisition
//!
//! Each page has its own fetch functions; preview state is passed in as an
//! explicit revision ref, never read from ambient state.

mod listing;
mod post;

pub use listing::{
    fetch_initial_page, fetch_listing, fetch_page_at, load_next_page, LoadMore, PaginationState,
};
pub use post::{fetch_adjacent, fetch_post, load_post_page, PostPage, RenderState};
