//! Helper functions for templates
//!
//! Date formatting, HTML escaping, rich-text rendering and URL generation.

mod date;
mod html;
mod url;

pub use date::*;
pub use html::*;
pub use url::*;
