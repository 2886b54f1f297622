//! Configuration module

mod site;

pub use site::CommentsConfig;
pub use site::ContentConfig;
pub use site::Fallback;
pub use site::PreviewConfig;
pub use site::SiteConfig;
pub use site::{ACCESS_TOKEN_ENV, ENDPOINT_ENV};
