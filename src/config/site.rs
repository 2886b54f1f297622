//! Site configuration (_config.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable overriding `content.endpoint`
pub const ENDPOINT_ENV: &str = "PRISMIC_API_ENDPOINT";
/// Environment variable overriding `content.access_token`
pub const ACCESS_TOKEN_ENV: &str = "PRISMIC_ACCESS_TOKEN";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub author: String,
    pub language: String,
    /// Header logo, relative to the site root
    pub logo: String,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub public_dir: String,

    // Date / Time format
    pub date_format: String,
    pub time_format: String,

    // Content source
    pub content: ContentConfig,

    // Extensions
    pub comments: CommentsConfig,
    pub preview: PreviewConfig,
    pub fallback: Fallback,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "spacetraveling".to_string(),
            description: String::new(),
            author: String::new(),
            language: "pt-BR".to_string(),
            logo: "/images/logo.svg".to_string(),

            url: "http://localhost:3000".to_string(),
            root: "/".to_string(),

            public_dir: "public".to_string(),

            date_format: "%d %b %Y".to_string(),
            time_format: "%H:%M".to_string(),

            content: ContentConfig::default(),

            comments: CommentsConfig::default(),
            preview: PreviewConfig::default(),
            fallback: Fallback::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Apply `PRISMIC_*` environment overrides on top of the file values
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(ENDPOINT_ENV).ok(),
            std::env::var(ACCESS_TOKEN_ENV).ok(),
        );
    }

    fn apply_overrides(&mut self, endpoint: Option<String>, token: Option<String>) {
        if let Some(endpoint) = endpoint.filter(|e| !e.trim().is_empty()) {
            tracing::debug!("Content endpoint overridden from {}", ENDPOINT_ENV);
            self.content.endpoint = endpoint;
        }
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.content.access_token = Some(token);
        }
    }
}

/// Content source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Content API endpoint, e.g. `https://my-repo.cdn.prismic.io/api/v2`
    pub endpoint: String,
    pub access_token: Option<String>,
    /// Custom type of the post documents
    pub document_type: String,
    /// Posts per listing page
    pub page_size: u32,
    /// Page size used to enumerate every post at generate time
    pub static_page_size: u32,
    pub lang: Option<String>,
    pub timeout_secs: u64,
    /// JSON file of documents served by the in-memory source instead of the API
    pub fixtures: Option<String>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_token: None,
            document_type: "posts".to_string(),
            page_size: 1,
            static_page_size: 100,
            lang: None,
            timeout_secs: 10,
            fixtures: None,
        }
    }
}

/// utterances comment widget configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentsConfig {
    /// `owner/name` of the GitHub repository holding the comment issues
    pub repo: String,
    pub issue_term: String,
    pub theme: String,
    pub label: Option<String>,
}

impl CommentsConfig {
    pub fn enabled(&self) -> bool {
        !self.repo.trim().is_empty()
    }
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            repo: String::new(),
            issue_term: "pathname".to_string(),
            theme: "github-dark".to_string(),
            label: None,
        }
    }
}

/// Preview mode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub enabled: bool,
    /// Cookie holding the preview ref
    pub cookie: String,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cookie: "io.prismic.preview".to_string(),
        }
    }
}

/// What the server does for a post route that has not been generated yet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fallback {
    /// Render the page inside the request
    #[default]
    Blocking,
    /// Answer with a loading page and generate the post in the background
    Loading,
}
