//! spacetraveling: a blog front-end for a headless content API
//!
//! Posts live in a Prismic-style content repository. This crate maps its
//! documents into posts, renders the listing and post pages with embedded
//! Tera templates, and either serves them over HTTP or exports them as
//! static files.

pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod generator;
pub mod helpers;
pub mod i18n;
pub mod pages;
pub mod server;
pub mod source;
pub mod templates;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use source::{ContentSource, MemorySource, PrismicClient};

/// The blog application
#[derive(Debug, Clone)]
pub struct Blog {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
}

impl Blog {
    /// Load `_config.yml` from a directory, then apply environment overrides
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let config_path = base_dir.as_ref().join("_config.yml");

        let mut config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            tracing::debug!("No _config.yml in {:?}, using defaults", base_dir.as_ref());
            config::SiteConfig::default()
        };
        config.apply_env();

        Ok(Self::with_config(base_dir, config))
    }

    pub fn with_config<P: AsRef<Path>>(base_dir: P, config: config::SiteConfig) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        let public_dir = base_dir.join(&config.public_dir);

        Self {
            config,
            base_dir,
            public_dir,
        }
    }

    /// The configured content source: fixtures when set, the remote API otherwise
    pub fn content_source(&self) -> Result<Arc<dyn ContentSource>> {
        if let Some(fixtures) = &self.config.content.fixtures {
            let source = MemorySource::from_file(self.base_dir.join(fixtures))?;
            return Ok(Arc::new(source));
        }

        let client = PrismicClient::new(&self.config.content)?;
        tracing::debug!("Using content API at {}", client.endpoint());
        Ok(Arc::new(client))
    }

    /// Export the site into the public directory
    pub async fn generate(&self) -> Result<()> {
        commands::generate::run(self).await
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_without_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let blog = Blog::new(dir.path()).unwrap();
        assert_eq!(blog.public_dir, dir.path().join("public"));
        assert_eq!(blog.config.content.document_type, "posts");
    }

    #[test]
    fn test_fixture_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("posts.json"), "[]").unwrap();
        std::fs::write(
            dir.path().join("_config.yml"),
            "title: Blog\npublic_dir: out\ncontent:\n  fixtures: posts.json\n",
        )
        .unwrap();

        let blog = Blog::new(dir.path()).unwrap();
        assert_eq!(blog.public_dir, dir.path().join("out"));
        assert_eq!(blog.content_source().unwrap().name(), "memory");
    }

    #[test]
    fn test_remote_source_requires_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config::SiteConfig::default();
        config.content.endpoint = String::new();
        let blog = Blog::with_config(dir.path(), config);
        assert!(blog.content_source().is_err());
    }
}
