//! Generator module - renders pages with the built-in Tera templates and
//! exports the site as static HTML files

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tera::Context;

use crate::config::SiteConfig;
use crate::content::PostSummary;
use crate::error::{BlogError, ErrorPage};
use crate::helpers::{date_xml, format_date, post_path, render_fragments, url_for};
use crate::i18n::I18n;
use crate::pages::{
    fetch_initial_page, fetch_listing, load_next_page, load_post_page, PaginationState, PostPage,
};
use crate::source::ContentSource;
use crate::templates::{
    BlockData, CommentsData, ConfigData, ListingData, NavPost, PostCardData, PostData,
    TemplateRenderer,
};
use crate::Blog;

/// Seconds before a loading page asks the browser to try again
const LOADING_REFRESH_SECS: u32 = 2;

/// Outcome of a static export
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateReport {
    pub posts: usize,
    pub skipped: Vec<String>,
}

/// Page renderer and static exporter
pub struct Generator {
    config: SiteConfig,
    public_dir: PathBuf,
    renderer: TemplateRenderer,
    i18n: I18n,
    source: Arc<dyn ContentSource>,
}

impl Generator {
    /// Create a new generator
    pub fn new(blog: &Blog, source: Arc<dyn ContentSource>) -> Result<Self> {
        Ok(Self {
            config: blog.config.clone(),
            public_dir: blog.public_dir.clone(),
            renderer: TemplateRenderer::new()?,
            i18n: I18n::new(&blog.config.language)?,
            source,
        })
    }

    pub fn source(&self) -> &dyn ContentSource {
        self.source.as_ref()
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Export `/`, every post, the first listing page as JSON and a 404 page
    pub async fn generate(&self) -> Result<GenerateReport> {
        fs::create_dir_all(&self.public_dir)?;

        let first = fetch_initial_page(self.source(), &self.config.content, None).await?;
        self.write_file("index.html", &self.render_index(&first, false)?)?;
        self.write_file(
            "api/posts.json",
            &serde_json::to_string(&self.listing_data(&first))?,
        )?;

        let mut report = GenerateReport::default();
        for id in self.static_paths().await? {
            match self.write_post(&id).await {
                Ok(path) => {
                    tracing::debug!("Generated post: {:?}", path);
                    report.posts += 1;
                }
                Err(e) => {
                    tracing::warn!("Skipping post {}: {}", id, e);
                    report.skipped.push(id);
                }
            }
        }

        let not_found = self.render_error(&self.i18n.get("post.not_found"), "")?;
        self.write_file("404.html", &not_found)?;

        Ok(report)
    }

    /// Route identifiers of every published post, most recently modified first
    ///
    /// Follows every page cursor the source hands out.
    pub async fn static_paths(&self) -> Result<Vec<String>, BlogError> {
        let content = &self.config.content;
        let mut state =
            fetch_listing(self.source(), content, content.static_page_size, None).await?;
        while state.has_more() {
            state = load_next_page(self.source(), &state).await?;
        }

        Ok(state.results.into_iter().filter_map(|s| s.id).collect())
    }

    /// Render one published post and write it under `public_dir`
    pub async fn write_post(&self, id: &str) -> Result<PathBuf, BlogError> {
        let path = self
            .post_file(id)
            .ok_or_else(|| BlogError::NotFound(id.to_string()))?;
        let page = load_post_page(self.source(), &self.config.content, id, None).await?;
        let html = self.render_post(&page)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create dir {:?}", parent))?;
        }
        fs::write(&path, html).with_context(|| format!("Failed to write {:?}", path))?;
        Ok(path)
    }

    /// Where a post is exported; `None` for identifiers that are not a
    /// single plain path segment
    pub fn post_file(&self, id: &str) -> Option<PathBuf> {
        let plain = !id.is_empty()
            && !id.starts_with('.')
            && !id.contains(['/', '\\'])
            && !id.chars().any(char::is_control);
        plain.then(|| self.public_dir.join("post").join(id).join("index.html"))
    }

    pub fn public_dir(&self) -> &Path {
        &self.public_dir
    }

    pub fn index_file(&self) -> PathBuf {
        self.public_dir.join("index.html")
    }

    fn write_file(&self, relative: &str, content: &str) -> Result<()> {
        let path = self.public_dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content).with_context(|| format!("Failed to write {:?}", path))?;
        tracing::debug!("Generated: {:?}", path);
        Ok(())
    }

    pub fn render_index(&self, state: &PaginationState, preview: bool) -> Result<String> {
        let listing = self.listing_data(state);
        let mut context = self.base_context(preview);
        context.insert("posts", &listing.results);
        context.insert("next_page_cursor", &listing.next_page_cursor);
        context.insert("api_posts_path", &url_for(&self.config, "api/posts"));
        self.renderer.render("index.html", &context)
    }

    pub fn render_post(&self, page: &PostPage) -> Result<String> {
        let nav = |summary: &Option<PostSummary>| {
            summary.as_ref().and_then(|s| {
                s.id.as_deref().map(|id| NavPost {
                    title: s.title.clone(),
                    path: post_path(&self.config, id),
                })
            })
        };

        let comments = self.config.comments.enabled().then(|| CommentsData {
            repo: self.config.comments.repo.clone(),
            issue_term: self.config.comments.issue_term.clone(),
            theme: self.config.comments.theme.clone(),
            label: self.config.comments.label.clone(),
        });

        let mut context = self.base_context(page.preview);
        context.insert("post", &self.post_data(page));
        context.insert("prev_post", &nav(&page.adjacent.prev));
        context.insert("next_post", &nav(&page.adjacent.next));
        context.insert("comments", &comments);
        self.renderer.render("post.html", &context)
    }

    /// Placeholder served while a post is generated in the background
    pub fn render_loading(&self) -> Result<String> {
        let mut context = self.base_context(false);
        context.insert("refresh_secs", &LOADING_REFRESH_SECS);
        self.renderer.render("loading.html", &context)
    }

    pub fn render_error(&self, heading: &str, message: &str) -> Result<String> {
        let mut context = self.base_context(false);
        context.insert("heading", heading);
        context.insert("message", message);
        self.renderer.render("error.html", &context)
    }

    /// Localized page for a failed request
    pub fn render_error_page(&self, page: ErrorPage) -> Result<String> {
        self.render_error(
            &self.i18n.get(&format!("error.{}.title", page.0)),
            &self.i18n.get(&format!("error.{}.message", page.0)),
        )
    }

    /// Listing results in the shape the "load more" script consumes
    pub fn listing_data(&self, state: &PaginationState) -> ListingData {
        ListingData {
            results: state.results.iter().map(|s| self.card(s)).collect(),
            next_page_cursor: state.next_page_cursor.clone(),
        }
    }

    fn card(&self, summary: &PostSummary) -> PostCardData {
        let (date, datetime) = self.dates(summary.first_publication_date.as_ref());
        PostCardData {
            id: summary.id.clone(),
            path: summary
                .id
                .as_deref()
                .map(|id| post_path(&self.config, id))
                .unwrap_or_default(),
            title: summary.title.clone(),
            subtitle: summary.subtitle.clone(),
            author: summary.author.clone(),
            date,
            datetime,
        }
    }

    fn post_data(&self, page: &PostPage) -> PostData {
        let post = &page.post;
        let (date, datetime) = self.dates(post.first_publication_date.as_ref());

        let edited_note = match (page.edited, post.last_publication_date.as_ref()) {
            (true, Some(last)) => Some(self.i18n.format(
                "post.edited",
                &[
                    ("date", &self.format(last, &self.config.date_format)),
                    ("time", &self.format(last, &self.config.time_format)),
                ],
            )),
            _ => None,
        };

        PostData {
            id: post.id.clone(),
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            author: post.author.clone(),
            banner_url: post.banner.url.clone(),
            banner_alt: post.banner.alt.clone().unwrap_or_default(),
            date,
            datetime,
            reading_time: self.i18n.format(
                "post.reading_time",
                &[("minutes", &page.reading_time.to_string())],
            ),
            edited_note,
            content: post
                .content
                .iter()
                .map(|block| BlockData {
                    heading: block.heading.clone(),
                    html: render_fragments(&block.body),
                })
                .collect(),
        }
    }

    fn dates(&self, date: Option<&DateTime<Utc>>) -> (String, String) {
        date.map(|d| (self.format(d, &self.config.date_format), date_xml(d)))
            .unwrap_or_default()
    }

    fn format(&self, date: &DateTime<Utc>, format: &str) -> String {
        format_date(date, format, &self.config.language)
    }

    fn config_data(&self) -> ConfigData {
        ConfigData {
            title: self.config.title.clone(),
            description: self.config.description.clone(),
            author: self.config.author.clone(),
            language: self.config.language.clone(),
            url: self.config.url.clone(),
            root: url_for(&self.config, ""),
            logo: url_for(&self.config, &self.config.logo),
        }
    }

    /// Create a base context with common variables
    fn base_context(&self, preview: bool) -> Context {
        let mut context = Context::new();
        context.insert("config", &self.config_data());
        context.insert("t", &self.i18n.get_all_translations());
        context.insert("preview", &preview);
        context.insert("exit_preview_path", &url_for(&self.config, "api/exit-preview"));
        context
    }
}
