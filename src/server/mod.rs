//! HTTP server
//!
//! By default every page is rendered per request from fresh content. With
//! `--static` the exported files are served first; a post that was never
//! exported is generated on demand according to the `fallback` setting.

use anyhow::Result;
use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap},
    middleware::{self, Next},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use cookie::{Cookie, SameSite};
use indexmap::IndexSet;
use serde::Deserialize;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::Fallback;
use crate::error::{ApiError, BlogError, ErrorPage};
use crate::generator::Generator;
use crate::helpers::{post_path, url_for};
use crate::pages::{fetch_initial_page, fetch_page_at, load_post_page, RenderState};
use crate::source::Query as ContentQuery;
use crate::templates::ListingData;
use crate::Blog;

/// Server state
pub struct ServerState {
    generator: Generator,
    static_mode: bool,
    /// Posts being generated in the background
    pending: Mutex<HashSet<String>>,
    /// Posts whose background generation failed; answered with 404 once
    missing: Mutex<IndexSet<String>>,
}

impl ServerState {
    pub fn new(generator: Generator, static_mode: bool) -> Self {
        Self {
            generator,
            static_mode,
            pending: Mutex::new(HashSet::new()),
            missing: Mutex::new(IndexSet::new()),
        }
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    pub fn missing_count(&self) -> usize {
        lock(&self.missing).len()
    }

    fn mark_missing(&self, id: String) {
        let mut missing = lock(&self.missing);
        missing.insert(id);
        while missing.len() > MISSING_CAPACITY {
            missing.shift_remove_index(0);
        }
    }

    /// Preview ref carried by the request's cookie, if preview is enabled
    fn preview_ref(&self, headers: &HeaderMap) -> Option<String> {
        let preview = &self.generator.config().preview;
        if !preview.enabled {
            return None;
        }

        headers
            .get_all(header::COOKIE)
            .into_iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(Cookie::split_parse_encoded)
            .filter_map(Result::ok)
            .find(|cookie| cookie.name() == preview.cookie)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
    }

    /// An exported post, generating it first if it was never exported
    async fn exported_post(self: &Arc<Self>, id: &str) -> Result<RenderState<String>, BlogError> {
        let path = self
            .generator
            .post_file(id)
            .ok_or_else(|| BlogError::NotFound(id.to_string()))?;
        if let Ok(html) = tokio::fs::read_to_string(&path).await {
            return Ok(RenderState::Ready(html));
        }

        match self.generator.config().fallback {
            Fallback::Blocking => {
                let path = self.generator.write_post(id).await?;
                let html = tokio::fs::read_to_string(&path)
                    .await
                    .map_err(anyhow::Error::from)?;
                Ok(RenderState::Ready(html))
            }
            Fallback::Loading => {
                if lock(&self.missing).shift_remove(id) {
                    return Err(BlogError::NotFound(id.to_string()));
                }
                if lock(&self.pending).insert(id.to_string()) {
                    self.spawn_generation(id.to_string());
                }
                Ok(RenderState::Loading)
            }
        }
    }

    fn spawn_generation(self: &Arc<Self>, id: String) {
        let state = Arc::clone(self);
        tokio::spawn(async move {
            match state.generator.write_post(&id).await {
                Ok(path) => {
                    tracing::info!("Generated on demand: {:?}", path);
                    lock(&state.missing).shift_remove(&id);
                }
                Err(e) => {
                    tracing::warn!("On-demand generation of {} failed: {}", id, e);
                    state.mark_missing(id.clone());
                }
            }
            lock(&state.pending).remove(&id);
        });
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

type SharedState = Arc<ServerState>;

/// Failed background generations remembered at most; the oldest is dropped first
const MISSING_CAPACITY: usize = 256;

/// Build the router, mounted under the configured root
pub fn app(state: SharedState) -> Router {
    let config = state.generator.config();
    let public_dir = state.generator.public_dir().to_path_buf();
    let root = config.root.trim_end_matches('/').to_string();

    let routes = Router::new()
        .route("/", get(index_handler))
        .route("/post/:id", get(post_handler))
        .route("/api/posts", get(posts_handler))
        .route("/api/preview", get(preview_handler))
        .route("/api/exit-preview", get(exit_preview_handler))
        .route("/health", get(|| async { "ok" }))
        .fallback_service(ServeDir::new(public_dir))
        .layer(middleware::from_fn_with_state(state.clone(), localized_errors))
        .with_state(state);

    let router = if root.is_empty() {
        routes
    } else {
        Router::new().nest(&root, routes)
    };
    router.layer(TraceLayer::new_for_http())
}

/// Replace plain error pages with the localized site page
async fn localized_errors(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    let Some(page) = response.extensions().get::<ErrorPage>().copied() else {
        return response;
    };

    match state.generator.render_error_page(page) {
        Ok(html) => (response.status(), Html(html)).into_response(),
        Err(e) => {
            tracing::warn!("Failed to render error page: {}", e);
            response
        }
    }
}

/// Start the server
pub async fn start(blog: &Blog, ip: &str, port: u16, static_mode: bool) -> Result<()> {
    let source = blog.content_source()?;
    let generator = Generator::new(blog, source)?;

    if static_mode {
        tracing::info!("Generating static files...");
        let report = generator.generate().await?;
        tracing::info!("Exported {} posts", report.posts);
    }

    let app = app(Arc::new(ServerState::new(generator, static_mode)));

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    if static_mode {
        println!("Serving exported files with on-demand generation.");
    }
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn index_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Html<String>, BlogError> {
    let preview = state.preview_ref(&headers);

    if state.static_mode && preview.is_none() {
        if let Ok(html) = tokio::fs::read_to_string(state.generator.index_file()).await {
            return Ok(Html(html));
        }
    }

    let generator = &state.generator;
    let listing = fetch_initial_page(
        generator.source(),
        &generator.config().content,
        preview.as_deref(),
    )
    .await?;
    Ok(Html(generator.render_index(&listing, preview.is_some())?))
}

async fn post_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Html<String>, BlogError> {
    let preview = state.preview_ref(&headers);

    if !state.static_mode || preview.is_some() {
        let generator = &state.generator;
        let page = load_post_page(
            generator.source(),
            &generator.config().content,
            &id,
            preview.as_deref(),
        )
        .await?;
        return Ok(Html(generator.render_post(&page)?));
    }

    match state.exported_post(&id).await? {
        RenderState::Ready(html) => Ok(Html(html)),
        RenderState::Loading => Ok(Html(state.generator.render_loading()?)),
    }
}

#[derive(Debug, Deserialize)]
struct CursorParams {
    cursor: Option<String>,
}

/// Next listing page for the "load more" button
async fn posts_handler(
    State(state): State<SharedState>,
    Query(params): Query<CursorParams>,
) -> Result<Json<ListingData>, ApiError> {
    let cursor = params
        .cursor
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| BlogError::InvalidCursor("missing cursor".to_string()))?;

    let page = fetch_page_at(state.generator.source(), &cursor).await?;
    Ok(Json(state.generator.listing_data(&page)))
}

#[derive(Debug, Deserialize)]
struct PreviewParams {
    token: Option<String>,
    #[serde(rename = "documentId")]
    document_id: Option<String>,
}

/// Enter preview mode and go to the previewed document
async fn preview_handler(
    State(state): State<SharedState>,
    Query(params): Query<PreviewParams>,
) -> Result<Response, BlogError> {
    let config = state.generator.config();
    if !config.preview.enabled {
        return Err(BlogError::NotFound("preview".to_string()));
    }
    let token = params
        .token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| BlogError::InvalidPreview("missing token".to_string()))?;

    let location = match params.document_id.as_deref() {
        Some(document_id) => {
            let query = ContentQuery::by_id(document_id).reference(Some(&token));
            let doc = state
                .generator
                .source()
                .first(&query)
                .await?
                .ok_or_else(|| BlogError::NotFound(document_id.to_string()))?;
            match doc.uid.as_deref() {
                Some(uid) => post_path(config, uid),
                None => url_for(config, ""),
            }
        }
        None => url_for(config, ""),
    };

    let cookie = Cookie::build((config.preview.cookie.clone(), token))
        .path(url_for(config, ""))
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    tracing::debug!("Preview started, redirecting to {}", location);

    Ok((
        [(header::SET_COOKIE, cookie.encoded().to_string())],
        Redirect::temporary(&location),
    )
        .into_response())
}

/// Leave preview mode
async fn exit_preview_handler(State(state): State<SharedState>) -> Response {
    let config = state.generator.config();
    let cookie = Cookie::build((config.preview.cookie.clone(), String::new()))
        .path(url_for(config, ""))
        .max_age(cookie::time::Duration::ZERO)
        .build();

    (
        [(header::SET_COOKIE, cookie.to_string())],
        Redirect::temporary(&url_for(config, "")),
    )
        .into_response()
}
