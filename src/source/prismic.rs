//! HTTP client for the Prismic REST API (v2)

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use super::query::{belongs_to, Query};
use super::ContentSource;
use crate::config::ContentConfig;
use crate::content::document::ApiRoot;
use crate::content::ApiResponse;
use crate::error::BlogError;

/// Remote content repository
pub struct PrismicClient {
    endpoint: Url,
    access_token: Option<String>,
    http: reqwest::Client,
}

impl PrismicClient {
    /// Create a client for the configured endpoint
    pub fn new(config: &ContentConfig) -> Result<Self, BlogError> {
        if config.endpoint.trim().is_empty() {
            return Err(BlogError::Config(
                "content.endpoint is not set (or set PRISMIC_API_ENDPOINT)".to_string(),
            ));
        }
        let endpoint = Url::parse(config.endpoint.trim())
            .map_err(|e| BlogError::Config(format!("invalid endpoint {}: {e}", config.endpoint)))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("spacetraveling/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            endpoint,
            access_token: config.access_token.clone(),
            http,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Current master ref, read from the API root
    async fn fetch_master_ref(&self) -> Result<String, BlogError> {
        let root: ApiRoot = self.get_json(self.endpoint.clone()).await?;
        root.master_ref()
            .map(str::to_string)
            .ok_or_else(|| BlogError::Api {
                status: 200,
                message: "API root lists no master ref".to_string(),
            })
    }

    async fn get_json<T: DeserializeOwned>(&self, mut url: Url) -> Result<T, BlogError> {
        if let Some(token) = &self.access_token {
            if !url.query_pairs().any(|(k, _)| k == "access_token") {
                url.query_pairs_mut().append_pair("access_token", token);
            }
        }

        tracing::debug!("GET {}", redact(&url));
        let resp = self.http.get(url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BlogError::Api {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        Ok(resp.json::<T>().await?)
    }
}

#[async_trait]
impl ContentSource for PrismicClient {
    async fn query(&self, query: &Query) -> Result<ApiResponse, BlogError> {
        let mut query = query.clone();
        if query.reference.is_none() {
            query.reference = Some(self.fetch_master_ref().await?);
        }
        self.get_json(query.to_url(&self.endpoint)).await
    }

    async fn fetch_page(&self, cursor: &str) -> Result<ApiResponse, BlogError> {
        let url = Url::parse(cursor).map_err(|_| BlogError::InvalidCursor(cursor.to_string()))?;
        if !belongs_to(&url, &self.endpoint) {
            return Err(BlogError::InvalidCursor(cursor.to_string()));
        }
        self.get_json(url).await
    }

    fn name(&self) -> &'static str {
        "prismic"
    }

    async fn master_ref(&self) -> Result<Option<String>, BlogError> {
        self.fetch_master_ref().await.map(Some)
    }
}

/// URL for logging, without the access token
fn redact(url: &Url) -> String {
    let mut shown = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "access_token")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if pairs.is_empty() {
        shown.set_query(None);
    } else {
        shown.query_pairs_mut().clear().extend_pairs(pairs);
    }
    shown.to_string()
}
