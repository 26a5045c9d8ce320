//! Best-effort decorative image for the session summary.

use std::env;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::error::ImageLookupError;

pub const FALLBACK_IMAGE_URL: &str = "https://images.pexels.com/photos/2245436/pexels-photo-2245436.png?auto=compress&cs=tinysrgb&h=650&w=940";

static FALLBACK_IMAGE: LazyLock<Url> =
    LazyLock::new(|| Url::parse(FALLBACK_IMAGE_URL).expect("fallback image url is valid"));

/// The image shown when no provider answer is available.
#[must_use]
pub fn fallback_image() -> Url {
    FALLBACK_IMAGE.clone()
}

/// Source of a display image. Implementations never fail; they degrade to
/// [`fallback_image`].
#[async_trait]
pub trait ImageLookup: Send + Sync {
    async fn fetch_display_image(&self) -> Url;
}

/// Always returns the same image. Used in tests and offline runs.
#[derive(Debug, Clone)]
pub struct FixedImageLookup {
    url: Url,
}

impl FixedImageLookup {
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    #[must_use]
    pub fn fallback() -> Self {
        Self::new(fallback_image())
    }
}

#[async_trait]
impl ImageLookup for FixedImageLookup {
    async fn fetch_display_image(&self) -> Url {
        self.url.clone()
    }
}

#[derive(Clone, Debug)]
pub struct ImageLookupConfig {
    pub base_url: String,
    pub api_key: String,
    pub query: String,
    pub timeout: Duration,
}

impl ImageLookupConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.pexels.com/v1";
    pub const DEFAULT_QUERY: &'static str = "travel";
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Reads `PEXELS_API_KEY` and `GLOBE_IMAGE_QUERY`. `None` without a key.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("PEXELS_API_KEY").ok()?;
        let query = env::var("GLOBE_IMAGE_QUERY").unwrap_or_else(|_| Self::DEFAULT_QUERY.into());
        Self::new(api_key, query)
    }

    #[must_use]
    pub fn new(api_key: impl Into<String>, query: impl Into<String>) -> Option<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return None;
        }
        let mut query = query.into();
        if query.trim().is_empty() {
            query = Self::DEFAULT_QUERY.into();
        }
        Some(Self {
            base_url: Self::DEFAULT_BASE_URL.into(),
            api_key,
            query,
            timeout: Self::DEFAULT_TIMEOUT,
        })
    }
}

/// Searches the Pexels photo API for a single image.
#[derive(Clone)]
pub struct PexelsImageLookup {
    client: Client,
    config: Option<ImageLookupConfig>,
}

impl PexelsImageLookup {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(ImageLookupConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<ImageLookupConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    async fn search(&self) -> Result<Url, ImageLookupError> {
        let config = self.config.as_ref().ok_or(ImageLookupError::Disabled)?;

        let url = format!("{}/search", config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(url)
            .query(&[("query", config.query.as_str()), ("per_page", "1")])
            .header(AUTHORIZATION, &config.api_key)
            .timeout(config.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ImageLookupError::HttpStatus(response.status()));
        }

        let body: SearchResponse = response.json().await?;
        let photo = body
            .photos
            .into_iter()
            .next()
            .ok_or(ImageLookupError::EmptyResponse)?;

        Url::parse(&photo.src.large).map_err(|_| ImageLookupError::InvalidUrl(photo.src.large))
    }
}

#[async_trait]
impl ImageLookup for PexelsImageLookup {
    async fn fetch_display_image(&self) -> Url {
        match self.search().await {
            Ok(url) => url,
            Err(ImageLookupError::Disabled) => fallback_image(),
            Err(err) => {
                tracing::warn!(error = %err, "image lookup failed, using fallback");
                fallback_image()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    photos: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    src: PhotoSrc,
}

#[derive(Debug, Deserialize)]
struct PhotoSrc {
    large: String,
}
