//! Site configuration (_config.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Environment variable holding the Prismic API endpoint
pub const ENV_API_ENDPOINT: &str = "PRISMIC_API_ENDPOINT";
/// Environment variable holding the Prismic access token
pub const ENV_ACCESS_TOKEN: &str = "PRISMIC_ACCESS_TOKEN";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub language: String,
    pub timezone: String,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub public_dir: String,

    // Date format (Moment.js style)
    pub date_format: String,

    // Listing
    pub per_page: usize,
    pub document_type: String,
    pub words_per_minute: usize,

    #[serde(default)]
    pub revalidate: RevalidateConfig,
    #[serde(default)]
    pub prismic: PrismicConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub load_more: LoadMoreConfig,
    #[serde(default)]
    pub comments: CommentsConfig,

    // Store any additional fields
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "spacetraveling".to_string(),
            description: String::new(),
            language: "pt-BR".to_string(),
            timezone: "America/Sao_Paulo".to_string(),

            url: "http://localhost:3000".to_string(),
            root: "/".to_string(),

            public_dir: "public".to_string(),

            date_format: "DD MMM YYYY".to_string(),

            per_page: 5,
            document_type: "post".to_string(),
            words_per_minute: 200,

            revalidate: RevalidateConfig::default(),
            prismic: PrismicConfig::default(),
            preview: PreviewConfig::default(),
            load_more: LoadMoreConfig::default(),
            comments: CommentsConfig::default(),
            extra: HashMap::new(),
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

    /// Overlay Prismic credentials from the process environment (and `.env`)
    pub fn apply_env(&mut self) {
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!("No .env file loaded: {}", e);
        }

        self.apply_overrides(
            std::env::var(ENV_API_ENDPOINT).ok(),
            std::env::var(ENV_ACCESS_TOKEN).ok(),
        );
    }

    /// Overlay Prismic credentials, ignoring empty values
    pub fn apply_overrides(&mut self, api_endpoint: Option<String>, access_token: Option<String>) {
        if let Some(endpoint) = api_endpoint.filter(|v| !v.trim().is_empty()) {
            self.prismic.api_endpoint = endpoint;
        }
        if let Some(token) = access_token.filter(|v| !v.trim().is_empty()) {
            self.prismic.access_token = Some(token);
        }
    }
}

/// Revalidation intervals for rendered pages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RevalidateConfig {
    pub listing_secs: u64,
    pub post_secs: u64,
}

impl RevalidateConfig {
    pub fn listing(&self) -> Duration {
        Duration::from_secs(self.listing_secs)
    }

    pub fn post(&self) -> Duration {
        Duration::from_secs(self.post_secs)
    }
}

impl Default for RevalidateConfig {
    fn default() -> Self {
        Self {
            listing_secs: 60 * 60 * 24,
            post_secs: 60 * 30,
        }
    }
}

/// Prismic repository configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrismicConfig {
    pub api_endpoint: String,
    pub access_token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for PrismicConfig {
    fn default() -> Self {
        Self {
            api_endpoint: String::new(),
            access_token: None,
            timeout_secs: 30,
        }
    }
}

/// Preview cookie configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub cookie_name: String,
    pub max_age_secs: u64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            cookie_name: "io.prismic.preview".to_string(),
            max_age_secs: 60 * 30,
        }
    }
}

/// "Load more" fetch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadMoreConfig {
    pub timeout_secs: u64,
}

impl LoadMoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for LoadMoreConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

/// Utterances comment widget configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentsConfig {
    /// GitHub repository (`owner/name`); empty disables comments
    pub repo: String,
    pub issue_term: String,
    pub theme: String,
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
        }
    }
}
