//! spacetraveling: a blog front-end for a Prismic content repository
//!
//! Posts are fetched from the Prismic REST API, normalized into typed
//! [`content::Post`] values and rendered with embedded Tera templates, either
//! on demand by the HTTP server or ahead of time by the `generate` command.

pub mod cache;
pub mod client;
pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod generator;
pub mod helpers;
pub mod pagination;
pub mod preview;
pub mod server;
pub mod templates;

pub use error::{Error, Result};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use client::{ContentClient, PrismicClient};

/// The main spacetraveling application
#[derive(Clone)]
pub struct Spacetraveling {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
    /// Content store client
    pub client: Arc<dyn ContentClient>,
}

impl Spacetraveling {
    /// Create an instance from a directory, using credentials from
    /// `_config.yml` and the environment, with credentials given on the
    /// command line taking precedence
    pub fn with_overrides<P: AsRef<Path>>(
        base_dir: P,
        api_endpoint: Option<String>,
        access_token: Option<String>,
    ) -> anyhow::Result<Self> {
        let base_dir = base_dir.as_ref();
        let mut config = Self::load_config(base_dir)?;
        config.apply_env();
        config.apply_overrides(api_endpoint, access_token);

        let client = PrismicClient::from_config(&config.prismic)?;
        tracing::debug!("Using content store {}", client.endpoint());

        Ok(Self::with_client(base_dir, config, Arc::new(client)))
    }

    /// Read `_config.yml` from `base_dir`, falling back to defaults
    pub fn load_config<P: AsRef<Path>>(base_dir: P) -> anyhow::Result<config::SiteConfig> {
        let config_path = base_dir.as_ref().join("_config.yml");
        if config_path.exists() {
            config::SiteConfig::load(&config_path)
        } else {
            Ok(config::SiteConfig::default())
        }
    }

    /// Create an instance around an existing content client
    pub fn with_client<P: AsRef<Path>>(
        base_dir: P,
        config: config::SiteConfig,
        client: Arc<dyn ContentClient>,
    ) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        let public_dir = base_dir.join(&config.public_dir);

        Self {
            config,
            base_dir,
            public_dir,
            client,
        }
    }

    /// Generate the static site
    pub async fn generate(&self, force: bool) -> anyhow::Result<commands::generate::GenerateStats> {
        commands::generate::run(self, force).await
    }

    /// Clean the public directory
    pub fn clean(&self) -> anyhow::Result<()> {
        commands::clean::run(&self.base_dir, &self.public_dir)
    }
}
