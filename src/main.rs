//! CLI entry point for spacetraveling

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spacetraveling::Spacetraveling;

#[derive(Parser)]
#[command(name = "spacetraveling")]
#[command(author = "Yukang Chen")]
#[command(version = "0.1.0")]
#[command(about = "A Prismic-backed blog server and static generator", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Prismic API endpoint (overrides _config.yml and PRISMIC_API_ENDPOINT)
    #[arg(long, global = true)]
    api_endpoint: Option<String>,

    /// Prismic access token (overrides _config.yml and PRISMIC_ACCESS_TOKEN)
    #[arg(long, global = true)]
    access_token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate static files
    #[command(alias = "g")]
    Generate {
        /// Regenerate every page, even those still fresh
        #[arg(short, long)]
        force: bool,
    },

    /// Start the blog server
    #[command(alias = "s")]
    Server {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,

        /// Open browser automatically
        #[arg(short, long)]
        open: bool,
    },

    /// Clean the public folder and generation manifest
    Clean,

    /// List posts from the content store
    List,

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "spacetraveling=debug,info"
    } else {
        "spacetraveling=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let open_site = || {
        Spacetraveling::with_overrides(
            &base_dir,
            cli.api_endpoint.clone(),
            cli.access_token.clone(),
        )
    };

    match cli.command {
        Commands::Generate { force } => {
            let site = open_site()?;
            tracing::info!("Generating static files...");
            site.generate(force).await?;
            println!("Generated successfully!");
        }

        Commands::Server { port, ip, open } => {
            let site = open_site()?;
            tracing::info!("Starting server at http://{}:{}", ip, port);
            spacetraveling::server::start(&site, &ip, port, open).await?;
        }

        Commands::Clean => {
            // No content store access needed
            let config = Spacetraveling::load_config(&base_dir)?;
            tracing::info!("Cleaning public folder...");
            spacetraveling::commands::clean::run(&base_dir, &base_dir.join(&config.public_dir))?;
            println!("Cleaned successfully!");
        }

        Commands::List => {
            let site = open_site()?;
            spacetraveling::commands::list::run(&site).await?;
        }

        Commands::Version => {
            println!("spacetraveling version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
