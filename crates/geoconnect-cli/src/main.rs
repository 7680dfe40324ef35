//! GeoConnect CLI - administration commands
//!
//! Usage:
//!   geoconnect init-indices
//!   geoconnect search --lat <lat> --lon <lon> [--range <km>] [--json]
//!   geoconnect delete-post <id>
//!   geoconnect delete-user <username>
//!   echo -n 'secret' | geoconnect hash-password

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use geoconnect_api::auth::CredentialHasher;
use geoconnect_core::config::AppConfig;
use geoconnect_core::{Credential, CredentialStore, Location, Post, PostStore};
use geoconnect_search::{ensure_indices, ElasticClient, EsCredentialStore, EsPostStore};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "geoconnect")]
#[command(about = "GeoConnect administration CLI")]
#[command(version)]
struct Cli {
    /// TOML config file (defaults to GEOCONNECT_CONFIG, then environment only)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the posts and users indices if they are missing
    InitIndices,
    /// Search posts around a point
    Search {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Radius in kilometers (default from config)
        #[arg(long)]
        range: Option<f64>,
        /// Print posts as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Delete a post by id, regardless of owner
    DeletePost { id: String },
    /// Delete a user's credential
    DeleteUser { username: String },
    /// Read a password from stdin and print its Argon2id digest
    HashPassword,
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::load()?,
    };
    Ok(config)
}

fn format_post(post: &Post) -> String {
    format!(
        "{}\t{}\t{:.5},{:.5}\t{}{}",
        post.id,
        post.user,
        post.location.lat,
        post.location.lon,
        post.message,
        post.url
            .as_deref()
            .map(|u| format!("\t{u}"))
            .unwrap_or_default()
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config).context("Failed to load configuration")?;

    match cli.command {
        Commands::InitIndices => {
            let es = ElasticClient::new(&config.search)?;
            ensure_indices(&es, &config.search).await?;
            println!(
                "Indices ready: {}, {}",
                config.search.posts_index, config.search.users_index
            );
        }
        Commands::Search {
            lat,
            lon,
            range,
            json,
        } => {
            let center = Location::new(lat, lon);
            center.validate()?;
            let range = range.unwrap_or(config.posts.default_range_km);
            if !range.is_finite() || range <= 0.0 {
                bail!("range must be a positive number of kilometers");
            }

            let es = Arc::new(ElasticClient::new(&config.search)?);
            let store = EsPostStore::new(es, config.search.posts_index.clone());
            let posts = store
                .search_radius(center, range, config.posts.search_limit)
                .await?;

            for post in &posts {
                if json {
                    println!(
                        "{}",
                        serde_json::json!({
                            "id": post.id,
                            "user": post.user,
                            "message": post.message,
                            "location": post.location,
                            "url": post.url,
                        })
                    );
                } else {
                    println!("{}", format_post(post));
                }
            }
            tracing::info!(hits = posts.len(), range_km = range, "Search complete");
        }
        Commands::DeletePost { id } => {
            let es = Arc::new(ElasticClient::new(&config.search)?);
            let store = EsPostStore::new(es, config.search.posts_index.clone());
            if !store.delete(&id).await? {
                bail!("post {id} not found");
            }
            println!("Deleted post {id}");
        }
        Commands::DeleteUser { username } => {
            let username = Credential::normalize_username(&username);
            let es = Arc::new(ElasticClient::new(&config.search)?);
            let store = EsCredentialStore::new(es, config.search.users_index.clone());
            if !store.delete(&username).await? {
                bail!("user {username} not found");
            }
            println!("Deleted user {username}");
        }
        Commands::HashPassword => {
            let mut password = String::new();
            std::io::stdin()
                .read_to_string(&mut password)
                .context("Failed to read password from stdin")?;
            let password = password.trim_end_matches(['\r', '\n']);
            if password.is_empty() {
                bail!("no password given on stdin");
            }

            let hasher =
                CredentialHasher::new(&config.auth.hashing, config.auth.max_password_bytes)?;
            println!("{}", hasher.hash(password)?);
        }
    }

    Ok(())
}
