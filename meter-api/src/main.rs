//! meter-api - Meter reading service
//!
//! Accepts meter photos, reads the value with a vision model, and stores
//! one reading per customer, category and month.

use anyhow::Result;
use clap::Parser;
use meter_api::config::resolve_gemini_settings;
use meter_api::db::{self, MemoryReadingStore, SqliteReadingStore};
use meter_api::services::{GeminiClient, LocalImageStorage, ReadingStore};
use meter_api::{build_router, AppState};
use meter_common::config::{
    resolve_port, resolve_public_base_url, CompiledDefaults, RootFolderInitializer,
    RootFolderResolver, TomlConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "meter-api", version, about = "Meter reading service")]
struct Args {
    /// HTTP port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Root folder holding meter.db and stored images
    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep readings in memory instead of SQLite
    #[arg(long)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let toml_config = TomlConfig::load_or_default(args.config.as_deref());

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&toml_config.logging.level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    info!(
        "Starting meter-api v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = RootFolderResolver::new("meter-api")
        .with_cli_arg(args.root_folder)
        .with_toml(&toml_config)
        .resolve();

    let initializer = RootFolderInitializer::new(root_folder);
    initializer.ensure_directory_exists()?;
    info!("Root folder: {}", initializer.root_folder().display());

    let store: Arc<dyn ReadingStore> = if args.in_memory {
        info!("Using in-memory reading store");
        Arc::new(MemoryReadingStore::new())
    } else {
        let db_path = initializer.database_path();
        info!("Database path: {}", db_path.display());
        let pool = match db::init_database_pool(&db_path).await {
            Ok(pool) => {
                info!("✓ Connected to database");
                pool
            }
            Err(e) => {
                error!("Failed to connect to database: {}", e);
                return Err(e.into());
            }
        };
        Arc::new(SqliteReadingStore::new(pool))
    };

    let gemini = resolve_gemini_settings(&toml_config)?;
    info!("Vision model: {}", gemini.model);
    let reader = GeminiClient::with_endpoint(gemini.api_key, gemini.base_url, gemini.model)?;

    let port = resolve_port(args.port, &toml_config)?;
    let host = toml_config
        .host
        .clone()
        .unwrap_or_else(|| CompiledDefaults::for_current_platform().host);
    let public_base_url = resolve_public_base_url(port, &toml_config);

    let image_dir = initializer.temp_dir();
    let images = LocalImageStorage::new(image_dir.clone(), public_base_url.clone());

    let state = AppState::new(store, Arc::new(reader), Arc::new(images), image_dir);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    info!("meter-api listening on http://{}:{}", host, port);
    info!("Images published under {}/temp", public_base_url);

    axum::serve(listener, app).await?;

    Ok(())
}
