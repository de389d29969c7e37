mod catalog;
mod config_manager;
mod error;
mod gateway;
mod handlers;
mod language;
mod models;
mod resolver;
mod routes;
mod state;
mod store;
mod utils;

use anyhow::{Context, Result};
use axum::http::{HeaderValue, Method};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config_manager::{Config, SystemConfig};
use state::AppState;
use store::StoreFactory;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("vet_lookup=debug,tower_http=debug")),
        )
        .init();

    // Load configuration - try multiple paths
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| std::path::PathBuf::from("."));

    let config_paths: Vec<String> = vec![
        std::env::var("CONFIG_PATH").ok(),
        Some("conf.jsonld".to_string()),
        exe_dir.join("conf.jsonld").canonicalize().ok().and_then(|p| p.to_str().map(|s| s.to_string())),
        // Fallback to YAML
        Some("conf.yaml".to_string()),
        exe_dir.join("conf.yaml").canonicalize().ok().and_then(|p| p.to_str().map(|s| s.to_string())),
    ]
    .into_iter()
    .flatten()
    .collect();

    let mut config = None;
    let mut loaded_path = String::new();

    for path in &config_paths {
        match Config::load(path) {
            Ok(cfg) => {
                config = Some(cfg);
                loaded_path = path.clone();
                break;
            }
            Err(e) => {
                tracing::debug!("Failed to load config from {}: {}", path, e);
            }
        }
    }

    let config = config.ok_or_else(|| {
        anyhow::anyhow!("Could not find config file. Tried: {:?}", config_paths)
    })?;

    info!("Loaded configuration from: {}", loaded_path);

    let system_config = config.system_config.clone();
    let store = StoreFactory::create_store(&config.store_config, system_config.request_timeout())
        .await
        .context("Failed to initialize disease store")?;

    let app_state = AppState::new(config, store).await?;

    let app = Router::new()
        .merge(routes::create_routes())
        .layer(cors_layer(&system_config)?)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let addr = system_config.bind_addr()?;
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    Ok(())
}

/// Any origin when none are configured, otherwise only the listed ones.
fn cors_layer(system_config: &SystemConfig) -> Result<CorsLayer> {
    if system_config.allowed_origins.is_empty() {
        return Ok(CorsLayer::permissive());
    }
    let origins = system_config
        .allowed_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("Invalid allowed origin {:?}", origin))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET]))
}
