use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use log::info;
use tokio::net::TcpListener;

use crate::components::TemplateSet;
use crate::config::{Config, StoreBackend};
use crate::errors::WikiError;
use crate::handlers::{
    handle_asset, handle_edit, handle_index, handle_not_found, handle_save, handle_view,
};
use crate::services::{ArticleStore, Bounded, FileStore, MemoryStore};
use crate::types::AppState;

/// Route table for the wiki
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handle_index))
        .route("/view/*title", get(handle_view))
        .route("/edit/*title", get(handle_edit))
        .route("/save/*title", post(handle_save))
        .route("/css/*path", get(handle_asset))
        .route("/js/*path", get(handle_asset))
        .route("/font/*path", get(handle_asset))
        .route("/img/*path", get(handle_asset))
        .fallback(handle_not_found)
        .with_state(state)
}

/// Open the configured article store, wrapped in the per-operation timeout
pub fn build_store(config: &Config) -> Result<Arc<dyn ArticleStore>, WikiError> {
    let store: Arc<dyn ArticleStore> = match config.store {
        StoreBackend::File => {
            std::fs::create_dir_all(&config.data_dir)?;
            info!("Storing articles in {:?}", config.data_dir);
            Arc::new(Bounded::new(FileStore::new(&config.data_dir), config.store_timeout))
        }
        StoreBackend::Memory => {
            info!("Storing articles in memory; they will not survive a restart");
            Arc::new(Bounded::new(MemoryStore::new(), config.store_timeout))
        }
    };
    Ok(store)
}

/// Everything a request needs, assembled once at startup
pub fn build_state(config: &Config) -> Result<AppState, WikiError> {
    let store = build_store(config)?;
    let templates = TemplateSet::load(&config.template_dir, config.site_name.clone())?;
    Ok(AppState::new(store, templates, config.asset_dir.clone()))
}

/// Bind the configured address and serve until interrupted
pub async fn serve(config: Config) -> Result<(), WikiError> {
    let state = build_state(&config)?;
    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!("Wiki listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(WikiError::from)
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}
