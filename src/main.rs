use std::sync::Arc;

use diagram_import::config::ServerConfig;
use diagram_import::store::{DiagramStore, HttpStore, MemoryStore};
use diagram_import::{routes, state};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env();

    let store: Arc<dyn DiagramStore> = match config.store_url.as_deref() {
        Some(url) => {
            tracing::info!(%url, "using remote diagram store");
            Arc::new(HttpStore::new(url, config.store_timeout_secs)?)
        }
        None => {
            tracing::warn!("DIAGRAM_STORE_URL not set; diagrams are kept in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let state = state::AppState::new(store, config.layout).with_undo_depth(config.undo_depth);
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;

    tracing::info!(port = config.port, "diagram-import listening");
    axum::serve(listener, app).await?;
    Ok(())
}
