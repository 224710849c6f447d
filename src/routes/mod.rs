//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! JSON endpoints over the import service. The layout preview is stateless;
//! every `/api/diagrams/{id}/...` route mutates through that diagram's queue.

pub mod diagrams;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The full HTTP surface bound to `state`.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/layout", post(diagrams::layout_preview))
        .route("/api/diagrams/{id}/import", post(diagrams::import_diagram))
        .route("/api/diagrams/{id}/restore", post(diagrams::restore_snapshot))
        .route("/api/diagrams/{id}/undo", post(diagrams::undo))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
