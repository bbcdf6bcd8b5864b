pub mod handlers;

use axum::{
    Router,
    routing::{get, post, patch, delete},
    http::Method,
};
use std::sync::Arc;
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::TraceLayer;

use crate::runtime::StudioRuntime;

pub fn router(runtime: Arc<StudioRuntime>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/catalog/roles", get(handlers::list_roles))
        .route("/catalog/patterns", get(handlers::list_patterns))
        .route("/graph", get(handlers::get_graph))
        .route("/graph/reset", post(handlers::reset_graph))
        .route("/graph/nodes", post(handlers::add_node))
        .route("/graph/nodes/:node_id", patch(handlers::update_node).delete(handlers::delete_node))
        .route("/graph/nodes/:node_id/move", post(handlers::move_node))
        .route("/graph/selection", get(handlers::get_selection).put(handlers::set_selection))
        .route("/graph/connections", post(handlers::add_connection))
        .route("/graph/connections/:connection_id", delete(handlers::remove_connection))
        .route("/graph/settings", patch(handlers::update_settings))
        .route("/document", get(handlers::get_document))
        .route("/document/export", get(handlers::download_document).post(handlers::export_document))
        .route("/ws/document", get(handlers::ws_document_stream))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(runtime)
}
