//! Real-time collaboration relay for the web IDE.
//!
//! Clients connect over WebSockets at `ws://host:port/<roomId>` and exchange
//! opaque binary frames that the server fans out to the other members of the
//! same room. Code-editor rooms additionally mirror every update into a
//! server-side yrs replica so file content can be read back and saved on
//! demand.

pub mod classify;
pub mod config;
pub mod connection;
pub mod document;
pub mod handler;
pub mod lifecycle;
pub mod quota;
pub mod room;
pub mod save;

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use config::Settings;
use document::DocumentRegistry;
use quota::ConnectionQuota;
use room::RoomRegistry;
use save::{SaveError, SaveTrigger};

/// Shared state behind every handler: the process-wide singletons.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub registry: Arc<RoomRegistry>,
    pub documents: Arc<DocumentRegistry>,
    pub quota: Arc<ConnectionQuota>,
    pub save: Arc<SaveTrigger>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let documents = Arc::new(DocumentRegistry::new());
        let registry = RoomRegistry::new(
            documents.clone(),
            settings.grace_period(),
            settings.enable_code_editor_features,
        );
        let quota = Arc::new(ConnectionQuota::new(
            settings.max_connections_per_ip_per_room,
        ));
        let save = Arc::new(SaveTrigger::new(settings.api_base_url.clone()));
        Self {
            config: Arc::new(settings),
            registry,
            documents,
            quota,
            save,
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}

async fn status_handler(State(state): State<AppState>) -> Json<room::RelayStatus> {
    Json(state.registry.status().await)
}

async fn save_handler(State(state): State<AppState>, Path(room_id): Path<String>) -> Response {
    if !state.config.enable_code_editor_features {
        return (StatusCode::NOT_FOUND, "code editor features disabled").into_response();
    }
    match state.save.save_room(&state.documents, &room_id).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e @ SaveError::NotEligible(_)) => (StatusCode::NOT_FOUND, e.to_string()).into_response(),
        Err(e) => (StatusCode::BAD_GATEWAY, e.to_string()).into_response(),
    }
}

/// Build the full router: WebSocket relay at the root, admin and health
/// routes layered over it. The static admin paths never collide with room
/// ids, since no admissible room id matches them.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/admin/status", get(status_handler))
        .route("/admin/save/*room", post(save_handler))
        .route("/", get(handler::ws_root_handler))
        .route("/*room", get(handler::ws_room_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
