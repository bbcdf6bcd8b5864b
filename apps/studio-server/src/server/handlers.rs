// [[MMSS]]/apps/studio-server/src/server/handlers.rs
// Purpose: API Handlers. Map editor interactions onto the session store and serve the document.
// Architecture: API Layer
// Dependencies: Axum, Runtime

use axum::{
    body::Bytes,
    extract::{Path, State, Json, ws::{WebSocket, WebSocketUpgrade}},
    http::{header, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use futures::{sink::SinkExt, stream::StreamExt};
use axum::extract::ws::Message;
use tokio::sync::broadcast::error::RecvError;

use crate::events::EditorEvent;
use crate::export::{ExportError, DEFAULT_EXPORT_FILENAME};
use crate::models::*;
use crate::runtime::StudioRuntime;
use crate::security::ClientSession;
use crate::serializer;
use crate::store::{GraphStore, StoreError};

#[derive(Deserialize)]
pub struct AddNodeRequest {
    role_id: String,
}

#[derive(Deserialize)]
pub struct SelectionRequest {
    #[serde(default)]
    node_id: Option<String>,
}

#[derive(Deserialize)]
pub struct AddConnectionRequest {
    source: String,
    target: String,
    #[serde(rename = "type")]
    kind: ConnectionType,
}

#[derive(Deserialize, Default)]
pub struct ExportRequest {
    #[serde(default)]
    filename: Option<String>,
}

#[derive(serde::Serialize)]
pub struct HealthResponse {
    status: String,
    message: String,
    active_sessions: usize,
}

fn store_error_status(e: StoreError) -> StatusCode {
    tracing::debug!("Store lookup failed: {}", e);
    StatusCode::NOT_FOUND
}

pub async fn health(State(runtime): State<Arc<StudioRuntime>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "MMSS Studio Server is running".to_string(),
        active_sessions: runtime.session_count(),
    })
}

pub async fn list_roles(State(runtime): State<Arc<StudioRuntime>>) -> Json<Vec<AgentRoleDefinition>> {
    Json(runtime.catalog.roles().to_vec())
}

pub async fn list_patterns(State(runtime): State<Arc<StudioRuntime>>) -> Json<Vec<PatternDefinition>> {
    Json(runtime.catalog.patterns().to_vec())
}

pub async fn get_graph(
    State(runtime): State<Arc<StudioRuntime>>,
    ClientSession(session): ClientSession,
) -> Json<GraphStore> {
    Json(runtime.snapshot(&session))
}

pub async fn reset_graph(
    State(runtime): State<Arc<StudioRuntime>>,
    ClientSession(session): ClientSession,
) -> Json<GraphStore> {
    runtime.reset_session(&session);
    Json(runtime.snapshot(&session))
}

pub async fn add_node(
    State(runtime): State<Arc<StudioRuntime>>,
    ClientSession(session): ClientSession,
    Json(req): Json<AddNodeRequest>,
) -> (StatusCode, Json<AgentNode>) {
    let node = runtime.add_node(&session, &req.role_id);
    tracing::info!("Session {} added node {} ({})", session, node.id, node.role_id);
    (StatusCode::CREATED, Json(node))
}

pub async fn update_node(
    State(runtime): State<Arc<StudioRuntime>>,
    ClientSession(session): ClientSession,
    Path(node_id): Path<String>,
    Json(patch): Json<NodePatch>,
) -> Result<Json<AgentNode>, StatusCode> {
    runtime
        .update_node(&session, &node_id, patch)
        .map(Json)
        .map_err(store_error_status)
}

pub async fn delete_node(
    State(runtime): State<Arc<StudioRuntime>>,
    ClientSession(session): ClientSession,
    Path(node_id): Path<String>,
) -> StatusCode {
    match runtime.delete_node(&session, &node_id) {
        Ok(_) => StatusCode::NO_CONTENT,
        Err(e) => store_error_status(e),
    }
}

pub async fn move_node(
    State(runtime): State<Arc<StudioRuntime>>,
    ClientSession(session): ClientSession,
    Path(node_id): Path<String>,
    Json(position): Json<Position>,
) -> Json<serde_json::Value> {
    // A node deleted mid-drag is not an error for the canvas
    let moved = runtime.move_node(&session, &node_id, position);
    Json(json!({ "moved": moved }))
}

pub async fn get_selection(
    State(runtime): State<Arc<StudioRuntime>>,
    ClientSession(session): ClientSession,
) -> Json<serde_json::Value> {
    Json(json!({ "node_id": runtime.selection(&session) }))
}

pub async fn set_selection(
    State(runtime): State<Arc<StudioRuntime>>,
    ClientSession(session): ClientSession,
    Json(req): Json<SelectionRequest>,
) -> StatusCode {
    match runtime.set_selection(&session, req.node_id.as_deref()) {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(e) => store_error_status(e),
    }
}

pub async fn add_connection(
    State(runtime): State<Arc<StudioRuntime>>,
    ClientSession(session): ClientSession,
    Json(req): Json<AddConnectionRequest>,
) -> (StatusCode, Json<Connection>) {
    let connection = runtime.add_connection(&session, &req.source, &req.target, req.kind);
    (StatusCode::CREATED, Json(connection))
}

pub async fn remove_connection(
    State(runtime): State<Arc<StudioRuntime>>,
    ClientSession(session): ClientSession,
    Path(connection_id): Path<String>,
) -> StatusCode {
    match runtime.remove_connection(&session, &connection_id) {
        Ok(_) => StatusCode::NO_CONTENT,
        Err(e) => store_error_status(e),
    }
}

pub async fn update_settings(
    State(runtime): State<Arc<StudioRuntime>>,
    ClientSession(session): ClientSession,
    Json(patch): Json<SettingsPatch>,
) -> Json<GlobalSettings> {
    Json(runtime.update_settings(&session, patch))
}

/// Pretty-printed document, the "JSON Source" tab.
pub async fn get_document(
    State(runtime): State<Arc<StudioRuntime>>,
    ClientSession(session): ClientSession,
) -> Result<impl IntoResponse, StatusCode> {
    let body = serializer::to_pretty_json(&runtime.document(&session)).map_err(|e| {
        tracing::error!("Failed to render document: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(([(header::CONTENT_TYPE, "application/json")], body))
}

pub async fn download_document(
    State(runtime): State<Arc<StudioRuntime>>,
    ClientSession(session): ClientSession,
) -> Result<impl IntoResponse, StatusCode> {
    let body = serializer::to_pretty_json(&runtime.document(&session)).map_err(|e| {
        tracing::error!("Failed to render document: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    let disposition = format!("attachment; filename=\"{}\"", DEFAULT_EXPORT_FILENAME);

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

pub async fn export_document(
    State(runtime): State<Arc<StudioRuntime>>,
    ClientSession(session): ClientSession,
    body: Bytes,
) -> Result<Json<serde_json::Value>, StatusCode> {
    // An empty body exports under the default name
    let req = if body.is_empty() {
        ExportRequest::default()
    } else {
        let Json(req) = Json::<ExportRequest>::from_bytes(&body).map_err(|rejection| {
            tracing::warn!("Rejected export request body: {}", rejection.body_text());
            StatusCode::BAD_REQUEST
        })?;
        req
    };

    match runtime.export_document(&session, req.filename.as_deref()) {
        Ok(path) => Ok(Json(json!({
            "success": true,
            "path": path.display().to_string(),
        }))),
        Err(ExportError::InvalidFilename(name)) => {
            tracing::warn!("Rejected export filename: {}", name);
            Err(StatusCode::BAD_REQUEST)
        }
        Err(e) => {
            tracing::error!("Failed to export document for {}: {}", session, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub async fn ws_document_stream(
    State(runtime): State<Arc<StudioRuntime>>,
    ClientSession(session): ClientSession,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_document_stream(socket, runtime, session))
}

/// What the document stream does with one item from the event bus.
#[derive(Debug)]
enum StreamAction {
    /// Push the recomputed document. `None` after a lag, when the
    /// triggering events were dropped.
    Push(Option<EditorEvent>),
    Skip,
    Close,
}

fn stream_action(received: Result<EditorEvent, RecvError>, session: &str) -> StreamAction {
    match received {
        Ok(event) if event.session_id == session => StreamAction::Push(Some(event)),
        Ok(_) => StreamAction::Skip,
        Err(RecvError::Lagged(skipped)) => {
            tracing::warn!("Document stream for {} lagged by {} events", session, skipped);
            StreamAction::Push(None)
        }
        Err(RecvError::Closed) => StreamAction::Close,
    }
}

fn document_update(runtime: &StudioRuntime, session: &str, event: Option<&EditorEvent>) -> Option<String> {
    let update = json!({
        "type": "document_update",
        "event": event,
        "document": runtime.document(session),
        "timestamp": chrono::Utc::now().to_rfc3339()
    });
    serde_json::to_string(&update).ok()
}

async fn handle_document_stream(
    socket: WebSocket,
    runtime: Arc<StudioRuntime>,
    session: String,
) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = runtime.event_bus.subscribe();

    // Send initial document
    if let Some(text) = document_update(&runtime, &session, None) {
        if sender.send(Message::Text(text)).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            // Check for client disconnect
            msg = receiver.next() => {
                if msg.is_none() {
                    tracing::info!("Client disconnected from document stream: {}", session);
                    break;
                }
            }

            received = events.recv() => {
                match stream_action(received, &session) {
                    StreamAction::Push(event) => {
                        let Some(text) = document_update(&runtime, &session, event.as_ref()) else { continue };
                        if sender.send(Message::Text(text)).await.is_err() {
                            tracing::info!("Failed to send document update, client disconnected");
                            break;
                        }
                    }
                    StreamAction::Skip => continue,
                    StreamAction::Close => break,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogRegistry;
    use crate::events::EventType;
    use crate::export::ExportWriter;

    fn moved(session: &str) -> EditorEvent {
        EditorEvent::new(session, EventType::NodeMoved, Some("agent_root".to_string()), json!({"x": 1.0, "y": 2.0}))
    }

    #[test]
    fn test_stream_pushes_only_own_session() {
        match stream_action(Ok(moved("alice")), "alice") {
            StreamAction::Push(Some(event)) => assert_eq!(event.event_type, EventType::NodeMoved),
            other => panic!("expected push, got {:?}", other),
        }
        assert!(matches!(stream_action(Ok(moved("bob")), "alice"), StreamAction::Skip));
    }

    #[test]
    fn test_stream_resends_after_lag_and_stops_when_closed() {
        assert!(matches!(
            stream_action(Err(RecvError::Lagged(3)), "alice"),
            StreamAction::Push(None)
        ));
        assert!(matches!(stream_action(Err(RecvError::Closed), "alice"), StreamAction::Close));
    }

    #[tokio::test]
    async fn test_bus_events_drive_per_session_pushes() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = StudioRuntime::with_catalog(CatalogRegistry::builtin(), ExportWriter::new(dir.path()));
        let mut events = runtime.event_bus.subscribe();

        runtime.delete_node("alice", "agent_mixer").unwrap();
        runtime.add_node("bob", "MMSS_ARCHITECT");

        let event = match stream_action(events.recv().await, "alice") {
            StreamAction::Push(event) => event,
            other => panic!("expected push, got {:?}", other),
        };
        let text = document_update(&runtime, "alice", event.as_ref()).unwrap();
        let frame: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(frame["type"], "document_update");
        assert_eq!(frame["event"]["event_type"], "NodeDeleted");
        assert_eq!(frame["event"]["node_id"], "agent_mixer");
        assert_eq!(frame["document"]["ORCHESTRATION_GRAPH"]["nodes"].as_array().unwrap().len(), 2);

        assert!(matches!(stream_action(events.recv().await, "alice"), StreamAction::Skip));
    }

    #[test]
    fn test_initial_frame_has_no_event() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = StudioRuntime::with_catalog(CatalogRegistry::builtin(), ExportWriter::new(dir.path()));

        let frame: serde_json::Value =
            serde_json::from_str(&document_update(&runtime, "fresh", None).unwrap()).unwrap();
        assert!(frame["event"].is_null());
        assert_eq!(frame["document"]["ORCHESTRATION_GRAPH"]["nodes"].as_array().unwrap().len(), 3);
    }
}
