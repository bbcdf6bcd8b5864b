// [[MMSS]]/apps/studio-server/src/events.rs
// Purpose: Editor events broadcast after every store mutation.
// Architecture: Domain Event Layer
// Dependencies: Serde, Chrono, Uuid

use serde::{Deserialize, Serialize};
use serde_json::Value;
use chrono::Utc;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum EventType {
    /// A node was dropped onto the canvas from the palette
    NodeCreated,
    /// Properties form edit
    NodeUpdated,
    /// Drag gesture step
    NodeMoved,
    /// Node removed along with its connections
    NodeDeleted,
    SelectionChanged,
    ConnectionCreated,
    ConnectionRemoved,
    /// Objective function, semantic note or influence weights changed
    SettingsUpdated,
    /// Session store replaced with the seeded pipeline
    SessionReset,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorEvent {
    pub id: String,
    pub session_id: String,
    pub event_type: EventType,
    pub node_id: Option<String>,
    pub timestamp: String,
    pub payload: Value,
}

impl EditorEvent {
    pub fn new(session_id: &str, event_type: EventType, node_id: Option<String>, payload: Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            event_type,
            node_id,
            timestamp: Utc::now().to_rfc3339(),
            payload,
        }
    }
}
