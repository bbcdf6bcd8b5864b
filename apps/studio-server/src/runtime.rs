// [[MMSS]]/apps/studio-server/src/runtime.rs
// Purpose: Owns one graph store per editor session and emits editor events on every mutation.
// Architecture: Domain Logic Layer
// Dependencies: dashmap, tokio, serde_json

use dashmap::DashMap;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

use crate::catalog::CatalogRegistry;
use crate::config::StudioConfig;
use crate::events::{EditorEvent, EventType};
use crate::export::{ExportError, ExportWriter};
use crate::models::*;
use crate::serializer::{self, ConfigDocument};
use crate::store::{GraphStore, StoreError};

struct Session {
    store: GraphStore,
    last_touched: Instant,
}

impl Session {
    fn seeded() -> Self {
        Session {
            store: GraphStore::seeded(),
            last_touched: Instant::now(),
        }
    }
}

pub struct StudioRuntime {
    sessions: DashMap<String, Session>,
    session_ttl: Duration,
    pub catalog: Arc<CatalogRegistry>,
    pub exporter: ExportWriter,
    pub event_bus: broadcast::Sender<EditorEvent>,
}

impl StudioRuntime {
    pub fn new(config: &StudioConfig) -> Self {
        Self::with_catalog(CatalogRegistry::load(&config.catalog_path), ExportWriter::new(&config.export_dir))
            .with_session_ttl(config.session_ttl)
    }

    pub fn with_catalog(catalog: CatalogRegistry, exporter: ExportWriter) -> Self {
        let (tx, _) = broadcast::channel(100);

        StudioRuntime {
            sessions: DashMap::new(),
            session_ttl: Duration::from_secs(crate::config::DEFAULT_SESSION_TTL_SECS),
            catalog: Arc::new(catalog),
            exporter,
            event_bus: tx,
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    // === EVENT EMISSION ===

    fn emit_event(&self, event: EditorEvent) {
        // No subscribers is fine
        let _ = self.event_bus.send(event);
    }

    /// Run `f` with exclusive access to the session's store, creating the
    /// seeded store on first touch. Only mutations go through here.
    fn with_session<R>(&self, session_id: &str, f: impl FnOnce(&mut GraphStore) -> R) -> R {
        if !self.sessions.contains_key(session_id) {
            self.evict_idle();
        }

        let mut session = self.sessions.entry(session_id.to_string()).or_insert_with(|| {
            tracing::info!("Opening editor session: {}", session_id);
            Session::seeded()
        });
        session.last_touched = Instant::now();
        f(&mut session.store)
    }

    /// Reads never create a session. An unknown session reads as the seeded
    /// pipeline it would start from.
    fn read_session<R>(&self, session_id: &str, f: impl FnOnce(&GraphStore) -> R) -> R {
        match self.sessions.get_mut(session_id) {
            Some(mut session) => {
                session.last_touched = Instant::now();
                f(&session.store)
            }
            None => f(&GraphStore::seeded()),
        }
    }

    /// Drops sessions idle for longer than the configured TTL.
    /// Must not be called while holding a session guard.
    fn evict_idle(&self) {
        let ttl = self.session_ttl;
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.last_touched.elapsed() < ttl);

        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            tracing::info!("Evicted {} idle editor session(s)", evicted);
        }
    }

    // === READS ===

    pub fn snapshot(&self, session_id: &str) -> GraphStore {
        self.read_session(session_id, |store| store.clone())
    }

    pub fn selection(&self, session_id: &str) -> Option<String> {
        self.read_session(session_id, |store| store.selected_node_id().map(str::to_string))
    }

    /// Recomputed from scratch on every call.
    pub fn document(&self, session_id: &str) -> ConfigDocument {
        let catalog = self.catalog.clone();
        self.read_session(session_id, |store| {
            serializer::serialize(
                store.nodes(),
                store.connections(),
                store.settings(),
                store.metrics(),
                catalog.roles(),
                catalog.patterns(),
            )
        })
    }

    pub fn export_document(&self, session_id: &str, filename: Option<&str>) -> Result<std::path::PathBuf, ExportError> {
        let document = self.document(session_id);
        self.exporter.write(filename, &document)
    }

    // === MUTATIONS ===

    pub fn add_node(&self, session_id: &str, role_id: &str) -> AgentNode {
        if self.catalog.role(role_id).is_none() {
            tracing::warn!("Adding node with unknown role '{}' in session {}", role_id, session_id);
        }
        let node = self.with_session(session_id, |store| store.add_node(role_id));

        self.emit_event(EditorEvent::new(
            session_id,
            EventType::NodeCreated,
            Some(node.id.clone()),
            json!({"role_id": role_id}),
        ));
        node
    }

    pub fn update_node(&self, session_id: &str, node_id: &str, patch: NodePatch) -> Result<AgentNode, StoreError> {
        let payload = serde_json::to_value(&patch).unwrap_or_default();
        let node = self.with_session(session_id, |store| store.update_node(node_id, patch).cloned())?;

        self.emit_event(EditorEvent::new(
            session_id,
            EventType::NodeUpdated,
            Some(node_id.to_string()),
            payload,
        ));
        Ok(node)
    }

    pub fn delete_node(&self, session_id: &str, node_id: &str) -> Result<AgentNode, StoreError> {
        let removed = self.with_session(session_id, |store| store.delete_node(node_id))?;

        self.emit_event(EditorEvent::new(
            session_id,
            EventType::NodeDeleted,
            Some(node_id.to_string()),
            json!({}),
        ));
        Ok(removed)
    }

    pub fn move_node(&self, session_id: &str, node_id: &str, position: Position) -> bool {
        let moved = self.with_session(session_id, |store| store.move_node(node_id, position.x, position.y));

        if moved {
            self.emit_event(EditorEvent::new(
                session_id,
                EventType::NodeMoved,
                Some(node_id.to_string()),
                json!({"x": position.x, "y": position.y}),
            ));
        } else {
            tracing::debug!("Ignoring move for missing node {} in session {}", node_id, session_id);
        }
        moved
    }

    pub fn set_selection(&self, session_id: &str, node_id: Option<&str>) -> Result<(), StoreError> {
        self.with_session(session_id, |store| store.set_selection(node_id))?;

        self.emit_event(EditorEvent::new(
            session_id,
            EventType::SelectionChanged,
            node_id.map(str::to_string),
            json!({}),
        ));
        Ok(())
    }

    pub fn add_connection(&self, session_id: &str, source: &str, target: &str, kind: ConnectionType) -> Connection {
        let connection = self.with_session(session_id, |store| store.add_connection(source, target, kind));

        self.emit_event(EditorEvent::new(
            session_id,
            EventType::ConnectionCreated,
            None,
            json!({"connection": connection}),
        ));
        connection
    }

    pub fn remove_connection(&self, session_id: &str, connection_id: &str) -> Result<Connection, StoreError> {
        let removed = self.with_session(session_id, |store| store.remove_connection(connection_id))?;

        self.emit_event(EditorEvent::new(
            session_id,
            EventType::ConnectionRemoved,
            None,
            json!({"connection_id": connection_id}),
        ));
        Ok(removed)
    }

    pub fn update_settings(&self, session_id: &str, patch: SettingsPatch) -> GlobalSettings {
        let settings = self.with_session(session_id, |store| store.update_settings(patch).clone());

        self.emit_event(EditorEvent::new(
            session_id,
            EventType::SettingsUpdated,
            None,
            json!({"settings": settings}),
        ));
        settings
    }

    pub fn reset_session(&self, session_id: &str) {
        self.with_session(session_id, |store| *store = GraphStore::seeded());
        tracing::info!("Reset editor session: {}", session_id);

        self.emit_event(EditorEvent::new(session_id, EventType::SessionReset, None, json!({})));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime() -> (tempfile::TempDir, StudioRuntime) {
        let dir = tempfile::tempdir().unwrap();
        let runtime = StudioRuntime::with_catalog(CatalogRegistry::builtin(), ExportWriter::new(dir.path()));
        (dir, runtime)
    }

    #[test]
    fn test_new_session_is_seeded() {
        let (_dir, runtime) = runtime();
        let snapshot = runtime.snapshot("tab-1");
        assert_eq!(snapshot.nodes().len(), 3);
        assert_eq!(snapshot.connections().len(), 2);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let (_dir, runtime) = runtime();
        runtime.add_node("tab-1", "GENETIC_MIXER");
        runtime.delete_node("tab-2", "agent_root").unwrap();

        assert_eq!(runtime.snapshot("tab-1").nodes().len(), 4);
        assert_eq!(runtime.snapshot("tab-1").connections().len(), 2);
        assert_eq!(runtime.snapshot("tab-2").nodes().len(), 2);
        assert!(runtime.snapshot("tab-2").connections().is_empty());
    }

    #[test]
    fn test_document_tracks_mutations() {
        let (_dir, runtime) = runtime();
        let before = runtime.document("s");
        assert_eq!(before.orchestration_graph.edges.len(), 2);

        runtime.delete_node("s", "agent_mixer").unwrap();
        let after = runtime.document("s");
        assert_eq!(after.orchestration_graph.nodes.len(), 2);
        assert_eq!(after.orchestration_graph.edges.len(), 1);
        assert!(after.runtime_bindings.mistral_agents.agents.is_empty());
    }

    #[test]
    fn test_mutations_emit_events() {
        let (_dir, runtime) = runtime();
        let mut rx = runtime.event_bus.subscribe();

        let node = runtime.add_node("s", "MMSS_ARCHITECT");
        assert!(runtime.move_node("s", &node.id, Position { x: 1.0, y: 2.0 }));
        assert!(!runtime.move_node("s", "ghost", Position { x: 1.0, y: 2.0 }));
        runtime.set_selection("s", Some(node.id.as_str())).unwrap();

        let kinds: Vec<EventType> = (0..3).map(|_| rx.try_recv().unwrap().event_type).collect();
        assert_eq!(
            kinds,
            vec![EventType::NodeCreated, EventType::NodeMoved, EventType::SelectionChanged]
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_failed_mutation_emits_nothing() {
        let (_dir, runtime) = runtime();
        let mut rx = runtime.event_bus.subscribe();

        assert!(runtime.update_node("s", "ghost", NodePatch::default()).is_err());
        assert!(runtime.remove_connection("s", "ghost").is_err());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_reset_restores_seed() {
        let (_dir, runtime) = runtime();
        runtime.delete_node("s", "agent_root").unwrap();
        runtime.reset_session("s");
        assert!(runtime.snapshot("s").node("agent_root").is_some());
    }

    #[test]
    fn test_reads_do_not_open_sessions() {
        let (_dir, runtime) = runtime();
        for i in 0..50 {
            let client = format!("reader-{i}");
            assert_eq!(runtime.snapshot(&client).nodes().len(), 3);
            assert_eq!(runtime.document(&client).orchestration_graph.nodes.len(), 3);
            assert_eq!(runtime.selection(&client), None);
        }
        assert_eq!(runtime.session_count(), 0);

        runtime.add_node("writer", "MMSS_ARCHITECT");
        assert_eq!(runtime.session_count(), 1);
        assert_eq!(runtime.snapshot("writer").nodes().len(), 4);
    }

    #[test]
    fn test_idle_sessions_are_evicted_when_a_new_one_opens() {
        let (_dir, runtime) = runtime();
        let runtime = runtime.with_session_ttl(Duration::ZERO);

        runtime.delete_node("old", "agent_root").unwrap();
        assert_eq!(runtime.session_count(), 1);

        runtime.delete_node("new", "agent_arch").unwrap();
        assert_eq!(runtime.session_count(), 1);
        assert_eq!(runtime.snapshot("old").nodes().len(), 3);
        assert!(runtime.snapshot("new").node("agent_arch").is_none());
    }

    #[test]
    fn test_active_sessions_survive_eviction() {
        let (_dir, runtime) = runtime();

        runtime.delete_node("a", "agent_root").unwrap();
        runtime.delete_node("b", "agent_root").unwrap();
        assert_eq!(runtime.session_count(), 2);
        assert_eq!(runtime.snapshot("a").nodes().len(), 2);
    }

    #[test]
    fn test_selection_read() {
        let (_dir, runtime) = runtime();
        runtime.set_selection("s", Some("agent_arch")).unwrap();
        assert_eq!(runtime.selection("s").as_deref(), Some("agent_arch"));
    }

    #[test]
    fn test_export_document_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = StudioRuntime::with_catalog(CatalogRegistry::builtin(), ExportWriter::new(dir.path()));

        let path = runtime.export_document("s", Some("pipeline")).unwrap();
        assert_eq!(path, dir.path().join("pipeline.json"));
        let text = std::fs::read_to_string(path).unwrap();
        assert_eq!(text, serializer::to_pretty_json(&runtime.document("s")).unwrap());
    }
}
