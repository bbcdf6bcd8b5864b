use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::metrics::{self, Metric, MetricId};
use crate::models::*;

/// Area new nodes are dropped into, as `[min, max)` on both axes.
const SPAWN_MIN: f64 = 100.0;
const SPAWN_MAX: f64 = 500.0;
const COMPLEXITY_STEP: f64 = 0.001;

#[derive(Error, Debug, PartialEq)]
pub enum StoreError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),
    #[error("Connection not found: {0}")]
    ConnectionNotFound(String),
}

/// Editable pipeline state for one editor session.
#[derive(Debug, Clone, Serialize)]
pub struct GraphStore {
    nodes: Vec<AgentNode>,
    connections: Vec<Connection>,
    settings: GlobalSettings,
    metrics: Vec<Metric>,
    selected_node_id: Option<String>,
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphStore {
    pub fn new() -> Self {
        GraphStore {
            nodes: Vec::new(),
            connections: Vec::new(),
            settings: GlobalSettings::default(),
            metrics: metrics::initial_metrics(),
            selected_node_id: None,
        }
    }

    /// Starting pipeline every new session opens with.
    pub fn seeded() -> Self {
        let mut store = Self::new();
        store.nodes = vec![
            AgentNode {
                id: "agent_root".to_string(),
                position: Position { x: 300.0, y: 100.0 },
                role_id: "MMSS_ORCHESTRATOR".to_string(),
                custom_name: Some("Main Brain".to_string()),
                runtime_config: RuntimeConfig {
                    model: "gemini-3-pro-preview".to_string(),
                    temperature: 0.7,
                },
                tools: None,
            },
            AgentNode {
                id: "agent_arch".to_string(),
                position: Position { x: 100.0, y: 300.0 },
                role_id: "MMSS_ARCHITECT".to_string(),
                custom_name: None,
                runtime_config: RuntimeConfig {
                    model: "gemini-3-flash-preview".to_string(),
                    temperature: 0.2,
                },
                tools: None,
            },
            AgentNode {
                id: "agent_mixer".to_string(),
                position: Position { x: 500.0, y: 300.0 },
                role_id: "MIXER_AGENT".to_string(),
                custom_name: None,
                runtime_config: RuntimeConfig {
                    model: "mistral-large-latest".to_string(),
                    temperature: 0.9,
                },
                tools: None,
            },
        ];
        store.connections = vec![
            Connection {
                id: "c1".to_string(),
                source: "agent_root".to_string(),
                target: "agent_arch".to_string(),
                kind: ConnectionType::Delegation,
            },
            Connection {
                id: "c2".to_string(),
                source: "agent_root".to_string(),
                target: "agent_mixer".to_string(),
                kind: ConnectionType::Flow,
            },
        ];
        store
    }

    pub fn nodes(&self) -> &[AgentNode] {
        &self.nodes
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn settings(&self) -> &GlobalSettings {
        &self.settings
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn selected_node_id(&self) -> Option<&str> {
        self.selected_node_id.as_deref()
    }

    pub fn node(&self, id: &str) -> Option<&AgentNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    // === NODE OPERATIONS ===

    /// Add a node for `role_id` at a random spot in the spawn area.
    pub fn add_node(&mut self, role_id: &str) -> AgentNode {
        self.add_node_with_rng(role_id, &mut rand::thread_rng())
    }

    pub fn add_node_with_rng<R: Rng>(&mut self, role_id: &str, rng: &mut R) -> AgentNode {
        let node = AgentNode {
            id: format!("agent_{}", Uuid::new_v4().simple()),
            position: Position {
                x: rng.gen_range(SPAWN_MIN..SPAWN_MAX),
                y: rng.gen_range(SPAWN_MIN..SPAWN_MAX),
            },
            role_id: role_id.to_string(),
            custom_name: None,
            runtime_config: RuntimeConfig::default(),
            tools: None,
        };
        self.nodes.push(node.clone());
        metrics::nudge(&mut self.metrics, MetricId::FractalDimension, COMPLEXITY_STEP);
        node
    }

    /// Merge the supplied fields into the node. Absent fields are untouched.
    pub fn update_node(&mut self, id: &str, patch: NodePatch) -> Result<&AgentNode, StoreError> {
        let node = self
            .nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| StoreError::NodeNotFound(id.to_string()))?;

        if let Some(role_id) = patch.role_id {
            node.role_id = role_id;
        }
        if let Some(custom_name) = patch.custom_name {
            node.custom_name = Some(custom_name);
        }
        if let Some(runtime) = patch.runtime_config {
            if let Some(model) = runtime.model {
                node.runtime_config.model = model;
            }
            if let Some(temperature) = runtime.temperature {
                node.runtime_config.temperature = temperature;
            }
        }
        if let Some(tools) = patch.tools {
            node.tools = Some(tools);
        }
        if let Some(position) = patch.position {
            node.position = position;
        }

        Ok(node)
    }

    /// Remove the node and every connection touching it.
    pub fn delete_node(&mut self, id: &str) -> Result<AgentNode, StoreError> {
        let index = self
            .nodes
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| StoreError::NodeNotFound(id.to_string()))?;

        let removed = self.nodes.remove(index);
        self.connections.retain(|c| c.source != id && c.target != id);

        if self.selected_node_id.as_deref() == Some(id) {
            self.selected_node_id = None;
        }

        Ok(removed)
    }

    /// Drag update. Returns false when the node vanished mid-gesture.
    pub fn move_node(&mut self, id: &str, x: f64, y: f64) -> bool {
        match self.nodes.iter_mut().find(|n| n.id == id) {
            Some(node) => {
                node.position = Position { x, y };
                true
            }
            None => false,
        }
    }

    pub fn set_selection(&mut self, id: Option<&str>) -> Result<(), StoreError> {
        match id {
            Some(id) if self.node(id).is_none() => Err(StoreError::NodeNotFound(id.to_string())),
            Some(id) => {
                self.selected_node_id = Some(id.to_string());
                Ok(())
            }
            None => {
                self.selected_node_id = None;
                Ok(())
            }
        }
    }

    // === CONNECTION OPERATIONS ===

    /// Endpoints are not checked here; the serializer drops dangling edges.
    pub fn add_connection(&mut self, source: &str, target: &str, kind: ConnectionType) -> Connection {
        let connection = Connection {
            id: format!("c_{}", Uuid::new_v4().simple()),
            source: source.to_string(),
            target: target.to_string(),
            kind,
        };
        self.connections.push(connection.clone());
        connection
    }

    pub fn remove_connection(&mut self, id: &str) -> Result<Connection, StoreError> {
        let index = self
            .connections
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| StoreError::ConnectionNotFound(id.to_string()))?;
        Ok(self.connections.remove(index))
    }

    // === SETTINGS ===

    pub fn update_settings(&mut self, patch: SettingsPatch) -> &GlobalSettings {
        if let Some(objective) = patch.objective_function {
            self.settings.objective_function = objective;
        }
        if let Some(note) = patch.semantic_injection {
            self.settings.semantic_injection = note;
        }
        if let Some(influence) = patch.prompt_influence {
            let weights = &mut self.settings.prompt_influence;
            if let Some(prompt) = influence.prompt {
                weights.prompt = prompt;
            }
            if let Some(tools) = influence.tools {
                weights.tools = tools;
            }
            if let Some(schema) = influence.schema {
                weights.schema = schema;
            }
        }
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn node(id: &str) -> AgentNode {
        AgentNode {
            id: id.to_string(),
            position: Position::default(),
            role_id: "MMSS_ARCHITECT".to_string(),
            custom_name: None,
            runtime_config: RuntimeConfig::default(),
            tools: None,
        }
    }

    fn abc_store() -> GraphStore {
        let mut store = GraphStore::new();
        store.nodes = vec![node("a"), node("b"), node("c")];
        store.add_connection("a", "b", ConnectionType::Flow);
        store.add_connection("b", "c", ConnectionType::Delegation);
        store
    }

    #[test]
    fn test_add_node_defaults() {
        let mut store = GraphStore::new();
        let mut rng = StdRng::seed_from_u64(7);
        let created = store.add_node_with_rng("GENETIC_MIXER", &mut rng);

        assert!(created.id.starts_with("agent_"));
        assert_eq!(created.role_id, "GENETIC_MIXER");
        assert_eq!(created.runtime_config, RuntimeConfig::default());
        assert!(created.custom_name.is_none());
        assert!((SPAWN_MIN..SPAWN_MAX).contains(&created.position.x));
        assert!((SPAWN_MIN..SPAWN_MAX).contains(&created.position.y));
        assert_eq!(store.nodes().len(), 1);
    }

    #[test]
    fn test_add_node_ids_are_unique() {
        let mut store = GraphStore::new();
        let first = store.add_node("MMSS_ARCHITECT");
        let second = store.add_node("MMSS_ARCHITECT");
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_add_node_nudges_complexity() {
        let mut store = GraphStore::new();
        store.add_node("MMSS_ARCHITECT");
        store.add_node("MMSS_ARCHITECT");

        let fractal = store
            .metrics()
            .iter()
            .find(|m| m.id == MetricId::FractalDimension)
            .unwrap();
        assert!((fractal.value - 9.0023).abs() < 1e-9);
    }

    #[test]
    fn test_delete_cascades_connections() {
        let mut store = abc_store();
        store.delete_node("b").unwrap();

        let ids: Vec<&str> = store.nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert!(store.connections().is_empty());
    }

    #[test]
    fn test_delete_leaves_unrelated_connections() {
        let mut store = abc_store();
        let kept = store.add_connection("a", "c", ConnectionType::Feedback);
        store.delete_node("b").unwrap();

        assert_eq!(store.connections(), &[kept]);
    }

    #[test]
    fn test_delete_clears_selection_only_for_deleted_node() {
        let mut store = abc_store();
        store.set_selection(Some("a")).unwrap();
        store.delete_node("b").unwrap();
        assert_eq!(store.selected_node_id(), Some("a"));

        store.delete_node("a").unwrap();
        assert_eq!(store.selected_node_id(), None);
    }

    #[test]
    fn test_delete_unknown_node() {
        let mut store = abc_store();
        assert_eq!(
            store.delete_node("ghost"),
            Err(StoreError::NodeNotFound("ghost".to_string()))
        );
        assert_eq!(store.nodes().len(), 3);
        assert_eq!(store.connections().len(), 2);
    }

    #[test]
    fn test_update_merges_named_fields_only() {
        let mut store = abc_store();
        let before = store.node("a").unwrap().clone();

        store
            .update_node(
                "a",
                NodePatch {
                    custom_name: Some("X".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        let after = store.node("a").unwrap();
        assert_eq!(after.custom_name.as_deref(), Some("X"));
        assert_eq!(after.runtime_config, before.runtime_config);
        assert_eq!(after.role_id, before.role_id);
        assert_eq!(after.position, before.position);
        assert_eq!(after.tools, before.tools);
    }

    #[test]
    fn test_update_runtime_config_per_field() {
        let mut store = abc_store();
        store
            .update_node(
                "b",
                NodePatch {
                    runtime_config: Some(RuntimeConfigPatch {
                        model: None,
                        temperature: Some(0.1),
                    }),
                    ..Default::default()
                },
            )
            .unwrap();

        let cfg = &store.node("b").unwrap().runtime_config;
        assert_eq!(cfg.model, "gemini-3-flash-preview");
        assert_eq!(cfg.temperature, 0.1);
    }

    #[test]
    fn test_update_unknown_node() {
        let mut store = abc_store();
        let result = store.update_node("ghost", NodePatch::default());
        assert_eq!(result.unwrap_err(), StoreError::NodeNotFound("ghost".to_string()));
    }

    #[test]
    fn test_move_node_allows_overlap_and_ignores_missing() {
        let mut store = abc_store();
        assert!(store.move_node("a", -40.0, 12.5));
        assert!(store.move_node("b", -40.0, 12.5));
        assert_eq!(store.node("a").unwrap().position, store.node("b").unwrap().position);

        assert!(!store.move_node("ghost", 1.0, 1.0));
    }

    #[test]
    fn test_selection_is_single() {
        let mut store = abc_store();
        store.set_selection(Some("a")).unwrap();
        store.set_selection(Some("c")).unwrap();
        assert_eq!(store.selected_node_id(), Some("c"));

        assert!(store.set_selection(Some("ghost")).is_err());
        assert_eq!(store.selected_node_id(), Some("c"));

        store.set_selection(None).unwrap();
        assert_eq!(store.selected_node_id(), None);
    }

    #[test]
    fn test_remove_connection() {
        let mut store = abc_store();
        let id = store.connections()[0].id.clone();
        store.remove_connection(&id).unwrap();
        assert_eq!(store.connections().len(), 1);
        assert!(matches!(
            store.remove_connection(&id),
            Err(StoreError::ConnectionNotFound(_))
        ));
    }

    #[test]
    fn test_update_settings_merges() {
        let mut store = GraphStore::new();
        store.update_settings(SettingsPatch {
            semantic_injection: Some("prefer terse answers".to_string()),
            prompt_influence: Some(PromptInfluencePatch {
                tools: Some(0.25),
                ..Default::default()
            }),
            ..Default::default()
        });

        let settings = store.settings();
        assert_eq!(settings.objective_function, GlobalSettings::default().objective_function);
        assert_eq!(settings.semantic_injection, "prefer terse answers");
        assert_eq!(settings.prompt_influence.tools, 0.25);
        assert_eq!(settings.prompt_influence.prompt, 1.0);
    }

    #[test]
    fn test_seeded_pipeline() {
        let store = GraphStore::seeded();
        assert_eq!(store.nodes().len(), 3);
        assert_eq!(store.connections().len(), 2);
        assert_eq!(store.node("agent_root").unwrap().display_name(), Some("Main Brain"));
    }
}
