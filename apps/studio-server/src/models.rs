use serde::{Deserialize, Serialize};

/// Substring of a model identifier that places a node in the Gemini family.
pub const GEMINI_MARKER: &str = "gemini";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RuntimeType {
    Gemini,
    Mistral,
    Hybrid,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CoordinationType {
    Delegation,
    Parallel,
    Debate,
    Routing,
    OrchestratorWorkers,
    EvaluatorOptimizer,
}

/// Reusable agent archetype from the role catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentRoleDefinition {
    pub id: String,
    pub role_name: String,
    pub description: String,
    pub runtime: RuntimeType,
    pub default_tools: Vec<String>,
    pub patterns: Vec<String>,
}

/// Multi-agent coordination strategy from the pattern catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatternDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub constraints: Vec<String>,
    pub coordination_type: CoordinationType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Sequential,
    Parallel,
    Conditional,
    Loop,
    Handoff,
    Delegation,
    Flow,
    Feedback,
}

impl ConnectionType {
    pub const ALL: [ConnectionType; 8] = [
        ConnectionType::Sequential,
        ConnectionType::Parallel,
        ConnectionType::Conditional,
        ConnectionType::Loop,
        ConnectionType::Handoff,
        ConnectionType::Delegation,
        ConnectionType::Flow,
        ConnectionType::Feedback,
    ];
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuntimeConfig {
    pub model: String,
    pub temperature: f64,
}

impl RuntimeConfig {
    /// Binary family classification inferred from the model identifier.
    pub fn runtime_family(&self) -> RuntimeType {
        if self.model.contains(GEMINI_MARKER) {
            RuntimeType::Gemini
        } else {
            RuntimeType::Mistral
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            model: "gemini-3-flash-preview".to_string(),
            temperature: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentNode {
    pub id: String,
    pub position: Position,
    pub role_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_name: Option<String>,
    pub runtime_config: RuntimeConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,
}

impl AgentNode {
    /// Custom name if one was set and is not blank.
    pub fn display_name(&self) -> Option<&str> {
        self.custom_name.as_deref().filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Connection {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: ConnectionType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PromptInfluence {
    pub prompt: f64,
    pub tools: f64,
    pub schema: f64,
}

impl Default for PromptInfluence {
    fn default() -> Self {
        PromptInfluence {
            prompt: 1.0,
            tools: 1.0,
            schema: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlobalSettings {
    pub objective_function: String,
    pub semantic_injection: String,
    pub prompt_influence: PromptInfluence,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        GlobalSettings {
            objective_function:
                "J = Ψ(Quality, Robustness, Cost, Latency, Accessibility, Reusability)".to_string(),
            semantic_injection: String::new(),
            prompt_influence: PromptInfluence::default(),
        }
    }
}

// === PARTIAL UPDATES ===
// Absent fields leave the stored value untouched.

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RuntimeConfigPatch {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NodePatch {
    #[serde(default)]
    pub role_id: Option<String>,
    #[serde(default)]
    pub custom_name: Option<String>,
    #[serde(default)]
    pub runtime_config: Option<RuntimeConfigPatch>,
    #[serde(default)]
    pub tools: Option<Vec<String>>,
    #[serde(default)]
    pub position: Option<Position>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PromptInfluencePatch {
    #[serde(default)]
    pub prompt: Option<f64>,
    #[serde(default)]
    pub tools: Option<f64>,
    #[serde(default)]
    pub schema: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SettingsPatch {
    #[serde(default)]
    pub objective_function: Option<String>,
    #[serde(default)]
    pub semantic_injection: Option<String>,
    #[serde(default)]
    pub prompt_influence: Option<PromptInfluencePatch>,
}
