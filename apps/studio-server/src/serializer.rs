// [[MMSS]]/apps/studio-server/src/serializer.rs
// Purpose: Projects editor state and the static catalogs into the exported pipeline document.
// Architecture: Domain Logic Layer
// Dependencies: Serde, Models, Metrics

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::metrics::{Metric, MetricId};
use crate::models::*;

pub const EDGE_PROTOCOL: &str = "JSON-RPC/MCP";
pub const PATTERN_FLOW_TYPE: &str = "standard_mmss_v1";
pub const GRAPH_TOPOLOGY: &str = "Graph/Hierarchical";
pub const GOOGLE_API_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const MISTRAL_API_ENDPOINT: &str = "https://api.mistral.ai/v1/agents";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum Provider {
    #[serde(rename = "GOOGLE_AI_STUDIO")]
    GoogleAiStudio,
    #[serde(rename = "MISTRAL_AGENTS_API")]
    MistralAgentsApi,
}

impl Provider {
    /// Only Gemini-tagged roles go to Google; every other runtime goes to Mistral.
    pub fn for_runtime(runtime: RuntimeType) -> Self {
        match runtime {
            RuntimeType::Gemini => Provider::GoogleAiStudio,
            RuntimeType::Mistral | RuntimeType::Hybrid => Provider::MistralAgentsApi,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConfigDocument {
    #[serde(rename = "AGENT_ROLES")]
    pub agent_roles: BTreeMap<String, RoleEntry>,
    #[serde(rename = "PATTERN_LIBRARY")]
    pub pattern_library: BTreeMap<String, PatternEntry>,
    #[serde(rename = "ORCHESTRATION_GRAPH")]
    pub orchestration_graph: GraphSection,
    #[serde(rename = "RUNTIME_BINDINGS")]
    pub runtime_bindings: RuntimeBindings,
    #[serde(rename = "UI_LAYOUT_MODEL")]
    pub ui_layout: UiLayout,
    #[serde(rename = "METRIC_AND_OBJECTIVE_MODEL")]
    pub metric_and_objective: MetricObjectiveSection,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RoleEntry {
    pub role_name: String,
    pub description: String,
    pub provider: Provider,
    pub default_tools: Vec<String>,
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PatternEntry {
    pub name: String,
    pub description: String,
    pub constraints: Vec<String>,
    pub coordination_type: CoordinationType,
    pub flow_type: &'static str,
    pub applicable_roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GraphSection {
    pub nodes: Vec<GraphNodeEntry>,
    pub edges: Vec<GraphEdgeEntry>,
    pub allowed_edge_types: Vec<ConnectionType>,
    pub topology: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GraphNodeEntry {
    pub id: String,
    pub role_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub position: Position,
    pub runtime: RuntimeType,
    pub model_id: String,
    pub temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patterns_used: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GraphEdgeEntry {
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: ConnectionType,
    pub protocol: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RuntimeBindings {
    #[serde(rename = "GOOGLE_ADK_CONFIG")]
    pub google_adk: GoogleAdkConfig,
    #[serde(rename = "MISTRAL_AGENTS_CONFIG")]
    pub mistral_agents: MistralAgentsConfig,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GoogleAdkConfig {
    pub api_endpoint: &'static str,
    pub agents: Vec<AgentDescriptor>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MistralAgentsConfig {
    pub api_endpoint: &'static str,
    pub agents: Vec<AgentDescriptor>,
    pub handoffs: Vec<Handoff>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AgentDescriptor {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub instructions: String,
    pub tools: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Handoff {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UiLayout {
    pub theme: &'static str,
    pub panels: Vec<UiPanel>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UiPanel {
    pub name: &'static str,
    pub region: &'static str,
    pub binds_to: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetricObjectiveSection {
    pub objective_function: String,
    pub semantic_injection: String,
    pub prompt_influence: PromptInfluence,
    pub metrics: BTreeMap<MetricId, MetricEntry>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetricEntry {
    pub name: String,
    pub value: f64,
    pub target: f64,
    pub formula: String,
}

/// Build the export document. Pure: identical inputs give identical output,
/// and unresolvable references are dropped instead of reported.
pub fn serialize(
    nodes: &[AgentNode],
    connections: &[Connection],
    settings: &GlobalSettings,
    metrics: &[Metric],
    roles: &[AgentRoleDefinition],
    patterns: &[PatternDefinition],
) -> ConfigDocument {
    let role_index: HashMap<&str, &AgentRoleDefinition> =
        roles.iter().map(|r| (r.id.as_str(), r)).collect();
    let node_index: HashMap<&str, &AgentNode> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();

    let live_connections: Vec<&Connection> = connections
        .iter()
        .filter(|c| node_index.contains_key(c.source.as_str()) && node_index.contains_key(c.target.as_str()))
        .collect();

    ConfigDocument {
        agent_roles: role_section(roles),
        pattern_library: pattern_section(patterns, roles),
        orchestration_graph: graph_section(nodes, &live_connections, &role_index),
        runtime_bindings: bindings_section(nodes, &live_connections, &node_index, &role_index),
        ui_layout: ui_layout_model(),
        metric_and_objective: metric_section(settings, metrics),
    }
}

/// Render with two-space indentation.
pub fn to_pretty_json(document: &ConfigDocument) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(document)
}

fn role_section(roles: &[AgentRoleDefinition]) -> BTreeMap<String, RoleEntry> {
    roles
        .iter()
        .map(|role| {
            let entry = RoleEntry {
                role_name: role.role_name.clone(),
                description: role.description.clone(),
                provider: Provider::for_runtime(role.runtime),
                default_tools: role.default_tools.clone(),
                patterns: role.patterns.clone(),
            };
            (role.id.clone(), entry)
        })
        .collect()
}

fn pattern_section(
    patterns: &[PatternDefinition],
    roles: &[AgentRoleDefinition],
) -> BTreeMap<String, PatternEntry> {
    patterns
        .iter()
        .map(|pattern| {
            let applicable_roles = roles
                .iter()
                .filter(|r| r.patterns.iter().any(|p| *p == pattern.id))
                .map(|r| r.id.clone())
                .collect();

            let entry = PatternEntry {
                name: pattern.name.clone(),
                description: pattern.description.clone(),
                constraints: pattern.constraints.clone(),
                coordination_type: pattern.coordination_type,
                flow_type: PATTERN_FLOW_TYPE,
                applicable_roles,
            };
            (pattern.id.clone(), entry)
        })
        .collect()
}

fn graph_section(
    nodes: &[AgentNode],
    live_connections: &[&Connection],
    role_index: &HashMap<&str, &AgentRoleDefinition>,
) -> GraphSection {
    let nodes = nodes
        .iter()
        .map(|node| {
            let role = role_index.get(node.role_id.as_str()).copied();
            GraphNodeEntry {
                id: node.id.clone(),
                role_ref: node.role_id.clone(),
                name: node
                    .display_name()
                    .map(str::to_string)
                    .or_else(|| role.map(|r| r.role_name.clone())),
                position: node.position,
                runtime: node.runtime_config.runtime_family(),
                model_id: node.runtime_config.model.clone(),
                temperature: node.runtime_config.temperature,
                tools: node.tools.clone().or_else(|| role.map(|r| r.default_tools.clone())),
                patterns_used: role.map(|r| r.patterns.clone()),
            }
        })
        .collect();

    let edges = live_connections
        .iter()
        .map(|c| GraphEdgeEntry {
            id: c.id.clone(),
            from: c.source.clone(),
            to: c.target.clone(),
            kind: c.kind,
            protocol: EDGE_PROTOCOL,
        })
        .collect();

    GraphSection {
        nodes,
        edges,
        allowed_edge_types: ConnectionType::ALL.to_vec(),
        topology: GRAPH_TOPOLOGY,
    }
}

fn bindings_section(
    nodes: &[AgentNode],
    live_connections: &[&Connection],
    node_index: &HashMap<&str, &AgentNode>,
    role_index: &HashMap<&str, &AgentRoleDefinition>,
) -> RuntimeBindings {
    let (gemini, mistral): (Vec<&AgentNode>, Vec<&AgentNode>) = nodes
        .iter()
        .partition(|n| n.runtime_config.runtime_family() == RuntimeType::Gemini);

    let describe = |node: &&AgentNode| agent_descriptor(node, role_index.get(node.role_id.as_str()).copied());

    let handoffs = live_connections
        .iter()
        .filter(|c| c.kind == ConnectionType::Handoff)
        .filter_map(|c| {
            let from = node_index.get(c.source.as_str())?;
            let to = node_index.get(c.target.as_str())?;
            Some(Handoff {
                from: handoff_label(from),
                to: handoff_label(to),
            })
        })
        .collect();

    RuntimeBindings {
        google_adk: GoogleAdkConfig {
            api_endpoint: GOOGLE_API_ENDPOINT,
            agents: gemini.iter().map(describe).collect(),
        },
        mistral_agents: MistralAgentsConfig {
            api_endpoint: MISTRAL_API_ENDPOINT,
            agents: mistral.iter().map(describe).collect(),
            handoffs,
        },
    }
}

fn agent_descriptor(node: &AgentNode, role: Option<&AgentRoleDefinition>) -> AgentDescriptor {
    let instructions = match role {
        Some(role) => format!("You are the {} agent. {}", node.role_id, role.description),
        None => format!("You are the {} agent.", node.role_id),
    };

    AgentDescriptor {
        id: node.id.clone(),
        name: node.display_name().map(str::to_string),
        model: node.runtime_config.model.clone(),
        temperature: node.runtime_config.temperature,
        instructions,
        tools: node
            .tools
            .clone()
            .or_else(|| role.map(|r| r.default_tools.clone()))
            .unwrap_or_default(),
    }
}

fn handoff_label(node: &AgentNode) -> String {
    node.display_name().unwrap_or(&node.id).to_string()
}

/// Panel table of the studio shell. Independent of editor state.
pub fn ui_layout_model() -> UiLayout {
    UiLayout {
        theme: "MMSS_Dark_Cybernetics",
        panels: vec![
            UiPanel {
                name: "Constructor_Palette",
                region: "left",
                binds_to: vec!["AGENT_ROLES"],
            },
            UiPanel {
                name: "Orchestrator",
                region: "center",
                binds_to: vec!["ORCHESTRATION_GRAPH.nodes", "ORCHESTRATION_GRAPH.edges"],
            },
            UiPanel {
                name: "Architect",
                region: "right",
                binds_to: vec!["ORCHESTRATION_GRAPH.nodes", "PATTERN_LIBRARY"],
            },
            UiPanel {
                name: "Metric_Dashboard",
                region: "top",
                binds_to: vec!["METRIC_AND_OBJECTIVE_MODEL.metrics"],
            },
            UiPanel {
                name: "Objective_Settings",
                region: "settings",
                binds_to: vec![
                    "METRIC_AND_OBJECTIVE_MODEL.objective_function",
                    "METRIC_AND_OBJECTIVE_MODEL.semantic_injection",
                    "METRIC_AND_OBJECTIVE_MODEL.prompt_influence",
                ],
            },
            UiPanel {
                name: "JSON_Source",
                region: "center",
                binds_to: vec!["RUNTIME_BINDINGS"],
            },
        ],
    }
}

fn metric_section(settings: &GlobalSettings, metrics: &[Metric]) -> MetricObjectiveSection {
    MetricObjectiveSection {
        objective_function: settings.objective_function.clone(),
        semantic_injection: settings.semantic_injection.clone(),
        prompt_influence: settings.prompt_influence,
        metrics: metrics
            .iter()
            .map(|m| {
                let entry = MetricEntry {
                    name: m.name.clone(),
                    value: m.value,
                    target: m.target,
                    formula: m.formula.clone(),
                };
                (m.id, entry)
            })
            .collect(),
    }
}
