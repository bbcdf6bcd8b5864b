// [[MMSS]]/apps/studio-server/src/catalog.rs
// Purpose: Static reference data. Role and pattern catalogs injected into the serializer.
// Architecture: Reference Data Layer
// Dependencies: Serde, Models

use serde::Deserialize;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::models::{AgentRoleDefinition, CoordinationType, PatternDefinition, RuntimeType};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog file: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to parse catalog file: {0}")]
    Parse(#[from] serde_json::Error),
}

impl CatalogError {
    pub fn is_missing_file(&self) -> bool {
        matches!(self, CatalogError::Io(e) if e.kind() == io::ErrorKind::NotFound)
    }
}

/// On-disk override. A missing section keeps the built-in entries.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    roles: Option<Vec<AgentRoleDefinition>>,
    #[serde(default)]
    patterns: Option<Vec<PatternDefinition>>,
}

/// Read-only role and pattern tables. Order is preserved as loaded.
#[derive(Debug, Clone)]
pub struct CatalogRegistry {
    roles: Vec<AgentRoleDefinition>,
    patterns: Vec<PatternDefinition>,
}

impl CatalogRegistry {
    pub fn builtin() -> Self {
        CatalogRegistry {
            roles: builtin_roles(),
            patterns: builtin_patterns(),
        }
    }

    /// Loads the catalog from `path`, falling back to the built-ins when the
    /// file is missing or malformed.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::from_file(path) {
            Ok(registry) => {
                tracing::info!(
                    "Loaded catalog from '{}': {} roles, {} patterns",
                    path.display(),
                    registry.roles.len(),
                    registry.patterns.len()
                );
                registry
            }
            Err(e) if e.is_missing_file() => {
                tracing::warn!("Catalog file not found at '{}'. Loading built-in defaults.", path.display());
                Self::builtin()
            }
            Err(e) => {
                tracing::error!("{}. Loading built-in defaults.", e);
                Self::builtin()
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let data = fs::read_to_string(path)?;
        let file: CatalogFile = serde_json::from_str(&data)?;
        Ok(CatalogRegistry {
            roles: file.roles.unwrap_or_else(builtin_roles),
            patterns: file.patterns.unwrap_or_else(builtin_patterns),
        })
    }

    pub fn roles(&self) -> &[AgentRoleDefinition] {
        &self.roles
    }

    pub fn patterns(&self) -> &[PatternDefinition] {
        &self.patterns
    }

    pub fn role(&self, id: &str) -> Option<&AgentRoleDefinition> {
        self.roles.iter().find(|r| r.id == id)
    }
}

fn role(
    id: &str,
    role_name: &str,
    description: &str,
    runtime: RuntimeType,
    default_tools: &[&str],
    patterns: &[&str],
) -> AgentRoleDefinition {
    AgentRoleDefinition {
        id: id.to_string(),
        role_name: role_name.to_string(),
        description: description.to_string(),
        runtime,
        default_tools: default_tools.iter().map(|s| s.to_string()).collect(),
        patterns: patterns.iter().map(|s| s.to_string()).collect(),
    }
}

fn pattern(
    id: &str,
    name: &str,
    description: &str,
    constraints: &[&str],
    coordination_type: CoordinationType,
) -> PatternDefinition {
    PatternDefinition {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        constraints: constraints.iter().map(|s| s.to_string()).collect(),
        coordination_type,
    }
}

fn builtin_roles() -> Vec<AgentRoleDefinition> {
    use RuntimeType::*;
    vec![
        role(
            "MMSS_ORCHESTRATOR",
            "Root Orchestrator",
            "Decomposes tasks, assigns sub-agents, manages global state.",
            Hybrid,
            &["delegation_protocol", "state_manager"],
            &["PATTERN_ORCHESTRATOR_WORKERS", "PATTERN_DELEGATION"],
        ),
        role(
            "MMSS_ARCHITECT",
            "System Architect",
            "Designs hierarchy, optimizes V/N/S/D_f metrics.",
            Gemini,
            &["design_tool", "optimizer"],
            &["PATTERN_SPECIALIZATION", "PATTERN_EVALUATOR_OPTIMIZER"],
        ),
        role(
            "INTERFACE_SYNTHESIS",
            "Interface Synthesis Engine",
            "Generates JSON-Schemas for inter-agent communication.",
            Gemini,
            &["schema_editor", "validator"],
            &["PATTERN_CONTEXT_AUGMENTATION"],
        ),
        role(
            "GENETIC_MIXER",
            "Genetic Mixer",
            "Applies crossover and mutation to agent configurations.",
            Mistral,
            &["mutation_engine", "trait_equalizer"],
            &["PATTERN_PARALLELIZATION"],
        ),
        role(
            "WCAG_AUDITOR",
            "WCAG & Compliance",
            "Ensures accessibility and policy compliance.",
            Gemini,
            &["wcag_checker", "ui_analyzer"],
            &["PATTERN_TOOL_SUITE_EXPERTS"],
        ),
        role(
            "COMPLIANCE_AGENT",
            "Auto-compliance & Cloning",
            "Enforces regulatory standards and clones successful nodes.",
            Mistral,
            &["policy_enforcer", "cloning_vat"],
            &["PATTERN_EVALUATOR_OPTIMIZER"],
        ),
        role(
            "DNA_INGESTION",
            "DNA Ingestion Lab",
            "Ingests external modules and data into the MMSS context.",
            Mistral,
            &["parser", "vector_store"],
            &["PATTERN_ROUTING"],
        ),
        role(
            "NODE_VAULT",
            "Node Vault Agent",
            "Manages repository of saved agent states and modules.",
            Mistral,
            &["db_connector", "version_control"],
            &["PATTERN_ROUTING"],
        ),
        role(
            "SEQUENCER_AGENT",
            "4D Sequencer",
            "Manages temporal execution and dependencies.",
            Gemini,
            &["scheduler", "timeline_manager"],
            &["PATTERN_ORCHESTRATOR_WORKERS"],
        ),
        role(
            "MUTATION_AGENT",
            "Mutation Stream",
            "Injects controlled randomness into agent prompts.",
            Gemini,
            &["randomizer", "prompt_injector"],
            &["PATTERN_PARALLELIZATION"],
        ),
        role(
            "THEME_INJECTOR",
            "Theme Injector",
            "Applies semantic themes and styles across the pipeline.",
            Gemini,
            &["style_guide", "theme_api"],
            &["PATTERN_CONTEXT_AUGMENTATION"],
        ),
        role(
            "GLOBAL_RECODE",
            "Global DNA Recode",
            "Refactors entire pipeline structure based on performance.",
            Gemini,
            &["refactor_engine", "meta_analyzer"],
            &["PATTERN_EVALUATOR_OPTIMIZER"],
        ),
    ]
}

fn builtin_patterns() -> Vec<PatternDefinition> {
    use CoordinationType::*;
    vec![
        pattern(
            "PATTERN_DELEGATION",
            "Hierarchical Delegation",
            "Root agent delegates subtasks to specialists.",
            &["Clear JSON contract", "Handoff protocol"],
            Delegation,
        ),
        pattern(
            "PATTERN_DEBATE",
            "Multi-Agent Debate",
            "Agents argue for different solutions, Judge decides.",
            &["Divergent prompts", "Round limit"],
            Debate,
        ),
        pattern(
            "PATTERN_EVALUATOR_OPTIMIZER",
            "Evaluator-Optimizer",
            "Generator produces, Evaluator critiques, Generator refines.",
            &["Feedback loop limit", "Metric-driven"],
            EvaluatorOptimizer,
        ),
        pattern(
            "PATTERN_ORCHESTRATOR_WORKERS",
            "Orchestrator-Workers",
            "Central node manages a dynamic pool of workers.",
            &["State centralization", "Worker statelesness"],
            OrchestratorWorkers,
        ),
        pattern(
            "PATTERN_PARALLELIZATION",
            "Parallel Execution",
            "Multiple agents work on subtasks simultaneously.",
            &["Independence", "Aggregation step"],
            Parallel,
        ),
        pattern(
            "PATTERN_ROUTING",
            "Intelligent Routing",
            "Router agent classifies input and directs to specific handler.",
            &["Classification accuracy", "Route map"],
            Routing,
        ),
    ]
}
