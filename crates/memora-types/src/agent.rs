//! Agent definition types.
//!
//! An agent is described on disk by an `agent.json` manifest plus the files it
//! references (templates, defaults, schemas). [`AgentDefinition`] is the parsed
//! manifest; [`DefinitionBundle`] is the fully resolved in-memory form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Version used when a manifest leaves `version` empty.
pub const DEFAULT_PROMPT_VERSION: &str = "1.0.0";

/// Parsed `agent.json` manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDefinition {
    pub id: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub prompt: PromptConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CachePolicy>,
}

impl AgentDefinition {
    /// The prompt version used as part of the snapshot identity.
    pub fn prompt_version(&self) -> &str {
        if self.version.trim().is_empty() {
            DEFAULT_PROMPT_VERSION
        } else {
            &self.version
        }
    }

    /// The TTL configured for this agent, ignoring zero.
    pub fn cache_ttl(&self) -> Option<u64> {
        self.cache.as_ref().and_then(|c| c.ttl).filter(|ttl| *ttl > 0)
    }

    /// The explicit hashable-field allow-list, if one is configured and non-empty.
    pub fn source_hash_fields(&self) -> Option<&[String]> {
        self.cache
            .as_ref()
            .and_then(|c| c.source_hash_fields.as_deref())
            .filter(|fields| !fields.is_empty())
    }

    /// Relative path of the output schema, honoring the `outputSchemaFile` alias.
    pub fn output_schema_file(&self) -> Option<&str> {
        let validation = self.validation.as_ref()?;
        validation
            .output_schema
            .as_deref()
            .or(validation.output_schema_file.as_deref())
    }

    /// Relative path of the optional input schema.
    pub fn input_schema_file(&self) -> Option<&str> {
        self.validation.as_ref()?.input_schema.as_deref()
    }
}

/// Template references for the two prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptConfig {
    pub system_template: String,
    pub user_template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults_file: Option<String>,
}

/// How prior context is exposed to the templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Tool filtering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolMode {
    None,
    Allowlist,
    Denylist,
}

impl fmt::Display for ToolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolMode::None => write!(f, "none"),
            ToolMode::Allowlist => write!(f, "allowlist"),
            ToolMode::Denylist => write!(f, "denylist"),
        }
    }
}

impl FromStr for ToolMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(ToolMode::None),
            "allowlist" => Ok(ToolMode::Allowlist),
            "denylist" => Ok(ToolMode::Denylist),
            other => Err(format!("invalid tool mode: '{other}'")),
        }
    }
}

/// Which tools an agent may see.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolPolicy {
    pub mode: ToolMode,
    #[serde(default)]
    pub allowed_tools: Vec<String>,
}

/// Schema file references.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema_file: Option<String>,
}

/// Snapshot cache policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachePolicy {
    /// Seconds a snapshot stays fresh.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
    /// When set, only these input fields participate in the source hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_hash_fields: Option<Vec<String>>,
}

/// Fully resolved agent definition.
///
/// Template text is guaranteed non-empty and the output schema is always
/// present once the registry hands a bundle out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionBundle {
    pub definition: AgentDefinition,
    pub system_template: String,
    pub user_template: String,
    #[serde(default)]
    pub defaults: serde_json::Map<String, serde_json::Value>,
    pub output_schema: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<serde_json::Value>,
}
