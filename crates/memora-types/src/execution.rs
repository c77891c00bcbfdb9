//! Runtime executor inputs and outputs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-call generation overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Options accepted by `execute`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteOptions {
    /// When `false`, the cache is neither read nor written.
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
    /// Skip the cache read but still store the fresh result.
    #[serde(default)]
    pub force_refresh: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmOverrides>,
    /// Bypass routed capability handlers and run the generic pipeline.
    #[serde(default)]
    pub skip_routing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_mix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_budget_minutes: Option<u32>,
}

fn default_use_cache() -> bool {
    true
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            use_cache: default_use_cache(),
            force_refresh: false,
            user_id: None,
            conversation_id: None,
            llm: None,
            skip_routing: false,
            intent: None,
            relationship_mix: None,
            time_budget_minutes: None,
        }
    }
}

impl ExecuteOptions {
    /// Requested model override, if any.
    pub fn model(&self) -> Option<&str> {
        self.llm.as_ref().and_then(|l| l.model.as_deref())
    }
}

/// What `execute` returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub run_id: Uuid,
    pub cached: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<Uuid>,
    pub data: serde_json::Value,
}
