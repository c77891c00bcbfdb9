//! Snapshot cache records.
//!
//! A snapshot pairs one validated generation output with the identity that
//! produced it. The identity is a 7-part composite key that is unique in
//! storage; see [`SnapshotIdentity`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The entity a cached result is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeType {
    Conversation,
    Contact,
    User,
}

impl fmt::Display for ScopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeType::Conversation => write!(f, "conversation"),
            ScopeType::Contact => write!(f, "contact"),
            ScopeType::User => write!(f, "user"),
        }
    }
}

impl FromStr for ScopeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "conversation" => Ok(ScopeType::Conversation),
            "contact" => Ok(ScopeType::Contact),
            "user" => Ok(ScopeType::User),
            other => Err(format!("invalid scope type: '{other}'")),
        }
    }
}

/// Unique composite key of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotIdentity {
    pub agent_id: String,
    pub operation: Option<String>,
    pub user_id: Option<String>,
    pub scope_type: ScopeType,
    pub scope_id: Option<String>,
    pub source_hash: String,
    pub prompt_version: String,
}

impl SnapshotIdentity {
    /// The same identity with empty optional parts folded into `None`.
    ///
    /// Storage keys absent parts as empty strings, so `Some("")` and `None`
    /// name the same row; the cache compares identities in this form.
    pub fn normalized(mut self) -> Self {
        for part in [&mut self.operation, &mut self.user_id, &mut self.scope_id] {
            if part.as_deref() == Some("") {
                *part = None;
            }
        }
        self
    }
}

/// A persisted cache entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: Uuid,
    #[serde(flatten)]
    pub identity: SnapshotIdentity,
    pub model: Option<String>,
    pub input: serde_json::Value,
    pub output: serde_json::Value,
    /// Expiry instant as stored (epoch milliseconds); `None` never expires.
    pub expires_at_ms: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Snapshot {
    /// Decode the stored expiry.
    ///
    /// Returns `Err` with the raw value when it cannot be a valid instant
    /// (negative or outside the representable range).
    pub fn expires_at(&self) -> Result<Option<DateTime<Utc>>, i64> {
        match self.expires_at_ms {
            None => Ok(None),
            Some(ms) if ms < 0 => Err(ms),
            Some(ms) => Utc.timestamp_millis_opt(ms).single().map(Some).ok_or(ms),
        }
    }
}

/// Data needed to create (or refresh) a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSnapshot {
    #[serde(flatten)]
    pub identity: SnapshotIdentity,
    pub model: Option<String>,
    pub input: serde_json::Value,
    pub output: serde_json::Value,
}

/// Options for a cache probe.
#[derive(Debug, Clone, Copy, Default)]
pub struct FindOptions {
    pub force_refresh: bool,
}

/// Outcome of a cache probe.
#[derive(Debug, Clone, Default)]
pub struct FindSnapshotResult {
    pub snapshot: Option<Snapshot>,
    pub cached: bool,
}

impl FindSnapshotResult {
    pub fn miss() -> Self {
        Self {
            snapshot: None,
            cached: false,
        }
    }

    pub fn hit(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Some(snapshot),
            cached: true,
        }
    }
}
