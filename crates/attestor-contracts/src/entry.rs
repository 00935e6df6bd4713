//! Audit entries as submitted by collaborators.
//!
//! `NewEntry` is the ingress draft: callers fill in who did what to which
//! entity, optionally with before/after state and a rationale.
//! `NewEntry::into_entry()` validates it and produces an `Entry`, which is the
//! immutable record the ledger stamps and chains.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{AttestorError, AttestorResult};

/// Who performed a state-changing action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorType {
    Agent,
    Human,
    System,
}

impl ActorType {
    /// The lowercase wire name, as used in the hash preimage.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorType::Agent => "agent",
            ActorType::Human => "human",
            ActorType::System => "system",
        }
    }
}

impl fmt::Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated audit record describing one state change.
///
/// An `Entry` is never hashed or chained on its own; the ledger wraps it in
/// an `ImmutableEntry` at append time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Unique identifier, caller-supplied or a generated UUID v4.
    pub id: String,

    /// Tenant the action belongs to, if the platform is multi-tenant.
    #[serde(default)]
    pub tenant_id: Option<String>,

    /// When the state change happened (UTC).
    pub timestamp: DateTime<Utc>,

    /// Free-text identity of whoever acted.
    pub actor: String,

    pub actor_type: ActorType,

    /// What was done, e.g. `"approve_document"`.
    pub action: String,

    /// Kind of thing acted upon, e.g. `"document"`.
    pub entity_type: String,

    pub entity_id: String,

    /// State of the entity before the action.
    #[serde(default)]
    pub previous_state: Option<Value>,

    /// State of the entity after the action.
    #[serde(default)]
    pub new_state: Option<Value>,

    /// Why the action was taken.
    #[serde(default)]
    pub rationale: Option<String>,
}

/// An unvalidated entry as submitted at the ingress boundary.
///
/// `id` and `timestamp` are optional here; `into_entry()` fills them in.
///
/// ```rust,ignore
/// let entry = NewEntry::agent("reviewer-bot", "flag_document", "document", "doc-42")
///     .rationale("matched retention rule R-7")
///     .tenant("acme")
///     .into_entry()?;
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    pub actor: String,
    #[serde(default)]
    pub actor_type: Option<ActorType>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    #[serde(default)]
    pub previous_state: Option<Value>,
    #[serde(default)]
    pub new_state: Option<Value>,
    #[serde(default)]
    pub rationale: Option<String>,
}

impl NewEntry {
    /// Start a draft for an action performed by `actor_type`.
    pub fn new(
        actor: impl Into<String>,
        actor_type: ActorType,
        action: impl Into<String>,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        Self {
            actor: actor.into(),
            actor_type: Some(actor_type),
            action: action.into(),
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            ..Self::default()
        }
    }

    /// Draft for an action taken by an automated agent.
    pub fn agent(
        actor: impl Into<String>,
        action: impl Into<String>,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        Self::new(actor, ActorType::Agent, action, entity_type, entity_id)
    }

    /// Draft for an action taken by a person.
    pub fn human(
        actor: impl Into<String>,
        action: impl Into<String>,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        Self::new(actor, ActorType::Human, action, entity_type, entity_id)
    }

    /// Draft for an action taken by the platform itself.
    pub fn system(
        actor: impl Into<String>,
        action: impl Into<String>,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        Self::new(actor, ActorType::System, action, entity_type, entity_id)
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }

    pub fn previous_state(mut self, state: Value) -> Self {
        self.previous_state = Some(state);
        self
    }

    pub fn new_state(mut self, state: Value) -> Self {
        self.new_state = Some(state);
        self
    }

    /// Attach any serializable value as the prior state.
    ///
    /// Values with no JSON representation (e.g. maps with non-string keys)
    /// are rejected here instead of being stringified, so the hash preimage
    /// never depends on an ad-hoc fallback.
    pub fn with_previous_state<T: Serialize>(self, state: &T) -> AttestorResult<Self> {
        let value = to_state_value("previous_state", state)?;
        Ok(self.previous_state(value))
    }

    /// Attach any serializable value as the resulting state.
    pub fn with_new_state<T: Serialize>(self, state: &T) -> AttestorResult<Self> {
        let value = to_state_value("new_state", state)?;
        Ok(self.new_state(value))
    }

    /// Validate the draft and produce an `Entry`.
    ///
    /// Rejects blank `actor`, `action`, `entity_type`, `entity_id`, a blank
    /// explicit `id`, and a missing `actor_type`. Assigns a UUID v4 id and
    /// the current time when they were not supplied.
    pub fn into_entry(self) -> AttestorResult<Entry> {
        require("actor", &self.actor)?;
        require("action", &self.action)?;
        require("entity_type", &self.entity_type)?;
        require("entity_id", &self.entity_id)?;

        let actor_type = self.actor_type.ok_or_else(|| AttestorError::Validation {
            reason: "required field 'actor_type' is missing".to_string(),
        })?;

        let id = match self.id {
            Some(id) => {
                require("id", &id)?;
                id
            }
            None => Uuid::new_v4().to_string(),
        };

        if let Some(tenant) = &self.tenant_id {
            require("tenant_id", tenant)?;
        }

        Ok(Entry {
            id,
            tenant_id: self.tenant_id,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            actor: self.actor,
            actor_type,
            action: self.action,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            previous_state: self.previous_state,
            new_state: self.new_state,
            rationale: self.rationale,
        })
    }
}

fn require(field: &str, value: &str) -> AttestorResult<()> {
    if value.trim().is_empty() {
        return Err(AttestorError::Validation {
            reason: format!("required field '{}' is empty", field),
        });
    }
    Ok(())
}

fn to_state_value<T: Serialize>(field: &str, state: &T) -> AttestorResult<Value> {
    serde_json::to_value(state).map_err(|e| AttestorError::Validation {
        reason: format!("'{}' has no canonical JSON form: {}", field, e),
    })
}
