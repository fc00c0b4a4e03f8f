//! The Action record and its metadata.
//!
//! An [`Action`] is immutable once constructed. Filters never edit an
//! action in place: they describe overrides with a [`MetaUpdate`] and the
//! pipeline builds a new action that copies the old metadata and replaces
//! only the named fields. Fields the update does not name survive, which is
//! what relay loop prevention relies on.

use crate::{error::AntaresError, id::AgentId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Writes the payload at the action's key (or a fresh id), overwriting.
pub const ANTARES_STORE: &str = "Antares.store";
/// Applies the key's reducer to the value already stored at the action's key.
pub const ANTARES_UPDATE: &str = "Antares.update";
/// Replaces the whole store with the payload; may carry `parentAgentId`.
pub const ANTARES_INIT: &str = "Antares.init";
/// Actions under this prefix are client-managed and never reduced.
pub const VIEW_PREFIX: &str = "View.";

/// A storage location targeted by a reduction: one segment or an ordered path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    /// A single top-level key.
    Single(String),
    /// An ordered path into nested state.
    Path(Vec<String>),
}

impl Key {
    /// The key as an ordered list of path segments.
    pub fn segments(&self) -> Vec<&str> {
        match self {
            Key::Single(s) => vec![s.as_str()],
            Key::Path(p) => p.iter().map(String::as_str).collect(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments().join("/"))
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Single(s.to_owned())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Single(s)
    }
}

impl From<Vec<String>> for Key {
    fn from(p: Vec<String>) -> Self {
        Key::Path(p)
    }
}

impl<const N: usize> From<[&str; N]> for Key {
    fn from(p: [&str; N]) -> Self {
        Key::Path(p.iter().map(|s| (*s).to_owned()).collect())
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// The `meta.antares` namespace. Every field is optional.
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AntaresMeta {
    /// Storage location a reduction should target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Key>,
    /// Agent that first created the action. Never rewritten by a relay hop.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_agent_id: Option<AgentId>,
    /// Agent that most recently processed the action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
    /// Upstream agent the receiver was initialized from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_agent_id: Option<AgentId>,
    /// Relay intent: `Some(true)` forward, `Some(false)` never forward,
    /// `None` apply the default topology rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push: Option<bool>,
    /// The action must never cross an agent boundary.
    #[serde(default, skip_serializing_if = "is_false")]
    pub local_only: bool,
    /// Keys in this namespace that antares does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Action metadata: the `antares` namespace plus any other namespaces,
/// which are carried through untouched.
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    /// The protocol's own namespace.
    #[serde(default)]
    pub antares: AntaresMeta,
    /// Other namespaces, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An immutable typed event: `{ type, payload, meta }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    action_type: String,
    #[serde(default)]
    payload: Value,
    #[serde(default)]
    meta: Meta,
}

impl Action {
    /// Create an action with empty metadata.
    pub fn new(action_type: impl Into<String>, payload: Value) -> Self {
        Self {
            action_type: action_type.into(),
            payload,
            meta: Meta::default(),
        }
    }

    /// Parse an action from untyped JSON, checking the structural contract
    /// first: an object with a non-empty string `type`.
    pub fn from_value(value: Value) -> Result<Self, AntaresError> {
        match value.get("type") {
            Some(Value::String(t)) if !t.trim().is_empty() => {}
            Some(Value::String(_)) => {
                return Err(AntaresError::TypeValidation(
                    "action type must not be empty".into(),
                ));
            }
            Some(other) => {
                return Err(AntaresError::TypeValidation(format!(
                    "action type must be a string, got {other}"
                )));
            }
            None => {
                return Err(AntaresError::TypeValidation(
                    "action is missing required field `type`".into(),
                ));
            }
        }
        serde_json::from_value(value).map_err(|e| AntaresError::TypeValidation(e.to_string()))
    }

    /// Check the structural contract on an already-typed action.
    pub fn validate(&self) -> Result<(), AntaresError> {
        if self.action_type.trim().is_empty() {
            return Err(AntaresError::TypeValidation(
                "action type must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// The namespaced action type, e.g. `game/nextQuestion`.
    pub fn action_type(&self) -> &str {
        &self.action_type
    }

    /// The payload.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// All metadata.
    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// Shorthand for `meta().antares`.
    pub fn antares(&self) -> &AntaresMeta {
        &self.meta.antares
    }

    /// Whether the action is in the client-managed `View.` namespace.
    pub fn is_view(&self) -> bool {
        self.action_type.starts_with(VIEW_PREFIX)
    }

    /// A copy of this action with `update` merged over its metadata.
    pub fn merge_meta(&self, update: &MetaUpdate) -> Action {
        Action {
            action_type: self.action_type.clone(),
            payload: self.payload.clone(),
            meta: update.apply(&self.meta),
        }
    }

    /// Consuming form of [`Action::merge_meta`], for building actions.
    pub fn with_meta(self, update: MetaUpdate) -> Action {
        let meta = update.apply(&self.meta);
        Action { meta, ..self }
    }
}

/// A set of named metadata overrides. Unset fields leave the existing
/// metadata alone.
#[must_use]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaUpdate {
    key: Option<Key>,
    origin_agent_id: Option<AgentId>,
    agent_id: Option<AgentId>,
    parent_agent_id: Option<AgentId>,
    push: Option<bool>,
    local_only: Option<bool>,
    antares_extra: Map<String, Value>,
    namespaces: Map<String, Value>,
}

impl MetaUpdate {
    /// An update that changes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `meta.antares.key`.
    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set `meta.antares.originAgentId`.
    pub fn origin_agent_id(mut self, id: impl Into<AgentId>) -> Self {
        self.origin_agent_id = Some(id.into());
        self
    }

    /// Set `meta.antares.agentId`.
    pub fn agent_id(mut self, id: impl Into<AgentId>) -> Self {
        self.agent_id = Some(id.into());
        self
    }

    /// Set `meta.antares.parentAgentId`.
    pub fn parent_agent_id(mut self, id: impl Into<AgentId>) -> Self {
        self.parent_agent_id = Some(id.into());
        self
    }

    /// Set `meta.antares.push`.
    pub fn push(mut self, push: bool) -> Self {
        self.push = Some(push);
        self
    }

    /// Set `meta.antares.localOnly`.
    pub fn local_only(mut self, local_only: bool) -> Self {
        self.local_only = Some(local_only);
        self
    }

    /// Set an uninterpreted field inside `meta.antares`.
    pub fn antares_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.antares_extra.insert(name.into(), value);
        self
    }

    /// Set a whole metadata namespace outside `antares`.
    pub fn namespace(mut self, name: impl Into<String>, value: Value) -> Self {
        self.namespaces.insert(name.into(), value);
        self
    }

    /// True if applying this update would change nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Copy `meta` and override the fields this update names.
    pub fn apply(&self, meta: &Meta) -> Meta {
        let mut next = meta.clone();
        let a = &mut next.antares;
        if let Some(key) = &self.key {
            a.key = Some(key.clone());
        }
        if let Some(id) = &self.origin_agent_id {
            a.origin_agent_id = Some(id.clone());
        }
        if let Some(id) = &self.agent_id {
            a.agent_id = Some(id.clone());
        }
        if let Some(id) = &self.parent_agent_id {
            a.parent_agent_id = Some(id.clone());
        }
        if let Some(push) = self.push {
            a.push = Some(push);
        }
        if let Some(local_only) = self.local_only {
            a.local_only = local_only;
        }
        for (k, v) in &self.antares_extra {
            a.extra.insert(k.clone(), v.clone());
        }
        for (k, v) in &self.namespaces {
            // The protocol namespace is only reachable through the typed setters.
            if k == "antares" {
                continue;
            }
            next.extra.insert(k.clone(), v.clone());
        }
        next
    }
}
