use antares_core::AgentId;
use serde::{Deserialize, Serialize};

/// Construction-time settings for an [`crate::Agent`].
///
/// ```json
/// { "agentId": "moderator", "relayActions": true }
/// { "agentId": "client-7", "parentAgentId": "server" }
/// ```
///
/// Every field is optional. Without an `agentId` the agent picks a random
/// one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentConfig {
    /// Stable identity of the agent.
    pub agent_id: Option<AgentId>,
    /// Whether the agent is a relay hub. Peers forward to a hub with
    /// `push: true`, so a hub passes actions on to all of its own peers.
    pub relay_actions: bool,
    /// Upstream agent this one starts out attached to. An `Antares.init`
    /// action naming a parent replaces it.
    pub parent_agent_id: Option<AgentId>,
}

impl AgentConfig {
    /// An agent with a random id that is not a hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `id` as the agent's identity.
    #[must_use]
    pub fn agent_id(mut self, id: impl Into<AgentId>) -> Self {
        self.agent_id = Some(id.into());
        self
    }

    /// Mark the agent as a relay hub.
    #[must_use]
    pub fn relay_actions(mut self, relay_actions: bool) -> Self {
        self.relay_actions = relay_actions;
        self
    }

    /// Start out attached to `parent`.
    #[must_use]
    pub fn parent_agent_id(mut self, parent: impl Into<AgentId>) -> Self {
        self.parent_agent_id = Some(parent.into());
        self
    }
}
