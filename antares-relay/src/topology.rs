//! Static agent-to-peer links and the fan-out rule.

use antares_core::{Action, AgentId, MetaUpdate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which peers each agent forwards processed actions to.
///
/// Serializes as a plain map of agent id to ordered peer list:
///
/// ```json
/// { "player1": ["moderator"], "moderator": ["player1", "emcee"] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topology {
    links: BTreeMap<AgentId, Vec<AgentId>>,
}

impl Topology {
    /// A topology with no links.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `to` as a peer of `from`. Linking the same pair twice is a no-op.
    #[must_use]
    pub fn link(mut self, from: impl Into<AgentId>, to: impl Into<AgentId>) -> Self {
        let to = to.into();
        let peers = self.links.entry(from.into()).or_default();
        if !peers.contains(&to) {
            peers.push(to);
        }
        self
    }

    /// Configured peers of `from`, in link order.
    pub fn peers(&self, from: &AgentId) -> &[AgentId] {
        self.links.get(from).map(Vec::as_slice).unwrap_or_default()
    }

    /// The copies of `action` that `from` sends, one per receiving peer.
    ///
    /// Nothing is sent when the action is `localOnly` or carries
    /// `push: false`. Otherwise every peer gets a copy, except the action's
    /// origin agent, which has seen it already. Each copy's `push` is set
    /// to whether the receiving peer is a hub according to `is_hub`, so a
    /// hub passes the action on and anyone else keeps it. A hub handed
    /// `push: false` directly, rather than through a relay, forwards nothing.
    pub fn fan_out(
        &self,
        from: &AgentId,
        action: &Action,
        is_hub: impl Fn(&AgentId) -> bool,
    ) -> Vec<(AgentId, Action)> {
        let meta = action.antares();
        if meta.local_only || meta.push == Some(false) {
            return Vec::new();
        }
        self.peers(from)
            .iter()
            .filter(|peer| *peer != from && meta.origin_agent_id.as_ref() != Some(*peer))
            .map(|peer| {
                let copy = action.merge_meta(&MetaUpdate::new().push(is_hub(peer)));
                (peer.clone(), copy)
            })
            .collect()
    }
}
