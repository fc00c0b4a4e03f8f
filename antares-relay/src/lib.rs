#![deny(missing_docs)]
//! Topology relay for antares.
//!
//! An [`AgentSet`] owns a group of agents, the [`Topology`] linking them,
//! and a broadcast bus. Processing an action at one agent relays it through
//! the topology breadth-first, and every hop is published on the bus.
//!
//! Three rules keep relays from looping:
//!
//! 1. A copy sent to a non-hub carries `push: false`, and `push: false`
//!    is never forwarded.
//! 2. No copy is ever sent back to the action's origin agent, and relay
//!    hops never rewrite `originAgentId`.
//! 3. Within one relay wave, each agent processes the action at most once.

mod topology;

pub use topology::Topology;

use antares_agent::Agent;
use antares_core::{Action, AgentId, AntaresError, MetaUpdate};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::broadcast;

const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// One relay hop, as published on the bus.
#[derive(Debug, Clone, PartialEq)]
pub struct Relayed {
    /// The sending agent.
    pub from: AgentId,
    /// The receiving agent.
    pub to: AgentId,
    /// The copy that was sent, with `push` already rewritten.
    pub action: Action,
}

/// A group of agents wired together by a topology.
pub struct AgentSet {
    agents: HashMap<AgentId, Arc<Agent>>,
    topology: Topology,
    bus: broadcast::Sender<Relayed>,
}

impl AgentSet {
    /// An empty set relaying over `topology`.
    pub fn new(topology: Topology) -> Self {
        Self::with_capacity(topology, DEFAULT_CHANNEL_CAPACITY)
    }

    /// Like [`AgentSet::new`], with a bus holding up to `capacity` hops per
    /// lagging subscriber.
    pub fn with_capacity(topology: Topology, capacity: usize) -> Self {
        let (bus, _) = broadcast::channel(capacity);
        Self {
            agents: HashMap::new(),
            topology,
            bus,
        }
    }

    /// Add an agent, replacing any agent with the same id.
    pub fn insert(&mut self, agent: Agent) -> Arc<Agent> {
        let agent = Arc::new(agent);
        self.agents.insert(agent.id().clone(), Arc::clone(&agent));
        agent
    }

    /// The agent with `id`, if it is in the set.
    pub fn agent(&self, id: &AgentId) -> Option<&Arc<Agent>> {
        self.agents.get(id)
    }

    /// The topology this set relays over.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Receive every relay hop from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Relayed> {
        self.bus.subscribe()
    }

    fn entry(&self, at: &AgentId) -> Result<&Arc<Agent>, AntaresError> {
        self.agents
            .get(at)
            .ok_or_else(|| AntaresError::UnknownAgent(at.to_string()))
    }

    fn is_hub(&self, id: &AgentId) -> bool {
        self.agents.get(id).is_some_and(|a| a.relay_actions())
    }

    /// Process `action` at agent `at`, then relay it.
    ///
    /// The action's origin is set to `at` unless it already has one.
    /// Returns the action as filtered by the entry agent. Errors at later
    /// hops are logged and do not fail the call.
    pub fn process(&self, at: &AgentId, action: Action) -> Result<Action, AntaresError> {
        let entry = self.entry(at)?;
        let action = with_origin(action, entry.id());
        let processed = entry.process(action)?;
        self.relay(entry.id(), &processed);
        Ok(processed)
    }

    /// Announce `action` at agent `at` (reduce, notify parent), then relay
    /// it. Nothing is relayed if the announcement fails.
    pub async fn announce(&self, at: &AgentId, action: Action) -> Result<Action, AntaresError> {
        let entry = self.entry(at)?;
        let announced = entry.announce(action).await?;
        self.relay(entry.id(), &announced);
        Ok(announced)
    }

    fn relay(&self, from: &AgentId, action: &Action) {
        let mut visited = HashSet::from([from.clone()]);
        let mut wave = VecDeque::from([(from.clone(), action.clone())]);

        while let Some((sender, action)) = wave.pop_front() {
            for (peer, copy) in self.topology.fan_out(&sender, &action, |p| self.is_hub(p)) {
                if !visited.insert(peer.clone()) {
                    tracing::trace!(from = %sender, to = %peer, "antares.relay.revisit");
                    continue;
                }
                let Some(agent) = self.agents.get(&peer) else {
                    tracing::warn!(from = %sender, to = %peer, "antares.relay.unknown_peer");
                    continue;
                };

                tracing::debug!(
                    from = %sender,
                    to = %peer,
                    action_type = copy.action_type(),
                    push = ?copy.antares().push,
                    "antares.relay.forward"
                );
                // no subscribers is fine
                let _ = self.bus.send(Relayed {
                    from: sender.clone(),
                    to: peer.clone(),
                    action: copy.clone(),
                });

                match agent.process(copy) {
                    Ok(processed) => wave.push_back((peer, processed)),
                    Err(error) => {
                        tracing::warn!(from = %sender, to = %peer, %error, "antares.relay.hop_failed");
                    }
                }
            }
        }
    }
}

fn with_origin(action: Action, origin: &AgentId) -> Action {
    if action.antares().origin_agent_id.is_some() {
        action
    } else {
        action.with_meta(MetaUpdate::new().origin_agent_id(origin.clone()))
    }
}
