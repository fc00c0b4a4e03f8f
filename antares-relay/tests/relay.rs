use antares_agent::{Agent, AgentConfig};
use antares_core::test_utils::{FailingStore, RecordingFilter};
use antares_core::{Action, AgentId, AntaresError, FilterError, MetaUpdate, filter_fn};
use antares_relay::{AgentSet, Relayed, Topology};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

fn id(s: &str) -> AgentId {
    AgentId::new(s)
}

fn ping() -> Action {
    Action::new("ping", json!({"200": "OK"}))
}

fn drain(rx: &mut broadcast::Receiver<Relayed>) -> Vec<Relayed> {
    let mut hops = Vec::new();
    while let Ok(hop) = rx.try_recv() {
        hops.push(hop);
    }
    hops
}

/// Agents that record what reaches their pipeline.
struct Harness {
    set: AgentSet,
    seen: HashMap<&'static str, Arc<RecordingFilter>>,
}

impl Harness {
    fn new(topology: Topology, agents: &[(&'static str, bool)]) -> Self {
        let mut set = AgentSet::new(topology);
        let mut seen = HashMap::new();
        for &(name, hub) in agents {
            let recorder = Arc::new(RecordingFilter::new(name));
            set.insert(
                Agent::builder(AgentConfig::new().agent_id(name).relay_actions(hub))
                    .filter(recorder.clone())
                    .build(),
            );
            seen.insert(name, recorder);
        }
        Self { set, seen }
    }

    fn count(&self, name: &str) -> usize {
        self.seen[name].actions().len()
    }
}

// --- Fan-out rule ---

#[test]
fn push_false_and_local_only_fan_out_to_nobody() {
    let topology = Topology::new().link("a", "b").link("a", "c");
    let no_hubs = |_: &AgentId| false;

    let echo = ping().with_meta(MetaUpdate::new().push(false));
    assert!(topology.fan_out(&id("a"), &echo, no_hubs).is_empty());

    let local = ping().with_meta(MetaUpdate::new().local_only(true).push(true));
    assert!(topology.fan_out(&id("a"), &local, no_hubs).is_empty());

    assert_eq!(topology.fan_out(&id("a"), &ping(), no_hubs).len(), 2);
}

#[test]
fn push_is_rewritten_by_receiver_role() {
    let topology = Topology::new().link("player1", "moderator").link("player1", "emcee");
    let copies = topology.fan_out(&id("player1"), &ping(), |p| p.as_str() == "moderator");

    let push: Vec<_> = copies
        .iter()
        .map(|(to, a)| (to.as_str(), a.antares().push))
        .collect();
    assert_eq!(
        push,
        vec![("moderator", Some(true)), ("emcee", Some(false))]
    );
}

#[test]
fn origin_is_never_a_target_and_never_rewritten() {
    let topology = Topology::new().link("moderator", "player1").link("moderator", "emcee");
    let action = ping().with_meta(MetaUpdate::new().origin_agent_id("player1").push(true));

    let copies = topology.fan_out(&id("moderator"), &action, |_| false);
    assert_eq!(copies.len(), 1);
    assert_eq!(copies[0].0, id("emcee"));
    assert_eq!(copies[0].1.antares().origin_agent_id, Some(id("player1")));
}

#[test]
fn topology_reads_from_a_plain_map() {
    let topology: Topology = serde_json::from_value(json!({
        "player1": ["moderator"],
        "moderator": ["player1", "emcee"],
    }))
    .unwrap();

    assert_eq!(topology.peers(&id("moderator")), &[id("player1"), id("emcee")]);
    assert!(topology.peers(&id("emcee")).is_empty());
}

// --- AgentSet ---

fn star() -> Harness {
    Harness::new(
        Topology::new()
            .link("player1", "moderator")
            .link("emcee", "moderator")
            .link("moderator", "player1")
            .link("moderator", "emcee"),
        &[("player1", false), ("emcee", false), ("moderator", true)],
    )
}

#[tokio::test]
async fn hub_relays_to_every_other_spoke() {
    let harness = star();
    let mut rx = harness.set.subscribe();

    let action = harness.set.process(&id("player1"), ping()).unwrap();
    assert_eq!(action.antares().origin_agent_id, Some(id("player1")));

    let hops: Vec<_> = drain(&mut rx)
        .into_iter()
        .map(|h| (h.from.to_string(), h.to.to_string(), h.action.antares().push))
        .collect();
    assert_eq!(
        hops,
        vec![
            ("player1".into(), "moderator".into(), Some(true)),
            ("moderator".into(), "emcee".into(), Some(false)),
        ]
    );
    assert_eq!(harness.count("player1"), 1);
    assert_eq!(harness.count("moderator"), 1);
    assert_eq!(harness.count("emcee"), 1);
}

#[tokio::test]
async fn echo_to_a_non_hub_is_not_forwarded_again() {
    let harness = Harness::new(
        Topology::new().link("a", "b").link("b", "c"),
        &[("a", false), ("b", false), ("c", false)],
    );
    let mut rx = harness.set.subscribe();

    harness.set.process(&id("a"), ping()).unwrap();

    assert_eq!(drain(&mut rx).len(), 1);
    assert_eq!(harness.count("b"), 1);
    assert_eq!(harness.count("c"), 0);
}

#[tokio::test]
async fn each_agent_handles_a_wave_once() {
    // a ring of hubs would relay forever without the visit set
    let harness = Harness::new(
        Topology::new().link("a", "b").link("b", "c").link("c", "a"),
        &[("a", true), ("b", true), ("c", true)],
    );
    let mut rx = harness.set.subscribe();

    let from_outside = ping().with_meta(MetaUpdate::new().origin_agent_id("gateway"));
    harness.set.process(&id("a"), from_outside).unwrap();

    assert_eq!(drain(&mut rx).len(), 2);
    for name in ["a", "b", "c"] {
        assert_eq!(harness.count(name), 1, "{name}");
    }
}

#[tokio::test]
async fn local_only_stays_at_the_entry_agent() {
    let harness = star();
    let mut rx = harness.set.subscribe();

    let local = ping().with_meta(MetaUpdate::new().local_only(true));
    harness.set.process(&id("player1"), local).unwrap();

    assert!(drain(&mut rx).is_empty());
    assert_eq!(harness.count("moderator"), 0);
}

#[tokio::test]
async fn unknown_entry_agent_is_an_error() {
    let harness = star();
    let err = harness.set.process(&id("nobody"), ping()).unwrap_err();
    assert!(matches!(err, AntaresError::UnknownAgent(name) if name == "nobody"));
}

#[tokio::test]
async fn failed_hop_does_not_fail_the_entry_call() {
    let mut set = AgentSet::new(Topology::new().link("a", "b").link("b", "c"));
    set.insert(Agent::builder(AgentConfig::new().agent_id("a")).build());
    set.insert(
        Agent::builder(AgentConfig::new().agent_id("b").relay_actions(true))
            .filter(Arc::new(filter_fn("veto", |_ctx| {
                Err(FilterError::Rejected("closed".into()))
            })))
            .build(),
    );
    let recorder = Arc::new(RecordingFilter::new("c"));
    set.insert(
        Agent::builder(AgentConfig::new().agent_id("c"))
            .filter(recorder.clone())
            .build(),
    );

    assert!(set.process(&id("a"), ping()).is_ok());
    assert!(recorder.actions().is_empty());
}

#[tokio::test]
async fn failed_announce_relays_nothing() {
    let mut set = AgentSet::new(Topology::new().link("a", "b"));
    set.insert(
        Agent::builder(AgentConfig::new().agent_id("a"))
            .store(Arc::new(FailingStore::new()))
            .build(),
    );
    set.insert(Agent::builder(AgentConfig::new().agent_id("b")).build());
    let mut rx = set.subscribe();

    let err = set.announce(&id("a"), ping()).await.unwrap_err();
    assert!(matches!(err, AntaresError::Reduction(_)));
    assert!(drain(&mut rx).is_empty());

    assert!(set.agent(&id("b")).is_some());
}
