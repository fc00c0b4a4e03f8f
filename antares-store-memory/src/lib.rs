#![deny(missing_docs)]
//! In-memory implementation of antares' collaborator [`Store`].
//!
//! State is a single JSON tree behind a `RwLock`. Actions are reduced by
//! the keyed protocol:
//!
//! | Action | Effect |
//! |--------|--------|
//! | `View.*` | none |
//! | `Antares.store` | overwrite the value at `key`, or at a fresh id |
//! | `Antares.update`, or any action with a `key` | run the key's reducer; the key must already hold a value |
//! | `Antares.init` | replace the whole tree with the payload |
//! | anything else | none |

mod reducer;

pub use reducer::{AppendReducer, KeyReducer, MergeReducer};

use antares_core::{ANTARES_INIT, ANTARES_STORE, ANTARES_UPDATE, Action, Key, Store, StoreError};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory store reducing actions into a JSON tree.
pub struct KeyedStore {
    state: RwLock<Value>,
    reducers: Vec<(Vec<String>, Arc<dyn KeyReducer>)>,
    fallback: Arc<dyn KeyReducer>,
}

impl KeyedStore {
    /// Create an empty store whose keys merge by default.
    pub fn new() -> Self {
        Self::with_state(Value::Object(Map::new()))
    }

    /// Create a store starting from `state`.
    pub fn with_state(state: Value) -> Self {
        Self {
            state: RwLock::new(state),
            reducers: Vec::new(),
            fallback: Arc::new(MergeReducer),
        }
    }

    /// Use `reducer` for every key under `key`. The first registration
    /// whose segments prefix an action's key wins.
    #[must_use]
    pub fn with_reducer(mut self, key: impl Into<Key>, reducer: Arc<dyn KeyReducer>) -> Self {
        let prefix = key.into().segments().into_iter().map(str::to_owned).collect();
        self.reducers.push((prefix, reducer));
        self
    }

    /// Use `reducer` for keys with no registration.
    #[must_use]
    pub fn with_default_reducer(mut self, reducer: Arc<dyn KeyReducer>) -> Self {
        self.fallback = reducer;
        self
    }

    /// Snapshot of the whole tree.
    pub async fn state(&self) -> Value {
        self.state.read().await.clone()
    }

    /// The value stored at `key`, if any.
    pub async fn get(&self, key: &Key) -> Option<Value> {
        let state = self.state.read().await;
        get_in(&state, &key.segments()).cloned()
    }

    fn reducer_for(&self, path: &[&str]) -> &Arc<dyn KeyReducer> {
        self.reducers
            .iter()
            .find(|(prefix, _)| {
                prefix.len() <= path.len() && prefix.iter().zip(path).all(|(a, b)| a == b)
            })
            .map(|(_, reducer)| reducer)
            .unwrap_or(&self.fallback)
    }
}

impl Default for KeyedStore {
    fn default() -> Self {
        Self::new()
    }
}

fn get_in<'a>(state: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(state, |node, segment| node.get(segment))
}

fn get_in_mut<'a>(state: &'a mut Value, path: &[&str]) -> Option<&'a mut Value> {
    path.iter()
        .try_fold(state, |node, segment| node.get_mut(segment))
}

/// Write `value` at `path`, creating intermediate objects as needed.
fn set_in(state: &mut Value, path: &[&str], value: Value) -> Result<(), StoreError> {
    let Some((last, parents)) = path.split_last() else {
        *state = value;
        return Ok(());
    };
    let mut node = state;
    for segment in parents {
        let Value::Object(map) = node else {
            return Err(StoreError::ReducerFailed(format!(
                "cannot store under non-object at {segment}"
            )));
        };
        node = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    match node {
        Value::Object(map) => {
            map.insert(last.to_string(), value);
            Ok(())
        }
        _ => Err(StoreError::ReducerFailed(format!(
            "cannot store under non-object at {last}"
        ))),
    }
}

#[async_trait]
impl Store for KeyedStore {
    /// Reduce `action` and return the resulting value: the value at the
    /// key for keyed actions, the whole tree otherwise.
    async fn dispatch(&self, action: &Action) -> Result<Value, StoreError> {
        if action.is_view() {
            return Ok(self.state().await);
        }

        let key = action.antares().key.as_ref();
        let mut state = self.state.write().await;

        if action.action_type() == ANTARES_STORE {
            let fresh;
            let path = match key {
                Some(key) => key.segments(),
                None => {
                    fresh = uuid::Uuid::new_v4().to_string();
                    vec![fresh.as_str()]
                }
            };
            set_in(&mut state, &path, action.payload().clone())?;
            tracing::debug!(key = %path.join("/"), "antares.store.stored");
            return Ok(action.payload().clone());
        }

        if action.action_type() == ANTARES_UPDATE || key.is_some() {
            let Some(key) = key else {
                return Err(StoreError::NoValueAt { key: String::new() });
            };
            let path = key.segments();
            let reducer = self.reducer_for(&path);
            let Some(slot) = get_in_mut(&mut state, &path) else {
                return Err(StoreError::NoValueAt {
                    key: key.to_string(),
                });
            };
            let next = reducer.reduce(slot, action)?;
            *slot = next.clone();
            tracing::debug!(
                key = %key,
                action_type = action.action_type(),
                "antares.store.reduced"
            );
            return Ok(next);
        }

        if action.action_type() == ANTARES_INIT {
            *state = action.payload().clone();
            tracing::debug!("antares.store.init");
        }

        Ok(state.clone())
    }
}
