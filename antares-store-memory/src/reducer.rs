//! Reducers applied to the value at an action's key.

use antares_core::{Action, StoreError};
use serde_json::Value;

/// Computes the next value at a key from the current one and an action.
///
/// Only called when a value already exists at the key.
pub trait KeyReducer: Send + Sync {
    /// Return the new value for the key.
    fn reduce(&self, current: &Value, action: &Action) -> Result<Value, StoreError>;
}

/// Shallow-merges an object payload into the stored object. Any other
/// combination replaces the stored value with the payload.
#[derive(Debug, Default, Clone, Copy)]
pub struct MergeReducer;

impl KeyReducer for MergeReducer {
    fn reduce(&self, current: &Value, action: &Action) -> Result<Value, StoreError> {
        match (current, action.payload()) {
            (Value::Object(stored), Value::Object(update)) => {
                let mut merged = stored.clone();
                for (k, v) in update {
                    merged.insert(k.clone(), v.clone());
                }
                Ok(Value::Object(merged))
            }
            (_, payload) => Ok(payload.clone()),
        }
    }
}

/// Pushes the payload onto the stored array.
#[derive(Debug, Default, Clone, Copy)]
pub struct AppendReducer;

impl KeyReducer for AppendReducer {
    fn reduce(&self, current: &Value, action: &Action) -> Result<Value, StoreError> {
        let Value::Array(items) = current else {
            return Err(StoreError::ReducerFailed(format!(
                "cannot append {} to a non-array value",
                action.action_type()
            )));
        };
        let mut items = items.clone();
        items.push(action.payload().clone());
        Ok(Value::Array(items))
    }
}
