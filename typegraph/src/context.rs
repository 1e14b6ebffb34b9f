//! Provide a [`Context`] shared by one resolver invocation and its middleware chain.
//!
//! Middleware and field implementations receive the same [`Context`]; it contains a DashMap
//! which allows data to be passed along the invocation pipeline. Middleware results bound
//! to a result name are merged into it with [`Context::merge_result`].

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tower::BoxError;

use crate::json_ext::Value;

/// Holds [`Context`] entries.
pub type Entries = Arc<DashMap<String, Value>>;

/// Context for a field resolution.
#[derive(Clone, Debug, Default)]
pub struct Context {
    entries: Entries,
    // Number of merged writes per result slot, so that a slot promoted to a list can be
    // told apart from a first result that already was a list.
    result_writes: Arc<DashMap<String, usize>>,
}

impl Context {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn get<K, V>(&self, key: K) -> Result<Option<V>, BoxError>
    where
        K: Into<String>,
        V: for<'de> serde::Deserialize<'de>,
    {
        self.entries
            .get(&key.into())
            .map(|v| serde_json_bytes::from_value(v.value().clone()))
            .transpose()
            .map_err(|e| e.into())
    }

    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert<K, V>(&self, key: K, value: V) -> Result<Option<V>, BoxError>
    where
        K: Into<String>,
        V: for<'de> serde::Deserialize<'de> + Serialize,
    {
        match serde_json_bytes::to_value(value) {
            Ok(value) => self
                .entries
                .insert(key.into(), value)
                .map(|v| serde_json_bytes::from_value(v))
                .transpose()
                .map_err(|e| e.into()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn upsert<K, V>(
        &self,
        key: K,
        upsert: impl Fn(V) -> V,
        default: impl Fn() -> V,
    ) -> Result<(), BoxError>
    where
        K: Into<String>,
        V: for<'de> serde::Deserialize<'de> + Serialize,
    {
        let key = key.into();
        self.entries
            .entry(key.clone())
            .or_try_insert_with(|| serde_json_bytes::to_value((default)()))?;
        let mut result = Ok(());
        self.entries
            .alter(&key, |_, v| match serde_json_bytes::from_value(v.clone()) {
                Ok(value) => match serde_json_bytes::to_value((upsert)(value)) {
                    Ok(value) => value,
                    Err(e) => {
                        result = Err(e);
                        v
                    }
                },
                Err(e) => {
                    result = Err(e);
                    v
                }
            });
        result.map_err(|e| e.into())
    }

    /// Store a middleware result under `slot`.
    ///
    /// The first write sets the slot. The second write turns it into a two element list
    /// holding both results, and further writes append to that list.
    pub fn merge_result(&self, slot: &str, value: Value) {
        let writes = {
            let mut writes = self.result_writes.entry(slot.to_string()).or_insert(0);
            *writes += 1;
            *writes
        };

        match self.entries.entry(slot.to_string()) {
            Entry::Vacant(entry) => {
                entry.insert(value);
            }
            Entry::Occupied(mut entry) => match (writes, entry.get_mut()) {
                (1, current) => *current = value,
                (2, current) => {
                    let first = std::mem::replace(current, Value::Null);
                    *current = Value::Array(vec![first, value]);
                }
                (_, Value::Array(results)) => results.push(value),
                (_, current) => {
                    let previous = std::mem::replace(current, Value::Null);
                    *current = Value::Array(vec![previous, value]);
                }
            },
        }
    }
}
