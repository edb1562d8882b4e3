use std::collections::{BTreeMap, HashMap};
use tabweave_common::codec;
use tabweave_common::protocol::Action;
use tabweave_common::value::Value;
use tracing::warn;

/// The mutable name -> value store shared by every action in one sequence
/// run. Keys are the globally-unique `Variable::name` bindings; values live
/// for the duration of the run and are discarded afterwards.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    values: HashMap<String, Value>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the initial context from a pipeline's serialized value map.
    /// A value that fails structural decoding is kept as its raw string so
    /// the run still sees something under the binding.
    pub fn from_serialized(serialized: &BTreeMap<String, String>) -> Self {
        let mut ctx = Self::new();
        for (name, raw) in serialized {
            let value = match codec::decode_untyped(raw) {
                Ok(value) => value,
                Err(err) => {
                    warn!(binding = %name, %err, "initial context value is not valid JSON");
                    Value::String(raw.clone())
                }
            };
            ctx.values.insert(name.clone(), value);
        }
        ctx
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Bind declared default values for any input not yet present.
    pub fn merge_defaults(&mut self, action: &Action) {
        for input in &action.inputs {
            if let Some(default) = &input.default_value
                && !self.values.contains_key(&input.name)
            {
                self.values
                    .insert(input.name.clone(), Value::from(default.clone()));
            }
        }
    }

    /// Serialized snapshot of the values bound to an action's declared
    /// inputs, recorded on every `ActionResult`.
    pub fn snapshot_of(&self, action: &Action) -> BTreeMap<String, String> {
        let mut snapshot = BTreeMap::new();
        for input in &action.inputs {
            let Some(value) = self.values.get(&input.name) else {
                continue;
            };
            match codec::encode(value) {
                Ok(raw) => {
                    snapshot.insert(input.name.clone(), raw);
                }
                Err(err) => warn!(binding = %input.name, %err, "failed to snapshot input"),
            }
        }
        snapshot
    }

    /// Serialize the whole context for transport across the page boundary.
    pub fn serialize_all(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for (name, value) in &self.values {
            match codec::encode(value) {
                Ok(raw) => {
                    out.insert(name.clone(), raw);
                }
                Err(err) => warn!(binding = %name, %err, "failed to serialize context value"),
            }
        }
        out
    }
}
