use serde::de::DeserializeOwned;
use tower::BoxError;

use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::metadata::ResolverDescriptor;

static NULL: Value = Value::Null;

/// Positional arguments handed to an implementation method.
///
/// Each declared argument sits at its recorded index. When no argument claims index 0,
/// the parent value (the source) is placed there. Missing arguments read as `null`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Arguments {
    positional: Vec<Value>,
    named: Object,
    has_source: bool,
}

impl Arguments {
    pub(crate) fn expand(
        descriptor: &ResolverDescriptor,
        source: &Value,
        named: &Object,
    ) -> Self {
        let len = descriptor
            .args
            .iter()
            .filter_map(|argument| argument.index)
            .max()
            .map_or(1, |last| last + 1);
        let mut positional = vec![Value::Null; len];
        for argument in &descriptor.args {
            let value = named
                .get(argument.name.as_str())
                .cloned()
                .unwrap_or(Value::Null);
            if let Some(slot) = argument.index.and_then(|index| positional.get_mut(index)) {
                *slot = value;
            }
        }
        let has_source = descriptor.has_source_slot();
        if has_source {
            if let Some(slot) = positional.first_mut() {
                *slot = source.clone();
            }
        }

        Arguments {
            positional,
            named: named.clone(),
            has_source,
        }
    }

    /// The value at `index`, `null` when absent.
    pub fn get(&self, index: usize) -> &Value {
        self.positional.get(index).unwrap_or(&NULL)
    }

    /// Deserialize the value at `index`.
    pub fn parse<T: DeserializeOwned>(&self, index: usize) -> Result<T, BoxError> {
        serde_json_bytes::from_value(self.get(index).clone())
            .map_err(|error| format!("invalid argument at position {index}: {error}").into())
    }

    /// The parent value, unless an argument claimed its position.
    pub fn source(&self) -> Option<&Value> {
        if self.has_source {
            self.positional.first()
        } else {
            None
        }
    }

    /// The arguments by name, as received.
    pub fn named(&self) -> &Object {
        &self.named
    }

    pub fn len(&self) -> usize {
        self.positional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty()
    }
}
