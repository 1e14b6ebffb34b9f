//! Performance oriented JSON manipulation.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
pub use serde_json_bytes::ByteString;
pub use serde_json_bytes::Value;

/// A JSON object.
pub type Object = serde_json_bytes::Map<ByteString, Value>;

/// Extension trait for [`serde_json_bytes::Value`].
pub trait ValueExt {
    /// Returns `false` for the values a loosely typed runtime treats as "falsy":
    /// `null`, `false`, `0`, `NaN` and the empty string. Everything else, including
    /// empty lists and empty objects, is truthy.
    fn is_truthy(&self) -> bool;

    /// Returns `true` if the value is an object carrying `key`, whatever its value.
    fn has_key(&self, key: &str) -> bool;

    /// Returns the string stored under `key` when the value is an object.
    fn str_field(&self, key: &str) -> Option<&str>;
}

impl ValueExt for Value {
    fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
            Value::String(s) => !s.as_str().is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }

    fn has_key(&self, key: &str) -> bool {
        self.as_object()
            .map(|object| object.contains_key(key))
            .unwrap_or(false)
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.as_object()
            .and_then(|object| object.get(key))
            .and_then(|value| value.as_str())
    }
}

/// A GraphQL path element that is composed of strings or numbers.
/// e.g `/user/friends/3/name`
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathElement {
    /// An index path element.
    Index(usize),

    /// A key path element.
    Key(String),
}

/// A path into the result document.
///
/// This can be composed of strings and numbers
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Path(pub Vec<PathElement>);

impl Path {
    pub fn empty() -> Path {
        Path(Default::default())
    }

    pub fn join(&self, element: impl Into<PathElement>) -> Path {
        let mut elements = self.0.clone();
        elements.push(element.into());
        Path(elements)
    }
}

impl From<&str> for PathElement {
    fn from(key: &str) -> Self {
        PathElement::Key(key.to_string())
    }
}

impl From<String> for PathElement {
    fn from(key: String) -> Self {
        PathElement::Key(key)
    }
}

impl From<usize> for PathElement {
    fn from(index: usize) -> Self {
        PathElement::Index(index)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for element in self.0.iter() {
            write!(f, "/")?;
            match element {
                PathElement::Index(index) => write!(f, "{index}")?,
                PathElement::Key(key) => write!(f, "{key}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;

    #[test]
    fn truthiness_follows_loose_runtime_rules() {
        assert!(!json!(null).is_truthy());
        assert!(!json!(false).is_truthy());
        assert!(!json!(0).is_truthy());
        assert!(!json!(0.0).is_truthy());
        assert!(!json!("").is_truthy());

        assert!(json!(true).is_truthy());
        assert!(json!(-1).is_truthy());
        assert!(json!("no").is_truthy());
        assert!(json!([]).is_truthy());
        assert!(json!({}).is_truthy());
    }

    #[test]
    fn has_key_ignores_the_value() {
        let value = json!({ "present": null });
        assert!(value.has_key("present"));
        assert!(!value.has_key("absent"));
        assert!(!json!("scalar").has_key("present"));
    }

    #[test]
    fn path_display() {
        let path = Path::empty().join("user").join(3).join("name");
        assert_eq!(path.to_string(), "/user/3/name");
        assert_eq!(
            serde_json::to_string(&path).unwrap(),
            r#"["user",3,"name"]"#
        );
    }
}
