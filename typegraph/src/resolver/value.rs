use serde::Serialize;
use tower::BoxError;

use crate::json_ext::Value;

/// A Rust type standing for one object type of the schema.
///
/// Values built with [`ResolvedValue::typed`] carry the type name, so interfaces and
/// unions need no discriminant to resolve them.
pub trait ObjectType {
    const TYPE_NAME: &'static str;
}

/// The value of a resolved field
#[derive(Clone, Debug, PartialEq)]
pub enum ResolvedValue {
    /// * JSON null represents GraphQL null
    /// * Objects are plain JSON objects whose runtime type is resolved when needed
    /// * For custom scalars, any JSON value is passed to the scalar codec as-is
    Value(Value),

    /// A JSON object known to be of object type `type_name`.
    Typed { type_name: String, value: Value },

    /// Expected for GraphQL list types
    List(Vec<ResolvedValue>),
}

impl ResolvedValue {
    /// Construct a null resolved value
    pub fn null() -> Self {
        Self::Value(Value::Null)
    }

    /// Construct a resolved value from something that is convertible to JSON
    pub fn value(json: impl Into<Value>) -> Self {
        Self::Value(json.into())
    }

    /// Construct a resolved value from anything serializable
    pub fn serialize<T: Serialize>(value: &T) -> Result<Self, BoxError> {
        Ok(Self::Value(serde_json_bytes::to_value(value)?))
    }

    /// Construct a resolved value carrying the object type of `T`
    pub fn typed<T: ObjectType + Serialize>(value: &T) -> Result<Self, BoxError> {
        Ok(Self::Typed {
            type_name: T::TYPE_NAME.to_string(),
            value: serde_json_bytes::to_value(value)?,
        })
    }

    /// Construct a typed resolved value or null
    pub fn opt_typed<T: ObjectType + Serialize>(value: Option<&T>) -> Result<Self, BoxError> {
        match value {
            Some(value) => Self::typed(value),
            None => Ok(Self::null()),
        }
    }

    /// Construct a list resolved value
    pub fn list<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        Self::List(iter.into_iter().collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Value(Value::Null))
    }

    /// The static type name, if any.
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Self::Typed { type_name, .. } => Some(type_name),
            _ => None,
        }
    }
}

impl From<Value> for ResolvedValue {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}
