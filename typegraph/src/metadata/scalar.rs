use tower::BoxError;

use crate::injector::Injectable;
use crate::injector::Provider;
use crate::injector::Token;
use crate::json_ext::Value;

/// Converts values of a custom scalar between their internal and external forms.
pub trait ScalarCodec: Send + Sync + 'static {
    /// Internal value to response value.
    fn serialize(&self, value: &Value) -> Result<Value, BoxError>;

    /// Variable value to internal value.
    fn parse_value(&self, value: &Value) -> Result<Value, BoxError> {
        Ok(value.clone())
    }

    /// Inline argument value to internal value.
    fn parse_literal(&self, value: &Value) -> Result<Value, BoxError> {
        self.parse_value(value)
    }
}

/// A custom scalar type, served by the codec registered at `codec`.
#[derive(Clone, Debug)]
pub struct ScalarDefinition {
    pub name: String,
    pub description: Option<String>,
    pub codec: Token,
    pub(crate) provider: Option<Provider>,
}

impl ScalarDefinition {
    pub fn new(name: impl Into<String>, codec: impl Into<Token>) -> Self {
        Self {
            name: name.into(),
            description: None,
            codec: codec.into(),
            provider: None,
        }
    }

    /// A scalar served by `S`, registered under `S`'s own token.
    pub fn of<S: ScalarCodec + Injectable>(name: impl Into<String>) -> Self {
        Self {
            provider: Some(Provider::scalar::<S>()),
            ..Self::new(name, S::token())
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn provider(&self) -> Option<&Provider> {
        self.provider.as_ref()
    }
}
