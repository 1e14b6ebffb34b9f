//! Named, asynchronous, short-circuiting middleware run before field implementations.

use async_trait::async_trait;
use derivative::Derivative;
use serde::Serialize;
use tower::BoxError;

mod sequence;

pub use self::sequence::create_sequence;
pub use self::sequence::execute_sequentially;
pub use self::sequence::run_sequentially;
pub use self::sequence::Step;
use crate::context::Context;
use crate::injector::Injectable;
use crate::injector::Provider;
use crate::injector::Token;
use crate::json_ext::Object;
use crate::json_ext::Value;

/// A step run before a field implementation.
///
/// Returning an error or a falsy value (`null`, `false`, `0`, `""`) stops the chain
/// and fails the field. Any other value lets the chain continue, and is stored in the
/// context when the binding names a result slot.
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    async fn execute(
        &self,
        source: &Value,
        args: &Object,
        context: &Context,
        options: Option<&Value>,
    ) -> Result<Value, BoxError>;
}

/// Binds a middleware token to a field or to every field of an implementation.
#[derive(Clone, Derivative, Serialize)]
#[derivative(Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MiddlewareBinding {
    pub token: Token,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_name: Option<String>,
    #[serde(skip)]
    #[derivative(Debug = "ignore", PartialEq = "ignore")]
    pub(crate) provider: Option<Provider>,
}

impl MiddlewareBinding {
    /// Bind the middleware registered at `token`. Its provider must be listed explicitly.
    pub fn new(token: impl Into<Token>) -> Self {
        Self {
            token: token.into(),
            options: None,
            result_name: None,
            provider: None,
        }
    }

    /// Bind `M`, registered under its own token.
    pub fn of<M: Middleware + Injectable>() -> Self {
        Self {
            provider: Some(Provider::middleware::<M>()),
            ..Self::new(M::token())
        }
    }

    pub fn options(mut self, options: impl Into<Value>) -> Self {
        self.options = Some(options.into());
        self
    }

    pub fn result_name(mut self, result_name: impl Into<String>) -> Self {
        self.result_name = Some(result_name.into());
        self
    }

    pub fn provider(&self) -> Option<&Provider> {
        self.provider.as_ref()
    }
}
