use std::future::Future;
use std::sync::Arc;

use derivative::Derivative;

use super::Middleware;
use super::MiddlewareBinding;
use crate::context::Context;
use crate::error::MiddlewareError;
use crate::error::SequenceError;
use crate::injector::Injector;
use crate::injector::Token;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::json_ext::ValueExt;

/// One resolved middleware of a sequence.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct Step {
    token: Token,
    #[derivative(Debug = "ignore")]
    middleware: Arc<dyn Middleware>,
    options: Option<Value>,
    result_name: Option<String>,
}

impl Step {
    pub fn token(&self) -> &Token {
        &self.token
    }

    /// Run the middleware, storing a successful result in its slot.
    pub async fn run(
        &self,
        source: &Value,
        args: &Object,
        context: &Context,
    ) -> Result<Value, MiddlewareError> {
        let outcome = self
            .middleware
            .execute(source, args, context, self.options.as_ref())
            .await;
        match outcome {
            Ok(value) if value.is_truthy() => {
                if let Some(slot) = &self.result_name {
                    context.merge_result(slot, value.clone());
                }
                Ok(value)
            }
            Ok(value) => {
                tracing::debug!(
                    middleware = %self.token,
                    %value,
                    "middleware returned a falsy value"
                );
                Err(MiddlewareError::new(self.token.as_str(), value))
            }
            Err(error) => {
                tracing::debug!(middleware = %self.token, %error, "middleware failed");
                Err(MiddlewareError::new(self.token.as_str(), error.to_string()))
            }
        }
    }
}

/// Resolve every binding to its middleware instance.
///
/// Fails if an instance is missing or is not a middleware, before anything runs.
pub fn create_sequence(
    bindings: &[MiddlewareBinding],
    injector: &Injector,
) -> Result<Vec<Step>, SequenceError> {
    bindings
        .iter()
        .map(|binding| {
            let instance =
                injector
                    .get(&binding.token)
                    .map_err(|source| SequenceError::UnknownMiddleware {
                        token: binding.token.clone(),
                        source,
                    })?;
            let middleware = instance
                .downcast_ref::<Arc<dyn Middleware>>()
                .cloned()
                .ok_or_else(|| SequenceError::NotExecutable(binding.token.clone()))?;
            Ok(Step {
                token: binding.token.clone(),
                middleware,
                options: binding.options.clone(),
                result_name: binding.result_name.clone(),
            })
        })
        .collect()
}

/// Run `steps` one after the other, stopping at the first failure.
pub async fn execute_sequentially(
    steps: &[Step],
    source: &Value,
    args: &Object,
    context: &Context,
) -> Result<Vec<Value>, MiddlewareError> {
    run_sequentially(
        steps
            .iter()
            .map(|step| move || step.run(source, args, context))
            .collect::<Vec<_>>(),
    )
    .await
}

/// Run fallible asynchronous thunks in order.
///
/// Each thunk starts once the previous one has completed. The first error is returned and
/// the remaining thunks are never called.
pub async fn run_sequentially<I, F, Fut, T, E>(thunks: I) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = F>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let thunks = thunks.into_iter();
    let mut results = Vec::with_capacity(thunks.size_hint().0);
    for thunk in thunks {
        results.push(thunk().await?);
    }
    Ok(results)
}
