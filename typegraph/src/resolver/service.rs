//! [`Layer`] and [`Service`] running a field's middleware sequence before its implementation.
//!
//! The sequence is built on every call, so middleware instances are resolved lazily and a
//! missing one fails the field rather than the schema.

use std::sync::Arc;
use std::task::Context;
use std::task::Poll;

use futures::future::BoxFuture;
use futures::FutureExt;
use tower::Layer;
use tower::Service;
use tower::ServiceExt;

use super::Arguments;
use super::FieldRequest;
use super::Method;
use super::ResolvedValue;
use crate::error::FieldError;
use crate::injector::Injector;
use crate::metadata::ResolverDescriptor;
use crate::middleware::create_sequence;
use crate::middleware::execute_sequentially;
use crate::middleware::MiddlewareBinding;

/// [`Layer`] running middleware bindings before the inner service.
#[derive(Clone)]
pub struct MiddlewareLayer {
    bindings: Arc<Vec<MiddlewareBinding>>,
    injector: Arc<Injector>,
}

impl MiddlewareLayer {
    /// Create a new instance.
    pub fn new(bindings: Vec<MiddlewareBinding>, injector: Arc<Injector>) -> Self {
        Self {
            bindings: Arc::new(bindings),
            injector,
        }
    }
}

impl<S> Layer<S> for MiddlewareLayer {
    type Service = MiddlewareService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MiddlewareService {
            inner,
            bindings: self.bindings.clone(),
            injector: self.injector.clone(),
        }
    }
}

/// [`Service`] running middleware bindings before the inner service.
#[derive(Clone)]
pub struct MiddlewareService<S> {
    inner: S,
    bindings: Arc<Vec<MiddlewareBinding>>,
    injector: Arc<Injector>,
}

impl<S> Service<FieldRequest> for MiddlewareService<S>
where
    S: Service<FieldRequest, Response = ResolvedValue, Error = FieldError>
        + Clone
        + Send
        + 'static,
    S::Future: Send,
{
    type Response = ResolvedValue;
    type Error = FieldError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: FieldRequest) -> Self::Future {
        let steps = create_sequence(&self.bindings, &self.injector);
        // The inner service is driven to readiness once the middleware have passed.
        let inner = self.inner.clone();
        async move {
            let steps = steps?;
            execute_sequentially(&steps, &request.source, &request.args, &request.context)
                .await?;
            inner.oneshot(request).await
        }
        .boxed()
    }
}

/// [`Service`] invoking a field's implementation method.
#[derive(Clone)]
pub struct ImplementationService {
    descriptor: Arc<ResolverDescriptor>,
    method: Method,
    injector: Arc<Injector>,
}

impl ImplementationService {
    /// Create a new instance.
    pub fn new(descriptor: ResolverDescriptor, method: Method, injector: Arc<Injector>) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            method,
            injector,
        }
    }
}

impl Service<FieldRequest> for ImplementationService {
    type Response = ResolvedValue;
    type Error = FieldError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: FieldRequest) -> Self::Future {
        let instance = match self.injector.get(&self.descriptor.instance_token) {
            Ok(instance) => instance,
            Err(error) => return futures::future::ready(Err(error.into())).boxed(),
        };
        let arguments = Arguments::expand(&self.descriptor, &request.source, &request.args);
        let field = self.descriptor.name.clone();
        let resolved = (self.method)(instance, arguments, request.context);
        async move {
            resolved
                .await
                .map_err(|error| FieldError::Implementation {
                    field,
                    reason: error.to_string(),
                })
        }
        .boxed()
    }
}
