//! Field resolution closures handed to the executor.
//!
//! A resolver backed field runs its middleware sequence, then the implementation method
//! with positional [`Arguments`]. A plain field reads the same named property of its
//! source value.

use std::sync::Arc;

use futures::future;
use futures::future::BoxFuture;
use futures::FutureExt;
use tower::BoxError;
use tower::ServiceBuilder;
use tower::ServiceExt;

mod arguments;
mod service;
mod value;

pub use self::arguments::Arguments;
pub use self::service::ImplementationService;
pub use self::service::MiddlewareLayer;
pub use self::service::MiddlewareService;
pub use self::value::ObjectType;
pub use self::value::ResolvedValue;
use crate::context::Context;
use crate::error::FieldError;
use crate::injector::Injector;
use crate::injector::Instance;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::metadata::Resolver;
use crate::middleware::MiddlewareBinding;

/// Type erased implementation method, invoked with the instance at the resolver's token.
pub type Method = Arc<
    dyn Fn(Instance, Arguments, Context) -> BoxFuture<'static, Result<ResolvedValue, BoxError>>
        + Send
        + Sync,
>;

/// Resolves one field for one source value.
pub type Resolve = Arc<
    dyn Fn(FieldRequest) -> BoxFuture<'static, Result<ResolvedValue, FieldError>> + Send + Sync,
>;

/// Inputs of a single field resolution.
#[derive(Clone, Debug, Default)]
pub struct FieldRequest {
    /// The parent value the field is read from.
    pub source: Value,
    /// Arguments by name, after input coercion.
    pub args: Object,
    /// Shared by every field and middleware of one request.
    pub context: Context,
}

/// Build the resolution closure of a resolver backed field.
///
/// The field's own bindings apply when it declares any, `type_bindings` otherwise.
pub fn field_resolver(
    resolver: &Resolver,
    type_bindings: &[MiddlewareBinding],
    injector: Arc<Injector>,
) -> Resolve {
    let bindings = if resolver.descriptor.middlewares.is_empty() {
        type_bindings.to_vec()
    } else {
        resolver.descriptor.middlewares.clone()
    };
    let service = ServiceBuilder::new()
        .layer(MiddlewareLayer::new(bindings, injector.clone()))
        .service(ImplementationService::new(
            resolver.descriptor.clone(),
            resolver.method.clone(),
            injector,
        ));

    Arc::new(move |request: FieldRequest| service.clone().oneshot(request).boxed())
}

/// Build the resolution closure of a plain field named `field`.
pub fn property_resolver(field: &str) -> Resolve {
    let field = field.to_string();
    Arc::new(move |request: FieldRequest| {
        let value = request
            .source
            .as_object()
            .and_then(|source| source.get(field.as_str()))
            .cloned()
            .unwrap_or(Value::Null);
        future::ready(Ok(ResolvedValue::Value(value))).boxed()
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use async_trait::async_trait;
    use serde_json_bytes::json;

    use super::*;
    use crate::injector::Dependencies;
    use crate::injector::Injectable;
    use crate::injector::Provider;
    use crate::metadata::FieldDescriptor;
    use crate::metadata::ObjectImplementation;
    use crate::metadata::ResolverDescriptor;
    use crate::middleware::Middleware;

    struct Posts;

    impl Injectable for Posts {
        fn create(_dependencies: &Dependencies) -> Result<Self, BoxError> {
            Ok(Posts)
        }
    }

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Middleware for Counting {
        async fn execute(
            &self,
            _source: &Value,
            _args: &Object,
            _context: &Context,
            _options: Option<&Value>,
        ) -> Result<Value, BoxError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Bool(true))
        }
    }

    fn implementation() -> ObjectImplementation {
        ObjectImplementation::of::<Posts>("User")
            .middleware(MiddlewareBinding::new("TypeLevel"))
            .resolver(
                ResolverDescriptor::new("title", FieldDescriptor::new("String")),
                |_posts: Arc<Posts>, arguments: Arguments, _context| async move {
                    let source = arguments.source().cloned().unwrap_or(Value::Null);
                    Ok(ResolvedValue::value(source))
                },
            )
            .resolver(
                ResolverDescriptor::new("draft", FieldDescriptor::new("Boolean"))
                    .middleware(MiddlewareBinding::new("FieldLevel")),
                |_posts: Arc<Posts>, _arguments, _context| async {
                    Ok(ResolvedValue::value(json!(false)))
                },
            )
            .build()
    }

    #[tokio::test]
    async fn field_bindings_override_type_bindings() {
        let type_level = Arc::new(Counting::default());
        let field_level = Arc::new(Counting::default());
        let injector = Injector::resolve_and_create([
            Provider::of::<Posts>(),
            Provider::middleware_instance("TypeLevel", type_level.clone()),
            Provider::middleware_instance("FieldLevel", field_level.clone()),
        ])
        .unwrap();
        let implementation = implementation();

        let title = field_resolver(
            &implementation.resolvers["title"],
            &implementation.middlewares,
            injector.clone(),
        );
        let draft = field_resolver(
            &implementation.resolvers["draft"],
            &implementation.middlewares,
            injector,
        );

        let request = FieldRequest {
            source: json!("source"),
            ..Default::default()
        };
        assert_eq!(
            title(request.clone()).await.unwrap(),
            ResolvedValue::value(json!("source"))
        );
        assert_eq!(
            draft(request).await.unwrap(),
            ResolvedValue::value(json!(false))
        );
        assert_eq!(type_level.calls.load(Ordering::SeqCst), 1);
        assert_eq!(field_level.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn property_resolver_reads_the_source() {
        let resolve = property_resolver("name");
        let resolved = resolve(FieldRequest {
            source: json!({ "name": "Bob" }),
            ..Default::default()
        })
        .await
        .unwrap();
        assert_eq!(resolved, ResolvedValue::value(json!("Bob")));

        let missing = resolve(FieldRequest::default()).await.unwrap();
        assert!(missing.is_null());
    }
}
