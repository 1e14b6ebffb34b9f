use std::collections::HashSet;

use crate::injector::Provider;
use crate::metadata::Component;
use crate::middleware::MiddlewareBinding;

/// Everything a schema is assembled from.
///
/// Components may be declared in any order; object types may be split over several
/// definition and implementation fragments sharing a name.
#[derive(Clone, Debug)]
pub struct SchemaDescriptor {
    /// Name of the root query object type.
    pub root_query: String,
    /// Name of the root mutation object type, if any.
    pub root_mutation: Option<String>,
    pub components: Vec<Component>,
    /// Providers registered in addition to the ones the components carry.
    pub providers: Vec<Provider>,
}

#[buildstructor::buildstructor]
impl SchemaDescriptor {
    #[builder(visibility = "pub")]
    fn new(
        root_query: String,
        root_mutation: Option<String>,
        components: Vec<Component>,
        providers: Vec<Provider>,
    ) -> Self {
        Self {
            root_query,
            root_mutation,
            components,
            providers,
        }
    }

    /// Every provider the schema needs.
    ///
    /// Explicit providers come first, followed by the ones carried by implementations,
    /// scalars and middleware bindings at type and field level. When several providers
    /// share a token the first one is kept.
    pub fn providers(&self) -> Vec<Provider> {
        let mut seen = HashSet::new();
        let mut providers = Vec::new();
        let mut push = |provider: &Provider| {
            if seen.insert(provider.token().clone()) {
                providers.push(provider.clone());
            }
        };

        self.providers.iter().for_each(&mut push);
        for component in &self.components {
            match component {
                Component::ObjectImplementation(implementation) => {
                    implementation.provider().into_iter().for_each(&mut push);
                    bindings_providers(&implementation.middlewares).for_each(&mut push);
                    for resolver in implementation.resolvers.values() {
                        bindings_providers(&resolver.descriptor.middlewares).for_each(&mut push);
                    }
                }
                Component::Scalar(scalar) => scalar.provider().into_iter().for_each(&mut push),
                _ => {}
            }
        }
        providers
    }
}

fn bindings_providers(bindings: &[MiddlewareBinding]) -> impl Iterator<Item = &Provider> {
    bindings.iter().filter_map(MiddlewareBinding::provider)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tower::BoxError;

    use super::*;
    use crate::context::Context;
    use crate::injector::Dependencies;
    use crate::injector::Injectable;
    use crate::injector::Injector;
    use crate::injector::Token;
    use crate::json_ext::Object;
    use crate::json_ext::Value;
    use crate::metadata::FieldDescriptor;
    use crate::metadata::ObjectImplementation;
    use crate::metadata::ResolverDescriptor;
    use crate::metadata::ScalarCodec;
    use crate::metadata::ScalarDefinition;
    use crate::middleware::Middleware;
    use crate::resolver::ResolvedValue;

    struct Users;

    impl Injectable for Users {
        fn create(_dependencies: &Dependencies) -> Result<Self, BoxError> {
            Ok(Users)
        }
    }

    struct Auth;

    impl Injectable for Auth {
        fn create(_dependencies: &Dependencies) -> Result<Self, BoxError> {
            Ok(Auth)
        }
    }

    #[async_trait]
    impl Middleware for Auth {
        async fn execute(
            &self,
            _source: &Value,
            _args: &Object,
            _context: &Context,
            _options: Option<&Value>,
        ) -> Result<Value, BoxError> {
            Ok(Value::Bool(true))
        }
    }

    struct Audit;

    impl Injectable for Audit {
        fn create(_dependencies: &Dependencies) -> Result<Self, BoxError> {
            Ok(Audit)
        }
    }

    #[async_trait]
    impl Middleware for Audit {
        async fn execute(
            &self,
            _source: &Value,
            _args: &Object,
            _context: &Context,
            _options: Option<&Value>,
        ) -> Result<Value, BoxError> {
            Ok(Value::Bool(true))
        }
    }

    struct DateCodec;

    impl Injectable for DateCodec {
        fn create(_dependencies: &Dependencies) -> Result<Self, BoxError> {
            Ok(DateCodec)
        }
    }

    impl ScalarCodec for DateCodec {
        fn serialize(&self, value: &Value) -> Result<Value, BoxError> {
            Ok(value.clone())
        }
    }

    fn descriptor() -> SchemaDescriptor {
        let users: Component = ObjectImplementation::of::<Users>("Query")
            .middleware(MiddlewareBinding::of::<Auth>())
            .resolver(
                ResolverDescriptor::new("me", FieldDescriptor::new("String"))
                    .middleware(MiddlewareBinding::of::<Auth>())
                    .middleware(MiddlewareBinding::of::<Audit>()),
                |_users: Arc<Users>, _arguments, _context| async { Ok(ResolvedValue::null()) },
            )
            .into();
        let date = Component::from(ScalarDefinition::of::<DateCodec>("Date"));

        SchemaDescriptor::builder()
            .root_query("Query")
            .component(users)
            .component(date)
            .component(Component::Middleware(Token::new("Logger")))
            .provider(Provider::value("Users", 42u8))
            .build()
    }

    #[test]
    fn providers_are_collected_from_components() {
        let tokens: Vec<_> = descriptor()
            .providers()
            .iter()
            .map(|provider| provider.token().to_string())
            .collect();
        assert_eq!(tokens, vec!["Users", "Auth", "Audit", "DateCodec"]);
    }

    #[test]
    fn explicit_providers_win() {
        let injector = Injector::resolve_and_create(descriptor().providers()).unwrap();
        assert_eq!(*injector.get_as::<u8>("Users").unwrap(), 42);
    }
}
