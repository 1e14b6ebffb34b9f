//! Token registry resolving dependencies to lazily built singletons.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use derivative::Derivative;
use once_cell::sync::OnceCell;

mod provider;

pub use self::provider::Dependencies;
pub use self::provider::Injectable;
pub use self::provider::Instance;
pub use self::provider::Provider;
pub use self::provider::Token;
use self::provider::ProviderSource;
use crate::error::RegistrationError;
use crate::error::ResolutionError;

#[derive(Derivative)]
#[derivative(Debug)]
struct Entry {
    provider: Provider,
    #[derivative(Debug = "ignore")]
    instance: OnceCell<Instance>,
}

/// Resolves tokens to singleton instances.
///
/// Providers are registered once, when the injector is created. Each instance is
/// built on first use, after its declared dependencies, and cached for the lifetime of
/// the injector.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Injector {
    entries: HashMap<Token, Entry>,
}

impl Injector {
    /// Register `providers`, failing on an invalid or duplicate token.
    pub fn resolve_and_create(
        providers: impl IntoIterator<Item = Provider>,
    ) -> Result<Arc<Self>, RegistrationError> {
        let mut entries = HashMap::new();
        for provider in providers {
            if provider.token.is_empty() {
                return Err(RegistrationError::InvalidProvider {
                    reason: "provider token must not be empty".to_string(),
                });
            }
            if entries.contains_key(&provider.token) {
                return Err(RegistrationError::DuplicateToken(provider.token));
            }
            tracing::trace!(
                token = %provider.token,
                dependencies = ?provider.dependencies(),
                "registering provider"
            );
            entries.insert(
                provider.token.clone(),
                Entry {
                    provider,
                    instance: OnceCell::new(),
                },
            );
        }
        tracing::debug!("injector created with {} providers", entries.len());

        Ok(Arc::new(Injector { entries }))
    }

    pub fn contains(&self, token: impl Into<Token>) -> bool {
        self.entries.contains_key(&token.into())
    }

    /// Resolve `token`, building it and its dependencies on first use.
    pub fn get(&self, token: impl Into<Token>) -> Result<Instance, ResolutionError> {
        self.resolve(&token.into(), &mut Vec::new())
    }

    /// Like [`Injector::get`], but an unregistered token yields `fallback`.
    ///
    /// Failures while building a registered token are still reported.
    pub fn get_or(
        &self,
        token: impl Into<Token>,
        fallback: Instance,
    ) -> Result<Instance, ResolutionError> {
        match self.get(token) {
            Err(ResolutionError::UnknownToken(_)) => Ok(fallback),
            other => other,
        }
    }

    /// Resolve `token` and downcast it to `T`.
    pub fn get_as<T: Any + Send + Sync>(
        &self,
        token: impl Into<Token>,
    ) -> Result<Arc<T>, ResolutionError> {
        let token = token.into();
        self.get(&token)?
            .downcast::<T>()
            .map_err(|_| ResolutionError::TypeMismatch {
                token,
                expected: std::any::type_name::<T>(),
            })
    }

    fn resolve(
        &self,
        token: &Token,
        chain: &mut Vec<Token>,
    ) -> Result<Instance, ResolutionError> {
        let entry = self
            .entries
            .get(token)
            .ok_or_else(|| ResolutionError::UnknownToken(token.clone()))?;
        if let Some(instance) = entry.instance.get() {
            return Ok(instance.clone());
        }
        if chain.contains(token) {
            let chain = chain
                .iter()
                .chain(std::iter::once(token))
                .map(Token::as_str)
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(ResolutionError::CyclicDependency { chain });
        }

        chain.push(token.clone());
        let result = entry
            .instance
            .get_or_try_init(|| self.construct(&entry.provider, chain))
            .cloned();
        chain.pop();
        result
    }

    fn construct(
        &self,
        provider: &Provider,
        chain: &mut Vec<Token>,
    ) -> Result<Instance, ResolutionError> {
        match &provider.source {
            ProviderSource::Value(instance) => Ok(instance.clone()),
            ProviderSource::Factory {
                dependencies,
                factory,
            } => {
                let mut resolved = Vec::with_capacity(dependencies.len());
                for dependency in dependencies {
                    let instance = self.resolve(dependency, chain).map_err(|source| {
                        ResolutionError::Factory {
                            factory: provider.token.clone(),
                            source: source.into(),
                        }
                    })?;
                    resolved.push((dependency.clone(), instance));
                }
                tracing::trace!(token = %provider.token, "constructing instance");
                factory(&Dependencies { resolved }).map_err(|source| ResolutionError::Factory {
                    factory: provider.token.clone(),
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use tower::BoxError;

    use super::*;

    static_assertions::assert_impl_all!(Injector: Send, Sync);

    struct Database {
        url: String,
    }

    impl Injectable for Database {
        fn create(_dependencies: &Dependencies) -> Result<Self, BoxError> {
            Ok(Database {
                url: "postgres://localhost".to_string(),
            })
        }
    }

    struct UserService {
        database: Arc<Database>,
    }

    impl Injectable for UserService {
        fn dependencies() -> Vec<Token> {
            vec![Token::of::<Database>()]
        }

        fn create(dependencies: &Dependencies) -> Result<Self, BoxError> {
            Ok(UserService {
                database: dependencies.get::<Database>(0)?,
            })
        }
    }

    #[test]
    fn duplicate_tokens_fail_registration() {
        let result = Injector::resolve_and_create([
            Provider::value("config", 1u32),
            Provider::value("config", 2u32),
        ]);
        assert_eq!(
            result.unwrap_err(),
            RegistrationError::DuplicateToken(Token::new("config"))
        );
    }

    #[test]
    fn empty_tokens_are_invalid() {
        let result = Injector::resolve_and_create([Provider::value("", 1u32)]);
        assert!(matches!(
            result.unwrap_err(),
            RegistrationError::InvalidProvider { .. }
        ));
    }

    #[test]
    fn instances_are_singletons() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let injector = Injector::resolve_and_create([Provider::factory(
            "counter",
            Vec::<Token>::new(),
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(String::from("instance")) as Instance)
            },
        )])
        .unwrap();

        let first = injector.get("counter").unwrap();
        let second = injector.get("counter").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dependencies_are_resolved_recursively() {
        let injector = Injector::resolve_and_create([
            Provider::of::<UserService>(),
            Provider::of::<Database>(),
        ])
        .unwrap();

        let service = injector.get_as::<UserService>("UserService").unwrap();
        let database = injector.get_as::<Database>("Database").unwrap();
        assert_eq!(service.database.url, "postgres://localhost");
        assert!(Arc::ptr_eq(&service.database, &database));
    }

    #[test]
    fn unknown_token_without_fallback_fails() {
        let injector = Injector::resolve_and_create(Vec::new()).unwrap();
        let error = injector.get("missing").unwrap_err();
        assert_eq!(error.to_string(), "no provider for token 'missing'");
    }

    #[test]
    fn unknown_token_with_fallback_returns_the_fallback() {
        let injector = Injector::resolve_and_create(Vec::new()).unwrap();
        let fallback: Instance = Arc::new(7u8);
        let instance = injector.get_or("missing", fallback.clone()).unwrap();
        assert!(Arc::ptr_eq(&instance, &fallback));
    }

    #[test]
    fn factory_errors_are_prefixed_with_the_factory_name() {
        let injector = Injector::resolve_and_create([Provider::of::<UserService>()]).unwrap();
        let error = injector.get("UserService").unwrap_err();
        assert_eq!(
            error.to_string(),
            "UserService -> no provider for token 'Database'"
        );

        let injector = Injector::resolve_and_create([Provider::factory(
            "Broken",
            Vec::<Token>::new(),
            |_| Err("connection refused".into()),
        )])
        .unwrap();
        assert_eq!(
            injector.get("Broken").unwrap_err().to_string(),
            "Broken -> connection refused"
        );
    }

    #[test]
    fn cycles_are_reported() {
        let injector = Injector::resolve_and_create([
            Provider::factory("A", ["B"], |_| Ok(Arc::new(()) as Instance)),
            Provider::factory("B", ["A"], |_| Ok(Arc::new(()) as Instance)),
        ])
        .unwrap();
        let error = injector.get("A").unwrap_err();
        assert_eq!(
            error.to_string(),
            "A -> B -> cyclic dependency detected: A -> B -> A"
        );
    }

    #[test]
    fn type_mismatch_is_reported() {
        let injector = Injector::resolve_and_create([Provider::value("name", 1u32)]).unwrap();
        assert!(matches!(
            injector.get_as::<String>("name").unwrap_err(),
            ResolutionError::TypeMismatch { .. }
        ));
    }
}
