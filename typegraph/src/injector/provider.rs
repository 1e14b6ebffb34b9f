use std::any::Any;
use std::fmt;
use std::sync::Arc;

use derivative::Derivative;
use serde::Deserialize;
use serde::Serialize;
use tower::BoxError;

use crate::metadata::ScalarCodec;
use crate::middleware::Middleware;

/// A singleton held by an [`super::Injector`].
pub type Instance = Arc<dyn Any + Send + Sync>;

type FactoryFn = Arc<dyn Fn(&Dependencies) -> Result<Instance, BoxError> + Send + Sync>;

/// Unique name of a dependency or of a logical type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new(name: impl Into<String>) -> Self {
        Token(name.into())
    }

    /// The token a type registers under by default: its unqualified type name.
    pub fn of<T: ?Sized>() -> Self {
        let name = std::any::type_name::<T>();
        let name = name.split('<').next().unwrap_or(name);
        Token(name.rsplit("::").next().unwrap_or(name).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Token {
    fn from(name: &str) -> Self {
        Token(name.to_string())
    }
}

impl From<String> for Token {
    fn from(name: String) -> Self {
        Token(name)
    }
}

impl From<&Token> for Token {
    fn from(token: &Token) -> Self {
        token.clone()
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A type the injector knows how to build.
///
/// Dependencies are declared statically and resolved, in order, before `create` runs.
pub trait Injectable: Sized + Send + Sync + 'static {
    fn token() -> Token {
        Token::of::<Self>()
    }

    fn dependencies() -> Vec<Token> {
        Vec::new()
    }

    fn create(dependencies: &Dependencies) -> Result<Self, BoxError>;
}

/// The resolved dependencies handed to a factory, in declaration order.
#[derive(Clone, Default)]
pub struct Dependencies {
    pub(super) resolved: Vec<(Token, Instance)>,
}

impl Dependencies {
    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }

    pub fn instance(&self, index: usize) -> Result<Instance, BoxError> {
        self.resolved
            .get(index)
            .map(|(_, instance)| instance.clone())
            .ok_or_else(|| format!("no dependency declared at position {index}").into())
    }

    /// Downcast the dependency at `index` to `T`.
    pub fn get<T: Any + Send + Sync>(&self, index: usize) -> Result<Arc<T>, BoxError> {
        let (token, instance) = self
            .resolved
            .get(index)
            .ok_or_else(|| format!("no dependency declared at position {index}"))?;
        instance.clone().downcast::<T>().map_err(|_| {
            format!(
                "dependency '{token}' is not a {}",
                std::any::type_name::<T>()
            )
            .into()
        })
    }
}

impl fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.resolved.iter().map(|(token, _)| token))
            .finish()
    }
}

/// How to produce the instance registered at a token.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct Provider {
    pub(super) token: Token,
    pub(super) source: ProviderSource,
}

#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub(super) enum ProviderSource {
    Value(#[derivative(Debug = "ignore")] Instance),
    Factory {
        dependencies: Vec<Token>,
        #[derivative(Debug = "ignore")]
        factory: FactoryFn,
    },
}

impl Provider {
    /// A precomputed value.
    pub fn value<T: Any + Send + Sync>(token: impl Into<Token>, value: T) -> Self {
        Self::instance(token, Arc::new(value))
    }

    /// A precomputed, already shared instance.
    pub fn instance(token: impl Into<Token>, instance: Instance) -> Self {
        Provider {
            token: token.into(),
            source: ProviderSource::Value(instance),
        }
    }

    /// A factory invoked once, after the listed dependency tokens are resolved.
    pub fn factory<F>(
        token: impl Into<Token>,
        dependencies: impl IntoIterator<Item = impl Into<Token>>,
        factory: F,
    ) -> Self
    where
        F: Fn(&Dependencies) -> Result<Instance, BoxError> + Send + Sync + 'static,
    {
        Provider {
            token: token.into(),
            source: ProviderSource::Factory {
                dependencies: dependencies.into_iter().map(Into::into).collect(),
                factory: Arc::new(factory),
            },
        }
    }

    /// Register `T` under its own token.
    pub fn of<T: Injectable>() -> Self {
        Self::erased::<T>(|instance| Arc::new(instance) as Instance)
    }

    /// Register `M` so that middleware sequences can execute it.
    pub fn middleware<M: Middleware + Injectable>() -> Self {
        Self::erased::<M>(|instance| {
            Arc::new(Arc::new(instance) as Arc<dyn Middleware>) as Instance
        })
    }

    /// Register an already built middleware.
    pub fn middleware_instance(token: impl Into<Token>, middleware: Arc<dyn Middleware>) -> Self {
        Self::instance(token, Arc::new(middleware))
    }

    /// Register `S` so that scalar types can serialize and parse through it.
    pub fn scalar<S: ScalarCodec + Injectable>() -> Self {
        Self::erased::<S>(|instance| {
            Arc::new(Arc::new(instance) as Arc<dyn ScalarCodec>) as Instance
        })
    }

    fn erased<T: Injectable>(wrap: fn(T) -> Instance) -> Self {
        Self::factory(T::token(), T::dependencies(), move |dependencies| {
            T::create(dependencies).map(wrap)
        })
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn dependencies(&self) -> &[Token] {
        match &self.source {
            ProviderSource::Value(_) => &[],
            ProviderSource::Factory { dependencies, .. } => dependencies,
        }
    }
}
