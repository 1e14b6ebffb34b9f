use std::any::Any;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use derivative::Derivative;
use futures::future;
use futures::FutureExt;
use indexmap::IndexMap;
use serde::Serialize;
use tower::BoxError;

use crate::context::Context;
use crate::injector::Injectable;
use crate::injector::Instance;
use crate::injector::Provider;
use crate::injector::Token;
use crate::middleware::MiddlewareBinding;
use crate::resolver::Arguments;
use crate::resolver::Method;
use crate::resolver::ResolvedValue;

/// Type of a field or of an input field.
///
/// Fields are non-null unless marked [`FieldDescriptor::nullable`]. A list field wraps
/// the named type in a list of nullable items: `[User]!`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    pub type_name: String,
    pub list: bool,
    pub nullable: bool,
    pub description: Option<String>,
}

impl FieldDescriptor {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            list: false,
            nullable: false,
            description: None,
        }
    }

    pub fn list(mut self) -> Self {
        self.list = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// An argument of a resolver backed field.
///
/// `index` is the position of the argument in the [`Arguments`] the implementation
/// method receives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ArgumentDescriptor {
    pub name: String,
    pub type_name: String,
    pub list: bool,
    pub nullable: bool,
    pub index: Option<usize>,
}

impl ArgumentDescriptor {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            list: false,
            nullable: false,
            index: None,
        }
    }

    pub fn list(mut self) -> Self {
        self.list = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Bind the argument at position `index`. Claiming position 0 replaces the source.
    pub fn at(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub(crate) fn as_field(&self) -> FieldDescriptor {
        FieldDescriptor {
            type_name: self.type_name.clone(),
            list: self.list,
            nullable: self.nullable,
            description: None,
        }
    }
}

/// Plain fields of an object type.
///
/// Several definitions may share a name; their fields are merged at compile time.
#[derive(Clone, Debug, Default)]
pub struct ObjectDefinition {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, FieldDescriptor>,
    pub implements: Vec<String>,
    pub(crate) duplicates: Vec<String>,
}

impl ObjectDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, field: FieldDescriptor) -> Self {
        insert_field(&mut self.fields, &mut self.duplicates, name.into(), field);
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.implements.push(interface.into());
        self
    }
}

/// Fields of an input object type.
#[derive(Clone, Debug, Default)]
pub struct InputDefinition {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, FieldDescriptor>,
    pub(crate) duplicates: Vec<String>,
}

impl InputDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, field: FieldDescriptor) -> Self {
        insert_field(&mut self.fields, &mut self.duplicates, name.into(), field);
        self
    }
}

pub(crate) fn insert_field<T>(
    fields: &mut IndexMap<String, T>,
    duplicates: &mut Vec<String>,
    name: String,
    field: T,
) {
    if fields.contains_key(&name) {
        duplicates.push(name);
    } else {
        fields.insert(name, field);
    }
}

/// Structural description of a resolver backed field.
#[derive(Clone, Debug, Serialize)]
pub struct ResolverDescriptor {
    pub name: String,
    pub field: FieldDescriptor,
    /// Token of the implementation instance owning the method.
    pub instance_token: Token,
    pub args: Vec<ArgumentDescriptor>,
    /// Empty means the implementation's type level bindings apply.
    pub middlewares: Vec<MiddlewareBinding>,
}

impl ResolverDescriptor {
    pub fn new(name: impl Into<String>, field: FieldDescriptor) -> Self {
        Self {
            name: name.into(),
            field,
            instance_token: Token::new(""),
            args: Vec::new(),
            middlewares: Vec::new(),
        }
    }

    /// Add an argument. Without an explicit position it takes the one after the last
    /// declared argument, starting at 1.
    pub fn arg(mut self, mut argument: ArgumentDescriptor) -> Self {
        if argument.index.is_none() {
            let next = self
                .args
                .iter()
                .filter_map(|argument| argument.index)
                .max()
                .map_or(1, |last| last + 1);
            argument.index = Some(next);
        }
        self.args.push(argument);
        self
    }

    pub fn middleware(mut self, binding: MiddlewareBinding) -> Self {
        self.middlewares.push(binding);
        self
    }

    pub(crate) fn has_source_slot(&self) -> bool {
        !self.args.iter().any(|argument| argument.index == Some(0))
    }
}

/// A resolver descriptor together with the method it invokes.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct Resolver {
    pub descriptor: ResolverDescriptor,
    #[derivative(Debug = "ignore")]
    pub(crate) method: Method,
}

/// Resolver backed fields of an object type, all served by one implementation instance.
#[derive(Clone, Debug)]
pub struct ObjectImplementation {
    pub name: String,
    pub description: Option<String>,
    pub implements: Vec<String>,
    pub instance_token: Token,
    pub resolvers: IndexMap<String, Resolver>,
    /// Applied to every resolver declaring no middleware of its own.
    pub middlewares: Vec<MiddlewareBinding>,
    pub(crate) provider: Option<Provider>,
    pub(crate) duplicates: Vec<String>,
}

impl ObjectImplementation {
    /// Implement `name` with an instance of `T`, registered under `T`'s own token.
    pub fn of<T: Injectable>(name: impl Into<String>) -> ImplementationBuilder<T> {
        let mut builder = ImplementationBuilder::new(name, T::token());
        builder.implementation.provider = Some(Provider::of::<T>());
        builder
    }

    pub fn provider(&self) -> Option<&Provider> {
        self.provider.as_ref()
    }
}

/// Builds an [`ObjectImplementation`] whose methods take an `Arc<T>`.
pub struct ImplementationBuilder<T> {
    implementation: ObjectImplementation,
    instance: PhantomData<fn() -> T>,
}

impl<T> ImplementationBuilder<T>
where
    T: Any + Send + Sync,
{
    /// Implement `name` with the instance registered at `instance_token`.
    pub fn new(name: impl Into<String>, instance_token: impl Into<Token>) -> Self {
        Self {
            implementation: ObjectImplementation {
                name: name.into(),
                description: None,
                implements: Vec::new(),
                instance_token: instance_token.into(),
                resolvers: IndexMap::new(),
                middlewares: Vec::new(),
                provider: None,
                duplicates: Vec::new(),
            },
            instance: PhantomData,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.implementation.description = Some(description.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.implementation.implements.push(interface.into());
        self
    }

    pub fn middleware(mut self, binding: MiddlewareBinding) -> Self {
        self.implementation.middlewares.push(binding);
        self
    }

    /// Add a resolver backed field.
    ///
    /// `method` receives the implementation instance, the positional [`Arguments`] and
    /// the shared [`Context`].
    pub fn resolver<F, Fut>(mut self, mut descriptor: ResolverDescriptor, method: F) -> Self
    where
        F: Fn(Arc<T>, Arguments, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ResolvedValue, BoxError>> + Send + 'static,
    {
        descriptor.instance_token = self.implementation.instance_token.clone();
        let field = descriptor.name.clone();
        let method: Method = Arc::new(move |instance: Instance, arguments, context| {
            match instance.downcast::<T>() {
                Ok(instance) => method(instance, arguments, context).boxed(),
                Err(_) => future::ready(Err::<ResolvedValue, BoxError>(
                    format!(
                        "implementation instance for field '{field}' is not a {}",
                        std::any::type_name::<T>()
                    )
                    .into(),
                ))
                .boxed(),
            }
        });
        let name = descriptor.name.clone();
        insert_field(
            &mut self.implementation.resolvers,
            &mut self.implementation.duplicates,
            name,
            Resolver { descriptor, method },
        );
        self
    }

    pub fn build(self) -> ObjectImplementation {
        self.implementation
    }
}

impl<T> From<ImplementationBuilder<T>> for crate::metadata::Component
where
    T: Any + Send + Sync,
{
    fn from(builder: ImplementationBuilder<T>) -> Self {
        crate::metadata::Component::ObjectImplementation(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;
    use crate::injector::Dependencies;

    struct Users;

    impl Injectable for Users {
        fn create(_dependencies: &Dependencies) -> Result<Self, BoxError> {
            Ok(Users)
        }
    }

    #[test]
    fn arguments_are_positioned_after_the_source() {
        let descriptor = ResolverDescriptor::new("user", FieldDescriptor::new("User"))
            .arg(ArgumentDescriptor::new("name", "String"))
            .arg(ArgumentDescriptor::new("age", "Int").nullable());
        let indexes: Vec<_> = descriptor.args.iter().map(|a| a.index).collect();
        assert_eq!(indexes, vec![Some(1), Some(2)]);
        assert!(descriptor.has_source_slot());
    }

    #[test]
    fn claiming_position_zero_removes_the_source_slot() {
        let descriptor = ResolverDescriptor::new("user", FieldDescriptor::new("User"))
            .arg(ArgumentDescriptor::new("name", "String").at(0))
            .arg(ArgumentDescriptor::new("age", "Int"));
        let indexes: Vec<_> = descriptor.args.iter().map(|a| a.index).collect();
        assert_eq!(indexes, vec![Some(0), Some(1)]);
        assert!(!descriptor.has_source_slot());
    }

    #[test]
    fn duplicate_fields_are_recorded() {
        let definition = ObjectDefinition::new("User")
            .field("name", FieldDescriptor::new("String"))
            .field("name", FieldDescriptor::new("ID"));
        assert_eq!(definition.fields.len(), 1);
        assert_eq!(definition.fields["name"].type_name, "String");
        assert_eq!(definition.duplicates, vec!["name".to_string()]);
    }

    #[tokio::test]
    async fn implementation_methods_receive_the_instance() {
        let implementation = ObjectImplementation::of::<Users>("Query")
            .resolver(
                ResolverDescriptor::new("hello", FieldDescriptor::new("String")),
                |_users: Arc<Users>, _arguments, _context| async {
                    Ok(ResolvedValue::value("world"))
                },
            )
            .build();
        assert_eq!(implementation.instance_token, Token::new("Users"));
        assert_eq!(
            implementation.provider().map(Provider::token),
            Some(&Token::new("Users"))
        );

        let resolver = &implementation.resolvers["hello"];
        assert_eq!(resolver.descriptor.instance_token, Token::new("Users"));
        let value = (resolver.method)(
            Arc::new(Users) as Instance,
            Arguments::default(),
            Context::new(),
        )
        .await
        .unwrap();
        assert_eq!(value, ResolvedValue::value(json!("world")));

        let error = (resolver.method)(
            Arc::new(42u8) as Instance,
            Arguments::default(),
            Context::new(),
        )
        .await
        .unwrap_err();
        assert!(error.to_string().contains("is not a"));
    }
}
