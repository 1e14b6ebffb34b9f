//! Structural descriptions of the components a schema is assembled from.
//!
//! Every component is described by a builder (`ObjectDefinition::new("User").field(..)`)
//! and handed to a [`crate::SchemaDescriptor`] as a [`Component`]. A Rust type can carry its
//! own description by implementing [`Describe`].

use serde::Serialize;

mod abstract_type;
mod object;
mod scalar;

pub use self::abstract_type::InterfaceDefinition;
pub use self::abstract_type::ResolveTypeFn;
pub use self::abstract_type::UnionDefinition;
pub use self::object::ArgumentDescriptor;
pub use self::object::FieldDescriptor;
pub use self::object::ImplementationBuilder;
pub use self::object::InputDefinition;
pub use self::object::ObjectDefinition;
pub use self::object::ObjectImplementation;
pub use self::object::Resolver;
pub use self::object::ResolverDescriptor;
pub use self::scalar::ScalarCodec;
pub use self::scalar::ScalarDefinition;
use crate::injector::Token;

/// The kind of a declared [`Component`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ComponentKind {
    ObjectDefinition,
    ObjectImplementation,
    Interface,
    Union,
    Input,
    Scalar,
    Middleware,
    Unannotated,
}

/// One declared building block of a schema.
#[derive(Clone, Debug)]
pub enum Component {
    /// Plain fields of an object type.
    ObjectDefinition(ObjectDefinition),
    /// Resolver backed fields of an object type.
    ObjectImplementation(ObjectImplementation),
    Interface(InterfaceDefinition),
    Union(UnionDefinition),
    Input(InputDefinition),
    Scalar(ScalarDefinition),
    /// A middleware token. Middleware is not part of the type graph.
    Middleware(Token),
    /// Anything that was declared without a description. Ignored by compilation.
    Unannotated(String),
}

impl Component {
    /// The description a Rust type carries.
    pub fn of<T: Describe>() -> Self {
        T::describe()
    }

    pub fn kind(&self) -> ComponentKind {
        match self {
            Component::ObjectDefinition(_) => ComponentKind::ObjectDefinition,
            Component::ObjectImplementation(_) => ComponentKind::ObjectImplementation,
            Component::Interface(_) => ComponentKind::Interface,
            Component::Union(_) => ComponentKind::Union,
            Component::Input(_) => ComponentKind::Input,
            Component::Scalar(_) => ComponentKind::Scalar,
            Component::Middleware(_) => ComponentKind::Middleware,
            Component::Unannotated(_) => ComponentKind::Unannotated,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Component::ObjectDefinition(definition) => &definition.name,
            Component::ObjectImplementation(implementation) => &implementation.name,
            Component::Interface(interface) => &interface.name,
            Component::Union(union) => &union.name,
            Component::Input(input) => &input.name,
            Component::Scalar(scalar) => &scalar.name,
            Component::Middleware(token) => token.as_str(),
            Component::Unannotated(name) => name,
        }
    }
}

/// Attach a component description to a Rust type.
pub trait Describe {
    fn describe() -> Component;
}

macro_rules! impl_into_component {
    ($($variant: ident($ty: ty)),+ $(,)?) => {
        $(
            impl From<$ty> for Component {
                fn from(component: $ty) -> Self {
                    Component::$variant(component)
                }
            }
        )+
    };
}

impl_into_component!(
    ObjectDefinition(ObjectDefinition),
    ObjectImplementation(ObjectImplementation),
    Interface(InterfaceDefinition),
    Union(UnionDefinition),
    Input(InputDefinition),
    Scalar(ScalarDefinition),
);
