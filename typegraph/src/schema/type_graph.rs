use std::sync::Arc;

use derivative::Derivative;
use indexmap::IndexMap;

use super::FieldType;
use super::TypeResolver;
use crate::metadata::ScalarCodec;
use crate::resolver::Resolve;

/// A compiled, fully linked set of named types.
///
/// Every type reference of every field, argument and union member names a node of the
/// graph.
#[derive(Debug)]
pub struct TypeGraph {
    pub(crate) types: IndexMap<String, TypeNode>,
    pub(crate) query: String,
    pub(crate) mutation: Option<String>,
}

impl TypeGraph {
    pub fn get(&self, name: &str) -> Option<&TypeNode> {
        self.types.get(name)
    }

    pub fn object(&self, name: &str) -> Option<&ObjectNode> {
        match self.types.get(name) {
            Some(TypeNode::Object(object)) => Some(object),
            _ => None,
        }
    }

    /// Every node, built-in scalars first, then in declaration order.
    pub fn types(&self) -> impl Iterator<Item = &TypeNode> {
        self.types.values()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn mutation(&self) -> Option<&str> {
        self.mutation.as_deref()
    }

    /// Returns `true` if `maybe_subtype` is `abstract_type` or one of its possible types.
    pub fn is_subtype(&self, abstract_type: &str, maybe_subtype: &str) -> bool {
        if abstract_type == maybe_subtype {
            return true;
        }
        match self.types.get(abstract_type) {
            Some(TypeNode::Interface(InterfaceNode { resolver, .. }))
            | Some(TypeNode::Union(UnionNode { resolver, .. })) => resolver
                .possible_types()
                .iter()
                .any(|possible| possible == maybe_subtype),
            _ => false,
        }
    }
}

/// One named type of a [`TypeGraph`].
#[derive(Debug)]
pub enum TypeNode {
    Scalar(ScalarNode),
    Object(ObjectNode),
    Interface(InterfaceNode),
    Union(UnionNode),
    Input(InputNode),
}

impl TypeNode {
    pub fn name(&self) -> &str {
        match self {
            TypeNode::Scalar(node) => &node.name,
            TypeNode::Object(node) => &node.name,
            TypeNode::Interface(node) => &node.name,
            TypeNode::Union(node) => &node.name,
            TypeNode::Input(node) => &node.name,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            TypeNode::Scalar(node) => node.description.as_deref(),
            TypeNode::Object(node) => node.description.as_deref(),
            TypeNode::Interface(node) => node.description.as_deref(),
            TypeNode::Union(node) => node.description.as_deref(),
            TypeNode::Input(node) => node.description.as_deref(),
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            TypeNode::Scalar(_) => "scalar",
            TypeNode::Object(_) => "object",
            TypeNode::Interface(_) => "interface",
            TypeNode::Union(_) => "union",
            TypeNode::Input(_) => "input",
        }
    }

    /// Scalars and inputs may be used as arguments and input fields.
    pub(crate) fn is_input_type(&self) -> bool {
        matches!(self, TypeNode::Scalar(_) | TypeNode::Input(_))
    }

    pub(crate) fn is_output_type(&self) -> bool {
        !matches!(self, TypeNode::Input(_))
    }
}

#[derive(Derivative)]
#[derivative(Debug)]
pub struct ScalarNode {
    pub name: String,
    pub description: Option<String>,
    /// `None` for built-in scalars.
    #[derivative(Debug = "ignore")]
    pub codec: Option<Arc<dyn ScalarCodec>>,
}

#[derive(Debug)]
pub struct ObjectNode {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, FieldNode>,
    pub implements: Vec<String>,
}

#[derive(Debug)]
pub struct InterfaceNode {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, FieldNode>,
    pub resolver: TypeResolver,
}

#[derive(Debug)]
pub struct UnionNode {
    pub name: String,
    pub description: Option<String>,
    pub resolver: TypeResolver,
}

#[derive(Debug)]
pub struct InputNode {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, InputValueNode>,
}

/// A field of an object or interface type.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct FieldNode {
    pub name: String,
    pub description: Option<String>,
    pub ty: FieldType,
    pub args: IndexMap<String, InputValueNode>,
    #[derivative(Debug = "ignore")]
    pub resolve: Resolve,
}

/// An argument or an input field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputValueNode {
    pub name: String,
    pub description: Option<String>,
    pub ty: FieldType,
}
