//! Partition declared components by kind and group object fragments by type name.

use indexmap::IndexMap;

use crate::metadata::Component;
use crate::metadata::InputDefinition;
use crate::metadata::InterfaceDefinition;
use crate::metadata::ObjectDefinition;
use crate::metadata::ObjectImplementation;
use crate::metadata::ScalarDefinition;
use crate::metadata::UnionDefinition;

/// Components sorted by kind, each bucket in declaration order.
#[derive(Clone, Debug, Default)]
pub struct ClassifiedComponents {
    pub interfaces: Vec<InterfaceDefinition>,
    pub unions: Vec<UnionDefinition>,
    pub inputs: Vec<InputDefinition>,
    pub scalars: Vec<ScalarDefinition>,
    pub object_definitions: Vec<ObjectDefinition>,
    pub object_implementations: Vec<ObjectImplementation>,
}

/// Every fragment declaring one object type.
#[derive(Clone, Debug, Default)]
pub struct TypeFragments {
    pub definitions: Vec<ObjectDefinition>,
    pub implementations: Vec<ObjectImplementation>,
}

/// Sort `components` by kind. Middleware and unannotated components are dropped.
pub fn classify(components: impl IntoIterator<Item = Component>) -> ClassifiedComponents {
    let mut classified = ClassifiedComponents::default();
    for component in components {
        match component {
            Component::Interface(interface) => classified.interfaces.push(interface),
            Component::Union(union) => classified.unions.push(union),
            Component::Input(input) => classified.inputs.push(input),
            Component::Scalar(scalar) => classified.scalars.push(scalar),
            Component::ObjectDefinition(definition) => {
                classified.object_definitions.push(definition)
            }
            Component::ObjectImplementation(implementation) => {
                classified.object_implementations.push(implementation)
            }
            Component::Middleware(_) | Component::Unannotated(_) => {}
        }
    }
    classified
}

/// Group object fragments by type name, in order of first declaration.
///
/// Definitions come first, so a type declared by a definition and an implementation is
/// positioned where its first definition is.
pub fn group_by_type_name(
    definitions: Vec<ObjectDefinition>,
    implementations: Vec<ObjectImplementation>,
) -> IndexMap<String, TypeFragments> {
    let mut groups: IndexMap<String, TypeFragments> = IndexMap::new();
    for definition in definitions {
        groups
            .entry(definition.name.clone())
            .or_default()
            .definitions
            .push(definition);
    }
    for implementation in implementations {
        groups
            .entry(implementation.name.clone())
            .or_default()
            .implementations
            .push(implementation);
    }
    groups
}
