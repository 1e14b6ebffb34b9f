//! Compile a [`SchemaDescriptor`] into a [`TypeGraph`].
//!
//! Named types are declared first, then linked: every type reference is checked against
//! the complete set of declared types, so types may reference each other in any order.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use indexmap::IndexSet;

use super::field_type::BUILTIN_SCALARS;
use super::type_graph::FieldNode;
use super::type_graph::InputNode;
use super::type_graph::InputValueNode;
use super::type_graph::InterfaceNode;
use super::type_graph::ObjectNode;
use super::type_graph::ScalarNode;
use super::type_graph::TypeNode;
use super::type_graph::UnionNode;
use super::FieldType;
use super::SchemaDescriptor;
use super::TypeGraph;
use super::TypeResolver;
use crate::classify::classify;
use crate::classify::group_by_type_name;
use crate::classify::TypeFragments;
use crate::configuration::Configuration;
use crate::error::ResolutionError;
use crate::error::SchemaError;
use crate::injector::Injector;
use crate::metadata::ArgumentDescriptor;
use crate::metadata::FieldDescriptor;
use crate::metadata::ResolveTypeFn;
use crate::metadata::ScalarCodec;
use crate::metadata::ScalarDefinition;
use crate::resolver::field_resolver;
use crate::resolver::property_resolver;

/// Compile `descriptor`, resolving implementation and scalar instances from `injector`.
pub fn compile(
    descriptor: &SchemaDescriptor,
    injector: &Arc<Injector>,
    configuration: &Configuration,
) -> Result<TypeGraph, SchemaError> {
    let classified = classify(descriptor.components.iter().cloned());
    tracing::debug!(
        interfaces = classified.interfaces.len(),
        unions = classified.unions.len(),
        inputs = classified.inputs.len(),
        scalars = classified.scalars.len(),
        object_definitions = classified.object_definitions.len(),
        object_implementations = classified.object_implementations.len(),
        "compiling schema"
    );

    let mut factory = Factory {
        types: IndexMap::new(),
        custom_resolvers: HashMap::new(),
        union_members: HashMap::new(),
    };
    for name in BUILTIN_SCALARS {
        factory.declare(TypeNode::Scalar(ScalarNode {
            name: name.to_string(),
            description: None,
            codec: None,
        }))?;
    }

    for interface in classified.interfaces {
        if let Some(field) = interface.duplicates.first() {
            return Err(SchemaError::DuplicateField {
                field: field.clone(),
                parent: interface.name,
            });
        }
        let fields = interface
            .fields
            .iter()
            .map(|(name, field)| (name.clone(), plain_field(name, field)))
            .collect();
        factory
            .custom_resolvers
            .insert(interface.name.clone(), interface.resolve_type.clone());
        factory.declare(TypeNode::Interface(InterfaceNode {
            resolver: pending_resolver(&interface.name, configuration),
            name: interface.name,
            description: interface.description,
            fields,
        }))?;
    }

    for union in classified.unions {
        factory
            .custom_resolvers
            .insert(union.name.clone(), union.resolve_type.clone());
        factory
            .union_members
            .insert(union.name.clone(), union.types.clone());
        factory.declare(TypeNode::Union(UnionNode {
            resolver: pending_resolver(&union.name, configuration),
            name: union.name,
            description: union.description,
        }))?;
    }

    for input in classified.inputs {
        if let Some(field) = input.duplicates.first() {
            return Err(SchemaError::DuplicateField {
                field: field.clone(),
                parent: input.name,
            });
        }
        let fields = input
            .fields
            .iter()
            .map(|(name, field)| (name.clone(), input_value(name, field)))
            .collect();
        factory.declare(TypeNode::Input(InputNode {
            name: input.name,
            description: input.description,
            fields,
        }))?;
    }

    for scalar in classified.scalars {
        let codec = scalar_codec(&scalar, injector)?;
        factory.declare(TypeNode::Scalar(ScalarNode {
            name: scalar.name,
            description: scalar.description,
            codec: Some(codec),
        }))?;
    }
    tracing::debug!("declared {} named types", factory.types.len());

    let groups = group_by_type_name(
        classified.object_definitions,
        classified.object_implementations,
    );
    for (name, fragments) in groups {
        let object = merge_object(name, fragments, injector)?;
        tracing::trace!(
            object = %object.name,
            fields = ?object.fields.keys().collect::<Vec<_>>(),
            "merged object type"
        );
        factory.declare(TypeNode::Object(object))?;
    }

    factory.link(configuration)?;

    let query = descriptor.root_query.clone();
    if !matches!(factory.types.get(&query), Some(TypeNode::Object(_))) {
        return Err(SchemaError::MissingRootQuery(query));
    }
    if let Some(mutation) = &descriptor.root_mutation {
        if !matches!(factory.types.get(mutation), Some(TypeNode::Object(_))) {
            return Err(SchemaError::InvalidRootMutation(mutation.clone()));
        }
    }
    tracing::debug!(types = factory.types.len(), %query, "schema compiled");

    Ok(TypeGraph {
        types: factory.types,
        query,
        mutation: descriptor.root_mutation.clone(),
    })
}

struct Factory {
    types: IndexMap<String, TypeNode>,
    custom_resolvers: HashMap<String, Option<ResolveTypeFn>>,
    union_members: HashMap<String, Vec<String>>,
}

impl Factory {
    fn declare(&mut self, node: TypeNode) -> Result<(), SchemaError> {
        let name = node.name().to_string();
        if self.types.contains_key(&name) {
            return Err(SchemaError::DuplicateType(name));
        }
        self.types.insert(name, node);
        Ok(())
    }

    /// Validate every type reference and compute the possible types of abstract types.
    fn link(&mut self, configuration: &Configuration) -> Result<(), SchemaError> {
        for node in self.types.values() {
            match node {
                TypeNode::Object(object) => {
                    for interface in &object.implements {
                        let Some(TypeNode::Interface(interface)) = self.types.get(interface)
                        else {
                            return Err(SchemaError::UnknownInterface {
                                interface: interface.clone(),
                                parent: object.name.clone(),
                            });
                        };
                        self.check_implementation(object, interface)?;
                    }
                    self.check_fields(&object.name, &object.fields)?;
                }
                TypeNode::Interface(interface) => {
                    self.check_fields(&interface.name, &interface.fields)?;
                }
                TypeNode::Input(input) => {
                    for field in input.fields.values() {
                        self.check_input(&input.name, &field.name, &field.ty)?;
                    }
                }
                TypeNode::Union(union) => {
                    for member in self.union_members.get(&union.name).into_iter().flatten() {
                        if !matches!(self.types.get(member), Some(TypeNode::Object(_))) {
                            return Err(SchemaError::InvalidUnionMember {
                                member: member.clone(),
                                union: union.name.clone(),
                            });
                        }
                    }
                }
                TypeNode::Scalar(_) => {}
            }
            tracing::trace!(name = node.name(), kind = node.kind(), "type linked");
        }

        let field_sets: IndexMap<String, IndexSet<String>> = self
            .types
            .values()
            .filter_map(|node| match node {
                TypeNode::Object(object) => Some((
                    object.name.clone(),
                    object.fields.keys().cloned().collect(),
                )),
                _ => None,
            })
            .collect();
        let mut implementations: HashMap<String, Vec<String>> = HashMap::new();
        for node in self.types.values() {
            if let TypeNode::Object(object) = node {
                for interface in &object.implements {
                    implementations
                        .entry(interface.clone())
                        .or_default()
                        .push(object.name.clone());
                }
            }
        }

        for node in self.types.values_mut() {
            let (name, resolver, possible_types) = match node {
                TypeNode::Interface(interface) => (
                    &interface.name,
                    &mut interface.resolver,
                    implementations.remove(&interface.name).unwrap_or_default(),
                ),
                TypeNode::Union(union) => (
                    &union.name,
                    &mut union.resolver,
                    self.union_members.remove(&union.name).unwrap_or_default(),
                ),
                _ => continue,
            };
            let custom = self.custom_resolvers.remove(name).flatten();
            *resolver = TypeResolver::new(
                name,
                possible_types,
                &field_sets,
                custom,
                &configuration.type_resolution,
            );
        }
        Ok(())
    }

    fn check_fields(
        &self,
        parent: &str,
        fields: &IndexMap<String, FieldNode>,
    ) -> Result<(), SchemaError> {
        for field in fields.values() {
            let type_name = field.ty.inner_type_name();
            let node = self.lookup(parent, &field.name, type_name)?;
            if !node.is_output_type() {
                return Err(SchemaError::InvalidFieldType {
                    type_name: type_name.to_string(),
                    field: field.name.clone(),
                    parent: parent.to_string(),
                    reason: format!("{} types cannot be used as output", node.kind()),
                });
            }
            for argument in field.args.values() {
                self.check_input(parent, &field.name, &argument.ty)?;
            }
        }
        Ok(())
    }

    /// Every field of `interface` must be present on `object`, with a type that is
    /// valid wherever the interface field's type is expected.
    fn check_implementation(
        &self,
        object: &ObjectNode,
        interface: &InterfaceNode,
    ) -> Result<(), SchemaError> {
        let invalid = |field: &str, reason: String| SchemaError::InvalidImplementation {
            object: object.name.clone(),
            interface: interface.name.clone(),
            field: field.to_string(),
            reason,
        };
        for expected in interface.fields.values() {
            let Some(field) = object.fields.get(&expected.name) else {
                return Err(invalid(&expected.name, "the field is missing".to_string()));
            };
            if !self.is_covariant(&field.ty, &expected.ty) {
                return Err(invalid(
                    &field.name,
                    format!("type '{}' is not compatible with '{}'", field.ty, expected.ty),
                ));
            }
            for argument in expected.args.values() {
                match field.args.get(&argument.name) {
                    Some(actual) if actual.ty == argument.ty => {}
                    Some(actual) => {
                        return Err(invalid(
                            &field.name,
                            format!(
                                "argument '{}' has type '{}' instead of '{}'",
                                argument.name, actual.ty, argument.ty
                            ),
                        ))
                    }
                    None => {
                        return Err(invalid(
                            &field.name,
                            format!("argument '{}' is missing", argument.name),
                        ))
                    }
                }
            }
        }
        Ok(())
    }

    /// Whether a field of type `actual` can stand in for a field of type `expected`.
    fn is_covariant(&self, actual: &FieldType, expected: &FieldType) -> bool {
        match (actual, expected) {
            (FieldType::NonNull(actual), FieldType::NonNull(expected)) => {
                self.is_covariant(actual, expected)
            }
            (_, FieldType::NonNull(_)) => false,
            (FieldType::NonNull(actual), expected) => self.is_covariant(actual, expected),
            (FieldType::List(actual), FieldType::List(expected)) => {
                self.is_covariant(actual, expected)
            }
            (FieldType::List(_), _) | (_, FieldType::List(_)) => false,
            (actual, expected) => {
                let (actual, expected) = (actual.inner_type_name(), expected.inner_type_name());
                actual == expected || self.is_possible_type(expected, actual)
            }
        }
    }

    fn is_possible_type(&self, abstract_type: &str, object: &str) -> bool {
        match self.types.get(abstract_type) {
            Some(TypeNode::Interface(_)) => match self.types.get(object) {
                Some(TypeNode::Object(node)) => {
                    node.implements.iter().any(|name| name == abstract_type)
                }
                _ => false,
            },
            Some(TypeNode::Union(_)) => self
                .union_members
                .get(abstract_type)
                .is_some_and(|members| members.iter().any(|member| member == object)),
            _ => false,
        }
    }

    fn check_input(&self, parent: &str, field: &str, ty: &FieldType) -> Result<(), SchemaError> {
        let type_name = ty.inner_type_name();
        let node = self.lookup(parent, field, type_name)?;
        if !node.is_input_type() {
            return Err(SchemaError::InvalidFieldType {
                type_name: type_name.to_string(),
                field: field.to_string(),
                parent: parent.to_string(),
                reason: format!("{} types cannot be used as input", node.kind()),
            });
        }
        Ok(())
    }

    fn lookup(
        &self,
        parent: &str,
        field: &str,
        type_name: &str,
    ) -> Result<&TypeNode, SchemaError> {
        self.types
            .get(type_name)
            .ok_or_else(|| SchemaError::UnknownType {
                type_name: type_name.to_string(),
                field: field.to_string(),
                parent: parent.to_string(),
            })
    }
}

/// Merge every fragment of one object type.
fn merge_object(
    name: String,
    fragments: TypeFragments,
    injector: &Arc<Injector>,
) -> Result<ObjectNode, SchemaError> {
    let duplicate = |field: &str| SchemaError::DuplicateField {
        field: field.to_string(),
        parent: name.clone(),
    };
    let mut fields: IndexMap<String, FieldNode> = IndexMap::new();
    let mut descriptions = Vec::new();
    let mut implements: Vec<String> = Vec::new();

    for definition in &fragments.definitions {
        if let Some(field) = definition.duplicates.first() {
            return Err(duplicate(field));
        }
        for (field_name, field) in &definition.fields {
            if fields.contains_key(field_name) {
                return Err(duplicate(field_name));
            }
            fields.insert(field_name.clone(), plain_field(field_name, field));
        }
        descriptions.extend(definition.description.clone());
        implements.extend(definition.implements.iter().cloned());
    }

    for implementation in &fragments.implementations {
        if let Some(field) = implementation.duplicates.first() {
            return Err(duplicate(field));
        }
        for (field_name, resolver) in &implementation.resolvers {
            if fields.contains_key(field_name) {
                return Err(duplicate(field_name));
            }
            let descriptor = &resolver.descriptor;
            let args = descriptor
                .args
                .iter()
                .map(|argument| (argument.name.clone(), argument_value(argument)))
                .collect();
            fields.insert(
                field_name.clone(),
                FieldNode {
                    name: field_name.clone(),
                    description: descriptor.field.description.clone(),
                    ty: FieldType::from(&descriptor.field),
                    args,
                    resolve: field_resolver(
                        resolver,
                        &implementation.middlewares,
                        injector.clone(),
                    ),
                },
            );
        }
        descriptions.extend(implementation.description.clone());
        implements.extend(implementation.implements.iter().cloned());
    }

    let mut seen = IndexSet::new();
    implements.retain(|interface| seen.insert(interface.clone()));
    let description = (!descriptions.is_empty()).then(|| descriptions.join("\n"));

    Ok(ObjectNode {
        name,
        description,
        fields,
        implements,
    })
}

fn plain_field(name: &str, field: &FieldDescriptor) -> FieldNode {
    FieldNode {
        name: name.to_string(),
        description: field.description.clone(),
        ty: FieldType::from(field),
        args: IndexMap::new(),
        resolve: property_resolver(name),
    }
}

fn input_value(name: &str, field: &FieldDescriptor) -> InputValueNode {
    InputValueNode {
        name: name.to_string(),
        description: field.description.clone(),
        ty: FieldType::from(field),
    }
}

fn argument_value(argument: &ArgumentDescriptor) -> InputValueNode {
    input_value(&argument.name, &argument.as_field())
}

fn pending_resolver(name: &str, configuration: &Configuration) -> TypeResolver {
    TypeResolver::new(
        name,
        Vec::new(),
        &IndexMap::new(),
        None,
        &configuration.type_resolution,
    )
}

fn scalar_codec(
    scalar: &ScalarDefinition,
    injector: &Injector,
) -> Result<Arc<dyn ScalarCodec>, SchemaError> {
    let instance = injector.get(&scalar.codec)?;
    instance
        .downcast_ref::<Arc<dyn ScalarCodec>>()
        .cloned()
        .ok_or_else(|| {
            SchemaError::Resolution(ResolutionError::TypeMismatch {
                token: scalar.codec.clone(),
                expected: "scalar codec",
            })
        })
}
