//! Runtime type resolution for interfaces and unions.

use std::sync::Arc;

use derivative::Derivative;
use indexmap::IndexMap;
use indexmap::IndexSet;

use crate::configuration::TypeResolution;
use crate::context::Context;
use crate::error::FieldError;
use crate::json_ext::Value;
use crate::json_ext::ValueExt;
use crate::metadata::ResolveTypeFn;

/// Maps a runtime value of an abstract type to one of its possible object types.
///
/// Attempts, in order: the type carried by a typed value, the marker field of the value,
/// the custom resolver of the abstract type, then the discriminant fields.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct TypeResolver {
    abstract_type: String,
    possible_types: Vec<String>,
    #[derivative(Debug = "ignore")]
    custom: Option<ResolveTypeFn>,
    marker_field: Arc<str>,
    discriminants: Vec<(String, String)>,
}

impl TypeResolver {
    /// `field_sets` holds the field names of every possible type, in `possible_types` order.
    pub(crate) fn new(
        abstract_type: &str,
        possible_types: Vec<String>,
        field_sets: &IndexMap<String, IndexSet<String>>,
        custom: Option<ResolveTypeFn>,
        configuration: &TypeResolution,
    ) -> Self {
        let discriminants = if configuration.discriminants {
            discriminants(&possible_types, field_sets)
        } else {
            Vec::new()
        };
        tracing::trace!(
            abstract_type,
            ?possible_types,
            ?discriminants,
            "type resolver built"
        );

        Self {
            abstract_type: abstract_type.to_string(),
            possible_types,
            custom,
            marker_field: configuration.marker_field.as_str().into(),
            discriminants,
        }
    }

    pub fn possible_types(&self) -> &[String] {
        &self.possible_types
    }

    /// The discriminant field of each possible type that has one.
    pub fn discriminants(&self) -> &[(String, String)] {
        &self.discriminants
    }

    /// Resolve the object type of `value`.
    pub fn resolve(
        &self,
        static_type: Option<&str>,
        value: &Value,
        context: &Context,
    ) -> Result<String, FieldError> {
        let resolved = static_type
            .map(str::to_string)
            .or_else(|| value.str_field(&self.marker_field).map(str::to_string))
            .or_else(|| self.custom.as_ref().and_then(|custom| custom(value, context)))
            .or_else(|| self.discriminate(value));

        match resolved {
            Some(type_name) if self.possible_types.contains(&type_name) => Ok(type_name),
            Some(type_name) => Err(FieldError::ImpossibleType {
                runtime_type: type_name,
                abstract_type: self.abstract_type.clone(),
            }),
            None => {
                tracing::debug!(
                    abstract_type = %self.abstract_type,
                    "unable to resolve the runtime type of a value"
                );
                Err(FieldError::UnresolvedType(self.abstract_type.clone()))
            }
        }
    }

    fn discriminate(&self, value: &Value) -> Option<String> {
        self.discriminants
            .iter()
            .find(|(_, field)| value.has_key(field))
            .map(|(type_name, _)| type_name.clone())
    }
}

/// For each possible type, the first of its fields no other possible type declares.
fn discriminants(
    possible_types: &[String],
    field_sets: &IndexMap<String, IndexSet<String>>,
) -> Vec<(String, String)> {
    possible_types
        .iter()
        .filter_map(|type_name| {
            let fields = field_sets.get(type_name)?;
            fields
                .iter()
                .find(|field| {
                    possible_types
                        .iter()
                        .filter(|other| *other != type_name)
                        .filter_map(|other| field_sets.get(other))
                        .all(|other_fields| !other_fields.contains(*field))
                })
                .map(|field| (type_name.clone(), field.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use indexmap::indexmap;
    use indexmap::indexset;
    use serde_json_bytes::json;

    use super::*;

    fn field_sets() -> IndexMap<String, IndexSet<String>> {
        indexmap! {
            "TypeA".to_string() => indexset! {
                "fieldA".to_string(), "fieldB".to_string(), "fieldC".to_string()
            },
            "TypeB".to_string() => indexset! {
                "fieldA".to_string(), "fieldB".to_string(), "fieldD".to_string()
            },
        }
    }

    fn resolver(configuration: &TypeResolution) -> TypeResolver {
        TypeResolver::new(
            "Letters",
            vec!["TypeA".to_string(), "TypeB".to_string()],
            &field_sets(),
            None,
            configuration,
        )
    }

    #[test]
    fn discriminants_are_the_first_unique_fields() {
        let resolver = resolver(&TypeResolution::default());
        assert_eq!(
            resolver.discriminants(),
            &[
                ("TypeA".to_string(), "fieldC".to_string()),
                ("TypeB".to_string(), "fieldD".to_string()),
            ]
        );
    }

    #[test]
    fn values_resolve_by_discriminant() {
        let resolver = resolver(&TypeResolution::default());
        let context = Context::new();

        let a = json!({ "fieldA": 1, "fieldB": 2, "fieldC": 3 });
        let b = json!({ "fieldA": 1, "fieldB": 2, "fieldD": null });
        let neither = json!({ "fieldA": 1, "fieldB": 2 });

        assert_eq!(resolver.resolve(None, &a, &context).unwrap(), "TypeA");
        assert_eq!(resolver.resolve(None, &b, &context).unwrap(), "TypeB");
        assert!(matches!(
            resolver.resolve(None, &neither, &context),
            Err(FieldError::UnresolvedType(name)) if name == "Letters"
        ));
    }

    #[test]
    fn static_types_and_markers_come_first() {
        let resolver = resolver(&TypeResolution::default());
        let context = Context::new();
        let a = json!({ "fieldC": 3, "__typename": "TypeB" });

        assert_eq!(resolver.resolve(Some("TypeA"), &a, &context).unwrap(), "TypeA");
        assert_eq!(resolver.resolve(None, &a, &context).unwrap(), "TypeB");
        assert!(matches!(
            resolver.resolve(Some("TypeC"), &a, &context),
            Err(FieldError::ImpossibleType { .. })
        ));
    }

    #[test]
    fn custom_resolvers_run_before_discriminants() {
        let custom: ResolveTypeFn = Arc::new(|value: &Value, _context: &Context| {
            value.has_key("fieldC").then(|| "TypeB".to_string())
        });
        let resolver = TypeResolver::new(
            "Letters",
            vec!["TypeA".to_string(), "TypeB".to_string()],
            &field_sets(),
            Some(custom),
            &TypeResolution::default(),
        );
        let context = Context::new();
        assert_eq!(
            resolver
                .resolve(None, &json!({ "fieldC": 3 }), &context)
                .unwrap(),
            "TypeB"
        );
        assert_eq!(
            resolver
                .resolve(None, &json!({ "fieldD": 3 }), &context)
                .unwrap(),
            "TypeB"
        );
    }

    #[test]
    fn configuration_controls_markers_and_discriminants() {
        let configuration = TypeResolution::builder()
            .marker_field("kind")
            .discriminants(false)
            .build();
        let resolver = resolver(&configuration);
        let context = Context::new();

        assert!(resolver.discriminants().is_empty());
        assert!(resolver
            .resolve(None, &json!({ "fieldC": 3 }), &context)
            .is_err());
        assert_eq!(
            resolver
                .resolve(None, &json!({ "kind": "TypeA" }), &context)
                .unwrap(),
            "TypeA"
        );
    }
}
