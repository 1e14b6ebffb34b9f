use std::sync::Arc;

use derivative::Derivative;
use indexmap::IndexMap;

use super::object::insert_field;
use super::FieldDescriptor;
use crate::context::Context;
use crate::json_ext::Value;

/// Names the object type of a runtime value, or `None` to fall back to discriminants.
pub type ResolveTypeFn = Arc<dyn Fn(&Value, &Context) -> Option<String> + Send + Sync>;

/// An interface type.
///
/// Its possible types are the object types that declare they implement it.
#[derive(Clone, Default, Derivative)]
#[derivative(Debug)]
pub struct InterfaceDefinition {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, FieldDescriptor>,
    #[derivative(Debug = "ignore")]
    pub resolve_type: Option<ResolveTypeFn>,
    pub(crate) duplicates: Vec<String>,
}

impl InterfaceDefinition {
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

    pub fn resolve_type<F>(mut self, resolve_type: F) -> Self
    where
        F: Fn(&Value, &Context) -> Option<String> + Send + Sync + 'static,
    {
        self.resolve_type = Some(Arc::new(resolve_type));
        self
    }
}

/// A union of object types.
#[derive(Clone, Default, Derivative)]
#[derivative(Debug)]
pub struct UnionDefinition {
    pub name: String,
    pub description: Option<String>,
    pub types: Vec<String>,
    #[derivative(Debug = "ignore")]
    pub resolve_type: Option<ResolveTypeFn>,
}

impl UnionDefinition {
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

    pub fn member(mut self, type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        if !self.types.contains(&type_name) {
            self.types.push(type_name);
        }
        self
    }

    pub fn resolve_type<F>(mut self, resolve_type: F) -> Self
    where
        F: Fn(&Value, &Context) -> Option<String> + Send + Sync + 'static,
    {
        self.resolve_type = Some(Arc::new(resolve_type));
        self
    }
}
