//! Execute already parsed selections against a compiled [`crate::TypeGraph`].

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

mod engine;

pub(crate) use self::engine::execute;
use crate::context::Context;
use crate::error::Error;
use crate::json_ext::Object;
use crate::json_ext::Value;

/// The kind of an operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    /// Sibling fields may resolve concurrently.
    #[default]
    Query,
    /// Sibling fields resolve one after the other.
    Mutation,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Query => write!(f, "query"),
            Operation::Mutation => write!(f, "mutation"),
        }
    }
}

/// One element of a selection set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Selection {
    Field(Field),
    InlineFragment {
        type_condition: String,
        selection_set: Vec<Selection>,
    },
}

impl Selection {
    /// `... on type_condition { selection_set }`
    pub fn inline_fragment(
        type_condition: impl Into<String>,
        selection_set: impl IntoIterator<Item = impl Into<Selection>>,
    ) -> Self {
        Selection::InlineFragment {
            type_condition: type_condition.into(),
            selection_set: selection_set.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<Field> for Selection {
    fn from(field: Field) -> Self {
        Selection::Field(field)
    }
}

/// A selected field.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Object::is_empty")]
    pub arguments: Object,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selection_set: Vec<Selection>,
}

impl Field {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn argument(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.arguments.insert(name, value.into());
        self
    }

    pub fn selection(mut self, selection: impl Into<Selection>) -> Self {
        self.selection_set.push(selection.into());
        self
    }

    /// The key of the field in the response.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// An operation to execute.
#[derive(Clone, Debug, Default)]
pub struct Request {
    pub operation: Operation,
    pub selection_set: Vec<Selection>,
    /// Shared by every field and middleware of the request.
    pub context: Context,
}

#[buildstructor::buildstructor]
impl Request {
    #[builder(visibility = "pub")]
    fn new(
        operation: Option<Operation>,
        selections: Vec<Selection>,
        context: Option<Context>,
    ) -> Self {
        Self {
            operation: operation.unwrap_or_default(),
            selection_set: selections,
            context: context.unwrap_or_default(),
        }
    }
}

/// The result of a [`Request`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// `null` when an error propagated up to the root.
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<Error>,
}

#[buildstructor::buildstructor]
impl Response {
    #[builder(visibility = "pub")]
    fn new(data: Option<Value>, errors: Vec<Error>) -> Self {
        Self { data, errors }
    }
}
