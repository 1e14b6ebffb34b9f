//! Error types for registration, compilation and execution.
use displaydoc::Display;
use heck::ToShoutySnakeCase;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tower::BoxError;

use crate::injector::Token;
use crate::json_ext::Object;
use crate::json_ext::Path;
use crate::json_ext::Value;

/// Errors raised while building an [`crate::Injector`] from a provider list.
///
/// These are fatal: a registry that fails registration is never built.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// provider token '{0}' is registered more than once
    DuplicateToken(Token),

    /// invalid provider: {reason}
    InvalidProvider { reason: String },
}

/// Errors raised while resolving a token from an [`crate::Injector`].
#[derive(Error, Display, Debug)]
pub enum ResolutionError {
    /// no provider for token '{0}'
    UnknownToken(Token),

    /// {factory} -> {source}
    Factory {
        /// The factory whose dependencies or body failed.
        factory: Token,
        /// The underlying cause.
        source: BoxError,
    },

    /// cyclic dependency detected: {chain}
    CyclicDependency { chain: String },

    /// instance at token '{token}' is not a {expected}
    TypeMismatch {
        token: Token,
        expected: &'static str,
    },
}

/// Errors raised when a middleware sequence is constructed.
#[derive(Error, Display, Debug)]
pub enum SequenceError {
    /// unable to find instance at token '{token}' for middleware: {source}
    UnknownMiddleware {
        token: Token,
        source: ResolutionError,
    },

    /// instance at token '{0}' is not executable as middleware
    NotExecutable(Token),
}

/// A middleware step failed or returned a falsy value.
///
/// The chain stops at the first failing step; later steps never run.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("Middleware \"{middleware}\" error with reason \"{}\"", reason_text(.reason))]
pub struct MiddlewareError {
    /// Token of the failing middleware.
    pub middleware: String,
    /// The message of the returned error, or the falsy value itself.
    pub reason: Value,
}

fn reason_text(reason: &Value) -> String {
    match reason.as_str() {
        Some(text) => text.to_string(),
        None => reason.to_string(),
    }
}

impl MiddlewareError {
    pub fn new(middleware: impl Into<String>, reason: impl Into<Value>) -> Self {
        MiddlewareError {
            middleware: middleware.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while compiling a schema descriptor into a [`crate::TypeGraph`].
///
/// Any of these aborts compilation entirely.
#[derive(Error, Display, Debug)]
pub enum SchemaError {
    /// unknown type '{type_name}' for field '{field}' of type '{parent}'
    UnknownType {
        type_name: String,
        field: String,
        parent: String,
    },

    /// field '{field}' of type '{parent}' is defined more than one time
    DuplicateField { field: String, parent: String },

    /// root query type '{0}' is not a registered object type
    MissingRootQuery(String),

    /// root mutation type '{0}' is not a registered object type
    InvalidRootMutation(String),

    /// type '{parent}' implements '{interface}' which is not a registered interface
    UnknownInterface { interface: String, parent: String },

    /// type '{object}' does not implement field '{field}' of interface '{interface}': {reason}
    InvalidImplementation {
        object: String,
        interface: String,
        field: String,
        reason: String,
    },

    /// union '{union}' lists '{member}' which is not a registered object type
    InvalidUnionMember { member: String, union: String },

    /// field '{field}' of type '{parent}' cannot use '{type_name}': {reason}
    InvalidFieldType {
        type_name: String,
        field: String,
        parent: String,
        reason: String,
    },

    /// type '{0}' is declared more than one time
    DuplicateType(String),

    /// {0}
    Resolution(#[from] ResolutionError),

    /// {0}
    Registration(#[from] RegistrationError),
}

/// Trait providing an error code for a GraphQL error extension.
pub trait ErrorExtension
where
    Self: Sized + std::error::Error,
{
    fn extension_code(&self) -> String {
        let name = std::any::type_name::<Self>();
        name.rsplit("::")
            .next()
            .unwrap_or(name)
            .to_shouty_snake_case()
    }

    /// Convert the error to a GraphQL error located at `path`.
    fn to_graphql_error(&self, path: Option<Path>) -> Error {
        let mut extensions = Object::new();
        extensions.insert("code", Value::from(self.extension_code()));
        Error {
            message: self.to_string(),
            path,
            extensions,
        }
    }
}

/// A failure scoped to a single field resolution.
///
/// Sibling fields keep resolving; the failing field becomes `null` and the error is
/// reported alongside the data.
#[derive(Error, Display, Debug)]
pub enum FieldError {
    /// {0}
    Middleware(#[from] MiddlewareError),

    /// {0}
    Sequence(#[from] SequenceError),

    /// {0}
    Resolution(#[from] ResolutionError),

    /// resolver for field '{field}' failed: {reason}
    Implementation { field: String, reason: String },

    /// unable to resolve the runtime type of a value for abstract type '{0}'
    UnresolvedType(String),

    /// type '{runtime_type}' is not a possible type of '{abstract_type}'
    ImpossibleType {
        runtime_type: String,
        abstract_type: String,
    },

    /// cannot return null for non-nullable field '{0}'
    NullValue(String),

    /// invalid value for type '{type_name}': {reason}
    InvalidValue { type_name: String, reason: String },

    /// missing value for non-nullable argument '{0}'
    MissingArgument(String),

    /// field '{field}' does not exist on type '{parent}'
    UnknownField { field: String, parent: String },
}

impl ErrorExtension for FieldError {
    fn extension_code(&self) -> String {
        match self {
            FieldError::Middleware(_) => "MIDDLEWARE_REJECTED",
            FieldError::Sequence(_) => "MIDDLEWARE_UNAVAILABLE",
            FieldError::Resolution(_) => "RESOLUTION_FAILED",
            FieldError::Implementation { .. } => "RESOLVER_FAILED",
            FieldError::UnresolvedType(_) | FieldError::ImpossibleType { .. } => {
                "UNRESOLVED_TYPE"
            }
            FieldError::NullValue(_) | FieldError::InvalidValue { .. } => "INVALID_VALUE",
            FieldError::MissingArgument(_) => "MISSING_ARGUMENT",
            FieldError::UnknownField { .. } => "UNKNOWN_FIELD",
        }
        .to_string()
    }

    fn to_graphql_error(&self, path: Option<Path>) -> Error {
        let mut extensions = Object::new();
        extensions.insert("code", Value::from(self.extension_code()));
        if let FieldError::Middleware(error) = self {
            extensions.insert("middleware", Value::from(error.middleware.as_str()));
            extensions.insert("reason", error.reason.clone());
        }
        Error {
            message: self.to_string(),
            path,
            extensions,
        }
    }
}

/// A GraphQL error as reported in a [`crate::Response`].
#[derive(Error, Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Default)]
#[error("{message}")]
#[serde(rename_all = "camelCase")]
pub struct Error {
    /// The error message.
    pub message: String,

    /// The path of the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Path>,

    /// The optional graphql extensions.
    #[serde(default, skip_serializing_if = "Object::is_empty")]
    pub extensions: Object,
}

#[buildstructor::buildstructor]
impl Error {
    #[builder(visibility = "pub")]
    fn new(message: String, path: Option<Path>, extension_code: Option<String>) -> Self {
        let mut extensions = Object::new();
        if let Some(code) = extension_code {
            extensions.insert("code", Value::from(code));
        }
        Error {
            message,
            path,
            extensions,
        }
    }

    pub fn extension_code(&self) -> Option<&str> {
        self.extensions.get("code").and_then(|code| code.as_str())
    }
}
