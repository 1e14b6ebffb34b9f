//! Assemble independently declared GraphQL components into one validated, executable
//! type graph.
//!
//! Components (object fragments, field implementations, interfaces, unions, inputs and
//! scalars) are described with builders, registered in a [`SchemaDescriptor`], and
//! compiled against an [`Injector`] holding the implementation instances. Every
//! resolver-backed field runs its middleware pipeline before the implementation method.

#![cfg_attr(feature = "failfast", allow(unreachable_code))]

macro_rules! failfast_debug {
    ($($tokens:tt)+) => {{
        tracing::debug!($($tokens)+);
        #[cfg(feature = "failfast")]
        panic!(
            "failfast triggered. \
            Please remove the feature failfast if you don't want to see these panics"
        );
    }};
}

pub mod classify;
pub mod configuration;
mod context;
pub mod error;
pub mod execution;
pub mod injector;
mod json_ext;
pub mod metadata;
pub mod middleware;
pub mod resolver;
pub mod schema;
pub mod test_harness;

pub use crate::configuration::Configuration;
pub use crate::context::Context;
pub use crate::error::Error;
pub use crate::execution::Request;
pub use crate::execution::Response;
pub use crate::injector::Injectable;
pub use crate::injector::Injector;
pub use crate::injector::Provider;
pub use crate::injector::Token;
pub use crate::json_ext::*;
pub use crate::schema::Schema;
pub use crate::schema::SchemaDescriptor;
pub use crate::schema::TypeGraph;
pub use crate::test_harness::TestHarness;

/// Re-exports of the types most callers need to declare and run a schema.
pub mod prelude {
    pub use crate::execution::Field;
    pub use crate::execution::Operation;
    pub use crate::execution::Selection;
    pub use crate::metadata::*;
    pub use crate::middleware::Middleware;
    pub use crate::middleware::MiddlewareBinding;
    pub use crate::resolver::Arguments;
    pub use crate::resolver::ResolvedValue;
    pub use crate::*;
}
