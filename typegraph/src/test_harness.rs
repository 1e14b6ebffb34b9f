use crate::configuration::Configuration;
use crate::error::SchemaError;
use crate::injector::Provider;
use crate::metadata::Component;
use crate::schema::Schema;
use crate::schema::SchemaDescriptor;

/// Builder for a [`Schema`] in tests, benchmarks, etc.
///
/// Components and providers are collected in any order. The root query defaults to
/// `Query`; providers added here replace the ones the components carry for the same
/// token, which allows swapping an implementation instance for a mock.
///
/// ```
/// use typegraph::prelude::*;
///
/// # #[tokio::main] async fn main() -> Result<(), tower::BoxError> {
/// let schema = TestHarness::builder()
///     .component(ObjectDefinition::new("Query").field("version", FieldDescriptor::new("Int")))
///     .build()?;
/// let response = schema
///     .execute(Request::builder().selection(Field::new("version")).build())
///     .await;
/// # Ok(()) }
/// ```
pub struct TestHarness {
    root_query: Option<String>,
    root_mutation: Option<String>,
    components: Vec<Component>,
    providers: Vec<Provider>,
    configuration: Option<Configuration>,
}

// Not using buildstructor because `component` takes anything convertible to a component
impl TestHarness {
    /// Creates a new builder.
    pub fn builder() -> Self {
        Self {
            root_query: None,
            root_mutation: None,
            components: Vec::new(),
            providers: Vec::new(),
            configuration: None,
        }
    }

    /// Specifies the name of the root query type.
    ///
    /// Panics if called more than once.
    pub fn root_query(mut self, name: impl Into<String>) -> Self {
        assert!(self.root_query.is_none(), "root query was specified twice");
        self.root_query = Some(name.into());
        self
    }

    /// Specifies the name of the root mutation type.
    ///
    /// Panics if called more than once.
    pub fn root_mutation(mut self, name: impl Into<String>) -> Self {
        assert!(
            self.root_mutation.is_none(),
            "root mutation was specified twice"
        );
        self.root_mutation = Some(name.into());
        self
    }

    /// Adds a component. May be called multiple times.
    pub fn component(mut self, component: impl Into<Component>) -> Self {
        self.components.push(component.into());
        self
    }

    /// Adds a provider. May be called multiple times.
    pub fn provider(mut self, provider: Provider) -> Self {
        self.providers.push(provider);
        self
    }

    /// Specifies the (static) configuration.
    pub fn configuration(mut self, configuration: Configuration) -> Self {
        assert!(
            self.configuration.is_none(),
            "configuration was specified twice"
        );
        self.configuration = Some(configuration);
        self
    }

    /// Specifies the configuration as a JSON value,
    /// such as from the `serde_json::json!` macro.
    pub fn configuration_json(
        self,
        configuration: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        Ok(self.configuration(serde_json::from_value(configuration)?))
    }

    /// Builds the schema.
    pub fn build(self) -> Result<Schema, SchemaError> {
        let descriptor = SchemaDescriptor {
            root_query: self.root_query.unwrap_or_else(|| "Query".to_string()),
            root_mutation: self.root_mutation,
            components: self.components,
            providers: Vec::new(),
        };
        Schema::with_providers(
            &descriptor,
            self.providers,
            self.configuration.unwrap_or_default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;
    use crate::execution::Field;
    use crate::execution::Request;
    use crate::metadata::FieldDescriptor;
    use crate::metadata::ObjectDefinition;

    #[tokio::test]
    async fn builds_an_executable_schema() {
        let schema = TestHarness::builder()
            .component(ObjectDefinition::new("Query").field("version", FieldDescriptor::new("Int")))
            .configuration_json(serde_json::json!({ "execution": { "concurrent_fields": false } }))
            .unwrap()
            .build()
            .unwrap();
        assert!(!schema.configuration().execution.concurrent_fields);

        let response = schema
            .execute(Request::builder().selection(Field::new("version")).build())
            .await;
        // The root value is null, so a non-null property field fails and nulls the root.
        assert_eq!(response.data, Some(json!(null)));
        assert_eq!(
            response.errors[0].message,
            "cannot return null for non-nullable field 'Query.version'"
        );
    }

    #[test]
    #[should_panic(expected = "root query was specified twice")]
    fn root_query_is_specified_once() {
        let _ = TestHarness::builder().root_query("Query").root_query("Root");
    }
}
