//! Compile declared components into an executable type graph.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

use std::collections::HashSet;
use std::sync::Arc;

mod descriptor;
mod factory;
mod field_type;
mod printer;
mod resolve_type;
mod type_graph;

pub use self::descriptor::SchemaDescriptor;
pub use self::factory::compile;
pub use self::field_type::FieldType;
pub use self::resolve_type::TypeResolver;
pub use self::type_graph::FieldNode;
pub use self::type_graph::InputNode;
pub use self::type_graph::InputValueNode;
pub use self::type_graph::InterfaceNode;
pub use self::type_graph::ObjectNode;
pub use self::type_graph::ScalarNode;
pub use self::type_graph::TypeGraph;
pub use self::type_graph::TypeNode;
pub use self::type_graph::UnionNode;
use crate::error::SchemaError;
use crate::execution::Request;
use crate::execution::Response;
use crate::injector::Injector;
use crate::injector::Provider;
use crate::Configuration;

static_assertions::assert_impl_all!(Schema: Send, Sync);

/// A compiled type graph together with the injector serving its implementations.
#[derive(Clone, Debug)]
pub struct Schema {
    graph: Arc<TypeGraph>,
    injector: Arc<Injector>,
    configuration: Arc<Configuration>,
}

impl Schema {
    /// Register the providers `descriptor` needs, then compile it.
    pub fn new(
        descriptor: &SchemaDescriptor,
        configuration: Configuration,
    ) -> Result<Self, SchemaError> {
        Self::with_providers(descriptor, Vec::new(), configuration)
    }

    /// Like [`Schema::new`], registering `providers` as well.
    ///
    /// A provider in `providers` replaces the one `descriptor` carries for the same token.
    pub fn with_providers(
        descriptor: &SchemaDescriptor,
        providers: impl IntoIterator<Item = Provider>,
        configuration: Configuration,
    ) -> Result<Self, SchemaError> {
        let providers: Vec<Provider> = providers.into_iter().collect();
        let overridden: HashSet<_> = providers.iter().map(|p| p.token().clone()).collect();
        let injector = Injector::resolve_and_create(
            providers.into_iter().chain(
                descriptor
                    .providers()
                    .into_iter()
                    .filter(|provider| !overridden.contains(provider.token())),
            ),
        )?;
        Self::with_injector(descriptor, injector, configuration)
    }

    /// Compile `descriptor` against an existing injector.
    pub fn with_injector(
        descriptor: &SchemaDescriptor,
        injector: Arc<Injector>,
        configuration: Configuration,
    ) -> Result<Self, SchemaError> {
        let graph = compile(descriptor, &injector, &configuration)?;
        Ok(Schema {
            graph: Arc::new(graph),
            injector,
            configuration: Arc::new(configuration),
        })
    }

    pub fn graph(&self) -> &TypeGraph {
        &self.graph
    }

    pub fn injector(&self) -> &Arc<Injector> {
        &self.injector
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Execute `request` against the graph.
    pub async fn execute(&self, request: Request) -> Response {
        crate::execution::execute(&self.graph, &self.configuration, request).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json_bytes::json;
    use tower::BoxError;

    use super::*;
    use crate::context::Context;
    use crate::injector::Dependencies;
    use crate::injector::Injectable;
    use crate::json_ext::Value;
    use crate::metadata::ArgumentDescriptor;
    use crate::metadata::Component;
    use crate::metadata::FieldDescriptor;
    use crate::metadata::InputDefinition;
    use crate::metadata::InterfaceDefinition;
    use crate::metadata::ObjectDefinition;
    use crate::metadata::ObjectImplementation;
    use crate::metadata::ResolverDescriptor;
    use crate::metadata::ScalarDefinition;
    use crate::metadata::UnionDefinition;
    use crate::resolver::FieldRequest;
    use crate::resolver::ResolvedValue;

    struct Users;

    impl Injectable for Users {
        fn create(_dependencies: &Dependencies) -> Result<Self, BoxError> {
            Ok(Users)
        }
    }

    fn query() -> Component {
        ObjectImplementation::of::<Users>("Query")
            .resolver(
                ResolverDescriptor::new("me", FieldDescriptor::new("User").nullable()),
                |_users: Arc<Users>, _arguments, _context| async {
                    Ok(ResolvedValue::value(json!({ "name": "Bob" })))
                },
            )
            .into()
    }

    fn user() -> Component {
        ObjectDefinition::new("User")
            .field("name", FieldDescriptor::new("String"))
            .into()
    }

    fn schema(components: Vec<Component>) -> Result<Schema, SchemaError> {
        let descriptor = SchemaDescriptor::builder()
            .root_query("Query")
            .components(components)
            .build();
        Schema::new(&descriptor, Configuration::default())
    }

    #[test]
    fn declaration_order_does_not_matter() {
        let schema = schema(vec![query(), user()]).unwrap();
        let graph = schema.graph();
        assert_eq!(graph.query(), "Query");
        assert_eq!(graph.mutation(), None);
        let me = &graph.object("Query").unwrap().fields["me"];
        assert_eq!(me.ty.to_string(), "User");
        assert!(graph.object("User").is_some());
    }

    #[tokio::test]
    async fn fields_expose_their_resolution() {
        let schema = schema(vec![user(), query()]).unwrap();
        let me = &schema.graph().object("Query").unwrap().fields["me"];
        let resolved = (me.resolve)(FieldRequest {
            source: Value::Null,
            args: Default::default(),
            context: Context::new(),
        })
        .await
        .unwrap();
        assert_eq!(resolved, ResolvedValue::value(json!({ "name": "Bob" })));
    }

    #[test]
    fn fragments_merge_into_one_type() {
        let schema = schema(vec![
            query(),
            user(),
            ObjectDefinition::new("User")
                .field("age", FieldDescriptor::new("Int").nullable())
                .into(),
        ])
        .unwrap();
        let user = schema.graph().object("User").unwrap();
        let fields: Vec<_> = user.fields.keys().cloned().collect();
        assert_eq!(fields, vec!["name", "age"]);
    }

    #[test]
    fn duplicate_fields_across_fragments_fail() {
        let error = schema(vec![query(), user(), user()]).unwrap_err();
        assert_eq!(
            error.to_string(),
            "field 'name' of type 'User' is defined more than one time"
        );

        let error = schema(vec![
            query(),
            user(),
            ObjectImplementation::of::<Users>("User")
                .resolver(
                    ResolverDescriptor::new("name", FieldDescriptor::new("String")),
                    |_users: Arc<Users>, _arguments, _context| async { Ok(ResolvedValue::null()) },
                )
                .into(),
        ])
        .unwrap_err();
        assert!(matches!(error, SchemaError::DuplicateField { .. }));
    }

    #[test]
    fn unknown_types_name_the_field() {
        let error = schema(vec![query()]).unwrap_err();
        assert_eq!(
            error.to_string(),
            "unknown type 'User' for field 'me' of type 'Query'"
        );

        let error = schema(vec![
            query(),
            user(),
            ObjectImplementation::of::<Users>("Mutation")
                .resolver(
                    ResolverDescriptor::new("rename", FieldDescriptor::new("User"))
                        .arg(ArgumentDescriptor::new("input", "RenameInput")),
                    |_users: Arc<Users>, _arguments, _context| async { Ok(ResolvedValue::null()) },
                )
                .into(),
        ])
        .unwrap_err();
        assert_eq!(
            error.to_string(),
            "unknown type 'RenameInput' for field 'rename' of type 'Mutation'"
        );
    }

    #[test]
    fn root_types_must_be_objects() {
        let error = schema(vec![user()]).unwrap_err();
        assert!(matches!(error, SchemaError::MissingRootQuery(name) if name == "Query"));

        let descriptor = SchemaDescriptor::builder()
            .root_query("Query")
            .root_mutation("Mutation")
            .components(vec![query(), user()])
            .build();
        let error = Schema::new(&descriptor, Configuration::default()).unwrap_err();
        assert_eq!(
            error.to_string(),
            "root mutation type 'Mutation' is not a registered object type"
        );
    }

    #[test]
    fn abstract_types_are_validated() {
        let error = schema(vec![
            query(),
            ObjectDefinition::new("User")
                .implements("Node")
                .field("name", FieldDescriptor::new("String"))
                .into(),
        ])
        .unwrap_err();
        assert!(matches!(error, SchemaError::UnknownInterface { .. }));

        let error = schema(vec![
            query(),
            user(),
            UnionDefinition::new("Result").member("User").member("Node").into(),
            InterfaceDefinition::new("Node")
                .field("id", FieldDescriptor::new("ID"))
                .into(),
        ])
        .unwrap_err();
        assert_eq!(
            error.to_string(),
            "union 'Result' lists 'Node' which is not a registered object type"
        );
    }

    #[test]
    fn input_and_output_types_do_not_mix() {
        let error = schema(vec![
            query(),
            user(),
            InputDefinition::new("Filter")
                .field("owner", FieldDescriptor::new("User"))
                .into(),
        ])
        .unwrap_err();
        assert_eq!(
            error.to_string(),
            "field 'owner' of type 'Filter' cannot use 'User': object types cannot be used as input"
        );

        let error = schema(vec![
            query(),
            ObjectDefinition::new("User")
                .field("filter", FieldDescriptor::new("Filter"))
                .into(),
            InputDefinition::new("Filter")
                .field("name", FieldDescriptor::new("String"))
                .into(),
        ])
        .unwrap_err();
        assert!(matches!(error, SchemaError::InvalidFieldType { .. }));
    }

    #[test]
    fn scalars_need_a_codec() {
        let error = schema(vec![
            query(),
            user(),
            ScalarDefinition::new("Date", "DateCodec").into(),
        ])
        .unwrap_err();
        assert_eq!(error.to_string(), "no provider for token 'DateCodec'");
    }

    #[test]
    fn type_names_are_unique() {
        let error = schema(vec![
            query(),
            user(),
            InterfaceDefinition::new("Node").into(),
            InterfaceDefinition::new("Node").into(),
        ])
        .unwrap_err();
        assert_eq!(error.to_string(), "type 'Node' is declared more than one time");

        let error = schema(vec![query(), user(), InputDefinition::new("Int").into()]).unwrap_err();
        assert!(matches!(error, SchemaError::DuplicateType(name) if name == "Int"));
    }

    #[test]
    fn descriptions_of_fragments_are_joined() {
        let schema = schema(vec![
            query(),
            ObjectDefinition::new("User")
                .description("first")
                .field("name", FieldDescriptor::new("String"))
                .into(),
            ObjectDefinition::new("User").description("second").into(),
        ])
        .unwrap();
        assert_eq!(
            schema.graph().get("User").and_then(TypeNode::description),
            Some("first\nsecond")
        );
    }

    #[test]
    fn implementations_provide_the_interface_fields() {
        let named = || -> Component {
            InterfaceDefinition::new("Named")
                .field("name", FieldDescriptor::new("String"))
                .field("friend", FieldDescriptor::new("Named").nullable())
                .into()
        };

        let error = schema(vec![
            query(),
            user(),
            named(),
            ObjectDefinition::new("Book")
                .implements("Named")
                .field("title", FieldDescriptor::new("String"))
                .into(),
        ])
        .unwrap_err();
        assert_eq!(
            error.to_string(),
            "type 'Book' does not implement field 'name' of interface 'Named': the field is missing"
        );

        let error = schema(vec![
            query(),
            user(),
            named(),
            ObjectDefinition::new("Book")
                .implements("Named")
                .field("name", FieldDescriptor::new("String").nullable())
                .field("friend", FieldDescriptor::new("Book").nullable())
                .into(),
        ])
        .unwrap_err();
        assert!(matches!(
            error,
            SchemaError::InvalidImplementation { ref field, ref reason, .. }
                if field == "name" && reason == "type 'String' is not compatible with 'String!'"
        ));

        // A non-null field and an implementing object type are valid refinements.
        let schema = schema(vec![
            query(),
            user(),
            named(),
            ObjectDefinition::new("Book")
                .implements("Named")
                .field("name", FieldDescriptor::new("String"))
                .field("friend", FieldDescriptor::new("Book"))
                .into(),
        ])
        .unwrap();
        assert!(schema.graph().is_subtype("Named", "Book"));
    }

    #[test]
    fn interfaces_collect_their_implementations() {
        let schema = schema(vec![
            query(),
            InterfaceDefinition::new("Named")
                .field("name", FieldDescriptor::new("String"))
                .into(),
            ObjectDefinition::new("User")
                .implements("Named")
                .field("name", FieldDescriptor::new("String"))
                .into(),
            ObjectDefinition::new("User").implements("Named").into(),
        ])
        .unwrap();
        let graph = schema.graph();
        assert_eq!(graph.object("User").unwrap().implements, vec!["Named"]);
        assert!(graph.is_subtype("Named", "User"));
        assert!(!graph.is_subtype("Named", "Query"));
    }
}
