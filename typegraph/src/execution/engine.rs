use futures::future::join_all;
use futures::future::BoxFuture;
use futures::FutureExt;
use indexmap::IndexMap;
use parking_lot::Mutex;

use super::Field;
use super::Operation;
use super::Request;
use super::Response;
use super::Selection;
use crate::configuration::Configuration;
use crate::context::Context;
use crate::error::Error;
use crate::error::ErrorExtension;
use crate::error::FieldError;
use crate::json_ext::Object;
use crate::json_ext::Path;
use crate::json_ext::Value;
use crate::resolver::FieldRequest;
use crate::resolver::ResolvedValue;
use crate::schema::FieldNode;
use crate::schema::FieldType;
use crate::schema::InputNode;
use crate::schema::InterfaceNode;
use crate::schema::ObjectNode;
use crate::schema::ScalarNode;
use crate::schema::TypeGraph;
use crate::schema::TypeNode;
use crate::schema::UnionNode;

pub(crate) const TYPENAME: &str = "__typename";

/// The value at this position must be replaced by null, up to the nearest nullable
/// parent. The cause is already recorded.
#[derive(Debug)]
pub(crate) struct InvalidValue;

struct ExecutionParameters<'a> {
    graph: &'a TypeGraph,
    context: &'a Context,
    errors: Mutex<Vec<Error>>,
    concurrent: bool,
}

impl ExecutionParameters<'_> {
    fn push_error(&self, error: FieldError, path: &Path) {
        tracing::debug!(%path, %error, "field error");
        self.errors
            .lock()
            .push(error.to_graphql_error(Some(path.clone())));
    }
}

#[tracing::instrument(skip_all, level = "debug", fields(operation = %request.operation))]
pub(crate) async fn execute(
    graph: &TypeGraph,
    configuration: &Configuration,
    request: Request,
) -> Response {
    let root = match request.operation {
        Operation::Query => Some(graph.query()),
        Operation::Mutation => graph.mutation(),
    };
    let Some(root) = root.and_then(|name| graph.object(name)) else {
        return Response {
            data: None,
            errors: vec![Error::builder()
                .message(format!(
                    "the schema does not support {} operations",
                    request.operation
                ))
                .extension_code("UNSUPPORTED_OPERATION")
                .build()],
        };
    };

    let parameters = ExecutionParameters {
        graph,
        context: &request.context,
        errors: Mutex::new(Vec::new()),
        concurrent: request.operation == Operation::Query
            && configuration.execution.concurrent_fields,
    };
    let selections = request.selection_set.iter().collect();
    let data =
        match execute_selection_set(&parameters, root, Value::Null, selections, Path::empty())
            .await
        {
            Ok(object) => Value::Object(object),
            Err(InvalidValue) => Value::Null,
        };

    Response {
        data: Some(data),
        errors: parameters.errors.into_inner(),
    }
}

fn execute_selection_set<'a>(
    parameters: &'a ExecutionParameters<'a>,
    object: &'a ObjectNode,
    source: Value,
    selections: Vec<&'a Selection>,
    path: Path,
) -> BoxFuture<'a, Result<Object, InvalidValue>> {
    async move {
        let mut grouped = IndexMap::new();
        collect_fields(parameters.graph, &object.name, selections, &mut grouped);

        let source = &source;
        let path = &path;
        let results: Vec<(String, Result<Value, InvalidValue>)> = if parameters.concurrent {
            join_all(grouped.into_iter().map(|(key, fields)| async move {
                let path = path.join(key.as_str());
                let result = execute_field(parameters, object, source, &fields, path).await;
                (key, result)
            }))
            .await
        } else {
            let mut results = Vec::new();
            for (key, fields) in grouped {
                let path = path.join(key.as_str());
                let result = execute_field(parameters, object, source, &fields, path).await;
                results.push((key, result));
            }
            results
        };

        let mut output = Object::new();
        for (key, result) in results {
            output.insert(key, result?);
        }
        Ok(output)
    }
    .boxed()
}

/// Group the fields selected on `object` by response key, applying matching fragments.
fn collect_fields<'a>(
    graph: &TypeGraph,
    object: &str,
    selections: impl IntoIterator<Item = &'a Selection>,
    grouped: &mut IndexMap<String, Vec<&'a Field>>,
) {
    for selection in selections {
        match selection {
            Selection::Field(field) => grouped
                .entry(field.response_key().to_string())
                .or_default()
                .push(field),
            Selection::InlineFragment {
                type_condition,
                selection_set,
            } => {
                if graph.is_subtype(type_condition, object) {
                    collect_fields(graph, object, selection_set, grouped);
                }
            }
        }
    }
}

async fn execute_field<'a>(
    parameters: &'a ExecutionParameters<'a>,
    object: &'a ObjectNode,
    source: &Value,
    fields: &[&'a Field],
    path: Path,
) -> Result<Value, InvalidValue> {
    let Some(field) = fields.first() else {
        return Ok(Value::Null);
    };
    if field.name == TYPENAME {
        return Ok(Value::String(object.name.as_str().into()));
    }
    let Some(node) = object.fields.get(&field.name) else {
        parameters.push_error(
            FieldError::UnknownField {
                field: field.name.clone(),
                parent: object.name.clone(),
            },
            &path,
        );
        return Ok(Value::Null);
    };

    let args = match coerce_arguments(parameters.graph, node, &field.arguments) {
        Ok(args) => args,
        Err(error) => {
            parameters.push_error(error, &path);
            return null_for(&node.ty);
        }
    };
    let request = FieldRequest {
        source: source.clone(),
        args,
        context: parameters.context.clone(),
    };
    let resolved = match (node.resolve)(request).await {
        Ok(resolved) => resolved,
        Err(error) => {
            parameters.push_error(error, &path);
            return null_for(&node.ty);
        }
    };

    let label = format!("{}.{}", object.name, node.name);
    let selections = fields
        .iter()
        .copied()
        .flat_map(|field| field.selection_set.iter())
        .collect();
    complete_value(parameters, &node.ty, resolved, selections, path, &label).await
}

fn null_for(ty: &FieldType) -> Result<Value, InvalidValue> {
    if ty.is_non_null() {
        Err(InvalidValue)
    } else {
        Ok(Value::Null)
    }
}

/// Complete `resolved` according to `ty`.
///
/// Non-null positions report a null as an error and propagate it; nullable positions
/// absorb the errors of their content.
fn complete_value<'a, 'b>(
    parameters: &'a ExecutionParameters<'a>,
    ty: &'a FieldType,
    resolved: ResolvedValue,
    selections: Vec<&'a Selection>,
    path: Path,
    label: &'b str,
) -> BoxFuture<'b, Result<Value, InvalidValue>>
where
    'a: 'b,
{
    async move {
        match ty {
            FieldType::NonNull(inner) => {
                let value =
                    complete_inner(parameters, inner, resolved, selections, &path, label).await?;
                if value.is_null() {
                    parameters.push_error(FieldError::NullValue(label.to_string()), &path);
                    Err(InvalidValue)
                } else {
                    Ok(value)
                }
            }
            _ => Ok(
                complete_inner(parameters, ty, resolved, selections, &path, label)
                    .await
                    .unwrap_or(Value::Null),
            ),
        }
    }
    .boxed()
}

async fn complete_inner<'a>(
    parameters: &'a ExecutionParameters<'a>,
    ty: &'a FieldType,
    resolved: ResolvedValue,
    selections: Vec<&'a Selection>,
    path: &Path,
    label: &str,
) -> Result<Value, InvalidValue> {
    if resolved.is_null() {
        return Ok(Value::Null);
    }
    let invalid = |reason: String| {
        parameters.push_error(
            FieldError::InvalidValue {
                type_name: ty.to_string(),
                reason,
            },
            path,
        );
        InvalidValue
    };

    let (static_type, value) = match (ty, resolved) {
        (FieldType::NonNull(_), resolved) => {
            return complete_value(parameters, ty, resolved, selections, path.clone(), label).await;
        }
        (FieldType::List(inner), resolved) => {
            let items: Vec<ResolvedValue> = match resolved {
                ResolvedValue::List(items) => items,
                ResolvedValue::Value(Value::Array(values)) => {
                    values.into_iter().map(ResolvedValue::Value).collect()
                }
                ResolvedValue::Typed {
                    type_name,
                    value: Value::Array(values),
                } => values
                    .into_iter()
                    .map(|value| ResolvedValue::Typed {
                        type_name: type_name.clone(),
                        value,
                    })
                    .collect(),
                _ => return Err(invalid("expected a list".to_string())),
            };
            let completed = join_all(items.into_iter().enumerate().map(|(index, item)| {
                complete_value(
                    parameters,
                    inner,
                    item,
                    selections.clone(),
                    path.join(index),
                    label,
                )
            }))
            .await;
            return completed
                .into_iter()
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array);
        }
        (_, ResolvedValue::List(_)) => return Err(invalid("unexpected list".to_string())),
        (_, ResolvedValue::Value(value)) => (None, value),
        (_, ResolvedValue::Typed { type_name, value }) => (Some(type_name), value),
    };

    if ty.is_builtin_scalar() {
        return if is_valid_builtin(ty, &value) {
            Ok(value)
        } else {
            Err(invalid(format!("{value} is not a valid {ty}")))
        };
    }

    let graph = parameters.graph;
    match graph.get(ty.inner_type_name()) {
        Some(TypeNode::Scalar(ScalarNode {
            codec: Some(codec), ..
        })) => codec
            .serialize(&value)
            .map_err(|error| invalid(error.to_string())),
        Some(TypeNode::Object(object)) => {
            complete_object(parameters, object, value, selections, path).await
        }
        Some(TypeNode::Interface(InterfaceNode { resolver, .. }))
        | Some(TypeNode::Union(UnionNode { resolver, .. })) => {
            let runtime_type =
                match resolver.resolve(static_type.as_deref(), &value, parameters.context) {
                    Ok(runtime_type) => runtime_type,
                    Err(error) => {
                        parameters.push_error(error, path);
                        return Err(InvalidValue);
                    }
                };
            match graph.object(&runtime_type) {
                Some(object) => complete_object(parameters, object, value, selections, path).await,
                None => Err(invalid(format!("'{runtime_type}' is not an object type"))),
            }
        }
        _ => {
            failfast_debug!("type '{}' cannot be used as an output type", ty);
            Err(invalid("not an output type".to_string()))
        }
    }
}

async fn complete_object<'a>(
    parameters: &'a ExecutionParameters<'a>,
    object: &'a ObjectNode,
    value: Value,
    selections: Vec<&'a Selection>,
    path: &Path,
) -> Result<Value, InvalidValue> {
    if !value.is_object() {
        parameters.push_error(
            FieldError::InvalidValue {
                type_name: object.name.clone(),
                reason: format!("{value} is not an object"),
            },
            path,
        );
        return Err(InvalidValue);
    }
    execute_selection_set(parameters, object, value, selections, path.clone())
        .await
        .map(Value::Object)
}

fn is_valid_builtin(ty: &FieldType, value: &Value) -> bool {
    match ty {
        // Spec: https://spec.graphql.org/June2018/#sec-Int
        FieldType::Int => value
            .as_i64()
            .and_then(|int| i32::try_from(int).ok())
            .is_some(),
        FieldType::Float => value.as_f64().is_some(),
        FieldType::String => value.is_string(),
        FieldType::Boolean => value.is_boolean(),
        // In practice it seems Int works too
        FieldType::Id => value.is_string() || value.is_i64() || value.is_u64(),
        FieldType::Named(_) | FieldType::List(_) | FieldType::NonNull(_) => false,
    }
}

fn coerce_arguments(
    graph: &TypeGraph,
    node: &FieldNode,
    arguments: &Object,
) -> Result<Object, FieldError> {
    let mut coerced = Object::new();
    for (name, argument) in &node.args {
        match arguments.get(name.as_str()) {
            None | Some(Value::Null) if argument.ty.is_non_null() => {
                return Err(FieldError::MissingArgument(name.clone()));
            }
            None => {}
            Some(value) => {
                coerced.insert(name.as_str(), coerce_input(graph, &argument.ty, value.clone())?);
            }
        }
    }
    Ok(coerced)
}

fn invalid_input(ty: &FieldType, reason: impl Into<String>) -> FieldError {
    FieldError::InvalidValue {
        type_name: ty.to_string(),
        reason: reason.into(),
    }
}

/// Coerce an argument or input field value. Arguments are inline literals, so custom
/// scalars parse them with [`crate::metadata::ScalarCodec::parse_literal`].
fn coerce_input(graph: &TypeGraph, ty: &FieldType, value: Value) -> Result<Value, FieldError> {
    match ty {
        FieldType::NonNull(inner) => {
            if value.is_null() {
                Err(invalid_input(ty, "null is not allowed"))
            } else {
                coerce_input(graph, inner, value)
            }
        }
        _ if value.is_null() => Ok(Value::Null),
        FieldType::List(inner) => match value {
            Value::Array(values) => values
                .into_iter()
                .map(|value| coerce_input(graph, inner, value))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            // For coercion from single value to list
            value => coerce_input(graph, inner, value).map(|value| Value::Array(vec![value])),
        },
        FieldType::Named(name) => match graph.get(name) {
            Some(TypeNode::Scalar(ScalarNode {
                codec: Some(codec), ..
            })) => codec
                .parse_literal(&value)
                .map_err(|error| invalid_input(ty, error.to_string())),
            Some(TypeNode::Input(input)) => coerce_input_object(graph, input, value),
            _ => Err(invalid_input(ty, "not an input type")),
        },
        builtin => {
            if is_valid_builtin(builtin, &value) {
                Ok(value)
            } else {
                Err(invalid_input(builtin, format!("{value} is not a valid {builtin}")))
            }
        }
    }
}

fn coerce_input_object(
    graph: &TypeGraph,
    input: &InputNode,
    value: Value,
) -> Result<Value, FieldError> {
    let Value::Object(object) = value else {
        return Err(FieldError::InvalidValue {
            type_name: input.name.clone(),
            reason: format!("{value} is not an object"),
        });
    };
    let mut coerced = Object::new();
    for (name, field) in &input.fields {
        match object.get(name.as_str()) {
            None | Some(Value::Null) if field.ty.is_non_null() => {
                return Err(FieldError::InvalidValue {
                    type_name: input.name.clone(),
                    reason: format!("missing value for non-nullable field '{name}'"),
                });
            }
            None => {}
            Some(value) => {
                coerced.insert(name.as_str(), coerce_input(graph, &field.ty, value.clone())?);
            }
        }
    }
    Ok(Value::Object(coerced))
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;

    #[test]
    fn builtin_scalars() {
        assert!(is_valid_builtin(&FieldType::Int, &json!(3)));
        assert!(!is_valid_builtin(&FieldType::Int, &json!(i64::MAX)));
        assert!(!is_valid_builtin(&FieldType::Int, &json!(1.5)));
        assert!(is_valid_builtin(&FieldType::Float, &json!(1)));
        assert!(is_valid_builtin(&FieldType::Float, &json!(1.5)));
        assert!(is_valid_builtin(&FieldType::Id, &json!("a1")));
        assert!(is_valid_builtin(&FieldType::Id, &json!(12)));
        assert!(!is_valid_builtin(&FieldType::Id, &json!(true)));
        assert!(!is_valid_builtin(&FieldType::String, &json!(1)));
        assert!(is_valid_builtin(&FieldType::Boolean, &json!(false)));
    }

    #[test]
    fn input_lists_accept_single_values() {
        let graph = TypeGraph {
            types: IndexMap::new(),
            query: "Query".to_string(),
            mutation: None,
        };
        let ty = FieldType::List(Box::new(FieldType::NonNull(Box::new(FieldType::Int))));
        assert_eq!(coerce_input(&graph, &ty, json!(1)).unwrap(), json!([1]));
        assert_eq!(coerce_input(&graph, &ty, json!([1, 2])).unwrap(), json!([1, 2]));
        assert_eq!(coerce_input(&graph, &ty, Value::Null).unwrap(), Value::Null);

        let error = coerce_input(&graph, &ty, json!([1, null])).unwrap_err();
        assert_eq!(
            error.to_string(),
            "invalid value for type 'Int!': null is not allowed"
        );
        let error = coerce_input(&graph, &ty, json!(["one"])).unwrap_err();
        assert_eq!(
            error.to_string(),
            "invalid value for type 'Int': \"one\" is not a valid Int"
        );
    }
}
