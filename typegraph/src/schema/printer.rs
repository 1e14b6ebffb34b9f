//! Print a [`TypeGraph`] as GraphQL SDL.

use std::fmt;
use std::fmt::Write;

use indexmap::IndexMap;

use super::type_graph::FieldNode;
use super::type_graph::InputValueNode;
use super::type_graph::TypeNode;
use super::TypeGraph;

impl TypeGraph {
    /// The graph as GraphQL SDL. Built-in scalars are omitted.
    pub fn to_sdl(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TypeGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut blocks = Vec::new();

        let conventional_mutation = self.mutation.as_deref().map_or(true, |m| m == "Mutation");
        if self.query != "Query" || !conventional_mutation {
            let mut block = format!("schema {{\n  query: {}\n", self.query);
            if let Some(mutation) = &self.mutation {
                writeln!(block, "  mutation: {mutation}")?;
            }
            block.push('}');
            blocks.push(block);
        }

        for node in self.types.values() {
            if matches!(node, TypeNode::Scalar(scalar) if scalar.codec.is_none()) {
                continue;
            }
            let mut block = String::new();
            write_description(&mut block, node.description(), "")?;
            match node {
                TypeNode::Scalar(scalar) => write!(block, "scalar {}", scalar.name)?,
                TypeNode::Object(object) => {
                    write!(block, "type {}", object.name)?;
                    if !object.implements.is_empty() {
                        write!(block, " implements {}", object.implements.join(" & "))?;
                    }
                    write_fields(&mut block, &object.fields)?;
                }
                TypeNode::Interface(interface) => {
                    write!(block, "interface {}", interface.name)?;
                    write_fields(&mut block, &interface.fields)?;
                }
                TypeNode::Union(union) => {
                    write!(block, "union {}", union.name)?;
                    let members = union.resolver.possible_types();
                    if !members.is_empty() {
                        write!(block, " = {}", members.join(" | "))?;
                    }
                }
                TypeNode::Input(input) => {
                    write!(block, "input {}", input.name)?;
                    block.push_str(" {\n");
                    for value in input.fields.values() {
                        write_description(&mut block, value.description.as_deref(), "  ")?;
                        writeln!(block, "  {}: {}", value.name, value.ty)?;
                    }
                    block.push('}');
                }
            }
            blocks.push(block);
        }

        writeln!(f, "{}", blocks.join("\n\n"))
    }
}

fn write_fields(block: &mut String, fields: &IndexMap<String, FieldNode>) -> fmt::Result {
    block.push_str(" {\n");
    for field in fields.values() {
        write_description(block, field.description.as_deref(), "  ")?;
        write!(block, "  {}", field.name)?;
        if !field.args.is_empty() {
            let args: Vec<String> = field.args.values().map(argument).collect();
            write!(block, "({})", args.join(", "))?;
        }
        writeln!(block, ": {}", field.ty)?;
    }
    block.push('}');
    Ok(())
}

fn argument(value: &InputValueNode) -> String {
    format!("{}: {}", value.name, value.ty)
}

fn write_description(block: &mut String, description: Option<&str>, indent: &str) -> fmt::Result {
    match description {
        None => Ok(()),
        Some(description) if description.contains('\n') => {
            writeln!(block, "{indent}\"\"\"")?;
            for line in description.lines() {
                let line = line.replace(r#"""""#, r#"\""""#);
                writeln!(block, "{indent}{line}")?;
            }
            writeln!(block, "{indent}\"\"\"")
        }
        Some(description) => {
            let escaped = description.replace('\\', "\\\\").replace('"', "\\\"");
            writeln!(block, "{indent}\"{escaped}\"")
        }
    }
}
