//! Schema-guided traversal of content.
//!
//! The walk follows the schema's shape: struct values are entered through
//! their declared properties, list values through `items` for every element,
//! and `Ref`s are dereferenced without adding a path segment. Values whose
//! shape does not match the definition are skipped, as are `null`s. The
//! visitor is called for `DocumentRef` and `File` definitions only.

use crate::{PathSegment, Schema, SchemaStructureError, TypeDefinition};
use serde_json::Value;

/// Visits every `DocumentRef` and `File` position of `content`.
pub fn visit_content<'c, F>(
    schema: &Schema,
    content: &'c Value,
    visit: &mut F,
) -> Result<(), SchemaStructureError>
where
    F: FnMut(&TypeDefinition, &[PathSegment], &'c Value),
{
    let mut path = Vec::new();
    visit_node(schema, schema.root()?, content, &mut path, visit)
}

fn visit_node<'c, F>(
    schema: &Schema,
    def: &TypeDefinition,
    value: &'c Value,
    path: &mut Vec<PathSegment>,
    visit: &mut F,
) -> Result<(), SchemaStructureError>
where
    F: FnMut(&TypeDefinition, &[PathSegment], &'c Value),
{
    if value.is_null() {
        return Ok(());
    }
    match def {
        TypeDefinition::Ref { .. } => visit_node(schema, schema.resolve(def)?, value, path, visit)?,
        TypeDefinition::Struct { properties, .. } => {
            if let Value::Object(object) = value {
                for (key, property) in properties.iter() {
                    if let Some(child) = object.get(key) {
                        path.push(PathSegment::name(key));
                        visit_node(schema, property, child, path, visit)?;
                        path.pop();
                    }
                }
            }
        }
        TypeDefinition::List { items } => {
            if let Value::Array(elements) = value {
                for (index, element) in elements.iter().enumerate() {
                    path.push(PathSegment::index(index));
                    visit_node(schema, items, element, path, visit)?;
                    path.pop();
                }
            }
        }
        TypeDefinition::DocumentRef { .. } | TypeDefinition::File { .. } => {
            visit(def, path, value);
        }
        _ => {}
    }
    Ok(())
}

/// Mutable counterpart of [`visit_content`].
pub fn visit_content_mut<F>(
    schema: &Schema,
    content: &mut Value,
    visit: &mut F,
) -> Result<(), SchemaStructureError>
where
    F: FnMut(&TypeDefinition, &[PathSegment], &mut Value),
{
    let mut path = Vec::new();
    visit_node_mut(schema, schema.root()?, content, &mut path, visit)
}

fn visit_node_mut<F>(
    schema: &Schema,
    def: &TypeDefinition,
    value: &mut Value,
    path: &mut Vec<PathSegment>,
    visit: &mut F,
) -> Result<(), SchemaStructureError>
where
    F: FnMut(&TypeDefinition, &[PathSegment], &mut Value),
{
    if value.is_null() {
        return Ok(());
    }
    match def {
        TypeDefinition::Ref { .. } => {
            visit_node_mut(schema, schema.resolve(def)?, value, path, visit)?
        }
        TypeDefinition::Struct { properties, .. } => {
            if let Value::Object(object) = value {
                for (key, property) in properties.iter() {
                    if let Some(child) = object.get_mut(key) {
                        path.push(PathSegment::name(key));
                        visit_node_mut(schema, property, child, path, visit)?;
                        path.pop();
                    }
                }
            }
        }
        TypeDefinition::List { items } => {
            if let Value::Array(elements) = value {
                for (index, element) in elements.iter_mut().enumerate() {
                    path.push(PathSegment::index(index));
                    visit_node_mut(schema, items, element, path, visit)?;
                    path.pop();
                }
            }
        }
        TypeDefinition::DocumentRef { .. } | TypeDefinition::File { .. } => {
            visit(def, path, value);
        }
        _ => {}
    }
    Ok(())
}
