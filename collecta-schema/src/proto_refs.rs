//! Proto id discovery and substitution inside schemas and content.
//!
//! Schemas carry proto collection ids in `DocumentRef.collectionId`. Content
//! carries proto collection and document ids in the `DocumentRef` objects it
//! holds; those are found by walking the content along the schema's shape
//! (see [`crate::walk`]).

use crate::walk::{visit_content, visit_content_mut};
use crate::{PathSegment, Schema, SchemaStructureError, TypeDefinition};
use collecta_types::{CollectionId, IdKind, IdMapping, ProtoId, ResolutionContext, SELF_COLLECTION_ID};
use serde_json::Value;
use std::collections::BTreeSet;

/// Every `DocumentRef.collectionId` fixed anywhere in the schema, paired with
/// the name of the declared type it appears in.
pub fn document_ref_collection_ids(schema: &Schema) -> Vec<(&str, &str)> {
    let mut found = Vec::new();
    for (type_name, def) in &schema.types {
        def.for_each(&mut |node| {
            if let TypeDefinition::DocumentRef {
                collection_id: Some(collection_id),
            } = node
            {
                found.push((type_name.as_str(), collection_id.as_str()));
            }
        });
    }
    found
}

/// Collects the proto collection ids referenced by the schema.
///
/// Every declared type is scanned, not only those reachable from the root.
pub fn extract_proto_collection_ids(schema: &Schema) -> BTreeSet<ProtoId> {
    document_ref_collection_ids(schema)
        .into_iter()
        .filter_map(|(_, id)| ProtoId::parse_kind(IdKind::Collection, id))
        .collect()
}

/// Collects the proto document ids held by `DocumentRef`s in `content`.
pub fn extract_proto_document_ids(
    schema: &Schema,
    content: &Value,
) -> Result<BTreeSet<ProtoId>, SchemaStructureError> {
    let mut found = BTreeSet::new();
    visit_content(schema, content, &mut |def, _, value| {
        if matches!(def, TypeDefinition::DocumentRef { .. }) {
            if let Some(proto) = value
                .get("documentId")
                .and_then(Value::as_str)
                .and_then(|id| ProtoId::parse_kind(IdKind::Document, id))
            {
                found.insert(proto);
            }
        }
    })?;
    Ok(found)
}

/// An id held by a `DocumentRef` inside content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentIdReference {
    /// Path of the id, ending with `collectionId` or `documentId`.
    pub path: Vec<PathSegment>,
    /// Kind the field holds.
    pub expected: IdKind,
    pub value: String,
}

impl ContentIdReference {
    /// The id as a proto id, if it has that shape (of any kind).
    pub fn proto(&self) -> Option<ProtoId> {
        ProtoId::parse(&self.value).ok()
    }
}

/// Lists every string `collectionId`/`documentId` held by `DocumentRef`s in
/// `content`, proto shaped or not, in traversal order.
pub fn content_id_references(
    schema: &Schema,
    content: &Value,
) -> Result<Vec<ContentIdReference>, SchemaStructureError> {
    let mut found = Vec::new();
    visit_content(schema, content, &mut |def, path, value| {
        if !matches!(def, TypeDefinition::DocumentRef { .. }) {
            return;
        }
        for (key, expected) in [("collectionId", IdKind::Collection), ("documentId", IdKind::Document)] {
            if let Some(id) = value.get(key).and_then(Value::as_str) {
                let mut path = path.to_vec();
                path.push(PathSegment::name(key));
                found.push(ContentIdReference {
                    path,
                    expected,
                    value: id.to_owned(),
                });
            }
        }
    })?;
    Ok(found)
}

/// Returns a copy of the schema with every proto `DocumentRef.collectionId`
/// substituted through `mapping`. Everything else is left as is.
pub fn replace_proto_collection_ids(schema: &Schema, mapping: &IdMapping) -> Schema {
    let mut schema = schema.clone();
    schema.for_each_definition_mut(&mut |def| {
        if let TypeDefinition::DocumentRef {
            collection_id: Some(collection_id),
        } = def
        {
            *collection_id = mapping.resolve(collection_id);
        }
    });
    schema
}

/// Returns a copy of the schema with the `"self"` collection id replaced by
/// the id of the collection the schema belongs to.
pub fn replace_self_collection_id(schema: &Schema, own_id: &CollectionId) -> Schema {
    let mut schema = schema.clone();
    schema.for_each_definition_mut(&mut |def| {
        if let TypeDefinition::DocumentRef {
            collection_id: Some(collection_id),
        } = def
        {
            if collection_id.as_str() == SELF_COLLECTION_ID {
                *collection_id = own_id.to_string();
            }
        }
    });
    schema
}

/// Returns a copy of `content` where every `DocumentRef` has its
/// `collectionId` and `documentId` substituted through the context's
/// collection and document mappings.
pub fn replace_proto_document_ids_and_proto_collection_ids(
    schema: &Schema,
    content: &Value,
    ctx: &ResolutionContext,
) -> Result<Value, SchemaStructureError> {
    let mut content = content.clone();
    visit_content_mut(schema, &mut content, &mut |def, _, value| {
        if !matches!(def, TypeDefinition::DocumentRef { .. }) {
            return;
        }
        let Value::Object(object) = value else {
            return;
        };
        for (key, mapping) in [("collectionId", &ctx.collections), ("documentId", &ctx.documents)] {
            if let Some(Value::String(id)) = object.get_mut(key) {
                *id = mapping.resolve(id);
            }
        }
    })?;
    Ok(content)
}
