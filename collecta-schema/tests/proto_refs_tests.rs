use collecta_schema::proto_refs::{
    content_id_references, document_ref_collection_ids, extract_proto_collection_ids,
    extract_proto_document_ids, replace_proto_collection_ids,
    replace_proto_document_ids_and_proto_collection_ids, replace_self_collection_id,
};
use collecta_schema::{PathSegment, Schema, TypeDefinition};
use collecta_types::{CollectionId, IdKind, IdMapping, ProtoId, ResolutionContext};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

fn proto(kind: IdKind, index: usize) -> ProtoId {
    ProtoId::new(kind, index).unwrap()
}

/// `Root { author: DocumentRef(<author>), related: [Related] }`,
/// `Related = DocumentRef(<related>)`.
fn linked_schema(author: &str, related: Option<&str>) -> Schema {
    Schema::new(
        "Root",
        [
            (
                "Root",
                TypeDefinition::structure([
                    ("author", TypeDefinition::document_ref(Some(author))),
                    ("related", TypeDefinition::list(TypeDefinition::reference("Related"))),
                ]),
            ),
            ("Related", TypeDefinition::document_ref(related)),
        ],
    )
}

// ── Schema scanning ──────────────────────────────────────────────

#[test]
fn collection_ids_are_scanned_in_every_type() {
    let schema = linked_schema("ProtoCollection_0", Some("Collection_real"));
    let mut found = document_ref_collection_ids(&schema);
    found.sort();
    assert_eq!(
        found,
        vec![("Related", "Collection_real"), ("Root", "ProtoCollection_0")]
    );
}

#[test]
fn only_proto_collection_ids_are_extracted() {
    let schema = linked_schema("ProtoCollection_0", Some("Collection_real"));
    assert_eq!(
        extract_proto_collection_ids(&schema).into_iter().collect::<Vec<_>>(),
        vec![proto(IdKind::Collection, 0)]
    );
}

#[test]
fn repeated_proto_collection_id_is_extracted_once() {
    let schema = linked_schema("ProtoCollection_1", Some("ProtoCollection_1"));
    assert_eq!(extract_proto_collection_ids(&schema).len(), 1);
}

#[test]
fn self_and_unconstrained_refs_are_not_proto_ids() {
    let schema = linked_schema("self", None);
    assert!(extract_proto_collection_ids(&schema).is_empty());
}

// ── Content scanning ─────────────────────────────────────────────

#[test]
fn proto_document_ids_are_extracted_and_deduplicated() {
    let schema = linked_schema("ProtoCollection_0", None);
    let content = json!({
        "author": {"collectionId": "ProtoCollection_0", "documentId": "ProtoDocument_3"},
        "related": [
            {"collectionId": "ProtoCollection_0", "documentId": "ProtoDocument_3"},
            {"collectionId": "Collection_x", "documentId": "Document_real"},
        ],
    });
    let found = extract_proto_document_ids(&schema, &content).unwrap();
    assert_eq!(found.into_iter().collect::<Vec<_>>(), vec![proto(IdKind::Document, 3)]);
}

#[test]
fn content_outside_the_schema_shape_is_ignored() {
    let schema = linked_schema("ProtoCollection_0", None);
    let content = json!({
        "author": "not a ref",
        "related": null,
        "stray": {"collectionId": "ProtoCollection_0", "documentId": "ProtoDocument_9"},
    });
    assert!(extract_proto_document_ids(&schema, &content).unwrap().is_empty());
}

#[test]
fn content_references_report_path_and_expected_kind() {
    let schema = linked_schema("ProtoCollection_0", None);
    let content = json!({
        "author": {"collectionId": "ProtoCollection_0", "documentId": "Document_real"},
        "related": [{"collectionId": "Collection_x", "documentId": "ProtoCollection_2"}],
    });
    let refs = content_id_references(&schema, &content).unwrap();
    let values: Vec<&str> = refs.iter().map(|r| r.value.as_str()).collect();
    assert_eq!(
        values,
        vec!["ProtoCollection_0", "Document_real", "Collection_x", "ProtoCollection_2"]
    );

    assert_eq!(refs[0].expected, IdKind::Collection);
    assert_eq!(refs[0].proto(), Some(proto(IdKind::Collection, 0)));
    assert_eq!(
        refs[0].path,
        vec![PathSegment::name("author"), PathSegment::name("collectionId")]
    );

    // real ids come back too, without a proto reading
    assert_eq!(refs[1].expected, IdKind::Document);
    assert_eq!(refs[1].proto(), None);

    // a proto id of the wrong kind is still reported
    assert_eq!(refs[3].expected, IdKind::Document);
    assert_eq!(refs[3].proto().map(|p| p.kind()), Some(IdKind::Collection));
    assert_eq!(
        refs[3].path,
        vec![
            PathSegment::name("related"),
            PathSegment::index(0),
            PathSegment::name("documentId"),
        ]
    );
}

#[test]
fn content_references_include_malformed_ids() {
    let schema = linked_schema("ProtoCollection_0", None);
    let content = json!({
        "author": {"collectionId": "ProtoCollection_0", "documentId": "garbage"},
        "related": [],
    });
    let refs = content_id_references(&schema, &content).unwrap();
    assert_eq!(refs.len(), 2);
    assert_eq!(refs[1].value, "garbage");
    assert_eq!(refs[1].proto(), None);
}

#[test]
fn unknown_ref_in_content_walk_is_an_error() {
    let schema = Schema::new("Root", [("Root", TypeDefinition::reference("Gone"))]);
    assert!(extract_proto_document_ids(&schema, &json!({})).is_err());
}

// ── Substitution ─────────────────────────────────────────────────

#[test]
fn schema_collection_ids_are_replaced() {
    let schema = linked_schema("ProtoCollection_0", Some("ProtoCollection_5"));
    let mapping = IdMapping::from_real_ids(IdKind::Collection, ["Collection_a"]);
    let replaced = replace_proto_collection_ids(&schema, &mapping);
    // index 5 is not mapped and stays a proto id
    assert_eq!(replaced, linked_schema("Collection_a", Some("ProtoCollection_5")));
}

#[test]
fn self_is_replaced_by_own_id() {
    let own = CollectionId::parse("Collection_own").unwrap();
    let replaced = replace_self_collection_id(&linked_schema("self", Some("self")), &own);
    assert_eq!(replaced, linked_schema("Collection_own", Some("Collection_own")));
}

#[test]
fn proto_replacement_leaves_self_for_the_self_pass() {
    let mapping = IdMapping::from_real_ids(IdKind::Collection, ["Collection_a"]);
    let schema = linked_schema("self", None);
    assert_eq!(replace_proto_collection_ids(&schema, &mapping), schema);
}

#[test]
fn content_ids_are_replaced_through_the_context() {
    let schema = linked_schema("ProtoCollection_0", None);
    let mut ctx = ResolutionContext::new();
    ctx.collections.insert(0, "Collection_a");
    ctx.documents.insert(1, "Document_b");
    let content = json!({
        "author": {"collectionId": "ProtoCollection_0", "documentId": "ProtoDocument_1"},
        "related": [{"collectionId": "Collection_z", "documentId": "ProtoDocument_7"}],
    });
    let resolved =
        replace_proto_document_ids_and_proto_collection_ids(&schema, &content, &ctx).unwrap();
    assert_eq!(
        resolved,
        json!({
            "author": {"collectionId": "Collection_a", "documentId": "Document_b"},
            "related": [{"collectionId": "Collection_z", "documentId": "ProtoDocument_7"}],
        })
    );
}

#[test]
fn content_replacement_does_not_cross_kinds() {
    let schema = linked_schema("ProtoCollection_0", None);
    let mut ctx = ResolutionContext::new();
    ctx.collections.insert(0, "Collection_a");
    let content = json!({
        "author": {"collectionId": "ProtoCollection_0", "documentId": "ProtoCollection_0"},
        "related": [],
    });
    let resolved =
        replace_proto_document_ids_and_proto_collection_ids(&schema, &content, &ctx).unwrap();
    assert_eq!(resolved["author"]["documentId"], json!("ProtoCollection_0"));
}

proptest! {
    #[test]
    fn collection_id_replacement_is_idempotent(
        indices in proptest::collection::vec(0usize..6, 1..4),
        mapped in 0usize..6,
    ) {
        let types = indices.iter().enumerate().map(|(i, index)| {
            (format!("T{i}"), TypeDefinition::document_ref(Some(format!("ProtoCollection_{index}").as_str())))
        });
        let schema = Schema::new("T0", types);
        let mapping = IdMapping::from_real_ids(
            IdKind::Collection,
            (0..mapped).map(|i| format!("Collection_r{i}")),
        );
        let once = replace_proto_collection_ids(&schema, &mapping);
        let twice = replace_proto_collection_ids(&once, &mapping);
        prop_assert_eq!(&once, &twice);
        let remaining = extract_proto_collection_ids(&once);
        prop_assert!(remaining.iter().all(|p| p.index() >= mapped));
    }
}
