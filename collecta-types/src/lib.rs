//! Core identifier types for Collecta.
//!
//! This crate defines the two disjoint id namespaces used throughout the
//! engine:
//! - Real ids (`<Kind>_<opaque>`) for entities that exist in storage
//! - Proto ids (`Proto<Kind>_<index>`) that point at another member of the
//!   same pack payload before any real id exists
//!
//! It also provides [`IdMapping`] and [`ResolutionContext`], the call-scoped
//! values that turn proto ids into real ids during a single install.

mod ids;
mod proto;

pub use ids::{AppId, CollectionCategoryId, CollectionId, DocumentId, FileId, IdKind};
pub use proto::{
    IdMapping, ProtoId, ResolutionContext, SELF_COLLECTION_ID, is_proto_id,
    make_proto_app_id_mapping, make_proto_collection_category_id_mapping,
    make_proto_collection_id_mapping, make_proto_document_id_mapping, replace_proto_app_id,
    replace_proto_collection_category_id, replace_proto_collection_id, replace_proto_document_id,
};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, IdError>;

/// Errors that can occur while parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("invalid {kind} id: {value:?}")]
    InvalidId { kind: IdKind, value: String },

    #[error("invalid proto id: {0:?}")]
    InvalidProtoId(String),

    #[error("{0} entities have no proto ids")]
    NoProtoKind(IdKind),
}
