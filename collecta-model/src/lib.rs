//! Entity model for Collecta.
//!
//! Defines the entities that storage persists and the engine creates:
//! - [`CollectionCategory`]: a node in the category tree collections hang from
//! - [`Collection`]: a schema plus display settings; owns documents
//! - [`App`]: a frontend bundle targeting one or more collections
//! - [`Document`]: JSON content valid against its collection's schema
//! - [`StoredFile`]: bytes referenced from document content by `FileRef`
//!
//! It also defines [`Pack`], the wire shape of a bundle of interrelated
//! entity specs whose cross references use proto ids.

mod entity;
mod pack;

pub use entity::{
    App, Collection, CollectionCategory, CollectionSettings, Document, DocumentSpec, StoredFile,
    VersionSettings,
};
pub use pack::{
    Pack, PackInfo, ProtoAppSpec, ProtoCollectionCategorySpec, ProtoCollectionSettings,
    ProtoCollectionSpec, ProtoDocumentSpec,
};
