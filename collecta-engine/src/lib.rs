//! Collecta engine: creates entities and installs packs.
//!
//! The [`Engine`] sits on top of a [`collecta_storage::Storage`] and owns
//! the [`collecta_schema::FormatRegistry`] used to validate content. Every
//! write runs in one storage transaction:
//! - `create_collection_category`, `create_collection`, `create_app`,
//!   `create_document` create a single entity
//! - `create_many_documents` creates a batch of documents, all or none
//! - `install_pack` creates every entity of a [`collecta_model::Pack`],
//!   all or none
//!
//! Limits come from [`EngineConfig`], which can be loaded from TOML.

mod apps;
mod categories;
mod collections;
mod config;
mod documents;
mod engine;
mod error;
mod pack;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{DocumentReference, EngineError, EngineResult};
pub use pack::PackInstallation;
