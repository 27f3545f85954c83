use collecta_schema::Schema;
use collecta_types::{AppId, CollectionCategoryId, CollectionId, DocumentId, FileId};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// A category in the tree that groups collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionCategory {
    pub id: CollectionCategoryId,
    pub name: String,
    pub icon: String,
    pub parent_id: Option<CollectionCategoryId>,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSettings {
    pub name: String,
    pub icon: String,
    #[serde(default)]
    pub description: String,
    pub collection_category_id: Option<CollectionCategoryId>,
    pub default_collection_view_app_id: Option<AppId>,
}

/// How document versions of a collection are summarized and compared.
///
/// Both getters are source snippets evaluated by frontends; the engine
/// stores them as is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_blocking_keys_getter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_summary_getter: Option<String>,
}

/// A set of documents sharing one schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: CollectionId,
    pub settings: CollectionSettings,
    pub schema: Schema,
    #[serde(default)]
    pub version_settings: VersionSettings,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct App {
    pub id: AppId,
    #[serde(rename = "type")]
    pub app_type: String,
    pub name: String,
    pub target_collection_ids: Vec<CollectionId>,
    /// Bundle files, keyed by path.
    #[serde(default)]
    pub files: BTreeMap<String, String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: DocumentId,
    pub collection_id: CollectionId,
    pub content: Value,
    pub created_at: i64,
}

impl Document {
    /// Extract a string value from `content` using a JSON pointer (e.g., "/title").
    pub fn get_str(&self, pointer: &str) -> Option<&str> {
        self.content.pointer(pointer).and_then(|v| v.as_str())
    }
}

/// Input of a document creation.
///
/// In a batch, `content` may reference other documents of the same batch
/// with `ProtoDocument_<i>`, where `i` is the position in the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSpec {
    pub collection_id: CollectionId,
    pub content: Value,
}

/// A file stored from a ProtoFile found in document content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub id: FileId,
    pub name: String,
    pub mime_type: String,
    pub content: Vec<u8>,
    pub created_at: i64,
}

impl StoredFile {
    /// The `FileRef` value that points at this file from document content.
    pub fn to_file_ref(&self) -> Value {
        json!({
            "id": self.id.as_str(),
            "name": self.name,
            "mimeType": self.mime_type,
        })
    }
}
