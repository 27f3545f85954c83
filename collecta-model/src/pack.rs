//! Pack wire shape.
//!
//! Every reference field is a plain string: it may hold a real id, or a
//! proto id (`Proto<Kind>_<index>`) pointing at the entry with that index in
//! the list of the same kind in this pack. Collection schemas may also use
//! `"self"` as a `DocumentRef.collectionId`.

use crate::VersionSettings;
use collecta_schema::Schema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtoCollectionCategorySpec {
    pub name: String,
    pub icon: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtoCollectionSettings {
    pub name: String,
    pub icon: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub collection_category_id: Option<String>,
    #[serde(default)]
    pub default_collection_view_app_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtoCollectionSpec {
    pub settings: ProtoCollectionSettings,
    pub schema: Schema,
    #[serde(default)]
    pub version_settings: VersionSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtoAppSpec {
    #[serde(rename = "type")]
    pub app_type: String,
    pub name: String,
    #[serde(default)]
    pub target_collection_ids: Vec<String>,
    #[serde(default)]
    pub files: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtoDocumentSpec {
    pub collection_id: String,
    pub content: Value,
}

/// A bundle of interrelated entity specs, installed all at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pack {
    pub id: String,
    #[serde(default)]
    pub info: PackInfo,
    #[serde(default)]
    pub collection_categories: Vec<ProtoCollectionCategorySpec>,
    #[serde(default)]
    pub collections: Vec<ProtoCollectionSpec>,
    #[serde(default)]
    pub apps: Vec<ProtoAppSpec>,
    #[serde(default)]
    pub documents: Vec<ProtoDocumentSpec>,
}

impl Pack {
    /// Total number of entity specs in the pack.
    pub fn entity_count(&self) -> usize {
        self.collection_categories.len()
            + self.collections.len()
            + self.apps.len()
            + self.documents.len()
    }
}
