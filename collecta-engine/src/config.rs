//! Engine configuration.

use collecta_schema::DEFAULT_MAX_JSON_OBJECT_DEPTH;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Limits applied by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Nesting bound for JsonObject content values.
    pub max_json_object_depth: usize,
    /// Largest number of entity specs a pack may hold.
    pub max_pack_entities: usize,
    /// Largest number of documents `create_many_documents` accepts.
    pub max_batch_documents: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_json_object_depth: DEFAULT_MAX_JSON_OBJECT_DEPTH,
            max_pack_entities: 10_000,
            max_batch_documents: 10_000,
        }
    }
}

impl EngineConfig {
    /// Loads configuration from a TOML file.
    ///
    /// A missing, unreadable or malformed file yields the defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!("No engine config found at {:?}, using defaults", path);
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<EngineConfig>(&contents) {
                Ok(config) => {
                    info!("Loaded engine config from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!(
                        "Failed to parse engine config {:?}: {}. Falling back to defaults.",
                        path, e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read engine config {:?}: {}", path, e);
                Self::default()
            }
        }
    }
}
