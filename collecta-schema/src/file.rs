//! File values inside document content.
//!
//! A `File` property holds either a reference to a stored file
//! (`{id, name, mimeType}`) or a file still to be stored
//! (`{name, mimeType, content}`, with `content` a list of byte values).

use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileValue<'a> {
    /// A file that already exists in storage.
    Ref {
        id: &'a str,
        name: &'a str,
        mime_type: &'a str,
    },
    /// A file whose bytes travel with the content.
    Proto {
        name: &'a str,
        mime_type: &'a str,
        content: &'a [Value],
    },
}

impl<'a> FileValue<'a> {
    /// Recognizes a FileRef or a ProtoFile. Anything else is `None`.
    pub fn parse(value: &'a Value) -> Option<Self> {
        let object = value.as_object()?;
        let name = object.get("name")?.as_str()?;
        let mime_type = object.get("mimeType")?.as_str()?;
        match (object.get("id"), object.get("content")) {
            (Some(id), None) if only_keys(object, &["id", "name", "mimeType"]) => {
                Some(FileValue::Ref {
                    id: id.as_str()?,
                    name,
                    mime_type,
                })
            }
            (None, Some(Value::Array(content)))
                if only_keys(object, &["name", "mimeType", "content"])
                    && content.iter().all(is_byte) =>
            {
                Some(FileValue::Proto {
                    name,
                    mime_type,
                    content,
                })
            }
            _ => None,
        }
    }

    pub fn name(&self) -> &'a str {
        match self {
            FileValue::Ref { name, .. } | FileValue::Proto { name, .. } => name,
        }
    }

    pub fn mime_type(&self) -> &'a str {
        match self {
            FileValue::Ref { mime_type, .. } | FileValue::Proto { mime_type, .. } => mime_type,
        }
    }

    /// The raw bytes of a ProtoFile.
    pub fn bytes(&self) -> Option<Vec<u8>> {
        match self {
            FileValue::Ref { .. } => None,
            FileValue::Proto { content, .. } => content
                .iter()
                .map(|b| b.as_u64().and_then(|b| u8::try_from(b).ok()))
                .collect(),
        }
    }
}

fn only_keys(object: &Map<String, Value>, allowed: &[&str]) -> bool {
    object.keys().all(|k| allowed.contains(&k.as_str()))
}

fn is_byte(value: &Value) -> bool {
    value.as_u64().is_some_and(|b| b <= u64::from(u8::MAX))
}

/// The lowercased extension of a file name, with its leading dot.
pub fn file_extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(format!(".{}", ext.to_ascii_lowercase()))
}

fn mime_matches(pattern: &str, mime_type: &str) -> bool {
    if pattern == "*/*" || pattern.eq_ignore_ascii_case(mime_type) {
        return true;
    }
    match (pattern.strip_suffix("/*"), mime_type.split_once('/')) {
        (Some(top), Some((actual_top, _))) => top.eq_ignore_ascii_case(actual_top),
        _ => false,
    }
}

/// Whether a file with this name and MIME type satisfies an `accept` map of
/// MIME type (or `type/*` wildcard) to allowed extensions.
pub fn is_accepted(accept: &BTreeMap<String, Vec<String>>, name: &str, mime_type: &str) -> bool {
    let Some(extension) = file_extension(name) else {
        return false;
    };
    accept.iter().any(|(pattern, extensions)| {
        mime_matches(pattern, mime_type)
            && extensions
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(&extension))
    })
}
