//! Real identifier types used throughout the Collecta core.
//!
//! A real id is `<Kind>_<opaque>`. Freshly minted ids use the simple hex form
//! of a UUID v7 as the opaque part, so ids of one kind sort by creation time.

use crate::IdError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The entity kinds that carry ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IdKind {
    CollectionCategory,
    Collection,
    App,
    Document,
    File,
}

impl IdKind {
    /// Kinds that may be referenced by proto ids inside a pack.
    pub const PROTO_KINDS: [IdKind; 4] = [
        IdKind::CollectionCategory,
        IdKind::Collection,
        IdKind::App,
        IdKind::Document,
    ];

    /// The `<Kind>` part of an id string.
    pub const fn prefix(self) -> &'static str {
        match self {
            IdKind::CollectionCategory => "CollectionCategory",
            IdKind::Collection => "Collection",
            IdKind::App => "App",
            IdKind::Document => "Document",
            IdKind::File => "File",
        }
    }

    /// Whether proto ids exist for this kind.
    pub const fn has_proto_ids(self) -> bool {
        !matches!(self, IdKind::File)
    }
}

impl fmt::Display for IdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Checks the `<Kind>_<opaque>` shape. The opaque part must be non-empty and
/// made of ASCII alphanumerics, `-` or `_`.
pub(crate) fn is_real_id(kind: IdKind, s: &str) -> bool {
    s.strip_prefix(kind.prefix())
        .and_then(|rest| rest.strip_prefix('_'))
        .is_some_and(|opaque| {
            !opaque.is_empty()
                && opaque
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        })
}

macro_rules! real_id {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// The entity kind this id belongs to.
            pub const KIND: IdKind = $kind;

            /// Mints a new, time-ordered id.
            #[must_use]
            pub fn new() -> Self {
                Self(format!("{}_{}", Self::KIND.prefix(), Uuid::now_v7().simple()))
            }

            /// Parses an id, checking the kind prefix.
            pub fn parse(s: &str) -> Result<Self, IdError> {
                if is_real_id(Self::KIND, s) {
                    Ok(Self(s.to_owned()))
                } else {
                    Err(IdError::InvalidId {
                        kind: Self::KIND,
                        value: s.to_owned(),
                    })
                }
            }

            /// Returns the id as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                if is_real_id(Self::KIND, &s) {
                    Ok(Self(s))
                } else {
                    Err(IdError::InvalidId {
                        kind: Self::KIND,
                        value: s,
                    })
                }
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }
    };
}

real_id!(
    /// Id of a collection category (a folder-like grouping of collections).
    CollectionCategoryId,
    IdKind::CollectionCategory
);

real_id!(
    /// Id of a collection.
    CollectionId,
    IdKind::Collection
);

real_id!(
    /// Id of an app.
    AppId,
    IdKind::App
);

real_id!(
    /// Id of a document.
    DocumentId,
    IdKind::Document
);

real_id!(
    /// Id of a stored file.
    FileId,
    IdKind::File
);
