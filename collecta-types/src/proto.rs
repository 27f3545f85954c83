//! Proto ids and the mappings that resolve them.
//!
//! A proto id is `Proto<Kind>_<index>`, where `index` is the 0-based
//! position of the referenced entity in its list within one pack payload.
//! The index is decimal with no leading zeros.
//!
//! The ordinal convention is shared by every kind: `Proto<Kind>_<i>` maps to
//! the i-th real id handed to the corresponding `make_proto_*_id_mapping`.

use crate::{AppId, CollectionCategoryId, CollectionId, DocumentId, IdError, IdKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Collection id sentinel meaning "the collection currently being defined".
///
/// It is resolved per collection to that collection's own id and is never
/// looked up in an [`IdMapping`].
pub const SELF_COLLECTION_ID: &str = "self";

const PROTO_PREFIX: &str = "Proto";

/// A positional placeholder for a member of the same pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProtoId {
    kind: IdKind,
    index: usize,
}

impl ProtoId {
    /// Creates a proto id. Fails for kinds that have no proto ids.
    pub fn new(kind: IdKind, index: usize) -> Result<Self, IdError> {
        if kind.has_proto_ids() {
            Ok(Self { kind, index })
        } else {
            Err(IdError::NoProtoKind(kind))
        }
    }

    pub fn kind(&self) -> IdKind {
        self.kind
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Parses `Proto<Kind>_<index>`.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        let invalid = || IdError::InvalidProtoId(s.to_owned());
        let rest = s.strip_prefix(PROTO_PREFIX).ok_or_else(invalid)?;
        let (prefix, digits) = rest.rsplit_once('_').ok_or_else(invalid)?;
        let kind = IdKind::PROTO_KINDS
            .into_iter()
            .find(|kind| kind.prefix() == prefix)
            .ok_or_else(invalid)?;
        if !is_canonical_index(digits) {
            return Err(invalid());
        }
        let index = digits.parse::<usize>().map_err(|_| invalid())?;
        Ok(Self { kind, index })
    }

    /// Parses `s` only if it is a proto id of the given kind.
    pub fn parse_kind(kind: IdKind, s: &str) -> Option<Self> {
        Self::parse(s).ok().filter(|proto| proto.kind == kind)
    }
}

fn is_canonical_index(digits: &str) -> bool {
    match digits.as_bytes() {
        [] => false,
        [b'0'] => true,
        [b'0', ..] => false,
        bytes => bytes.iter().all(u8::is_ascii_digit),
    }
}

/// Whether `s` has the shape of a proto id of any kind.
pub fn is_proto_id(s: &str) -> bool {
    ProtoId::parse(s).is_ok()
}

impl fmt::Display for ProtoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PROTO_PREFIX}{}_{}", self.kind.prefix(), self.index)
    }
}

impl FromStr for ProtoId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ProtoId {
    type Error = IdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<ProtoId> for String {
    fn from(id: ProtoId) -> String {
        id.to_string()
    }
}

/// Proto id to real id mapping for a single kind.
///
/// Scoped to one install call: never shared across calls or persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdMapping {
    kind: IdKind,
    entries: BTreeMap<usize, String>,
}

impl IdMapping {
    /// Creates an empty mapping for `kind`.
    pub fn new(kind: IdKind) -> Self {
        Self {
            kind,
            entries: BTreeMap::new(),
        }
    }

    /// Maps `Proto<Kind>_<i>` to the i-th element of `real_ids`.
    pub fn from_real_ids<I, S>(kind: IdKind, real_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            entries: real_ids
                .into_iter()
                .map(Into::into)
                .enumerate()
                .collect(),
        }
    }

    pub fn kind(&self) -> IdKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records the real id of the entity at `index`.
    pub fn insert(&mut self, index: usize, real_id: impl Into<String>) {
        self.entries.insert(index, real_id.into());
    }

    /// Looks up the real id for a proto id of this mapping's kind.
    pub fn get(&self, proto: &ProtoId) -> Option<&str> {
        if proto.kind != self.kind {
            return None;
        }
        self.entries.get(&proto.index).map(String::as_str)
    }

    /// Iterates `(proto id, real id)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (ProtoId, &str)> + '_ {
        self.entries.iter().map(|(index, real)| {
            (
                ProtoId {
                    kind: self.kind,
                    index: *index,
                },
                real.as_str(),
            )
        })
    }

    /// Substitutes a single id.
    ///
    /// A proto id of this mapping's kind that is present is replaced; a
    /// proto id that is absent, a proto id of another kind and any non-proto
    /// value are returned unchanged.
    pub fn resolve(&self, value: &str) -> String {
        ProtoId::parse_kind(self.kind, value)
            .and_then(|proto| self.get(&proto))
            .unwrap_or(value)
            .to_owned()
    }

    /// Like [`IdMapping::resolve`], letting `None` pass through.
    pub fn resolve_opt(&self, value: Option<&str>) -> Option<String> {
        value.map(|v| self.resolve(v))
    }
}

pub fn make_proto_collection_category_id_mapping(
    real_ids: &[CollectionCategoryId],
) -> IdMapping {
    IdMapping::from_real_ids(IdKind::CollectionCategory, real_ids.iter().map(|id| id.as_str()))
}

pub fn make_proto_collection_id_mapping(real_ids: &[CollectionId]) -> IdMapping {
    IdMapping::from_real_ids(IdKind::Collection, real_ids.iter().map(|id| id.as_str()))
}

pub fn make_proto_app_id_mapping(real_ids: &[AppId]) -> IdMapping {
    IdMapping::from_real_ids(IdKind::App, real_ids.iter().map(|id| id.as_str()))
}

pub fn make_proto_document_id_mapping(real_ids: &[DocumentId]) -> IdMapping {
    IdMapping::from_real_ids(IdKind::Document, real_ids.iter().map(|id| id.as_str()))
}

fn replace_kind(kind: IdKind, value: Option<&str>, mapping: &IdMapping) -> Option<String> {
    let value = value?;
    if mapping.kind() != kind {
        return Some(value.to_owned());
    }
    Some(mapping.resolve(value))
}

pub fn replace_proto_collection_category_id(
    value: Option<&str>,
    mapping: &IdMapping,
) -> Option<String> {
    replace_kind(IdKind::CollectionCategory, value, mapping)
}

pub fn replace_proto_collection_id(value: Option<&str>, mapping: &IdMapping) -> Option<String> {
    replace_kind(IdKind::Collection, value, mapping)
}

pub fn replace_proto_app_id(value: Option<&str>, mapping: &IdMapping) -> Option<String> {
    replace_kind(IdKind::App, value, mapping)
}

pub fn replace_proto_document_id(value: Option<&str>, mapping: &IdMapping) -> Option<String> {
    replace_kind(IdKind::Document, value, mapping)
}

/// The id mappings of one install, one per kind.
///
/// Created at the start of an install, threaded by reference through every
/// substitution, and dropped when the install returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionContext {
    pub collection_categories: IdMapping,
    pub collections: IdMapping,
    pub apps: IdMapping,
    pub documents: IdMapping,
}

impl ResolutionContext {
    /// Creates a context with empty mappings.
    pub fn new() -> Self {
        Self {
            collection_categories: IdMapping::new(IdKind::CollectionCategory),
            collections: IdMapping::new(IdKind::Collection),
            apps: IdMapping::new(IdKind::App),
            documents: IdMapping::new(IdKind::Document),
        }
    }
}

impl Default for ResolutionContext {
    fn default() -> Self {
        Self::new()
    }
}
