use crate::SchemaStructureError;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::marker::PhantomData;

/// A string-keyed map that keeps declaration order.
///
/// Serialized as a plain JSON object; entries come back in the order they
/// appear in the source document.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Inserts a value. An existing key keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut V)> + '_ {
        self.entries.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<K: Into<String>, V, const N: usize> From<[(K, V); N]> for OrderedMap<V> {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct OrderedMapVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
    type Value = OrderedMap<V>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map with string keys")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = OrderedMap::new();
        while let Some((key, value)) = access.next_entry::<String, V>()? {
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

/// The value of an enum member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnumValue {
    String(String),
    Number(f64),
}

impl EnumValue {
    /// Whether a JSON value is exactly this member value.
    pub fn matches(&self, value: &serde_json::Value) -> bool {
        match (self, value) {
            (EnumValue::String(expected), serde_json::Value::String(actual)) => expected == actual,
            (EnumValue::Number(expected), serde_json::Value::Number(actual)) => {
                actual.as_f64() == Some(*expected)
            }
            _ => false,
        }
    }
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnumValue::String(s) => write!(f, "\"{s}\""),
            EnumValue::Number(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumMember {
    pub value: EnumValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One node of the schema type system.
///
/// `Ref` is the only indirection: it names another entry of the enclosing
/// [`Schema`]'s `types`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dataType")]
pub enum TypeDefinition {
    String {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
    },
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
    },
    Boolean,
    StringLiteral {
        value: String,
    },
    NumberLiteral {
        value: f64,
    },
    BooleanLiteral {
        value: bool,
    },
    Enum {
        members: OrderedMap<EnumMember>,
    },
    Struct {
        properties: OrderedMap<TypeDefinition>,
        #[serde(
            default,
            rename = "nullableProperties",
            skip_serializing_if = "BTreeSet::is_empty"
        )]
        nullable_properties: BTreeSet<String>,
    },
    List {
        items: Box<TypeDefinition>,
    },
    DocumentRef {
        #[serde(
            default,
            rename = "collectionId",
            skip_serializing_if = "Option::is_none"
        )]
        collection_id: Option<String>,
    },
    File {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        accept: Option<BTreeMap<String, Vec<String>>>,
    },
    JsonObject {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
    },
    Ref {
        #[serde(rename = "ref")]
        name: String,
    },
}

impl TypeDefinition {
    pub fn string() -> Self {
        TypeDefinition::String { format: None }
    }

    pub fn string_with_format(format: impl Into<String>) -> Self {
        TypeDefinition::String {
            format: Some(format.into()),
        }
    }

    pub fn number() -> Self {
        TypeDefinition::Number { format: None }
    }

    pub fn number_with_format(format: impl Into<String>) -> Self {
        TypeDefinition::Number {
            format: Some(format.into()),
        }
    }

    pub fn reference(name: impl Into<String>) -> Self {
        TypeDefinition::Ref { name: name.into() }
    }

    pub fn list(items: TypeDefinition) -> Self {
        TypeDefinition::List {
            items: Box::new(items),
        }
    }

    /// A struct with no nullable properties.
    pub fn structure<K: Into<String>, const N: usize>(properties: [(K, TypeDefinition); N]) -> Self {
        TypeDefinition::Struct {
            properties: properties.into(),
            nullable_properties: BTreeSet::new(),
        }
    }

    pub fn document_ref(collection_id: Option<&str>) -> Self {
        TypeDefinition::DocumentRef {
            collection_id: collection_id.map(str::to_owned),
        }
    }

    /// Marks struct properties as nullable. No-op on other variants.
    #[must_use]
    pub fn with_nullable<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let TypeDefinition::Struct {
            nullable_properties,
            ..
        } = &mut self
        {
            nullable_properties.extend(names.into_iter().map(Into::into));
        }
        self
    }

    /// Name of the variant, as used in the `dataType` tag.
    pub fn data_type(&self) -> &'static str {
        match self {
            TypeDefinition::String { .. } => "String",
            TypeDefinition::Number { .. } => "Number",
            TypeDefinition::Boolean => "Boolean",
            TypeDefinition::StringLiteral { .. } => "StringLiteral",
            TypeDefinition::NumberLiteral { .. } => "NumberLiteral",
            TypeDefinition::BooleanLiteral { .. } => "BooleanLiteral",
            TypeDefinition::Enum { .. } => "Enum",
            TypeDefinition::Struct { .. } => "Struct",
            TypeDefinition::List { .. } => "List",
            TypeDefinition::DocumentRef { .. } => "DocumentRef",
            TypeDefinition::File { .. } => "File",
            TypeDefinition::JsonObject { .. } => "JsonObject",
            TypeDefinition::Ref { .. } => "Ref",
        }
    }

    /// Calls `f` on this definition and every nested one, without following
    /// `Ref`s.
    pub fn for_each<'a>(&'a self, f: &mut impl FnMut(&'a TypeDefinition)) {
        f(self);
        match self {
            TypeDefinition::Struct { properties, .. } => {
                for def in properties.values() {
                    def.for_each(f);
                }
            }
            TypeDefinition::List { items } => items.for_each(f),
            _ => {}
        }
    }

    /// Mutable counterpart of [`TypeDefinition::for_each`].
    pub fn for_each_mut(&mut self, f: &mut impl FnMut(&mut TypeDefinition)) {
        f(self);
        match self {
            TypeDefinition::Struct { properties, .. } => {
                for (_, def) in properties.iter_mut() {
                    def.for_each_mut(f);
                }
            }
            TypeDefinition::List { items } => items.for_each_mut(f),
            _ => {}
        }
    }
}

/// A named set of type definitions plus the type that content must match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    pub types: BTreeMap<String, TypeDefinition>,
    pub root_type: String,
}

impl Schema {
    pub fn new<I, K>(root_type: impl Into<String>, types: I) -> Self
    where
        I: IntoIterator<Item = (K, TypeDefinition)>,
        K: Into<String>,
    {
        Self {
            types: types.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            root_type: root_type.into(),
        }
    }

    /// The definition content is validated against.
    pub fn root(&self) -> Result<&TypeDefinition, SchemaStructureError> {
        self.types
            .get(&self.root_type)
            .ok_or_else(|| SchemaStructureError::MissingRootType(self.root_type.clone()))
    }

    /// The root definition with `Ref`s followed.
    pub fn resolved_root(&self) -> Result<&TypeDefinition, SchemaStructureError> {
        self.resolve(self.root()?)
    }

    /// Follows `Ref`s until a concrete definition is reached.
    pub fn resolve<'a>(
        &'a self,
        mut def: &'a TypeDefinition,
    ) -> Result<&'a TypeDefinition, SchemaStructureError> {
        let mut hops = 0;
        while let TypeDefinition::Ref { name } = def {
            if hops > self.types.len() {
                return Err(SchemaStructureError::RefCycle(name.clone()));
            }
            def = self
                .types
                .get(name)
                .ok_or_else(|| SchemaStructureError::UnknownRef(name.clone()))?;
            hops += 1;
        }
        Ok(def)
    }

    /// Checks that the root type and every `Ref` target are declared, and
    /// that no `Ref` chain loops without reaching a definition.
    pub fn check_structure(&self) -> Result<(), SchemaStructureError> {
        self.root()?;
        let mut refs = Vec::new();
        for def in self.types.values() {
            def.for_each(&mut |node| {
                if matches!(node, TypeDefinition::Ref { .. }) {
                    refs.push(node);
                }
            });
        }
        for node in refs {
            self.resolve(node)?;
        }
        Ok(())
    }

    /// Mutable visit of every definition in every declared type.
    pub fn for_each_definition_mut(&mut self, f: &mut impl FnMut(&mut TypeDefinition)) {
        for def in self.types.values_mut() {
            def.for_each_mut(f);
        }
    }
}
