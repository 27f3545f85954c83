//! Content validation.
//!
//! A direct recursive evaluator over [`TypeDefinition`]. Independent
//! branches of structs and lists are all visited, so one call reports every
//! issue in the value. Within a single scalar a type mismatch stops the
//! check: the format refinement only runs on well-typed values.

use crate::file::{self, FileValue};
use crate::{
    FormatRegistry, FormatTarget, Issue, PathSegment, Schema, SchemaStructureError, TypeDefinition,
};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Nesting bound for JsonObject values.
pub const DEFAULT_MAX_JSON_OBJECT_DEPTH: usize = 256;

const DOCUMENT_REF_KEYS: [&str; 2] = ["collectionId", "documentId"];

/// Validates content against a schema.
pub struct ContentValidator<'a> {
    formats: &'a FormatRegistry,
    max_json_object_depth: usize,
}

impl<'a> ContentValidator<'a> {
    pub fn new(formats: &'a FormatRegistry) -> Self {
        Self {
            formats,
            max_json_object_depth: DEFAULT_MAX_JSON_OBJECT_DEPTH,
        }
    }

    #[must_use]
    pub fn with_max_json_object_depth(mut self, depth: usize) -> Self {
        self.max_json_object_depth = depth;
        self
    }

    /// Validates `content` against `schema.types[schema.root_type]`.
    ///
    /// Returns every issue found; an empty list means the content is valid.
    pub fn validate(
        &self,
        schema: &Schema,
        content: &Value,
    ) -> Result<Vec<Issue>, SchemaStructureError> {
        schema.check_structure()?;
        let mut run = Run {
            validator: self,
            schema,
            path: Vec::new(),
            issues: Vec::new(),
        };
        run.check(schema.root()?, content)?;
        Ok(run.issues)
    }
}

/// Validates with the built-in formats and default limits.
pub fn validate(schema: &Schema, content: &Value) -> Result<Vec<Issue>, SchemaStructureError> {
    let formats = FormatRegistry::with_builtins();
    ContentValidator::new(&formats).validate(schema, content)
}

/// State of one validation call.
struct Run<'v, 's> {
    validator: &'v ContentValidator<'v>,
    schema: &'s Schema,
    path: Vec<PathSegment>,
    issues: Vec<Issue>,
}

impl Run<'_, '_> {
    fn schema_issue(&mut self, message: String) {
        self.issues.push(Issue::schema(message, self.path.clone()));
    }

    fn validation_issue(&mut self, message: String) {
        self.issues.push(Issue::validation(message, self.path.clone()));
    }

    fn type_issue(&mut self, expected: &str, value: &Value) {
        self.schema_issue(format!(
            "Invalid type: Expected {expected} but received {}",
            received(value)
        ));
    }

    fn check_format(&mut self, target: FormatTarget, format: Option<&str>, value: &Value) {
        if let Some(id) = format {
            if let Err(message) = self.validator.formats.check(target, id, value) {
                self.validation_issue(message);
            }
        }
    }

    fn check(&mut self, def: &TypeDefinition, value: &Value) -> Result<(), SchemaStructureError> {
        match def {
            TypeDefinition::String { format } => match value {
                Value::String(_) => self.check_format(FormatTarget::String, format.as_deref(), value),
                _ => self.type_issue("string", value),
            },
            TypeDefinition::Number { format } => match value {
                Value::Number(_) => self.check_format(FormatTarget::Number, format.as_deref(), value),
                _ => self.type_issue("number", value),
            },
            TypeDefinition::Boolean => {
                if !value.is_boolean() {
                    self.type_issue("boolean", value);
                }
            }
            TypeDefinition::StringLiteral { value: expected } => {
                if value.as_str() != Some(expected.as_str()) {
                    self.type_issue(&format!("\"{expected}\""), value);
                }
            }
            TypeDefinition::NumberLiteral { value: expected } => {
                if value.as_f64() != Some(*expected) {
                    self.type_issue(&expected.to_string(), value);
                }
            }
            TypeDefinition::BooleanLiteral { value: expected } => {
                if value.as_bool() != Some(*expected) {
                    self.type_issue(&expected.to_string(), value);
                }
            }
            TypeDefinition::Enum { members } => {
                if !members.values().any(|member| member.value.matches(value)) {
                    let allowed = members
                        .values()
                        .map(|member| member.value.to_string())
                        .collect::<Vec<_>>()
                        .join(" | ");
                    self.type_issue(&allowed, value);
                }
            }
            TypeDefinition::JsonObject { format } => match value {
                Value::Object(_) => {
                    if fits_depth(value, self.validator.max_json_object_depth) {
                        self.check_format(FormatTarget::JsonObject, format.as_deref(), value);
                    } else {
                        self.validation_issue(NOT_A_JSON_OBJECT.to_owned());
                    }
                }
                Value::Array(_) => self.validation_issue(NOT_A_JSON_OBJECT.to_owned()),
                _ => self.type_issue("Object", value),
            },
            TypeDefinition::File { accept } => self.check_file(accept.as_ref(), value),
            TypeDefinition::Struct {
                properties,
                nullable_properties,
            } => match value {
                Value::Object(object) => {
                    for (key, property) in properties.iter() {
                        self.path.push(PathSegment::name(key));
                        match object.get(key) {
                            None => self.schema_issue(format!(
                                "Invalid key: Expected \"{key}\" but received undefined"
                            )),
                            Some(Value::Null) if nullable_properties.contains(key) => {}
                            Some(child) => self.check(property, child)?,
                        }
                        self.path.pop();
                    }
                    self.check_extraneous_keys(object, |key| properties.contains_key(key));
                }
                _ => self.type_issue("Object", value),
            },
            TypeDefinition::List { items } => match value {
                Value::Array(elements) => {
                    for (index, element) in elements.iter().enumerate() {
                        self.path.push(PathSegment::index(index));
                        self.check(items, element)?;
                        self.path.pop();
                    }
                }
                _ => self.type_issue("Array", value),
            },
            TypeDefinition::DocumentRef { collection_id } => {
                self.check_document_ref(collection_id.as_deref(), value)
            }
            TypeDefinition::Ref { .. } => {
                let schema = self.schema;
                let target = schema.resolve(def)?;
                self.check(target, value)?;
            }
        }
        Ok(())
    }

    fn check_extraneous_keys(
        &mut self,
        object: &Map<String, Value>,
        declared: impl Fn(&str) -> bool,
    ) {
        for key in object.keys().filter(|key| !declared(key.as_str())) {
            self.path.push(PathSegment::name(key));
            self.schema_issue(format!("Invalid key: Expected never but received \"{key}\""));
            self.path.pop();
        }
    }

    fn check_document_ref(&mut self, fixed_collection_id: Option<&str>, value: &Value) {
        let Value::Object(object) = value else {
            self.type_issue("Object", value);
            return;
        };
        for key in DOCUMENT_REF_KEYS {
            self.path.push(PathSegment::name(key));
            match object.get(key) {
                None => self.schema_issue(format!(
                    "Invalid key: Expected \"{key}\" but received undefined"
                )),
                Some(Value::String(_)) => {}
                Some(other) => self.type_issue("string", other),
            }
            self.path.pop();
        }
        self.check_extraneous_keys(object, |key| DOCUMENT_REF_KEYS.contains(&key));

        if let (Some(fixed), Some(Value::String(actual))) =
            (fixed_collection_id, object.get("collectionId"))
        {
            if fixed != actual {
                self.path.push(PathSegment::name("collectionId"));
                self.validation_issue(format!(
                    "Invalid DocumentRef: collectionId must be \"{fixed}\""
                ));
                self.path.pop();
            }
        }
    }

    fn check_file(&mut self, accept: Option<&BTreeMap<String, Vec<String>>>, value: &Value) {
        let Some(file) = FileValue::parse(value) else {
            self.schema_issue("Invalid file: neither a FileRef nor a ProtoFile".to_owned());
            return;
        };
        if let Some(accept) = accept {
            if !file::is_accepted(accept, file.name(), file.mime_type()) {
                let accepted: BTreeSet<_> = accept.keys().map(String::as_str).collect();
                self.validation_issue(format!(
                    "Invalid file: \"{}\" ({}) is not an accepted file type; accepted: {}",
                    file.name(),
                    file.mime_type(),
                    accepted.into_iter().collect::<Vec<_>>().join(", ")
                ));
            }
        }
    }
}

const NOT_A_JSON_OBJECT: &str = "Invalid JsonObject: Does not serialize to a JSON object";

/// Explicit bounded walk of a JSON tree.
///
/// `serde_json::Value` is an owned tree, so reference cycles cannot occur;
/// the only way for a value to fail to serialize is to nest deeper than the
/// bound, which is what this walk reports.
fn fits_depth(value: &Value, max_depth: usize) -> bool {
    let mut stack = vec![(value, 0usize)];
    while let Some((node, depth)) = stack.pop() {
        if depth > max_depth {
            return false;
        }
        match node {
            Value::Object(object) => stack.extend(object.values().map(|v| (v, depth + 1))),
            Value::Array(items) => stack.extend(items.iter().map(|v| (v, depth + 1))),
            _ => {}
        }
    }
    true
}

/// Short representation of a received value for issue messages.
fn received(value: &Value) -> String {
    match value {
        Value::Null => "null".to_owned(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("\"{s}\""),
        Value::Array(_) => "Array".to_owned(),
        Value::Object(_) => "Object".to_owned(),
    }
}
