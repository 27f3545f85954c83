//! Pluggable formats: named refinements of String, Number and JsonObject
//! type definitions.
//!
//! A format is looked up by the data type it refines plus its namespaced id.
//! Unknown format ids are not an error; the refinement is simply skipped so
//! that content authored against newer formats still validates.

use chrono::{DateTime, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The data type a format refines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatTarget {
    String,
    Number,
    JsonObject,
}

impl fmt::Display for FormatTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatTarget::String => f.write_str("String"),
            FormatTarget::Number => f.write_str("Number"),
            FormatTarget::JsonObject => f.write_str("JsonObject"),
        }
    }
}

/// A named refinement validator.
///
/// `validate` is only called with values that already have the target's
/// primitive type. Return `Err(message)` to reject the value.
pub trait Format: Send + Sync {
    fn id(&self) -> &str;

    fn target(&self) -> FormatTarget;

    fn validate(&self, value: &Value) -> Result<(), String>;
}

/// A format backed by a plain function.
pub struct FnFormat<F> {
    id: String,
    target: FormatTarget,
    check: F,
}

impl<F> FnFormat<F>
where
    F: Fn(&Value) -> Result<(), String> + Send + Sync,
{
    pub fn new(target: FormatTarget, id: impl Into<String>, check: F) -> Self {
        Self {
            id: id.into(),
            target,
            check,
        }
    }
}

impl<F> Format for FnFormat<F>
where
    F: Fn(&Value) -> Result<(), String> + Send + Sync,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn target(&self) -> FormatTarget {
        self.target
    }

    fn validate(&self, value: &Value) -> Result<(), String> {
        (self.check)(value)
    }
}

/// Registry of formats keyed by `(target, id)`.
#[derive(Clone, Default)]
pub struct FormatRegistry {
    formats: HashMap<(FormatTarget, String), Arc<dyn Format>>,
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self
            .formats
            .keys()
            .map(|(target, id)| format!("{target}:{id}"))
            .collect();
        keys.sort();
        f.debug_struct("FormatRegistry").field("formats", &keys).finish()
    }
}

impl FormatRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in formats.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(FnFormat::new(FormatTarget::String, PLAIN_DATE, check_plain_date));
        registry.register(FnFormat::new(FormatTarget::String, PLAIN_TIME, check_plain_time));
        registry.register(FnFormat::new(FormatTarget::String, INSTANT, check_instant));
        registry.register(FnFormat::new(FormatTarget::String, MARKDOWN, |_: &Value| Ok(())));
        registry.register(FnFormat::new(FormatTarget::Number, INTEGER, check_integer));
        registry.register(FnFormat::new(FormatTarget::JsonObject, RICH_TEXT, check_rich_text));
        registry
    }

    /// Registers a format, replacing any previous one with the same key.
    pub fn register(&mut self, format: impl Format + 'static) {
        let key = (format.target(), format.id().to_owned());
        self.formats.insert(key, Arc::new(format));
    }

    pub fn get(&self, target: FormatTarget, id: &str) -> Option<&Arc<dyn Format>> {
        self.formats.get(&(target, id.to_owned()))
    }

    pub fn contains(&self, target: FormatTarget, id: &str) -> bool {
        self.get(target, id).is_some()
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    /// Runs the format if it is registered. Unknown ids pass.
    pub fn check(&self, target: FormatTarget, id: &str, value: &Value) -> Result<(), String> {
        match self.get(target, id) {
            Some(format) => format.validate(value),
            None => Ok(()),
        }
    }
}

const PLAIN_DATE: &str = "dev.collecta:String.PlainDate";
const PLAIN_TIME: &str = "dev.collecta:String.PlainTime";
const INSTANT: &str = "dev.collecta:String.Instant";
const MARKDOWN: &str = "dev.collecta:String.Markdown";
const INTEGER: &str = "dev.collecta:Number.Integer";
const RICH_TEXT: &str = "dev.collecta:JsonObject.RichText";

/// Ids of the formats installed by [`FormatRegistry::with_builtins`].
pub fn builtin_format_ids() -> [(FormatTarget, &'static str); 6] {
    [
        (FormatTarget::String, PLAIN_DATE),
        (FormatTarget::String, PLAIN_TIME),
        (FormatTarget::String, INSTANT),
        (FormatTarget::String, MARKDOWN),
        (FormatTarget::Number, INTEGER),
        (FormatTarget::JsonObject, RICH_TEXT),
    ]
}

fn check_plain_date(value: &Value) -> Result<(), String> {
    const MESSAGE: &str = "Invalid PlainDate: Must be a date in the format YYYY-MM-DD";
    let s = value.as_str().ok_or(MESSAGE)?;
    let shaped = s.len() == 10
        && s.bytes()
            .enumerate()
            .all(|(i, b)| if i == 4 || i == 7 { b == b'-' } else { b.is_ascii_digit() });
    if shaped && NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok() {
        Ok(())
    } else {
        Err(MESSAGE.to_owned())
    }
}

fn check_plain_time(value: &Value) -> Result<(), String> {
    const MESSAGE: &str = "Invalid PlainTime: Must be a time in the format HH:MM[:SS[.fff]]";
    let s = value.as_str().ok_or(MESSAGE)?;
    let shaped = is_plain_time_shape(s.as_bytes());
    let parsed = ["%H:%M", "%H:%M:%S", "%H:%M:%S%.f"]
        .iter()
        .any(|pattern| NaiveTime::parse_from_str(s, pattern).is_ok());
    if shaped && parsed {
        Ok(())
    } else {
        Err(MESSAGE.to_owned())
    }
}

/// `HH:MM`, `HH:MM:SS` or `HH:MM:SS.f+`, every field zero padded.
fn is_plain_time_shape(bytes: &[u8]) -> bool {
    let digits = |range: std::ops::Range<usize>| {
        bytes.get(range).is_some_and(|field| field.iter().all(u8::is_ascii_digit))
    };
    let hours_minutes = bytes.len() >= 5 && digits(0..2) && bytes[2] == b':' && digits(3..5);
    match bytes.len() {
        5 => hours_minutes,
        8 => hours_minutes && bytes[5] == b':' && digits(6..8),
        n if n >= 10 => {
            hours_minutes && bytes[5] == b':' && digits(6..8) && bytes[8] == b'.' && digits(9..n)
        }
        _ => false,
    }
}

fn check_instant(value: &Value) -> Result<(), String> {
    const MESSAGE: &str = "Invalid Instant: Must be an RFC 3339 timestamp with offset";
    let s = value.as_str().ok_or(MESSAGE)?;
    DateTime::parse_from_rfc3339(s)
        .map(|_| ())
        .map_err(|_| MESSAGE.to_owned())
}

fn check_integer(value: &Value) -> Result<(), String> {
    const MESSAGE: &str = "Invalid Integer: Must be a whole number";
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(()),
        Value::Number(n) if n.as_f64().is_some_and(|f| f.fract() == 0.0) => Ok(()),
        _ => Err(MESSAGE.to_owned()),
    }
}

fn check_rich_text(value: &Value) -> Result<(), String> {
    match value.get("type").and_then(Value::as_str) {
        Some("doc") => Ok(()),
        _ => Err("Invalid RichText: Root node must have type \"doc\"".to_owned()),
    }
}
