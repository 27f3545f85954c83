use collecta_schema::{FnFormat, Format, FormatRegistry, FormatTarget, builtin_format_ids};
use serde_json::{Value, json};

fn check(target: FormatTarget, id: &str, value: Value) -> Result<(), String> {
    FormatRegistry::with_builtins().check(target, id, &value)
}

// ── Registry ─────────────────────────────────────────────────────

#[test]
fn builtins_are_registered() {
    let registry = FormatRegistry::with_builtins();
    assert_eq!(registry.len(), builtin_format_ids().len());
    for (target, id) in builtin_format_ids() {
        assert!(registry.contains(target, id), "{target}:{id}");
    }
}

#[test]
fn formats_are_keyed_by_target() {
    let registry = FormatRegistry::with_builtins();
    assert!(registry.contains(FormatTarget::String, "dev.collecta:String.PlainDate"));
    assert!(!registry.contains(FormatTarget::Number, "dev.collecta:String.PlainDate"));
}

#[test]
fn unknown_format_passes() {
    let registry = FormatRegistry::new();
    assert!(registry.is_empty());
    assert_eq!(registry.check(FormatTarget::String, "nope", &json!("x")), Ok(()));
}

#[test]
fn registering_twice_replaces() {
    let mut registry = FormatRegistry::new();
    registry.register(FnFormat::new(FormatTarget::String, "t:x", |_: &Value| Err("first".to_owned())));
    registry.register(FnFormat::new(FormatTarget::String, "t:x", |_: &Value| Err("second".to_owned())));
    assert_eq!(registry.len(), 1);
    let format = registry.get(FormatTarget::String, "t:x").unwrap();
    assert_eq!(format.id(), "t:x");
    assert_eq!(format.validate(&json!("v")), Err("second".to_owned()));
}

// ── Built-ins ────────────────────────────────────────────────────

#[test]
fn plain_date() {
    let id = "dev.collecta:String.PlainDate";
    assert!(check(FormatTarget::String, id, json!("2024-02-29")).is_ok());
    for bad in ["2023-02-29", "2024-2-01", "24-02-01", "2024/02/01", ""] {
        assert!(check(FormatTarget::String, id, json!(bad)).is_err(), "{bad}");
    }
}

#[test]
fn plain_time() {
    let id = "dev.collecta:String.PlainTime";
    for good in ["09:30", "23:59:59", "00:00:00.250"] {
        assert!(check(FormatTarget::String, id, json!(good)).is_ok(), "{good}");
    }
    for bad in ["9:30", "24:00", "12:60", "noon", "12:5:00", "12:05:7", "12:05:07.", "12:05:07,5"] {
        assert!(check(FormatTarget::String, id, json!(bad)).is_err(), "{bad}");
    }
}

#[test]
fn instant() {
    let id = "dev.collecta:String.Instant";
    assert!(check(FormatTarget::String, id, json!("2024-05-01T12:00:00Z")).is_ok());
    assert!(check(FormatTarget::String, id, json!("2024-05-01T12:00:00+02:00")).is_ok());
    assert!(check(FormatTarget::String, id, json!("2024-05-01T12:00:00")).is_err());
}

#[test]
fn markdown_accepts_any_string() {
    assert!(check(FormatTarget::String, "dev.collecta:String.Markdown", json!("# Title\n\n*x*")).is_ok());
}

#[test]
fn integer() {
    let id = "dev.collecta:Number.Integer";
    assert!(check(FormatTarget::Number, id, json!(42)).is_ok());
    assert!(check(FormatTarget::Number, id, json!(-7)).is_ok());
    assert!(check(FormatTarget::Number, id, json!(3.0)).is_ok());
    assert!(check(FormatTarget::Number, id, json!(3.5)).is_err());
}

#[test]
fn rich_text_requires_doc_root() {
    let id = "dev.collecta:JsonObject.RichText";
    assert!(check(FormatTarget::JsonObject, id, json!({"type": "doc", "content": []})).is_ok());
    assert!(check(FormatTarget::JsonObject, id, json!({"type": "paragraph"})).is_err());
    assert!(check(FormatTarget::JsonObject, id, json!({})).is_err());
}
