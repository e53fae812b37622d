//! Command Record.
//!
//! A [`Command`] is a flexible, ordered-field record keyed to a type tag.
//! Fields are added by the emitter via [`Command::set`]; [`Command::to_json`]
//! serializes them in the *canonical field order* for the tag, so two
//! implementations that set the same fields produce byte-identical
//! output. Fields outside the canonical list for a tag are appended after
//! it, in insertion order.

use serde_json::{Map, Number, Value as Json};
use std::fmt::Write as _;

/// A scalar or array field value that can be attached to a [`Command`].
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Void,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    Str(String),
    Array(Vec<FieldValue>),
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}
impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Int(v)
    }
}
impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Long(v)
    }
}
impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Double(v)
    }
}
impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Str(v.to_string())
    }
}
impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Str(v)
    }
}
impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(v: Vec<T>) -> Self {
        FieldValue::Array(v.into_iter().map(Into::into).collect())
    }
}

/// A `(type-tag, ordered field map, timestamp)` triple. Fields are stored
/// in insertion order; [`to_json`](Command::to_json) reorders them onto
/// the canonical layout for the tag at serialization time.
#[derive(Clone, Debug, PartialEq)]
pub struct Command {
    command_type: String,
    timestamp: i64,
    fields: Vec<(String, FieldValue)>,
}

impl Command {
    /// Creates a new record for `command_type`, stamped with
    /// `timestamp_ms` (monotonic milliseconds since the owning
    /// interpreter started).
    pub fn new(command_type: impl Into<String>, timestamp_ms: i64) -> Self {
        Command {
            command_type: command_type.into(),
            timestamp: timestamp_ms,
            fields: Vec::new(),
        }
    }

    pub fn command_type(&self) -> &str {
        &self.command_type
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Sets a field, overwriting any previous value for the same key but
    /// preserving its original insertion position (so re-setting a field
    /// doesn't move it to the back of the "unknown fields" tail).
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.fields.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.fields.push((key, value));
        }
        self
    }

    /// Builder-style variant of [`set`](Command::set).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Serializes this record to a `serde_json::Value` with fields in
    /// canonical order: floats use fixed 10-digit precision and strings
    /// use JSON's standard escaping, which already covers `"`, `\`, `\n`,
    /// `\r`, `\t` as required.
    pub fn to_json(&self) -> Json {
        let mut map = Map::new();
        map.insert("type".to_string(), Json::String(self.command_type.clone()));

        let order = canonical_order(&self.command_type, &self.fields);
        let mut emitted = vec!["type".to_string()];

        for key in &order {
            if *key == "timestamp" {
                map.insert("timestamp".to_string(), Json::Number(self.timestamp.into()));
                emitted.push("timestamp".to_string());
                continue;
            }
            if let Some(value) = self.field(key) {
                map.insert((*key).to_string(), field_to_json(value));
                emitted.push((*key).to_string());
            }
        }
        for (key, value) in &self.fields {
            if !emitted.contains(key) {
                map.insert(key.clone(), field_to_json(value));
            }
        }
        if !map.contains_key("timestamp") {
            map.insert("timestamp".to_string(), Json::Number(self.timestamp.into()));
        }
        Json::Object(map)
    }

    /// Serializes to a compact JSON string (one line, no trailing
    /// whitespace), matching `to_json`'s field ordering exactly.
    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }
}

fn field_to_json(value: &FieldValue) -> Json {
    match value {
        FieldValue::Void => Json::Null,
        FieldValue::Bool(b) => Json::Bool(*b),
        FieldValue::Int(i) => Json::Number((*i).into()),
        FieldValue::Long(i) => Json::Number((*i).into()),
        FieldValue::Double(d) => Json::Number(fixed_precision_number(*d)),
        FieldValue::Str(s) => Json::String(s.clone()),
        FieldValue::Array(items) => Json::Array(items.iter().map(field_to_json).collect()),
    }
}

/// Formats a float with fixed 10-digit precision so the emitted JSON number
/// keeps that exact textual form rather than the shortest-round-trip
/// formatting a plain `f64`-backed `Number` would produce. Needs the
/// `arbitrary_precision` feature on `serde_json` (enabled in `Cargo.toml`):
/// without it, `Number` is `f64`-backed and collapses a string like
/// `"6.0000000000"` down to `6.0` the moment it's parsed.
fn fixed_precision_number(d: f64) -> Number {
    let mut text = String::new();
    let _ = write!(text, "{d:.10}");
    Number::from_string_unchecked(text)
}

/// Canonical field order per command type tag, with `"timestamp"` inlined
/// at its documented position. Most tags put it last, but
/// `PROGRAM_START`/`PROGRAM_END`/`SETUP_START`/`SETUP_END`/`LOOP_START`
/// and the Serial-flavored `FUNCTION_CALL` variants place it before
/// `message`. `FUNCTION_CALL` has three layouts depending on which
/// Serial-specific fields were set.
fn canonical_order(tag: &str, fields: &[(String, FieldValue)]) -> Vec<&'static str> {
    let has = |name: &str| fields.iter().any(|(k, _)| k == name);
    match tag {
        "VERSION_INFO" => vec!["component", "version", "status", "timestamp"],
        "PROGRAM_START" | "PROGRAM_END" => vec!["timestamp", "message"],
        "SETUP_START" | "SETUP_END" => vec!["timestamp", "message"],
        "LOOP_START" => vec!["timestamp", "message"],
        "LOOP_END" | "LOOP_END_COMPLETE" => vec!["iterations", "limitReached", "message", "timestamp"],
        "FUNCTION_CALL" => {
            if has("baudRate") {
                vec!["function", "arguments", "baudRate", "timestamp", "message"]
            } else if has("data") {
                vec!["function", "arguments", "data", "timestamp", "message"]
            } else {
                vec![
                    "function",
                    "arguments",
                    "message",
                    "iteration",
                    "completed",
                    "timestamp",
                ]
            }
        }
        "VAR_SET" => vec!["variable", "value", "isConst", "timestamp"],
        "PIN_MODE" => vec!["pin", "mode", "timestamp"],
        "DIGITAL_WRITE" => vec!["pin", "value", "timestamp"],
        "ANALOG_WRITE" => vec!["pin", "value", "timestamp"],
        "DELAY" => vec!["duration", "actualDelay", "timestamp"],
        "DELAY_MICROSECONDS" => vec!["duration", "timestamp"],
        "ANALOG_READ_REQUEST" | "DIGITAL_READ_REQUEST" => vec!["pin", "requestId", "timestamp"],
        "MILLIS_REQUEST" | "MICROS_REQUEST" => vec!["requestId", "timestamp"],
        "SERIAL_REQUEST" => vec!["operation", "terminator", "requestId", "message", "timestamp"],
        "IF_STATEMENT" => vec!["condition", "result", "branch", "timestamp"],
        "SWITCH_STATEMENT" => vec!["discriminant", "timestamp"],
        "SWITCH_CASE" => vec!["caseValue", "matched", "timestamp"],
        "BREAK_STATEMENT" | "CONTINUE_STATEMENT" => vec!["message", "timestamp"],
        "ERROR" => vec!["errorType", "message", "timestamp"],
        _ => vec!["timestamp"],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_serialization() {
        let mut a = Command::new("PIN_MODE", 42);
        a.set("pin", 13).set("mode", 1);
        let mut b = Command::new("PIN_MODE", 42);
        b.set("pin", 13).set("mode", 1);
        assert_eq!(a.to_json_string(), b.to_json_string());
        assert_eq!(
            a.to_json_string(),
            r#"{"type":"PIN_MODE","pin":13,"mode":1,"timestamp":42}"#
        );
    }

    #[test]
    fn test_var_set_is_const_optional() {
        let mut v = Command::new("VAR_SET", 0);
        v.set("variable", "x").set("value", 5);
        assert!(!v.to_json_string().contains("isConst"));
        v.set("isConst", true);
        assert!(v.to_json_string().contains("isConst"));
    }

    #[test]
    fn test_float_fixed_precision() {
        let mut c = Command::new("SWITCH_STATEMENT", 0);
        c.set("discriminant", 1.0_f64 / 3.0);
        assert!(c.to_json_string().contains("0.3333333333"));
    }

    #[test]
    fn test_float_fixed_precision_on_round_values() {
        // A "round" float (the common case: every arithmetic expression in
        // `eval.rs` yields `Value::Double`) must still carry all ten digits,
        // not collapse to the shortest round-trip form.
        let mut c = Command::new("VAR_SET", 0);
        c.set("variable", "x").set("value", 6.0_f64);
        assert!(c.to_json_string().contains("6.0000000000"));
        assert!(!c.to_json_string().contains("\"value\":6.0,"));
    }

    #[test]
    fn test_string_escaping() {
        let mut c = Command::new("ERROR", 0);
        c.set("errorType", "RuntimeError");
        c.set("message", "line\nwith \"quotes\"\\and\ttabs");
        let json = c.to_json_string();
        assert!(json.contains("\\n"));
        assert!(json.contains("\\\""));
        assert!(json.contains("\\t"));
    }

    #[test]
    fn test_unknown_field_appended_after_canonical() {
        let mut c = Command::new("DIGITAL_WRITE", 0);
        c.set("extra", "x").set("pin", 13).set("value", 1);
        let order: Vec<&str> = c.to_json().as_object().unwrap().keys().map(String::as_str).collect();
        let pin_pos = order.iter().position(|k| *k == "pin").unwrap();
        let extra_pos = order.iter().position(|k| *k == "extra").unwrap();
        assert!(extra_pos > pin_pos);
    }
}
