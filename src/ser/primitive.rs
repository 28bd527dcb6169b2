//! Leaf generation: typed scalars to JSON scalars and to their textual forms.

use base64::{Engine as _, engine::general_purpose};
use chrono::SecondsFormat;
use serde_json::{Number, Value};

use crate::descriptor::PrimitiveKind;
use crate::error::{CodecError, Result};
use crate::value::TypedValue;

fn expected_typed(kind: PrimitiveKind) -> &'static str {
    match kind {
        PrimitiveKind::Null => "a null value",
        PrimitiveKind::Bool => "a `bool` value",
        PrimitiveKind::Int => "an `int` value",
        PrimitiveKind::Float => "a `float` value",
        PrimitiveKind::String => "a `str` value",
        PrimitiveKind::Bytes => "a `bytes` value",
        PrimitiveKind::DateTime => "a `datetime` value",
        PrimitiveKind::Date => "a `date` value",
        PrimitiveKind::Time => "a `time` value",
        PrimitiveKind::Uuid => "a `UUID` value",
    }
}

/// Whether a typed value carries the runtime tag of a primitive kind. Floats
/// take ints, as `generate_primitive` does.
pub(crate) fn has_kind(kind: PrimitiveKind, value: &TypedValue) -> bool {
    matches!(
        (kind, value),
        (PrimitiveKind::Null, TypedValue::Null | TypedValue::Absent)
            | (PrimitiveKind::Bool, TypedValue::Bool(_))
            | (PrimitiveKind::Int, TypedValue::Int(_))
            | (PrimitiveKind::Float, TypedValue::Float(_) | TypedValue::Int(_))
            | (PrimitiveKind::String, TypedValue::String(_))
            | (PrimitiveKind::Bytes, TypedValue::Bytes(_))
            | (PrimitiveKind::DateTime, TypedValue::DateTime(_) | TypedValue::LocalDateTime(_))
            | (PrimitiveKind::Date, TypedValue::Date(_))
            | (PrimitiveKind::Time, TypedValue::Time(_))
            | (PrimitiveKind::Uuid, TypedValue::Uuid(_))
    )
}

pub fn generate_primitive(kind: PrimitiveKind, type_name: &str, value: &TypedValue) -> Result<Value> {
    match (kind, value) {
        (PrimitiveKind::Null, TypedValue::Null | TypedValue::Absent) => Ok(Value::Null),
        (PrimitiveKind::Bool, TypedValue::Bool(b)) => Ok(Value::Bool(*b)),
        (PrimitiveKind::Int, TypedValue::Int(i)) => int_number(type_name, *i).map(Value::Number),
        (PrimitiveKind::Float, TypedValue::Float(f)) => float_number(type_name, f.0).map(Value::Number),
        (PrimitiveKind::Float, TypedValue::Int(i)) => float_number(type_name, *i as f64).map(Value::Number),
        (PrimitiveKind::String, TypedValue::String(s)) => Ok(Value::String(s.clone())),
        (
            PrimitiveKind::Bytes
            | PrimitiveKind::DateTime
            | PrimitiveKind::Date
            | PrimitiveKind::Time
            | PrimitiveKind::Uuid,
            _,
        ) => text_of(kind, type_name, value).map(Value::String),
        _ => Err(value.unexpected(type_name, expected_typed(kind))),
    }
}

/// Textual form of a primitive, as written into string values and object keys.
pub fn text_of(kind: PrimitiveKind, type_name: &str, value: &TypedValue) -> Result<String> {
    match (kind, value) {
        (PrimitiveKind::Bool, TypedValue::Bool(b)) => Ok(b.to_string()),
        (PrimitiveKind::Int, TypedValue::Int(i)) => Ok(i.to_string()),
        (PrimitiveKind::Float, TypedValue::Float(f)) => Ok(f.0.to_string()),
        (PrimitiveKind::String, TypedValue::String(s)) => Ok(s.clone()),
        (PrimitiveKind::Bytes, TypedValue::Bytes(b)) => Ok(general_purpose::STANDARD.encode(b)),
        (PrimitiveKind::DateTime, TypedValue::DateTime(ts)) => Ok(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        (PrimitiveKind::DateTime, TypedValue::LocalDateTime(ts)) => Err(CodecError::invalid(
            type_name,
            format!("timestamp lacks explicit time zone designator: {ts}"),
        )),
        (PrimitiveKind::Date, TypedValue::Date(d)) => Ok(d.to_string()),
        (PrimitiveKind::Time, TypedValue::Time(t)) => Ok(t.to_string()),
        (PrimitiveKind::Uuid, TypedValue::Uuid(u)) => Ok(u.to_string()),
        _ => Err(value.unexpected(type_name, expected_typed(kind))),
    }
}

fn int_number(type_name: &str, i: i128) -> Result<Number> {
    if let Ok(small) = i64::try_from(i) {
        return Ok(small.into());
    }
    u64::try_from(i)
        .map(Number::from)
        .map_err(|_| CodecError::invalid(type_name, format!("{i} does not fit a JSON number")))
}

fn float_number(type_name: &str, f: f64) -> Result<Number> {
    Number::from_f64(f).ok_or_else(|| CodecError::invalid(type_name, format!("{f} has no JSON representation")))
}
