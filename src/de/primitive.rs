//! Leaf parsing: JSON scalars and the textual forms of temporal, binary, and
//! UUID values.

use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{Number, Value};
use uuid::Uuid;

use crate::descriptor::PrimitiveKind;
use crate::error::{CodecError, Result};
use crate::value::TypedValue;

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M%:z"];
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// JSON integers span `i64::MIN..=u64::MAX`; integral floats must land there too.
const INTEGRAL_MIN: f64 = i64::MIN as f64;
const INTEGRAL_END: f64 = 18_446_744_073_709_551_616.0;

pub(crate) fn expected_json(kind: PrimitiveKind) -> &'static str {
    match kind {
        PrimitiveKind::Null => "JSON `null`",
        PrimitiveKind::Bool => "JSON `boolean`",
        PrimitiveKind::Int => "an integral JSON `number`",
        PrimitiveKind::Float => "JSON `number`",
        _ => "JSON `string`",
    }
}

pub fn parse_primitive(kind: PrimitiveKind, type_name: &str, value: &Value) -> Result<TypedValue> {
    let parsed = match (kind, value) {
        (PrimitiveKind::Null, Value::Null) => Some(TypedValue::Null),
        (PrimitiveKind::Bool, Value::Bool(b)) => Some(TypedValue::Bool(*b)),
        (PrimitiveKind::Int, Value::Number(n)) => integral(n).map(TypedValue::Int),
        (PrimitiveKind::Float, Value::Number(n)) => n.as_f64().map(TypedValue::float),
        (PrimitiveKind::String, Value::String(s)) => Some(TypedValue::String(s.clone())),
        (
            PrimitiveKind::Bytes
            | PrimitiveKind::DateTime
            | PrimitiveKind::Date
            | PrimitiveKind::Time
            | PrimitiveKind::Uuid,
            Value::String(s),
        ) => return parse_text(kind, type_name, s),
        _ => None,
    };
    parsed.ok_or_else(|| CodecError::mismatch(type_name, expected_json(kind), value))
}

/// Integer carried by a JSON number. `2.0` counts, `2.5` and `1e300` do not.
pub(crate) fn integral(n: &Number) -> Option<i128> {
    if let Some(i) = n.as_i64() {
        return Some(i.into());
    }
    if let Some(u) = n.as_u64() {
        return Some(u.into());
    }
    let f = n.as_f64()?;
    (f.fract() == 0.0 && (INTEGRAL_MIN..INTEGRAL_END).contains(&f)).then_some(f as i128)
}

/// Parses the textual form of a primitive, as found in string values and
/// object keys.
pub fn parse_text(kind: PrimitiveKind, type_name: &str, text: &str) -> Result<TypedValue> {
    let invalid = |what: &str| CodecError::invalid(type_name, format!("`{text}` is not {what}"));
    match kind {
        PrimitiveKind::Null => Err(invalid("null")),
        PrimitiveKind::Bool => match text {
            "true" => Ok(TypedValue::Bool(true)),
            "false" => Ok(TypedValue::Bool(false)),
            _ => Err(invalid("a boolean")),
        },
        PrimitiveKind::Int => text.parse::<i128>().map(TypedValue::Int).map_err(|_| invalid("an integer")),
        PrimitiveKind::Float => text.parse::<f64>().map(TypedValue::float).map_err(|_| invalid("a number")),
        PrimitiveKind::String => Ok(TypedValue::String(text.to_owned())),
        PrimitiveKind::Bytes => general_purpose::STANDARD
            .decode(text)
            .map(TypedValue::Bytes)
            .map_err(|err| CodecError::invalid(type_name, format!("invalid base64 payload: {err}"))),
        PrimitiveKind::DateTime => parse_datetime(type_name, text).map(TypedValue::DateTime),
        PrimitiveKind::Date => text.parse::<NaiveDate>().map(TypedValue::Date).map_err(|_| invalid("an ISO 8601 date")),
        PrimitiveKind::Time => parse_time(type_name, text).map(TypedValue::Time),
        PrimitiveKind::Uuid => Uuid::parse_str(text).map(TypedValue::Uuid).map_err(|_| invalid("a UUID")),
    }
}

/// ISO 8601 time of day. Times carry no offset; `01:02:03+02:00` is rejected
/// rather than silently shifted or truncated.
pub fn parse_time(type_name: &str, text: &str) -> Result<NaiveTime> {
    if let Ok(time) = text.parse::<NaiveTime>() {
        return Ok(time);
    }
    let stem = text.strip_suffix(['Z', 'z']).or_else(|| {
        let split = text.len().checked_sub(6)?;
        let (stem, tail) = (text.get(..split)?, text.get(split..)?);
        let offset = tail.starts_with(['+', '-']) && tail.as_bytes()[3] == b':';
        offset.then_some(stem)
    });
    if stem.is_some_and(|stem| stem.parse::<NaiveTime>().is_ok()) {
        return Err(CodecError::invalid(
            type_name,
            format!("`{text}` carries a time zone offset, which time-of-day values do not hold"),
        ));
    }
    Err(CodecError::invalid(type_name, format!("`{text}` is not an ISO 8601 time")))
}

/// ISO 8601 timestamp with a mandatory offset; `Z` reads as `+00:00`.
pub fn parse_datetime(type_name: &str, text: &str) -> Result<DateTime<FixedOffset>> {
    let normalized = match text.strip_suffix('Z').or_else(|| text.strip_suffix('z')) {
        Some(stem) => format!("{stem}+00:00"),
        None => text.to_owned(),
    };
    if let Ok(ts) = DateTime::parse_from_rfc3339(&normalized) {
        return Ok(ts);
    }
    if let Some(ts) = OFFSET_FORMATS.iter().find_map(|f| DateTime::parse_from_str(&normalized, f).ok()) {
        return Ok(ts);
    }
    if NAIVE_FORMATS.iter().any(|f| NaiveDateTime::parse_from_str(text, f).is_ok()) {
        return Err(CodecError::invalid(
            type_name,
            format!("timestamp lacks explicit time zone designator: {text}"),
        ));
    }
    Err(CodecError::invalid(type_name, format!("`{text}` is not an ISO 8601 timestamp")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn scalars_require_exact_json_kind() {
        assert_eq!(parse_primitive(PrimitiveKind::Bool, "bool", &json!(true)).unwrap(), TypedValue::Bool(true));
        for (kind, name, bad) in [
            (PrimitiveKind::Bool, "bool", json!(23)),
            (PrimitiveKind::Int, "int", json!("23")),
            (PrimitiveKind::Float, "float", json!("0.5")),
            (PrimitiveKind::String, "str", json!(23)),
            (PrimitiveKind::Null, "None", json!(false)),
            (PrimitiveKind::Uuid, "UUID", json!(1)),
        ] {
            let err = parse_primitive(kind, name, &bad).unwrap_err();
            assert_eq!(err.category(), "TypeMismatch", "{name} from {bad}");
        }
    }

    #[test]
    fn integral_floats_are_ints() {
        assert_eq!(parse_primitive(PrimitiveKind::Int, "int", &json!(2.0)).unwrap(), TypedValue::Int(2));
        let err = parse_primitive(PrimitiveKind::Int, "int", &json!(2.5)).unwrap_err();
        assert_eq!(err.category(), "TypeMismatch");
        assert_eq!(
            parse_primitive(PrimitiveKind::Int, "int", &json!(u64::MAX)).unwrap(),
            TypedValue::Int(u64::MAX.into())
        );
    }

    #[test]
    fn floats_beyond_the_integer_range_are_not_ints() {
        for big in [json!(1e300), json!(-1e40), json!(1e20), json!(18_446_744_073_709_551_616.0)] {
            let err = parse_primitive(PrimitiveKind::Int, "int", &big).unwrap_err();
            assert_eq!(err.category(), "TypeMismatch", "{big}");
        }
        assert_eq!(
            parse_primitive(PrimitiveKind::Int, "int", &json!(-9_223_372_036_854_775_808.0)).unwrap(),
            TypedValue::Int(i64::MIN.into())
        );
        assert_eq!(
            parse_primitive(PrimitiveKind::Int, "int", &json!(9_007_199_254_740_992.0)).unwrap(),
            TypedValue::Int(1 << 53)
        );
    }

    #[test]
    fn floats_accept_integers() {
        assert_eq!(parse_primitive(PrimitiveKind::Float, "float", &json!(3)).unwrap(), TypedValue::float(3.0));
    }

    #[test]
    fn bytes_are_base64() {
        let parsed = parse_primitive(PrimitiveKind::Bytes, "bytes", &json!("QU4=")).unwrap();
        assert_eq!(parsed, TypedValue::Bytes(b"AN".to_vec()));
        let err = parse_primitive(PrimitiveKind::Bytes, "bytes", &json!("Q!U4")).unwrap_err();
        assert_eq!(err.category(), "ValueInvalid");
    }

    #[test]
    fn zulu_and_offsets() {
        let expected = Utc.with_ymd_and_hms(1989, 10, 23, 1, 2, 3).unwrap().fixed_offset();
        assert_eq!(parse_datetime("datetime", "1989-10-23T01:02:03Z").unwrap(), expected);
        assert_eq!(parse_datetime("datetime", "1989-10-23T01:02:03+00:00").unwrap(), expected);
        assert_eq!(parse_datetime("datetime", "1989-10-23 03:02:03+02:00").unwrap(), expected);
    }

    #[test]
    fn naive_timestamps_are_rejected() {
        let err = parse_datetime("datetime", "1989-10-23T01:02:03").unwrap_err();
        assert_eq!(err.category(), "ValueInvalid");
        assert!(err.to_string().contains("time zone designator"), "{err}");

        let err = parse_datetime("datetime", "yesterday").unwrap_err();
        assert!(err.to_string().contains("ISO 8601"), "{err}");
    }

    #[test]
    fn dates_times_and_uuids() {
        assert_eq!(
            parse_text(PrimitiveKind::Date, "date", "1989-10-23").unwrap(),
            TypedValue::Date(NaiveDate::from_ymd_opt(1989, 10, 23).unwrap())
        );
        assert_eq!(
            parse_text(PrimitiveKind::Time, "time", "01:02:03").unwrap(),
            TypedValue::Time(NaiveTime::from_hms_opt(1, 2, 3).unwrap())
        );
        assert_eq!(
            parse_text(PrimitiveKind::Time, "time", "01:02:03.250").unwrap(),
            TypedValue::Time(NaiveTime::from_hms_milli_opt(1, 2, 3, 250).unwrap())
        );
        let id = "f81d4fae-7dec-11d0-a765-00a0c91e6bf6";
        assert_eq!(
            parse_text(PrimitiveKind::Uuid, "UUID", id).unwrap(),
            TypedValue::Uuid(Uuid::parse_str(id).unwrap())
        );
        assert_eq!(parse_text(PrimitiveKind::Uuid, "UUID", "f81d").unwrap_err().category(), "ValueInvalid");
    }

    #[test]
    fn times_with_offsets_are_rejected() {
        for text in ["01:02:03+02:00", "01:02:03Z", "01:02:03.5-05:30"] {
            let err = parse_time("time", text).unwrap_err();
            assert!(err.to_string().contains("time zone offset"), "{text}: {err}");
        }
        let err = parse_time("time", "noon").unwrap_err();
        assert!(err.to_string().contains("ISO 8601 time"), "{err}");
    }
}
