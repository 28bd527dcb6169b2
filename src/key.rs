//! Dictionary keys.
//!
//! JSON object keys are always strings, so a dict whose key type is not `str`
//! coerces each key from its textual form instead of parsing it as a nested
//! value. String-valued enumerations key by member value.

use std::sync::Arc;

use crate::de::primitive::parse_text;
use crate::descriptor::{EnumDescriptor, PrimitiveKind, TypeDescriptor};
use crate::error::{CodecError, Result};
use crate::ser::primitive::text_of;
use crate::value::{EnumValue, TypedValue};

#[derive(Debug, Clone)]
pub enum KeyCodec {
    Primitive { kind: PrimitiveKind, name: String },
    Enum(Arc<EnumDescriptor>),
}

impl KeyCodec {
    pub(crate) fn new(key_type: &TypeDescriptor, dict_name: &str) -> Result<Self> {
        match key_type {
            TypeDescriptor::Primitive(p) if p.kind.is_key_coercible() => {
                Ok(Self::Primitive { kind: p.kind, name: p.to_string() })
            }
            TypeDescriptor::Enum(e) if e.value_kind == PrimitiveKind::String => Ok(Self::Enum(e.clone())),
            TypeDescriptor::Enum(e) => Err(CodecError::unsupported(
                dict_name,
                format!("enumeration key type `{}` must have string values", e.name),
            )),
            other => Err(CodecError::unsupported(
                dict_name,
                format!("key type `{other}` cannot be coerced from a JSON object key"),
            )),
        }
    }

    pub fn parse(&self, key: &str) -> Result<TypedValue> {
        match self {
            Self::Primitive { kind: PrimitiveKind::String, .. } => Ok(TypedValue::String(key.to_owned())),
            Self::Primitive { kind, name } => parse_text(*kind, name, key),
            Self::Enum(e) => match e.member_for(&key.into()) {
                Some(member) => Ok(TypedValue::Enum(EnumValue::new(&e.name, member))),
                None => Err(CodecError::invalid(&e.name, format!("`{key}` is not a valid member value"))),
            },
        }
    }

    pub fn generate(&self, key: &TypedValue) -> Result<String> {
        match self {
            Self::Primitive { kind, name } => text_of(*kind, name, key),
            Self::Enum(e) => {
                let TypedValue::Enum(v) = key else {
                    return Err(key.unexpected(&e.name, "an enum member"));
                };
                match e.value_of(&v.member) {
                    Some(serde_json::Value::String(s)) if v.type_name == e.name => Ok(s.clone()),
                    _ => Err(CodecError::invalid(&e.name, format!("`{}` is not a member", v.member))),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::EnumBuilder;
    use pretty_assertions::assert_eq;

    #[test]
    fn primitive_keys_coerce_from_text() {
        let dict = "Dict[int, str]";
        let key = KeyCodec::new(&TypeDescriptor::int(), dict).unwrap();
        assert_eq!(key.parse("42").unwrap(), TypedValue::Int(42));
        assert_eq!(key.generate(&TypedValue::Int(-7)).unwrap(), "-7");
        assert_eq!(key.parse("forty").unwrap_err().category(), "ValueInvalid");

        let key = KeyCodec::new(&TypeDescriptor::bool(), dict).unwrap();
        assert_eq!(key.parse("true").unwrap(), TypedValue::Bool(true));
    }

    #[test]
    fn enum_keys_use_member_values() {
        let side = EnumBuilder::new("Side").member("LEFT", "L").member("RIGHT", "R").build().unwrap();
        let key = KeyCodec::new(&side, "Dict[Side, int]").unwrap();
        let parsed = key.parse("R").unwrap();
        assert_eq!(parsed, TypedValue::Enum(EnumValue::new("Side", "RIGHT")));
        assert_eq!(key.generate(&parsed).unwrap(), "R");
    }

    #[test]
    fn uncoercible_keys_are_unsupported() {
        let code = EnumBuilder::new("Code").member("OK", 200).build().unwrap();
        assert_eq!(KeyCodec::new(&code, "Dict[Code, str]").unwrap_err().category(), "UnsupportedType");
        let list = TypeDescriptor::list(TypeDescriptor::int());
        assert_eq!(KeyCodec::new(&list, "Dict[List[int], str]").unwrap_err().category(), "UnsupportedType");
        assert!(KeyCodec::new(&TypeDescriptor::bytes(), "Dict[bytes, str]").is_err());
    }
}
