//! Serialization engine: [`TypedValue`] → `serde_json::Value`.
//!
//! Mirrors [`crate::de`]: a descriptor compiles once into a tree of
//! [`GenerateNode`]s. Unions do not trial-encode; they write with the first
//! member whose runtime tag matches the value.
pub mod primitive;
pub mod record;

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::descriptor::{CustomDescriptor, EnumDescriptor, PrimitiveKind, TypeDescriptor};
use crate::error::{CodecError, MissingReason, Result};
use crate::key::KeyCodec;
use crate::registry::Registry;
use crate::value::TypedValue;

pub use record::RecordGenerator;

#[derive(Debug)]
pub enum GenerateNode {
    Primitive { kind: PrimitiveKind, name: String },
    Optional(Arc<GenerateNode>),
    List { name: String, item: Arc<GenerateNode> },
    Set { name: String, member: Arc<GenerateNode> },
    Dict { name: String, key: KeyCodec, value: Arc<GenerateNode> },
    Tuple { name: String, items: Vec<Arc<GenerateNode>> },
    Union { name: String, members: Vec<(String, Arc<GenerateNode>)> },
    Enum(Arc<EnumDescriptor>),
    Record(RecordGenerator),
    Custom(Arc<CustomDescriptor>),
}

// ----------------------------- Construction -------------------------------- //

impl GenerateNode {
    pub(crate) fn build(registry: &Registry, descriptor: &TypeDescriptor, depth: usize) -> Result<Self> {
        let max_depth = registry.config().max_depth;
        if depth > max_depth {
            return Err(CodecError::unsupported(descriptor, format!("codec nesting exceeds depth {max_depth}")));
        }
        let child = |d: &TypeDescriptor| registry.generator_at(d, depth + 1);

        let node = match descriptor {
            TypeDescriptor::Primitive(p) => Self::Primitive { kind: p.kind, name: p.to_string() },
            TypeDescriptor::Optional(inner) => Self::Optional(child(inner)?),
            TypeDescriptor::List(item) => Self::List { name: descriptor.to_string(), item: child(item)? },
            TypeDescriptor::Set(member) => Self::Set { name: descriptor.to_string(), member: child(member)? },
            TypeDescriptor::Dict(key, value) => {
                let name = descriptor.to_string();
                let key = KeyCodec::new(key, &name)?;
                Self::Dict { name, key, value: child(value)? }
            }
            TypeDescriptor::Tuple(items) => Self::Tuple {
                name: descriptor.to_string(),
                items: items.iter().map(child).collect::<Result<_>>()?,
            },
            TypeDescriptor::Union(members) => {
                if members.is_empty() {
                    return Err(CodecError::unsupported(descriptor, "a union needs at least one member"));
                }
                Self::Union {
                    name: descriptor.to_string(),
                    members: members
                        .iter()
                        .map(|m| Ok((m.to_string(), child(m)?)))
                        .collect::<Result<_>>()?,
                }
            }
            TypeDescriptor::Enum(e) => Self::Enum(e.clone()),
            TypeDescriptor::Record(r) => Self::Record(RecordGenerator::build(registry, r, depth)?),
            TypeDescriptor::Custom(c) => Self::Custom(c.clone()),
        };
        Ok(node)
    }
}

// ------------------------------ Generation --------------------------------- //

impl GenerateNode {
    pub fn generate(&self, value: &TypedValue) -> Result<Value> {
        match self {
            Self::Primitive { kind, name } => primitive::generate_primitive(*kind, name, value),
            Self::Optional(inner) => match value {
                TypedValue::Null | TypedValue::Absent => Ok(Value::Null),
                _ => inner.generate(value),
            },
            Self::List { name, item } => match value {
                TypedValue::List(items) => {
                    items.iter().map(|v| item.generate(v)).collect::<Result<_>>().map(Value::Array)
                }
                other => Err(other.unexpected(name, "a `list` value")),
            },
            Self::Set { name, member } => match value {
                TypedValue::Set(items) => {
                    items.iter().map(|v| member.generate(v)).collect::<Result<_>>().map(Value::Array)
                }
                other => Err(other.unexpected(name, "a `set` value")),
            },
            Self::Dict { name, key, value: value_node } => {
                let TypedValue::Dict(entries) = value else {
                    return Err(value.unexpected(name, "a `dict` value"));
                };
                let mut object = Map::new();
                for (k, v) in entries {
                    object.insert(key.generate(k)?, value_node.generate(v)?);
                }
                Ok(Value::Object(object))
            }
            Self::Tuple { name, items } => {
                let TypedValue::Tuple(values) = value else {
                    return Err(value.unexpected(name, "a `tuple` value"));
                };
                if values.len() != items.len() {
                    return Err(CodecError::invalid(
                        name,
                        format!("expects a tuple of length {} but received length {}", items.len(), values.len()),
                    ));
                }
                items
                    .iter()
                    .zip(values)
                    .map(|(node, v)| node.generate(v))
                    .collect::<Result<_>>()
                    .map(Value::Array)
            }
            Self::Union { name, members } => match members.iter().find(|(_, node)| node.accepts(value)) {
                Some((_, node)) => node.generate(value),
                None => Err(CodecError::missing(
                    name,
                    MissingReason::NoUnionMember,
                    members.iter().map(|(n, _)| n.clone()).collect(),
                )),
            },
            Self::Enum(e) => generate_enum(e, value),
            Self::Record(record) => record.generate(value),
            Self::Custom(c) => c.codec.encode(value),
        }
    }

    /// Whether the value's runtime tag belongs to this node's type.
    pub fn accepts(&self, value: &TypedValue) -> bool {
        match (self, value) {
            (Self::Primitive { kind, .. }, v) => primitive::has_kind(*kind, v),
            (Self::Optional(_), TypedValue::Null | TypedValue::Absent) => true,
            (Self::Optional(inner), v) => inner.accepts(v),
            (Self::List { .. }, TypedValue::List(_))
            | (Self::Set { .. }, TypedValue::Set(_))
            | (Self::Dict { .. }, TypedValue::Dict(_)) => true,
            (Self::Tuple { items, .. }, TypedValue::Tuple(values)) => items.len() == values.len(),
            (Self::Union { members, .. }, v) => members.iter().any(|(_, node)| node.accepts(v)),
            (Self::Enum(e), TypedValue::Enum(v)) => v.type_name == e.name,
            (Self::Record(r), TypedValue::Record(v)) => v.type_name == r.name(),
            (Self::Custom(c), v) => c.codec.accepts(v),
            _ => false,
        }
    }
}

fn generate_enum(e: &EnumDescriptor, value: &TypedValue) -> Result<Value> {
    match value {
        TypedValue::Enum(v) if v.type_name == e.name => e
            .value_of(&v.member)
            .cloned()
            .ok_or_else(|| CodecError::invalid(&e.name, format!("`{}` is not a member", v.member))),
        TypedValue::Enum(v) => Err(CodecError::mismatch_typed(&e.name, "an enum member", &v.type_name)),
        other => Err(other.unexpected(&e.name, "an enum member")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::{EnumBuilder, RecordBuilder};
    use crate::value::{EnumValue, RecordValue};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn generate(descriptor: &TypeDescriptor, value: &TypedValue) -> Result<Value> {
        Registry::new().generate_value(descriptor, value)
    }

    #[test]
    fn union_picks_member_by_runtime_tag() {
        let a = RecordBuilder::new("A").field("x", TypeDescriptor::int()).build();
        let b = RecordBuilder::new("B").field("y", TypeDescriptor::string()).build();
        let u = TypeDescriptor::union([a, b, TypeDescriptor::int()]).unwrap();

        let value = TypedValue::Record(RecordValue::new("B").with_value("y", "hi".into()));
        assert_eq!(generate(&u, &value).unwrap(), json!({"y": "hi"}));
        assert_eq!(generate(&u, &TypedValue::Int(4)).unwrap(), json!(4));

        let err = generate(&u, &TypedValue::Bool(true)).unwrap_err();
        assert_eq!(err.category(), "KeyMissing");
        assert!(err.to_string().contains("A, B, int"), "{err}");
    }

    #[test]
    fn union_float_member_widens_ints() {
        let u = TypeDescriptor::union([TypeDescriptor::float(), TypeDescriptor::string()]).unwrap();
        assert_eq!(generate(&u, &TypedValue::Int(1)).unwrap(), json!(1.0));
        assert_eq!(generate(&u, &TypedValue::from("one")).unwrap(), json!("one"));

        // an earlier int member still keeps ints integral
        let u = TypeDescriptor::union([TypeDescriptor::int(), TypeDescriptor::float()]).unwrap();
        assert_eq!(generate(&u, &TypedValue::Int(1)).unwrap(), json!(1));
        assert_eq!(generate(&u, &TypedValue::float(1.5)).unwrap(), json!(1.5));
    }

    #[test]
    fn enums_write_their_literal() {
        let code = EnumBuilder::new("Code").member("OK", 200).member("GONE", 410).build().unwrap();
        assert_eq!(generate(&code, &TypedValue::Enum(EnumValue::new("Code", "GONE"))).unwrap(), json!(410));
        let err = generate(&code, &TypedValue::Enum(EnumValue::new("Code", "TEAPOT"))).unwrap_err();
        assert_eq!(err.category(), "ValueInvalid");
    }

    #[test]
    fn dict_keys_are_stringified() {
        let dict = TypeDescriptor::dict(TypeDescriptor::int(), TypeDescriptor::optional(TypeDescriptor::string()));
        let value = TypedValue::Dict(vec![
            (TypedValue::Int(2), "two".into()),
            (TypedValue::Int(1), TypedValue::Null),
        ]);
        let out = generate(&dict, &value).unwrap();
        assert_eq!(serde_json::to_string(&out).unwrap(), r#"{"2":"two","1":null}"#);
    }

    #[test]
    fn tuple_arity_is_checked() {
        let tuple = TypeDescriptor::tuple([TypeDescriptor::bool(), TypeDescriptor::bool()]);
        let err = generate(&tuple, &TypedValue::Tuple(vec![TypedValue::Bool(true)])).unwrap_err();
        assert_eq!(err.category(), "ValueInvalid");
    }
}
