//! Deserialization engine: `serde_json::Value` → [`TypedValue`].
//!
//! A descriptor is compiled once into a tree of [`ParseNode`]s; parsing is
//! then a plain recursive walk. Nodes for named types are shared through the
//! registry cache, so `List[Person]` and `Dict[str, Person]` reuse one
//! `Person` node.
pub mod primitive;
pub mod record;

use std::sync::Arc;

use serde_json::Value;

use crate::descriptor::{CustomDescriptor, EnumDescriptor, PrimitiveKind, TypeDescriptor};
use crate::error::{CodecError, MissingReason, Result};
use crate::key::KeyCodec;
use crate::registry::Registry;
use crate::value::{EnumValue, TypedValue};

pub use record::RecordParser;

#[derive(Debug)]
pub enum ParseNode {
    Primitive { kind: PrimitiveKind, name: String },
    /// JSON `null` reads as [`TypedValue::Null`]; anything else goes to the inner node.
    Optional(Arc<ParseNode>),
    List { name: String, item: Arc<ParseNode> },
    Set { name: String, member: Arc<ParseNode> },
    Dict { name: String, key: KeyCodec, value: Arc<ParseNode> },
    Tuple { name: String, items: Vec<Arc<ParseNode>> },
    Union { name: String, members: Vec<(String, Arc<ParseNode>)> },
    Enum(Arc<EnumDescriptor>),
    Record(RecordParser),
    Custom(Arc<CustomDescriptor>),
}

// ----------------------------- Construction -------------------------------- //

impl ParseNode {
    pub(crate) fn build(registry: &Registry, descriptor: &TypeDescriptor, depth: usize) -> Result<Self> {
        let max_depth = registry.config().max_depth;
        if depth > max_depth {
            return Err(CodecError::unsupported(descriptor, format!("codec nesting exceeds depth {max_depth}")));
        }
        let child = |d: &TypeDescriptor| registry.parser_at(d, depth + 1);

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
            TypeDescriptor::Record(r) => Self::Record(RecordParser::build(registry, r, depth)?),
            TypeDescriptor::Custom(c) => Self::Custom(c.clone()),
        };
        Ok(node)
    }
}

// ------------------------------- Parsing ----------------------------------- //

impl ParseNode {
    pub fn parse(&self, value: &Value) -> Result<TypedValue> {
        match self {
            Self::Primitive { kind, name } => primitive::parse_primitive(*kind, name, value),
            Self::Optional(inner) => match value {
                Value::Null => Ok(TypedValue::Null),
                _ => inner.parse(value),
            },
            Self::List { name, item } => {
                let items = expect_array(name, value)?;
                items.iter().map(|v| item.parse(v)).collect::<Result<_>>().map(TypedValue::List)
            }
            Self::Set { name, member } => {
                let items = expect_array(name, value)?;
                let mut members: Vec<TypedValue> = Vec::with_capacity(items.len());
                for v in items {
                    let parsed = member.parse(v)?;
                    if !members.contains(&parsed) {
                        members.push(parsed);
                    }
                }
                Ok(TypedValue::Set(members))
            }
            Self::Dict { name, key, value: value_node } => {
                let Value::Object(object) = value else {
                    return Err(CodecError::mismatch(name, "JSON `object`", value));
                };
                // distinct keys may coerce to one (`"1"`, `"01"`); the last value wins
                let mut entries: Vec<(TypedValue, TypedValue)> = Vec::with_capacity(object.len());
                for (k, v) in object {
                    let (k, v) = (key.parse(k)?, value_node.parse(v)?);
                    match entries.iter_mut().find(|(existing, _)| *existing == k) {
                        Some(entry) => entry.1 = v,
                        None => entries.push((k, v)),
                    }
                }
                Ok(TypedValue::Dict(entries))
            }
            Self::Tuple { name, items } => {
                let array = expect_array(name, value)?;
                if array.len() != items.len() {
                    return Err(CodecError::invalid(
                        name,
                        format!(
                            "expects a JSON `array` of length {} but received length {}",
                            items.len(),
                            array.len()
                        ),
                    ));
                }
                items
                    .iter()
                    .zip(array)
                    .map(|(node, v)| node.parse(v))
                    .collect::<Result<_>>()
                    .map(TypedValue::Tuple)
            }
            Self::Union { name, members } => parse_union(name, members, value),
            Self::Enum(e) => parse_enum(e, value),
            Self::Record(record) => record.parse(value),
            Self::Custom(c) => c.codec.decode(value),
        }
    }
}

fn expect_array<'v>(type_name: &str, value: &'v Value) -> Result<&'v Vec<Value>> {
    value.as_array().ok_or_else(|| CodecError::mismatch(type_name, "JSON `array`", value))
}

/// First member that applies wins. Shape errors move on to the next member;
/// a content error from a member that matched structurally is final.
fn parse_union(name: &str, members: &[(String, Arc<ParseNode>)], value: &Value) -> Result<TypedValue> {
    for (member_name, node) in members {
        match node.parse(value) {
            Ok(parsed) => return Ok(parsed),
            Err(err) if err.is_fallthrough() => {
                tracing::trace!(union = name, member = %member_name, error = %err, "union member does not apply");
            }
            Err(err) => return Err(err),
        }
    }
    Err(CodecError::missing(
        name,
        MissingReason::NoUnionMember,
        members.iter().map(|(n, _)| n.clone()).collect(),
    ))
}

fn parse_enum(e: &EnumDescriptor, value: &Value) -> Result<TypedValue> {
    // integral floats look up int members the way int primitives read them
    let canonical;
    let literal = match e.value_kind {
        PrimitiveKind::Int => match value.as_number().and_then(primitive::integral) {
            Some(i) => {
                canonical = int_literal(i);
                Some(&canonical)
            }
            None => None,
        },
        _ => value.is_string().then_some(value),
    };
    let Some(literal) = literal else {
        return Err(CodecError::mismatch(&e.name, primitive::expected_json(e.value_kind), value));
    };
    match e.member_for(literal) {
        Some(member) => Ok(TypedValue::Enum(EnumValue::new(&e.name, member))),
        None => Err(CodecError::invalid(&e.name, format!("{value} is not a valid member value"))),
    }
}

/// `integral` stays within `i64::MIN..=u64::MAX`.
fn int_literal(i: i128) -> Value {
    match i64::try_from(i) {
        Ok(i) => Value::from(i),
        Err(_) => Value::from(i as u64),
    }
}
