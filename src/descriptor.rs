//! Structural type model shared by the resolver, both engines, and schema tooling.
//!
//! A [`TypeDescriptor`] is a closed sum over the supported type algebra. Named
//! types (records, enums, custom hooks) live behind `Arc` so one resolution is
//! shared by every codec that refers to it; their identity is the `Arc`.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{CodecError, Result};
use crate::hooks::CustomCodec;
use crate::value::TypedValue;

// ------------------------------- Primitives -------------------------------- //

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Null,
    Bool,
    Int,
    Float,
    String,
    Bytes,
    DateTime,
    Date,
    Time,
    Uuid,
}

impl PrimitiveKind {
    /// Kinds whose values can be spelled as a JSON object key.
    pub fn is_key_coercible(self) -> bool {
        !matches!(self, Self::Null | Self::Bytes)
    }
}

/// Advisory metadata; never enforced by the engines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations {
    pub signed: Option<bool>,
    /// Storage width in bytes.
    pub storage: Option<u8>,
    pub precision: Option<Precision>,
    pub max_length: Option<usize>,
    pub range: Option<IntegerRange>,
}

impl Annotations {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Precision {
    pub significant_digits: u32,
    pub decimal_digits: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegerRange {
    pub minimum: i64,
    pub maximum: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub kind: PrimitiveKind,
    pub annotations: Annotations,
}

impl From<PrimitiveKind> for Primitive {
    fn from(kind: PrimitiveKind) -> Self {
        Self { kind, annotations: Annotations::default() }
    }
}

// ------------------------------- Descriptor -------------------------------- //

#[derive(Debug, Clone)]
pub enum TypeDescriptor {
    Primitive(Primitive),
    Optional(Box<TypeDescriptor>),
    List(Box<TypeDescriptor>),
    Set(Box<TypeDescriptor>),
    Dict(Box<TypeDescriptor>, Box<TypeDescriptor>),
    Tuple(Vec<TypeDescriptor>),
    /// Member order is significant for parsing.
    Union(Vec<TypeDescriptor>),
    Enum(Arc<EnumDescriptor>),
    Record(Arc<RecordDescriptor>),
    Custom(Arc<CustomDescriptor>),
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        use TypeDescriptor::*;
        match (self, other) {
            (Primitive(a), Primitive(b)) => a == b,
            (Optional(a), Optional(b)) | (List(a), List(b)) | (Set(a), Set(b)) => a == b,
            (Dict(ak, av), Dict(bk, bv)) => ak == bk && av == bv,
            (Tuple(a), Tuple(b)) | (Union(a), Union(b)) => a == b,
            (Enum(a), Enum(b)) => Arc::ptr_eq(a, b),
            (Record(a), Record(b)) => Arc::ptr_eq(a, b),
            (Custom(a), Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl TypeDescriptor {
    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self::Primitive(kind.into())
    }

    pub fn null() -> Self {
        Self::primitive(PrimitiveKind::Null)
    }

    pub fn bool() -> Self {
        Self::primitive(PrimitiveKind::Bool)
    }

    pub fn int() -> Self {
        Self::primitive(PrimitiveKind::Int)
    }

    pub fn float() -> Self {
        Self::primitive(PrimitiveKind::Float)
    }

    pub fn string() -> Self {
        Self::primitive(PrimitiveKind::String)
    }

    pub fn bytes() -> Self {
        Self::primitive(PrimitiveKind::Bytes)
    }

    pub fn datetime() -> Self {
        Self::primitive(PrimitiveKind::DateTime)
    }

    pub fn date() -> Self {
        Self::primitive(PrimitiveKind::Date)
    }

    pub fn time() -> Self {
        Self::primitive(PrimitiveKind::Time)
    }

    pub fn uuid() -> Self {
        Self::primitive(PrimitiveKind::Uuid)
    }

    /// Integer with signedness and storage width (`int8` … `uint64`).
    pub fn sized_int(signed: bool, storage: u8) -> Self {
        Self::Primitive(Primitive {
            kind: PrimitiveKind::Int,
            annotations: Annotations {
                signed: Some(signed),
                storage: Some(storage),
                ..Annotations::default()
            },
        })
    }

    /// Attaches annotations; a no-op for non-primitive descriptors.
    pub fn annotated(mut self, edit: impl FnOnce(&mut Annotations)) -> Self {
        if let Self::Primitive(p) = &mut self {
            edit(&mut p.annotations);
        }
        self
    }

    pub fn optional(inner: TypeDescriptor) -> Self {
        match inner {
            // Optional[None] and Optional[Optional[T]] add nothing
            Self::Primitive(Primitive { kind: PrimitiveKind::Null, .. }) | Self::Optional(_) => inner,
            other => Self::Optional(Box::new(other)),
        }
    }

    pub fn list(item: TypeDescriptor) -> Self {
        Self::List(Box::new(item))
    }

    pub fn set(member: TypeDescriptor) -> Self {
        Self::Set(Box::new(member))
    }

    pub fn dict(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        Self::Dict(Box::new(key), Box::new(value))
    }

    pub fn tuple(items: impl IntoIterator<Item = TypeDescriptor>) -> Self {
        Self::Tuple(items.into_iter().collect())
    }

    /// Builds a union, normalizing it the way type annotations read:
    /// nested unions flatten, duplicates drop, a `None` member turns the rest
    /// into `Optional`, and a single remaining member stands for itself.
    pub fn union(members: impl IntoIterator<Item = TypeDescriptor>) -> Result<Self> {
        fn collect(member: TypeDescriptor, flat: &mut Vec<TypeDescriptor>, nullable: &mut bool) {
            match member {
                TypeDescriptor::Union(inner) => {
                    for m in inner {
                        collect(m, flat, nullable);
                    }
                }
                TypeDescriptor::Optional(inner) => {
                    *nullable = true;
                    collect(*inner, flat, nullable);
                }
                m if m.is_null() => *nullable = true,
                m => {
                    if !flat.contains(&m) {
                        flat.push(m);
                    }
                }
            }
        }

        let mut flat: Vec<TypeDescriptor> = Vec::new();
        let mut nullable = false;
        for member in members {
            collect(member, &mut flat, &mut nullable);
        }

        let core = match flat.len() {
            0 if nullable => return Ok(Self::null()),
            0 => return Err(CodecError::unsupported("Union[]", "a union needs at least one member")),
            1 => flat.remove(0),
            _ => Self::Union(flat),
        };
        Ok(if nullable { Self::optional(core) } else { core })
    }

    /// An enumeration of bare literals, named like `Literal["a", "b"]`. Each
    /// member is named by its literal's text.
    pub fn literal(values: impl IntoIterator<Item = Value>) -> Result<Self> {
        let values: Vec<Value> = values.into_iter().collect();
        let listed: Vec<String> = values.iter().map(Value::to_string).collect();
        let name = format!("Literal[{}]", listed.join(", "));
        let mut members = IndexMap::with_capacity(values.len());
        for value in values {
            let member = match &value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            if members.contains_key(&member) {
                return Err(CodecError::unsupported(&name, format!("literal {value} is repeated")));
            }
            members.insert(member, value);
        }
        Ok(Self::Enum(Arc::new(EnumDescriptor::new(name, members)?)))
    }

    pub fn custom(descriptor: CustomDescriptor) -> Self {
        Self::Custom(Arc::new(descriptor))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Primitive(Primitive { kind: PrimitiveKind::Null, .. }))
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, Self::Optional(_))
    }

    /// Identity of named descriptors, used as a cache key.
    pub(crate) fn named_identity(&self) -> Option<usize> {
        match self {
            Self::Enum(e) => Some(Arc::as_ptr(e) as *const () as usize),
            Self::Record(r) => Some(Arc::as_ptr(r) as *const () as usize),
            Self::Custom(c) => Some(Arc::as_ptr(c) as *const () as usize),
            _ => None,
        }
    }
}

// ------------------------------- Records ----------------------------------- //

/// Produces a fresh default for a field each time it is absent.
pub type DefaultFactory = Arc<dyn Fn() -> TypedValue + Send + Sync>;

/// Takes over parsing of a whole record object.
pub type DecodeHook = Arc<dyn Fn(&Value) -> Result<TypedValue> + Send + Sync>;

#[derive(Clone)]
pub enum Presence {
    Required,
    /// Absent key (or `null`) yields no value.
    OptionalNullable,
    DefaultValue(TypedValue),
    DefaultFactory(DefaultFactory),
}

impl fmt::Debug for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => f.write_str("Required"),
            Self::OptionalNullable => f.write_str("OptionalNullable"),
            Self::DefaultValue(v) => f.debug_tuple("DefaultValue").field(v).finish(),
            Self::DefaultFactory(_) => f.write_str("DefaultFactory(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Internal (Rust-side) name; keys the record's typed value.
    pub name: String,
    /// Key in the interchange object.
    pub wire_name: String,
    pub value_type: TypeDescriptor,
    pub presence: Presence,
}

pub struct RecordDescriptor {
    pub name: String,
    pub description: Option<String>,
    /// Declaration order; drives output key order.
    pub fields: Vec<FieldDescriptor>,
    pub decode_hook: Option<DecodeHook>,
}

impl fmt::Debug for RecordDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("fields", &self.fields)
            .field("decode_hook", &self.decode_hook.is_some())
            .finish()
    }
}

impl RecordDescriptor {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

// -------------------------------- Enums ------------------------------------ //

#[derive(Debug, Clone)]
pub struct EnumDescriptor {
    pub name: String,
    pub description: Option<String>,
    /// `Int` or `String`; every member literal has this kind.
    pub value_kind: PrimitiveKind,
    /// Symbolic member name → literal value, in declaration order.
    pub members: IndexMap<String, Value>,
}

impl EnumDescriptor {
    /// Validates that member literals are all integers or all strings, and distinct.
    pub fn new(name: impl Into<String>, members: IndexMap<String, Value>) -> Result<Self> {
        let name = name.into();
        let mut value_kind = None;
        for (member, literal) in &members {
            let kind = match literal {
                Value::String(_) => PrimitiveKind::String,
                Value::Number(n) if n.is_i64() || n.is_u64() => PrimitiveKind::Int,
                other => {
                    return Err(CodecError::unsupported(
                        &name,
                        format!("member `{member}` has non-integer, non-string value {other}"),
                    ));
                }
            };
            match value_kind {
                None => value_kind = Some(kind),
                Some(k) if k != kind => {
                    return Err(CodecError::unsupported(
                        &name,
                        "enumerations must have a consistent member value type",
                    ));
                }
                Some(_) => {}
            }
        }
        let Some(value_kind) = value_kind else {
            return Err(CodecError::unsupported(&name, "enumeration declares no members"));
        };
        for (i, (member, literal)) in members.iter().enumerate() {
            if members.values().skip(i + 1).any(|other| other == literal) {
                return Err(CodecError::unsupported(
                    &name,
                    format!("member `{member}` repeats value {literal}"),
                ));
            }
        }
        Ok(Self { name, description: None, value_kind, members })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Symbolic name of the member carrying `literal`.
    pub fn member_for(&self, literal: &Value) -> Option<&str> {
        self.members
            .iter()
            .find(|(_, v)| *v == literal)
            .map(|(k, _)| k.as_str())
    }

    pub fn value_of(&self, member: &str) -> Option<&Value> {
        self.members.get(member)
    }
}

// ----------------------------- Custom hooks -------------------------------- //

pub struct CustomDescriptor {
    pub name: String,
    pub codec: Arc<dyn CustomCodec>,
}

impl CustomDescriptor {
    pub fn new(name: impl Into<String>, codec: Arc<dyn CustomCodec>) -> Self {
        Self { name: name.into(), codec }
    }
}

impl fmt::Debug for CustomDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomDescriptor").field("name", &self.name).finish_non_exhaustive()
    }
}

// ------------------------------- Tests ------------------------------------ //
