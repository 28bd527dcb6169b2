//! In-memory values produced by parsing and consumed by generation.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use uuid::Uuid;

use crate::error::{CodecError, Result};
use crate::resolve::Typed;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedValue {
    /// No value at all. Record fields holding this are omitted on output.
    Absent,
    Null,
    Bool(bool),
    Int(i128),
    Float(OrderedFloat<f64>),
    String(String),
    Bytes(Vec<u8>),
    DateTime(DateTime<FixedOffset>),
    /// A timestamp without offset. Representable, but never written out.
    LocalDateTime(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
    Uuid(Uuid),
    List(Vec<TypedValue>),
    /// Distinct members; order is whatever the producer gave.
    Set(Vec<TypedValue>),
    Dict(Vec<(TypedValue, TypedValue)>),
    Tuple(Vec<TypedValue>),
    Enum(EnumValue),
    Record(RecordValue),
    Opaque(Opaque),
}

impl TypedValue {
    /// Short kind label for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "str",
            Self::Bytes(_) => "bytes",
            Self::DateTime(_) => "datetime",
            Self::LocalDateTime(_) => "naive datetime",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::Uuid(_) => "UUID",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Dict(_) => "dict",
            Self::Tuple(_) => "tuple",
            Self::Enum(_) => "enum",
            Self::Record(_) => "record",
            Self::Opaque(_) => "opaque",
        }
    }

    /// Declared type name carried by enum, record, and opaque values.
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Self::Enum(e) => Some(&e.type_name),
            Self::Record(r) => Some(&r.type_name),
            Self::Opaque(o) => Some(o.type_name),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Absent or null.
    pub fn is_nothing(&self) -> bool {
        matches!(self, Self::Absent | Self::Null)
    }

    pub fn float(value: f64) -> Self {
        Self::Float(OrderedFloat(value))
    }

    pub fn opaque<T>(value: T) -> Self
    where
        T: Any + fmt::Debug + PartialEq + Send + Sync,
    {
        Self::Opaque(Opaque::new(value))
    }

    /// Describes a kind mismatch against the expected type name.
    pub(crate) fn unexpected(&self, type_name: impl fmt::Display, expected: &'static str) -> CodecError {
        CodecError::mismatch_typed(type_name, expected, self.kind_name())
    }
}

impl From<bool> for TypedValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for TypedValue {
    fn from(v: i64) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for TypedValue {
    fn from(v: f64) -> Self {
        Self::float(v)
    }
}

impl From<&str> for TypedValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for TypedValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

// -------------------------------- Enums ------------------------------------ //

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub type_name: String,
    /// Symbolic member name (not the literal value).
    pub member: String,
}

impl EnumValue {
    pub fn new(type_name: impl Into<String>, member: impl Into<String>) -> Self {
        Self { type_name: type_name.into(), member: member.into() }
    }
}

// ------------------------------- Records ----------------------------------- //

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordValue {
    pub type_name: String,
    /// Keyed by internal field name.
    pub fields: IndexMap<String, TypedValue>,
}

impl RecordValue {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self { type_name: type_name.into(), fields: IndexMap::new() }
    }

    /// Adds a field from a Rust value through its `Typed` conversion.
    pub fn with<T: Typed>(mut self, name: &str, value: &T) -> Self {
        self.fields.insert(name.to_owned(), value.to_typed());
        self
    }

    pub fn with_value(mut self, name: &str, value: TypedValue) -> Self {
        self.fields.insert(name.to_owned(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&TypedValue> {
        self.fields.get(name)
    }

    /// Removes a field and converts it; a missing field converts from `Absent`.
    pub fn take<T: Typed>(&mut self, name: &str) -> Result<T> {
        let value = self.fields.shift_remove(name).unwrap_or(TypedValue::Absent);
        T::from_typed(value).map_err(|err| match err {
            CodecError::ValueInvalid { type_name, reason } => CodecError::ValueInvalid {
                type_name,
                reason: format!("field `{}.{name}`: {reason}", self.type_name),
            },
            other => other,
        })
    }

    /// Unwraps a typed value that must be a record of the given type.
    pub fn expect(value: TypedValue, type_name: &str) -> Result<Self> {
        match value {
            TypedValue::Record(r) if r.type_name == type_name => Ok(r),
            other => Err(other.unexpected(type_name, "a record value")),
        }
    }
}

// -------------------------------- Opaque ----------------------------------- //

/// A value owned by a custom codec hook; the engines never look inside.
#[derive(Clone)]
pub struct Opaque {
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
    eq: fn(&dyn Any, &dyn Any) -> bool,
    debug: fn(&dyn Any, &mut fmt::Formatter<'_>) -> fmt::Result,
}

impl Opaque {
    pub fn new<T>(value: T) -> Self
    where
        T: Any + fmt::Debug + PartialEq + Send + Sync,
    {
        Self {
            type_name: std::any::type_name::<T>(),
            value: Arc::new(value),
            eq: opaque_eq::<T>,
            debug: opaque_debug::<T>,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

fn opaque_eq<T: Any + PartialEq>(a: &dyn Any, b: &dyn Any) -> bool {
    match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn opaque_debug<T: Any + fmt::Debug>(v: &dyn Any, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match v.downcast_ref::<T>() {
        Some(v) => v.fmt(f),
        None => f.write_str("<opaque>"),
    }
}

impl PartialEq for Opaque {
    fn eq(&self, other: &Self) -> bool {
        let a: &dyn Any = &*self.value;
        let b: &dyn Any = &*other.value;
        (self.eq)(a, b)
    }
}

impl Eq for Opaque {}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v: &dyn Any = &*self.value;
        (self.debug)(v, f)
    }
}
