//! User-supplied conversion hooks.
//!
//! A type that knows its own interchange form implements [`JsonEncode`] and
//! [`JsonDecode`]; [`CustomDescriptor::from_hooks`] wraps it so the engines
//! defer to it in both directions without introspecting further. Dynamic
//! callers can implement [`CustomCodec`] directly.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;

use crate::descriptor::CustomDescriptor;
use crate::error::{CodecError, Result};
use crate::value::TypedValue;

pub trait CustomCodec: Send + Sync {
    fn decode(&self, value: &Value) -> Result<TypedValue>;

    fn encode(&self, value: &TypedValue) -> Result<Value>;

    /// Whether a runtime value belongs to this codec; consulted when a union
    /// picks the member to write with.
    fn accepts(&self, value: &TypedValue) -> bool {
        let _ = value;
        true
    }
}

/// Capability: the type writes its own interchange value.
pub trait JsonEncode {
    fn to_json(&self) -> Result<Value>;
}

/// Capability: the type reads itself from an interchange value.
pub trait JsonDecode: Sized {
    fn from_json(value: &Value) -> Result<Self>;
}

/// Adapts a `JsonEncode + JsonDecode` type; values travel as [`TypedValue::Opaque`].
pub struct HookCodec<T> {
    name: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> HookCodec<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), _marker: PhantomData }
    }
}

impl<T> CustomCodec for HookCodec<T>
where
    T: JsonEncode + JsonDecode + Any + fmt::Debug + PartialEq + Send + Sync,
{
    fn decode(&self, value: &Value) -> Result<TypedValue> {
        T::from_json(value).map(TypedValue::opaque)
    }

    fn encode(&self, value: &TypedValue) -> Result<Value> {
        match value {
            TypedValue::Opaque(o) => match o.downcast_ref::<T>() {
                Some(v) => v.to_json(),
                None => Err(CodecError::mismatch_typed(&self.name, "an opaque value of this type", o.type_name())),
            },
            other => Err(other.unexpected(&self.name, "an opaque value")),
        }
    }

    fn accepts(&self, value: &TypedValue) -> bool {
        matches!(value, TypedValue::Opaque(o) if o.is::<T>())
    }
}

impl CustomDescriptor {
    pub fn from_hooks<T>(name: impl Into<String>) -> Self
    where
        T: JsonEncode + JsonDecode + Any + fmt::Debug + PartialEq + Send + Sync,
    {
        let name = name.into();
        let codec: Arc<dyn CustomCodec> = Arc::new(HookCodec::<T>::new(name.clone()));
        Self::new(name, codec)
    }
}

/// Recovers a hook-owned Rust value from its typed form.
pub fn unwrap_opaque<T: Any + Clone>(value: TypedValue, type_name: &str) -> Result<T> {
    match value {
        TypedValue::Opaque(o) => o
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| CodecError::mismatch_typed(type_name, "an opaque value of this type", o.type_name())),
        TypedValue::Absent => Err(CodecError::invalid(type_name, "value is absent")),
        other => Err(other.unexpected(type_name, "an opaque value")),
    }
}
