//! Type Descriptor Resolver.
//!
//! Rust types opt in by implementing [`Typed`], which replaces runtime
//! reflection: `describe` classifies the type into a [`TypeDescriptor`] once,
//! and `to_typed` / `from_typed` move values in and out of the engine's
//! [`TypedValue`] model.
//!
//! Records and enumerations are declared with [`RecordBuilder`] and
//! [`EnumBuilder`]; field order is declaration order and is preserved all the
//! way to the output object's key order.
pub mod impls;

use std::any::{TypeId, type_name};
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::descriptor::{
    DecodeHook, DefaultFactory, EnumDescriptor, FieldDescriptor, Presence, RecordDescriptor, TypeDescriptor,
};
use crate::error::{CodecError, Result};
use crate::mapping::wire_name;
use crate::registry::Registry;
use crate::value::TypedValue;

pub use impls::Bytes;

pub trait Typed: Sized + 'static {
    /// Classifies the type. Called at most once per registry; constituent
    /// types are obtained through `resolver.resolve::<T>()`.
    fn describe(resolver: &mut Resolver<'_>) -> Result<TypeDescriptor>;

    fn to_typed(&self) -> TypedValue;

    fn from_typed(value: TypedValue) -> Result<Self>;
}

/// Walks `Typed::describe` calls, memoizing per `TypeId` in the registry and
/// bounding nesting depth so self-referential type graphs fail instead of
/// recursing forever.
pub struct Resolver<'r> {
    registry: &'r Registry,
    depth: usize,
}

impl<'r> Resolver<'r> {
    pub(crate) fn new(registry: &'r Registry) -> Self {
        Self { registry, depth: 0 }
    }

    pub fn resolve<T: Typed>(&mut self) -> Result<TypeDescriptor> {
        let id = TypeId::of::<T>();
        if let Some(hit) = self.registry.cached_descriptor(id) {
            return Ok(hit);
        }

        let max_depth = self.registry.config().max_depth;
        if self.depth >= max_depth {
            return Err(CodecError::unsupported(
                type_name::<T>(),
                format!("type nesting exceeds depth {max_depth} (self-referential types are not supported)"),
            ));
        }

        self.depth += 1;
        let described = T::describe(self);
        self.depth -= 1;

        let descriptor = described?;
        tracing::debug!(rust_type = type_name::<T>(), descriptor = %descriptor, "resolved type");
        Ok(self.registry.insert_descriptor(id, descriptor))
    }

    /// Starts a record declaration whose field types are Rust types.
    pub fn record(&mut self, name: impl Into<String>) -> TypedRecordBuilder<'_, 'r> {
        TypedRecordBuilder { resolver: self, inner: RecordBuilder::new(name), error: None }
    }
}

// ------------------------------- Records ----------------------------------- //

/// Declares a record from field descriptors.
pub struct RecordBuilder {
    name: String,
    description: Option<String>,
    fields: Vec<FieldDescriptor>,
    decode_hook: Option<DecodeHook>,
}

impl RecordBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), description: None, fields: Vec::new(), decode_hook: None }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Field whose presence follows its type: optional types may be absent.
    pub fn field(self, name: &str, value_type: TypeDescriptor) -> Self {
        self.field_as(name, None, value_type)
    }

    pub fn field_as(self, name: &str, alias: Option<&str>, value_type: TypeDescriptor) -> Self {
        let presence = if value_type.is_optional() { Presence::OptionalNullable } else { Presence::Required };
        self.push(name, alias, value_type, presence)
    }

    pub fn field_default(self, name: &str, value_type: TypeDescriptor, default: TypedValue) -> Self {
        self.push(name, None, value_type, Presence::DefaultValue(default))
    }

    pub fn field_factory(self, name: &str, value_type: TypeDescriptor, factory: DefaultFactory) -> Self {
        self.push(name, None, value_type, Presence::DefaultFactory(factory))
    }

    pub fn push(mut self, name: &str, alias: Option<&str>, value_type: TypeDescriptor, presence: Presence) -> Self {
        self.fields.push(FieldDescriptor {
            name: name.to_owned(),
            wire_name: wire_name(name, alias),
            value_type,
            presence,
        });
        self
    }

    /// The hook owns parsing of the whole object; unknown keys are its business.
    pub fn decode_with(mut self, hook: DecodeHook) -> Self {
        self.decode_hook = Some(hook);
        self
    }

    pub fn build(self) -> TypeDescriptor {
        TypeDescriptor::Record(Arc::new(RecordDescriptor {
            name: self.name,
            description: self.description,
            fields: self.fields,
            decode_hook: self.decode_hook,
        }))
    }
}

/// [`RecordBuilder`] whose field types come from `Typed` Rust types.
///
/// Resolution errors are held back until [`build`](Self::build) so
/// declarations read as one chain.
pub struct TypedRecordBuilder<'a, 'r> {
    resolver: &'a mut Resolver<'r>,
    inner: RecordBuilder,
    error: Option<CodecError>,
}

impl TypedRecordBuilder<'_, '_> {
    fn with_type<T: Typed>(mut self, apply: impl FnOnce(RecordBuilder, TypeDescriptor) -> RecordBuilder) -> Self {
        if self.error.is_some() {
            return self;
        }
        match self.resolver.resolve::<T>() {
            Ok(desc) => self.inner = apply(self.inner, desc),
            Err(err) => self.error = Some(err),
        }
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.inner = self.inner.description(text);
        self
    }

    pub fn field<T: Typed>(self, name: &str) -> Self {
        self.with_type::<T>(|b, desc| b.field(name, desc))
    }

    pub fn field_as<T: Typed>(self, name: &str, alias: &str) -> Self {
        self.with_type::<T>(|b, desc| b.field_as(name, Some(alias), desc))
    }

    pub fn field_default<T: Typed>(self, name: &str, default: T) -> Self {
        let default = default.to_typed();
        self.with_type::<T>(|b, desc| b.field_default(name, desc, default))
    }

    pub fn field_with<T: Typed>(self, name: &str, factory: impl Fn() -> T + Send + Sync + 'static) -> Self {
        let factory: DefaultFactory = Arc::new(move || factory().to_typed());
        self.with_type::<T>(|b, desc| b.field_factory(name, desc, factory))
    }

    pub fn decode_with(mut self, hook: DecodeHook) -> Self {
        self.inner = self.inner.decode_with(hook);
        self
    }

    pub fn build(self) -> Result<TypeDescriptor> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.inner.build()),
        }
    }
}

// -------------------------------- Enums ------------------------------------ //

pub struct EnumBuilder {
    name: String,
    description: Option<String>,
    members: IndexMap<String, Value>,
}

impl EnumBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), description: None, members: IndexMap::new() }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn member(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.members.insert(name.to_owned(), value.into());
        self
    }

    pub fn build(self) -> Result<TypeDescriptor> {
        let mut descriptor = EnumDescriptor::new(self.name, self.members)?;
        descriptor.description = self.description;
        Ok(TypeDescriptor::Enum(Arc::new(descriptor)))
    }
}

// ------------------------------- Tests ------------------------------------ //
