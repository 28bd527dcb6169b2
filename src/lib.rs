//! Type-driven JSON codecs.
//!
//! Given a [`TypeDescriptor`], a [`Registry`] builds (once) and runs the parse
//! and generate codecs that move values between `serde_json::Value` and the
//! typed [`TypedValue`] model. Rust types take part through [`Typed`]; types
//! can also be declared in JSON documents ([`decl`]).
//!
//! ```ignore
//! let person: Person = strong_typing::json_to_object(&json!({"name": "Ada"}))?;
//! let back = strong_typing::object_to_json(&person)?;
//! ```
pub mod de;
pub mod decl;
pub mod descriptor;
pub mod error;
pub mod hooks;
pub mod key;
pub mod mapping;
pub mod name;
pub mod registry;
pub mod resolve;
pub mod ser;
pub mod value;

pub use descriptor::{
    Annotations, CustomDescriptor, EnumDescriptor, FieldDescriptor, IntegerRange, Precision, Presence, Primitive,
    PrimitiveKind, RecordDescriptor, TypeDescriptor,
};
pub use error::{CodecError, MissingReason, Result};
pub use hooks::{CustomCodec, JsonDecode, JsonEncode, unwrap_opaque};
pub use registry::{Registry, RegistryConfig, default_registry, json_to_object, object_to_json};
pub use resolve::{Bytes, EnumBuilder, RecordBuilder, Resolver, Typed};
pub use value::{EnumValue, RecordValue, TypedValue};
