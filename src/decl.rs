//! Type declaration documents.
//!
//! Named enumerations and records declared in JSON, so descriptors can be
//! built without Rust code:
//!
//! ```json
//! { "types": {
//!     "Side":   { "kind": "enum", "values": { "LEFT": "L", "RIGHT": "R" } },
//!     "Person": { "kind": "record", "fields": [
//!         { "name": "name", "type": "str" },
//!         { "name": "side", "type": "Optional[Side]", "default": "L" } ] } } }
//! ```
//!
//! Field types are [`TypeExpr`]s and may name declared types in any order.
pub mod expr;

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::descriptor::{EnumDescriptor, Presence, TypeDescriptor};
use crate::error::{CodecError, Result};
use crate::registry::Registry;
use crate::resolve::RecordBuilder;

pub use expr::TypeExpr;

// ------------------------------- Document ---------------------------------- //

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Declarations {
    pub types: IndexMap<String, TypeDecl>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TypeDecl {
    Enum {
        #[serde(default)]
        description: Option<String>,
        values: IndexMap<String, Value>,
    },
    Record {
        #[serde(default)]
        description: Option<String>,
        fields: Vec<FieldDecl>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub type_expr: String,
    #[serde(default)]
    pub alias: Option<String>,
    /// Interchange form of the default; parsed with the field's own codec.
    #[serde(default)]
    pub default: Option<Value>,
}

/// A malformed declaration document, located by JSON path.
#[derive(Debug, Error)]
#[error("at JSON path {path} → {message}")]
pub struct DocumentError {
    pub path: String,
    pub message: String,
}

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> std::result::Result<T, DocumentError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| DocumentError {
        path: err.path().to_string(),
        message: err.into_inner().to_string(),
    })
}

impl Declarations {
    pub fn from_json_str(src: &str) -> std::result::Result<Self, DocumentError> {
        from_str_with_path(src)
    }

    /// Builds a descriptor for every declared type.
    pub fn resolve(&self, registry: &Registry) -> Result<TypeSet> {
        let mut resolver = DeclResolver { decls: self, registry, resolved: HashMap::new(), in_progress: Vec::new() };
        let mut types = IndexMap::with_capacity(self.types.len());
        for name in self.types.keys() {
            types.insert(name.clone(), resolver.named(name)?);
        }
        tracing::debug!(count = types.len(), "resolved declared types");
        Ok(TypeSet { types })
    }
}

// ------------------------------- Type set ---------------------------------- //

/// Resolved declarations, in document order.
#[derive(Debug, Clone, Default)]
pub struct TypeSet {
    types: IndexMap<String, TypeDescriptor>,
}

impl TypeSet {
    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypeDescriptor)> {
        self.types.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Resolves a type expression against the declared names,
    /// e.g. `List[Person]`.
    pub fn expr(&self, src: &str) -> Result<TypeDescriptor> {
        let expr = TypeExpr::parse(src)?;
        build_expr(&expr, &mut |name: &str| {
            self.types
                .get(name)
                .cloned()
                .ok_or_else(|| CodecError::unsupported(name, "unknown type name"))
        })
    }
}

// ------------------------------- Resolver ---------------------------------- //

fn primitive_named(name: &str) -> Option<TypeDescriptor> {
    let desc = match name {
        "None" => TypeDescriptor::null(),
        "bool" => TypeDescriptor::bool(),
        "int" => TypeDescriptor::int(),
        "int8" => TypeDescriptor::sized_int(true, 1),
        "int16" => TypeDescriptor::sized_int(true, 2),
        "int32" => TypeDescriptor::sized_int(true, 4),
        "int64" => TypeDescriptor::sized_int(true, 8),
        "uint8" => TypeDescriptor::sized_int(false, 1),
        "uint16" => TypeDescriptor::sized_int(false, 2),
        "uint32" => TypeDescriptor::sized_int(false, 4),
        "uint64" => TypeDescriptor::sized_int(false, 8),
        "float" => TypeDescriptor::float(),
        "str" => TypeDescriptor::string(),
        "bytes" => TypeDescriptor::bytes(),
        "datetime" => TypeDescriptor::datetime(),
        "date" => TypeDescriptor::date(),
        "time" => TypeDescriptor::time(),
        "UUID" => TypeDescriptor::uuid(),
        _ => return None,
    };
    Some(desc)
}

fn build_expr(
    expr: &TypeExpr,
    named: &mut dyn FnMut(&str) -> Result<TypeDescriptor>,
) -> Result<TypeDescriptor> {
    let (head, args) = match expr {
        TypeExpr::Name(name) => return primitive_named(name).map_or_else(|| named(name), Ok),
        TypeExpr::Apply { head, args } if head == "Literal" => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                let TypeExpr::Literal(value) = arg else {
                    return Err(CodecError::unsupported(expr, format!("`{arg}` is not a string or integer literal")));
                };
                values.push(value.clone());
            }
            return TypeDescriptor::literal(values);
        }
        TypeExpr::Apply { head, args } => (head.as_str(), args),
        TypeExpr::Literal(value) => {
            return Err(CodecError::unsupported(expr, format!("literal {value} outside `Literal[...]`")));
        }
    };
    let mut resolved = Vec::with_capacity(args.len());
    for arg in args {
        resolved.push(build_expr(arg, named)?);
    }
    let desc = match (head, resolved.len()) {
        ("Optional", 1) => TypeDescriptor::optional(resolved.remove(0)),
        ("List", 1) => TypeDescriptor::list(resolved.remove(0)),
        ("Set", 1) => TypeDescriptor::set(resolved.remove(0)),
        ("Dict", 2) => {
            let value = resolved.remove(1);
            TypeDescriptor::dict(resolved.remove(0), value)
        }
        ("Tuple", _) => TypeDescriptor::tuple(resolved),
        ("Union", _) => TypeDescriptor::union(resolved)?,
        ("Optional" | "List" | "Set" | "Dict", n) => {
            return Err(CodecError::unsupported(expr, format!("`{head}` does not take {n} arguments")));
        }
        _ => return Err(CodecError::unsupported(expr, format!("unknown generic `{head}`"))),
    };
    Ok(desc)
}

struct DeclResolver<'d> {
    decls: &'d Declarations,
    registry: &'d Registry,
    resolved: HashMap<String, TypeDescriptor>,
    /// Names whose declaration is being built; a repeat is a cycle.
    in_progress: Vec<String>,
}

impl DeclResolver<'_> {
    fn named(&mut self, name: &str) -> Result<TypeDescriptor> {
        if let Some(hit) = self.resolved.get(name) {
            return Ok(hit.clone());
        }
        if self.in_progress.iter().any(|n| n == name) {
            let chain = self.in_progress.join(" → ");
            return Err(CodecError::unsupported(
                name,
                format!("self-referential types are not supported ({chain} → {name})"),
            ));
        }
        let max_depth = self.registry.config().max_depth;
        if self.in_progress.len() >= max_depth {
            return Err(CodecError::unsupported(name, format!("type nesting exceeds depth {max_depth}")));
        }
        let Some(decl) = self.decls.types.get(name) else {
            return Err(CodecError::unsupported(name, "unknown type name"));
        };

        self.in_progress.push(name.to_owned());
        let built = self.declaration(name, decl);
        self.in_progress.pop();

        let desc = built?;
        self.resolved.insert(name.to_owned(), desc.clone());
        Ok(desc)
    }

    fn field_type(&mut self, src: &str) -> Result<TypeDescriptor> {
        let expr = TypeExpr::parse(src)?;
        build_expr(&expr, &mut |name: &str| self.named(name))
    }

    fn declaration(&mut self, name: &str, decl: &TypeDecl) -> Result<TypeDescriptor> {
        match decl {
            TypeDecl::Enum { description, values } => {
                let mut e = EnumDescriptor::new(name, values.clone())?;
                e.description = description.clone();
                Ok(TypeDescriptor::Enum(Arc::new(e)))
            }
            TypeDecl::Record { description, fields } => {
                let mut builder = RecordBuilder::new(name);
                if let Some(text) = description {
                    builder = builder.description(text);
                }
                for field in fields {
                    let value_type = self.field_type(&field.type_expr)?;
                    let presence = match &field.default {
                        Some(default) => {
                            let parsed = self.registry.parse_value(&value_type, default).map_err(|err| {
                                CodecError::invalid(name, format!("default of field `{}`: {err}", field.name))
                            })?;
                            Presence::DefaultValue(parsed)
                        }
                        None if value_type.is_optional() => Presence::OptionalNullable,
                        None => Presence::Required,
                    };
                    builder = builder.push(&field.name, field.alias.as_deref(), value_type, presence);
                }
                Ok(builder.build())
            }
        }
    }
}
