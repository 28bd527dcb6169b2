//! Codec cache.
//!
//! A [`Registry`] owns every descriptor and codec tree it builds. Entries are
//! keyed by type identity: the Rust `TypeId` for resolved types, the `Arc`
//! address for named descriptors (the entry keeps a clone of the descriptor,
//! so the address cannot be reused while cached). Structural wrappers such as
//! `List[Person]` are rebuilt on request; only what they wrap is cached.
//!
//! Names are not keys: two declaration documents may each declare a `Person`.
//! A descriptor rebuilt at runtime is a new identity and gets its own entry,
//! which lives as long as the registry. Build descriptors once and share them.
//!
//! Construction never happens under a map lock. Two threads racing on the
//! same type may both build; `entry().or_insert()` keeps the first insert and
//! both callers get that one.

use std::any::{TypeId, type_name};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde_json::Value;

use crate::de::ParseNode;
use crate::descriptor::TypeDescriptor;
use crate::error::Result;
use crate::resolve::{Resolver, Typed};
use crate::ser::GenerateNode;
use crate::value::TypedValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Ceiling on type nesting during resolution and codec construction.
    pub max_depth: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { max_depth: 64 }
    }
}

struct Cached<N> {
    /// Keeps the keyed `Arc` alive.
    #[allow(dead_code)]
    anchor: TypeDescriptor,
    node: Arc<N>,
}

#[derive(Default)]
pub struct Registry {
    config: RegistryConfig,
    descriptors: DashMap<TypeId, TypeDescriptor>,
    parsers: DashMap<usize, Cached<ParseNode>>,
    generators: DashMap<usize, Cached<GenerateNode>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self { config, ..Self::default() }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // ----------------------------- Descriptors ----------------------------- //

    pub fn resolve<T: Typed>(&self) -> Result<TypeDescriptor> {
        Resolver::new(self).resolve::<T>()
    }

    pub(crate) fn cached_descriptor(&self, id: TypeId) -> Option<TypeDescriptor> {
        self.descriptors.get(&id).map(|d| d.clone())
    }

    /// Stores a freshly resolved descriptor unless another thread got there
    /// first; returns the one that stays.
    pub(crate) fn insert_descriptor(&self, id: TypeId, descriptor: TypeDescriptor) -> TypeDescriptor {
        self.descriptors.entry(id).or_insert(descriptor).clone()
    }

    // ------------------------------- Codecs -------------------------------- //

    pub fn parser(&self, descriptor: &TypeDescriptor) -> Result<Arc<ParseNode>> {
        self.parser_at(descriptor, 0)
    }

    pub fn generator(&self, descriptor: &TypeDescriptor) -> Result<Arc<GenerateNode>> {
        self.generator_at(descriptor, 0)
    }

    pub(crate) fn parser_at(&self, descriptor: &TypeDescriptor, depth: usize) -> Result<Arc<ParseNode>> {
        let Some(key) = descriptor.named_identity() else {
            return ParseNode::build(self, descriptor, depth).map(Arc::new);
        };
        if let Some(hit) = self.parsers.get(&key) {
            tracing::trace!(type_name = %descriptor, "parser cache hit");
            return Ok(hit.node.clone());
        }
        let node = Arc::new(ParseNode::build(self, descriptor, depth)?);
        tracing::debug!(type_name = %descriptor, "built parser");
        let cached = Cached { anchor: descriptor.clone(), node };
        Ok(self.parsers.entry(key).or_insert(cached).node.clone())
    }

    pub(crate) fn generator_at(&self, descriptor: &TypeDescriptor, depth: usize) -> Result<Arc<GenerateNode>> {
        let Some(key) = descriptor.named_identity() else {
            return GenerateNode::build(self, descriptor, depth).map(Arc::new);
        };
        if let Some(hit) = self.generators.get(&key) {
            tracing::trace!(type_name = %descriptor, "generator cache hit");
            return Ok(hit.node.clone());
        }
        let node = Arc::new(GenerateNode::build(self, descriptor, depth)?);
        tracing::debug!(type_name = %descriptor, "built generator");
        let cached = Cached { anchor: descriptor.clone(), node };
        Ok(self.generators.entry(key).or_insert(cached).node.clone())
    }

    // ------------------------------ Execution ------------------------------ //

    pub fn parse_value(&self, descriptor: &TypeDescriptor, value: &Value) -> Result<TypedValue> {
        self.parser(descriptor)?.parse(value)
    }

    pub fn generate_value(&self, descriptor: &TypeDescriptor, value: &TypedValue) -> Result<Value> {
        self.generator(descriptor)?.generate(value)
    }

    pub fn parse<T: Typed>(&self, value: &Value) -> Result<T> {
        let descriptor = self.resolve::<T>()?;
        tracing::trace!(rust_type = type_name::<T>(), "parse");
        T::from_typed(self.parse_value(&descriptor, value)?)
    }

    pub fn generate<T: Typed>(&self, value: &T) -> Result<Value> {
        let descriptor = self.resolve::<T>()?;
        tracing::trace!(rust_type = type_name::<T>(), "generate");
        self.generate_value(&descriptor, &value.to_typed())
    }
}

static DEFAULT_REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// Process-wide registry behind [`json_to_object`] and [`object_to_json`].
pub fn default_registry() -> &'static Registry {
    &DEFAULT_REGISTRY
}

/// Parses a JSON value into a `Typed` Rust value.
pub fn json_to_object<T: Typed>(value: &Value) -> Result<T> {
    DEFAULT_REGISTRY.parse::<T>(value)
}

/// Writes a `Typed` Rust value as JSON.
pub fn object_to_json<T: Typed>(value: &T) -> Result<Value> {
    DEFAULT_REGISTRY.generate::<T>(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::RecordBuilder;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn named_codecs_are_shared() {
        let registry = Registry::new();
        let person = RecordBuilder::new("Person").field("name", TypeDescriptor::string()).build();
        let a = registry.parser(&person).unwrap();
        let b = registry.parser(&person).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let list = TypeDescriptor::list(person.clone());
        let list_parser = registry.parser(&list).unwrap();
        let ParseNode::List { item, .. } = &*list_parser else {
            panic!("list node expected");
        };
        assert!(Arc::ptr_eq(item, &a));

        let g1 = registry.generator(&person).unwrap();
        let g2 = registry.generator(&person).unwrap();
        assert!(Arc::ptr_eq(&g1, &g2));
    }

    #[test]
    fn rebuilt_descriptors_get_their_own_entry() {
        let registry = Registry::new();
        let build = || RecordBuilder::new("Person").field("name", TypeDescriptor::string()).build();
        let (first, second) = (build(), build());
        let a = registry.parser(&first).unwrap();
        let b = registry.parser(&second).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &registry.parser(&first.clone()).unwrap()));
        assert_eq!(
            a.parse(&json!({"name": "x"})).unwrap(),
            b.parse(&json!({"name": "x"})).unwrap()
        );
    }

    #[test]
    fn depth_ceiling_bounds_codec_construction() {
        let mut deep = TypeDescriptor::int();
        for _ in 0..8 {
            deep = TypeDescriptor::list(deep);
        }
        let shallow = Registry::with_config(RegistryConfig { max_depth: 4 });
        assert_eq!(shallow.parser(&deep).unwrap_err().category(), "UnsupportedType");
        assert!(Registry::new().parser(&deep).is_ok());
    }

    #[test]
    fn registry_is_shareable_across_threads() {
        fn assert_sync<T: Send + Sync>() {}
        assert_sync::<Registry>();

        let registry = Arc::new(Registry::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.parse::<Vec<i64>>(&json!([i, i + 1])).unwrap())
            })
            .collect();
        for (i, h) in handles.into_iter().enumerate() {
            let i = i as i64;
            assert_eq!(h.join().unwrap(), vec![i, i + 1]);
        }
    }

    #[test]
    fn top_level_helpers() {
        let value: Vec<Option<String>> = json_to_object(&json!(["a", null])).unwrap();
        assert_eq!(value, vec![Some("a".to_owned()), None]);
        assert_eq!(object_to_json(&value).unwrap(), json!(["a", null]));
    }
}
