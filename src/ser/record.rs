use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::GenerateNode;
use crate::descriptor::RecordDescriptor;
use crate::error::{CodecError, MissingReason, Result};
use crate::registry::Registry;
use crate::value::TypedValue;

struct FieldGenerator {
    name: String,
    wire_name: String,
    node: Arc<GenerateNode>,
}

/// Writes a record's fields in declaration order under their wire names.
/// Absent fields are left out.
pub struct RecordGenerator {
    descriptor: Arc<RecordDescriptor>,
    fields: Vec<FieldGenerator>,
}

impl fmt::Debug for RecordGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordGenerator")
            .field("name", &self.descriptor.name)
            .field("fields", &self.fields.iter().map(|g| &g.wire_name).collect::<Vec<_>>())
            .finish()
    }
}

impl RecordGenerator {
    pub(crate) fn build(registry: &Registry, descriptor: &Arc<RecordDescriptor>, depth: usize) -> Result<Self> {
        let fields = descriptor
            .fields
            .iter()
            .map(|field| {
                Ok(FieldGenerator {
                    name: field.name.clone(),
                    wire_name: field.wire_name.clone(),
                    node: registry.generator_at(&field.value_type, depth + 1)?,
                })
            })
            .collect::<Result<_>>()?;
        Ok(Self { descriptor: descriptor.clone(), fields })
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn generate(&self, value: &TypedValue) -> Result<Value> {
        let name = &self.descriptor.name;
        let record = match value {
            TypedValue::Record(r) if r.type_name == *name => r,
            TypedValue::Record(r) => return Err(CodecError::mismatch_typed(name, "a record value", &r.type_name)),
            other => return Err(other.unexpected(name, "a record value")),
        };

        let undeclared: Vec<String> = record
            .fields
            .keys()
            .filter(|k| !self.fields.iter().any(|f| &f.name == *k))
            .cloned()
            .collect();
        if !undeclared.is_empty() {
            return Err(CodecError::missing(name, MissingReason::UnknownField, undeclared));
        }

        let mut object = Map::new();
        for field in &self.fields {
            match record.fields.get(&field.name) {
                None | Some(TypedValue::Absent) => {}
                Some(v) => {
                    object.insert(field.wire_name.clone(), field.node.generate(v)?);
                }
            }
        }
        Ok(Value::Object(object))
    }
}
