use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use super::ParseNode;
use crate::descriptor::{Presence, RecordDescriptor};
use crate::error::{CodecError, MissingReason, Result};
use crate::registry::Registry;
use crate::value::{RecordValue, TypedValue};

struct FieldParser {
    name: String,
    wire_name: String,
    node: Arc<ParseNode>,
    presence: Presence,
}

/// Parses a JSON object into a record, applying each field's presence policy
/// and rejecting keys the record does not declare.
pub struct RecordParser {
    descriptor: Arc<RecordDescriptor>,
    fields: Vec<FieldParser>,
}

impl fmt::Debug for RecordParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordParser")
            .field("name", &self.descriptor.name)
            .field("fields", &self.fields.iter().map(|p| &p.wire_name).collect::<Vec<_>>())
            .finish()
    }
}

impl RecordParser {
    pub(crate) fn build(registry: &Registry, descriptor: &Arc<RecordDescriptor>, depth: usize) -> Result<Self> {
        let fields = descriptor
            .fields
            .iter()
            .map(|field| {
                Ok(FieldParser {
                    name: field.name.clone(),
                    wire_name: field.wire_name.clone(),
                    node: registry.parser_at(&field.value_type, depth + 1)?,
                    presence: field.presence.clone(),
                })
            })
            .collect::<Result<_>>()?;
        Ok(Self { descriptor: descriptor.clone(), fields })
    }

    pub fn parse(&self, value: &Value) -> Result<TypedValue> {
        let record = &self.descriptor;
        if let Some(hook) = &record.decode_hook {
            return hook(value);
        }
        let Value::Object(object) = value else {
            return Err(CodecError::mismatch(&record.name, "JSON `object`", value));
        };

        let mut fields = IndexMap::with_capacity(self.fields.len());
        let mut missing = Vec::new();
        for field in &self.fields {
            let given = object.get(&field.wire_name);
            let parsed = match (&field.presence, given) {
                // null stands in for "not given" when a default exists
                (Presence::DefaultValue(default), None | Some(Value::Null)) => default.clone(),
                (Presence::DefaultFactory(factory), None | Some(Value::Null)) => factory(),
                (_, Some(v)) => field.node.parse(v)?,
                (Presence::OptionalNullable, None) => TypedValue::Absent,
                (Presence::Required, None) => {
                    missing.push(field.wire_name.clone());
                    continue;
                }
            };
            fields.insert(field.name.clone(), parsed);
        }
        if !missing.is_empty() {
            return Err(CodecError::missing(&record.name, MissingReason::RequiredField, missing));
        }

        let unknown: Vec<String> = object
            .keys()
            .filter(|k| !self.fields.iter().any(|f| &f.wire_name == *k))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(CodecError::missing(&record.name, MissingReason::UnknownField, unknown));
        }

        Ok(TypedValue::Record(RecordValue { type_name: record.name.clone(), fields }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::TypeDescriptor;
    use crate::resolve::RecordBuilder;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn person() -> TypeDescriptor {
        RecordBuilder::new("Person")
            .field("name", TypeDescriptor::string())
            .field("age", TypeDescriptor::optional(TypeDescriptor::int()))
            .field_default("score", TypeDescriptor::float(), TypedValue::float(0.5))
            .field_factory(
                "tags",
                TypeDescriptor::list(TypeDescriptor::string()),
                Arc::new(|| TypedValue::List(Vec::new())),
            )
            .field("type_", TypeDescriptor::string())
            .build()
    }

    #[test]
    fn presence_policies() {
        let parsed = Registry::new()
            .parse_value(&person(), &json!({"name": "Ada", "type": "human", "score": null}))
            .unwrap();
        let TypedValue::Record(r) = parsed else { panic!("record expected") };
        assert_eq!(r.type_name, "Person");
        assert_eq!(
            r.fields.keys().collect::<Vec<_>>(),
            ["name", "age", "score", "tags", "type_"]
        );
        assert_eq!(r.get("age"), Some(&TypedValue::Absent));
        assert_eq!(r.get("score"), Some(&TypedValue::float(0.5)));
        assert_eq!(r.get("tags"), Some(&TypedValue::List(Vec::new())));
        assert_eq!(r.get("type_"), Some(&TypedValue::from("human")));
    }

    #[test]
    fn missing_required_fields_are_listed() {
        let err = Registry::new().parse_value(&person(), &json!({"age": 3})).unwrap_err();
        assert_eq!(
            err,
            CodecError::missing("Person", MissingReason::RequiredField, vec!["name".into(), "type".into()])
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = Registry::new()
            .parse_value(&person(), &json!({"name": "Ada", "type": "x", "extra": 1, "type_": 2}))
            .unwrap_err();
        assert_eq!(
            err,
            CodecError::missing("Person", MissingReason::UnknownField, vec!["extra".into(), "type_".into()])
        );
    }

    #[test]
    fn decode_hook_owns_the_value() {
        let stamp = RecordBuilder::new("Stamp")
            .field("seconds", TypeDescriptor::int())
            .decode_with(Arc::new(|v: &Value| -> Result<TypedValue> {
                let seconds = v.as_i64().ok_or_else(|| CodecError::mismatch("Stamp", "JSON `number`", v))?;
                Ok(TypedValue::Record(RecordValue::new("Stamp").with_value("seconds", TypedValue::from(seconds))))
            }))
            .build();
        let parsed = Registry::new().parse_value(&stamp, &json!(90)).unwrap();
        assert_eq!(
            parsed,
            TypedValue::Record(RecordValue::new("Stamp").with_value("seconds", TypedValue::Int(90)))
        );
    }
}
