//! Rust types through the default registry: `json_to_object` / `object_to_json`.
use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use uuid::Uuid;

use strong_typing::{
    Bytes, CodecError, CustomDescriptor, JsonDecode, JsonEncode, MissingReason, RecordValue, Resolver, Result,
    TypeDescriptor, Typed, TypedValue, json_to_object, object_to_json, unwrap_opaque,
};

// ----- Fixtures ----- //

#[derive(Debug, Clone, PartialEq)]
struct SimpleObjectExample {
    bool_value: bool,
    int_value: i64,
    float_value: f64,
    str_value: String,
    date_value: NaiveDate,
    time_value: NaiveTime,
    datetime_value: DateTime<FixedOffset>,
    guid_value: Uuid,
}

impl Typed for SimpleObjectExample {
    fn describe(r: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        r.record("SimpleObjectExample")
            .description("A simple data class with multiple properties.")
            .field_default("bool_value", true)
            .field_default("int_value", 23_i64)
            .field_default("float_value", 4.5)
            .field_default("str_value", "string".to_owned())
            .field::<NaiveDate>("date_value")
            .field::<NaiveTime>("time_value")
            .field::<DateTime<FixedOffset>>("datetime_value")
            .field::<Uuid>("guid_value")
            .build()
    }

    fn to_typed(&self) -> TypedValue {
        TypedValue::Record(
            RecordValue::new("SimpleObjectExample")
                .with("bool_value", &self.bool_value)
                .with("int_value", &self.int_value)
                .with("float_value", &self.float_value)
                .with("str_value", &self.str_value)
                .with("date_value", &self.date_value)
                .with("time_value", &self.time_value)
                .with("datetime_value", &self.datetime_value)
                .with("guid_value", &self.guid_value),
        )
    }

    fn from_typed(value: TypedValue) -> Result<Self> {
        let mut r = RecordValue::expect(value, "SimpleObjectExample")?;
        Ok(Self {
            bool_value: r.take("bool_value")?,
            int_value: r.take("int_value")?,
            float_value: r.take("float_value")?,
            str_value: r.take("str_value")?,
            date_value: r.take("date_value")?,
            time_value: r.take("time_value")?,
            datetime_value: r.take("datetime_value")?,
            guid_value: r.take("guid_value")?,
        })
    }
}

/// Keyword and aliased wire names.
#[derive(Debug, Clone, PartialEq)]
struct Tagged {
    type_: String,
    label: String,
    note: Option<String>,
}

impl Typed for Tagged {
    fn describe(r: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        r.record("Tagged")
            .field::<String>("type_")
            .field_as::<String>("label", "display-name")
            .field::<Option<String>>("note")
            .build()
    }

    fn to_typed(&self) -> TypedValue {
        TypedValue::Record(
            RecordValue::new("Tagged")
                .with("type_", &self.type_)
                .with("label", &self.label)
                .with("note", &self.note),
        )
    }

    fn from_typed(value: TypedValue) -> Result<Self> {
        let mut r = RecordValue::expect(value, "Tagged")?;
        Ok(Self { type_: r.take("type_")?, label: r.take("label")?, note: r.take("note")? })
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Circle {
    radius: f64,
}

#[derive(Debug, Clone, PartialEq)]
struct Square {
    side: f64,
}

/// Data-carrying enum written as a union of disjoint records.
#[derive(Debug, Clone, PartialEq)]
enum Shape {
    Circle(Circle),
    Square(Square),
}

impl Typed for Circle {
    fn describe(r: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        r.record("Circle").field::<f64>("radius").build()
    }
    fn to_typed(&self) -> TypedValue {
        TypedValue::Record(RecordValue::new("Circle").with("radius", &self.radius))
    }
    fn from_typed(value: TypedValue) -> Result<Self> {
        let mut r = RecordValue::expect(value, "Circle")?;
        Ok(Self { radius: r.take("radius")? })
    }
}

impl Typed for Square {
    fn describe(r: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        r.record("Square").field::<f64>("side").build()
    }
    fn to_typed(&self) -> TypedValue {
        TypedValue::Record(RecordValue::new("Square").with("side", &self.side))
    }
    fn from_typed(value: TypedValue) -> Result<Self> {
        let mut r = RecordValue::expect(value, "Square")?;
        Ok(Self { side: r.take("side")? })
    }
}

impl Typed for Shape {
    fn describe(r: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        TypeDescriptor::union([r.resolve::<Circle>()?, r.resolve::<Square>()?])
    }
    fn to_typed(&self) -> TypedValue {
        match self {
            Shape::Circle(c) => c.to_typed(),
            Shape::Square(s) => s.to_typed(),
        }
    }
    fn from_typed(value: TypedValue) -> Result<Self> {
        let name = value.type_name().unwrap_or_default().to_owned();
        match name.as_str() {
            "Circle" => Circle::from_typed(value).map(Shape::Circle),
            "Square" => Square::from_typed(value).map(Shape::Square),
            _ => Err(CodecError::mismatch_typed("Shape", "a `Circle` or `Square` record", value.kind_name())),
        }
    }
}

/// Identifier that owns its JSON form.
#[derive(Debug, Clone, PartialEq)]
struct Uid(String);

impl JsonEncode for Uid {
    fn to_json(&self) -> Result<Value> {
        Ok(Value::String(self.0.clone()))
    }
}

impl JsonDecode for Uid {
    fn from_json(value: &Value) -> Result<Self> {
        let text = value.as_str().ok_or_else(|| CodecError::mismatch("UID", "JSON `string`", value))?;
        if !text.split('.').all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit())) {
            return Err(CodecError::invalid("UID", format!("`{text}` is not a dotted numeric identifier")));
        }
        Ok(Uid(text.to_owned()))
    }
}

impl Typed for Uid {
    fn describe(_: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::custom(CustomDescriptor::from_hooks::<Uid>("UID")))
    }
    fn to_typed(&self) -> TypedValue {
        TypedValue::opaque(self.clone())
    }
    fn from_typed(value: TypedValue) -> Result<Self> {
        unwrap_opaque(value, "UID")
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Study {
    uid: Uid,
    series: Vec<Uid>,
}

impl Typed for Study {
    fn describe(r: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        r.record("Study").field::<Uid>("uid").field_with("series", Vec::<Uid>::new).build()
    }
    fn to_typed(&self) -> TypedValue {
        TypedValue::Record(RecordValue::new("Study").with("uid", &self.uid).with("series", &self.series))
    }
    fn from_typed(value: TypedValue) -> Result<Self> {
        let mut r = RecordValue::expect(value, "Study")?;
        Ok(Self { uid: r.take("uid")?, series: r.take("series")? })
    }
}

fn simple_object_json() -> Value {
    json!({
        "bool_value": false,
        "int_value": 7,
        "float_value": 0.25,
        "str_value": "text",
        "date_value": "1970-01-01",
        "time_value": "06:15:30",
        "datetime_value": "1989-10-23T01:02:03+02:00",
        "guid_value": "f81d4fae-7dec-11d0-a765-00a0c91e6bf6"
    })
}

// ----- Records ----- //

#[test]
fn simple_object_round_trips() {
    let parsed: SimpleObjectExample = json_to_object(&simple_object_json()).unwrap();
    assert_eq!(parsed.int_value, 7);
    assert_eq!(parsed.datetime_value.offset().local_minus_utc(), 2 * 3600);
    assert_eq!(parsed.guid_value, Uuid::parse_str("f81d4fae-7dec-11d0-a765-00a0c91e6bf6").unwrap());
    assert_eq!(object_to_json(&parsed).unwrap(), simple_object_json());
}

#[test]
fn defaults_fill_missing_fields() {
    let parsed: SimpleObjectExample = json_to_object(&json!({
        "date_value": "1970-01-01",
        "time_value": "06:15:30",
        "datetime_value": "1989-10-23T01:02:03Z",
        "guid_value": "f81d4fae-7dec-11d0-a765-00a0c91e6bf6"
    }))
    .unwrap();
    assert!(parsed.bool_value);
    assert_eq!(parsed.int_value, 23);
    assert_eq!(parsed.float_value, 4.5);
    assert_eq!(parsed.str_value, "string");
}

#[test]
fn output_keys_follow_declaration_order() {
    let parsed: SimpleObjectExample = json_to_object(&json!({
        "guid_value": "f81d4fae-7dec-11d0-a765-00a0c91e6bf6",
        "datetime_value": "1989-10-23T01:02:03Z",
        "time_value": "06:15:30",
        "date_value": "1970-01-01"
    }))
    .unwrap();
    let out = object_to_json(&parsed).unwrap();
    let keys: Vec<_> = out.as_object().unwrap().keys().cloned().collect();
    assert_eq!(
        keys,
        [
            "bool_value",
            "int_value",
            "float_value",
            "str_value",
            "date_value",
            "time_value",
            "datetime_value",
            "guid_value"
        ]
    );
}

#[test]
fn wrong_field_kind_is_a_mismatch() {
    let mut input = simple_object_json();
    input["bool_value"] = json!(23);
    let err = json_to_object::<SimpleObjectExample>(&input).unwrap_err();
    assert_eq!(err.to_string(), "type `bool` expects JSON `boolean` but instead received: 23");
}

#[test]
fn keyword_and_alias_wire_names() {
    let input = json!({"type": "a", "display-name": "Label"});
    let parsed: Tagged = json_to_object(&input).unwrap();
    assert_eq!(parsed, Tagged { type_: "a".into(), label: "Label".into(), note: None });
    assert_eq!(object_to_json(&parsed).unwrap(), input);
}

#[test]
fn optional_field_null_reads_as_none() {
    let parsed: Tagged = json_to_object(&json!({"type": "a", "display-name": "b", "note": null})).unwrap();
    assert_eq!(parsed.note, None);
    let with_note = Tagged { note: Some("n".into()), ..parsed };
    assert_eq!(object_to_json(&with_note).unwrap(), json!({"type": "a", "display-name": "b", "note": "n"}));
}

#[test]
fn required_fields_are_reported_by_wire_name() {
    let err = json_to_object::<Tagged>(&json!({"note": "n"})).unwrap_err();
    assert_eq!(
        err,
        CodecError::missing("Tagged", MissingReason::RequiredField, vec!["type".into(), "display-name".into()])
    );
}

#[test]
fn unknown_fields_are_rejected() {
    let err = json_to_object::<Tagged>(&json!({"type": "a", "display-name": "b", "type_": "c"})).unwrap_err();
    assert_eq!(err, CodecError::missing("Tagged", MissingReason::UnknownField, vec!["type_".into()]));
}

// ----- Primitives and containers ----- //

#[test]
fn bytes_travel_as_base64() {
    let parsed: Bytes = json_to_object(&json!("QU4=")).unwrap();
    assert_eq!(parsed, Bytes(b"AN".to_vec()));
    assert_eq!(object_to_json(&parsed).unwrap(), json!("QU4="));
}

#[test]
fn utc_timestamps_are_written_with_zulu() {
    let parsed: DateTime<Utc> = json_to_object(&json!("1989-10-23T01:02:03+00:00")).unwrap();
    assert_eq!(object_to_json(&parsed).unwrap(), json!("1989-10-23T01:02:03Z"));
}

#[test]
fn naive_timestamps_are_rejected() {
    let err = json_to_object::<DateTime<Utc>>(&json!("1989-10-23T01:02:03")).unwrap_err();
    assert_eq!(err.category(), "ValueInvalid");
}

#[test]
fn tuple_length_must_match() {
    let ok: (bool, i64, String) = json_to_object(&json!([true, 1, "a"])).unwrap();
    assert_eq!(ok, (true, 1, "a".to_owned()));
    let err = json_to_object::<(bool, i64, String)>(&json!([true, 1, "a", 2])).unwrap_err();
    assert_eq!(err.category(), "ValueInvalid");
}

#[test]
fn list_rejects_object() {
    let err = json_to_object::<Vec<i64>>(&json!({"a": 1})).unwrap_err();
    assert_eq!(err.to_string(), "type `List[int64]` expects JSON `array` but instead received: {\"a\":1}");
}

#[test]
fn sized_integers_check_range() {
    assert_eq!(json_to_object::<u8>(&json!(255)).unwrap(), 255);
    assert_eq!(json_to_object::<u8>(&json!(256)).unwrap_err().category(), "ValueInvalid");
}

#[test]
fn integral_floats_read_as_integers() {
    assert_eq!(json_to_object::<i64>(&json!(2.0)).unwrap(), 2);
    assert_eq!(json_to_object::<i64>(&json!(-9_223_372_036_854_775_808.0)).unwrap(), i64::MIN);
    assert_eq!(json_to_object::<Option<i64>>(&json!(7.0)).unwrap(), Some(7));
    assert_eq!(object_to_json(&json_to_object::<u32>(&json!(4.0)).unwrap()).unwrap(), json!(4));
}

#[test]
fn floats_outside_the_integer_range_are_rejected() {
    for input in [json!(1e300), json!(-1e40), json!(18_446_744_073_709_551_616.0), json!(2.5), json!(-0.5)] {
        let err = json_to_object::<i64>(&input).unwrap_err();
        assert_eq!(err.category(), "TypeMismatch", "{input}");
        assert_eq!(
            err.to_string(),
            format!("type `int64` expects an integral JSON `number` but instead received: {input}")
        );
    }
    // within the JSON integer range but not the Rust type's
    assert_eq!(json_to_object::<u8>(&json!(1e19)).unwrap_err().category(), "ValueInvalid");
}

#[test]
fn integer_keyed_maps() {
    let map: BTreeMap<i64, String> = json_to_object(&json!({"2": "two", "1": "one"})).unwrap();
    assert_eq!(map.keys().copied().collect::<Vec<_>>(), [1, 2]);
    assert_eq!(object_to_json(&map).unwrap(), json!({"1": "one", "2": "two"}));
}

// ----- Unions ----- //

#[test]
fn union_picks_the_matching_record() {
    let circle: Shape = json_to_object(&json!({"radius": 1.5})).unwrap();
    assert_eq!(circle, Shape::Circle(Circle { radius: 1.5 }));
    let square: Shape = json_to_object(&json!({"side": 2.0})).unwrap();
    assert_eq!(square, Shape::Square(Square { side: 2.0 }));
    assert_eq!(object_to_json(&square).unwrap(), json!({"side": 2.0}));
}

#[test]
fn union_without_a_match_names_its_members() {
    let err = json_to_object::<Shape>(&json!({"width": 1.0})).unwrap_err();
    assert_eq!(
        err,
        CodecError::missing(
            "Union[Circle, Square]",
            MissingReason::NoUnionMember,
            vec!["Circle".into(), "Square".into()]
        )
    );
}

#[test]
fn list_of_unions() {
    let input = json!([{"radius": 1.0}, {"side": 3.0}]);
    let shapes: Vec<Shape> = json_to_object(&input).unwrap();
    assert_eq!(shapes.len(), 2);
    assert_eq!(object_to_json(&shapes).unwrap(), input);
}

// ----- Custom hooks ----- //

#[test]
fn custom_hooks_own_the_wire_form() {
    let input = json!({"uid": "1.2.840.10008", "series": ["1.2.3"]});
    let study: Study = json_to_object(&input).unwrap();
    assert_eq!(study.uid, Uid("1.2.840.10008".into()));
    assert_eq!(object_to_json(&study).unwrap(), input);
}

#[test]
fn custom_hook_errors_propagate() {
    let err = json_to_object::<Study>(&json!({"uid": "1.x.3"})).unwrap_err();
    assert_eq!(err.category(), "ValueInvalid");
    let err = json_to_object::<Study>(&json!({"uid": 5})).unwrap_err();
    assert_eq!(err.category(), "TypeMismatch");
}

#[test]
fn default_factory_fills_missing_field() {
    let study: Study = json_to_object(&json!({"uid": "1.2"})).unwrap();
    assert!(study.series.is_empty());
}
