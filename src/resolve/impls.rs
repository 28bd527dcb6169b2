//! `Typed` for the standard library, chrono, and uuid types.

use std::any::type_name;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::Hash;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use indexmap::IndexMap;
use uuid::Uuid;

use super::{Resolver, Typed};
use crate::descriptor::TypeDescriptor;
use crate::error::{CodecError, Result};
use crate::value::TypedValue;

/// A byte payload; travels as a base64 string.
///
/// `Vec<u8>` stays a list of small integers, so binary data needs its own type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bytes(pub Vec<u8>);

impl From<Vec<u8>> for Bytes {
    fn from(v: Vec<u8>) -> Self {
        Self(v)
    }
}

fn wrong<T>(value: TypedValue, type_name: &str, expected: &'static str) -> Result<T> {
    match value {
        TypedValue::Absent => Err(CodecError::invalid(type_name, "value is absent")),
        other => Err(other.unexpected(type_name, expected)),
    }
}

// ------------------------------- Scalars ----------------------------------- //

impl Typed for () {
    fn describe(_: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::null())
    }
    fn to_typed(&self) -> TypedValue {
        TypedValue::Null
    }
    fn from_typed(value: TypedValue) -> Result<Self> {
        match value {
            TypedValue::Null | TypedValue::Absent => Ok(()),
            other => wrong(other, "None", "a null value"),
        }
    }
}

impl Typed for bool {
    fn describe(_: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::bool())
    }
    fn to_typed(&self) -> TypedValue {
        TypedValue::Bool(*self)
    }
    fn from_typed(value: TypedValue) -> Result<Self> {
        match value {
            TypedValue::Bool(b) => Ok(b),
            other => wrong(other, "bool", "a `bool` value"),
        }
    }
}

macro_rules! impl_int {
    ($($ty:ty => $signed:expr, $storage:expr, $label:expr;)+) => {$(
        impl Typed for $ty {
            fn describe(_: &mut Resolver<'_>) -> Result<TypeDescriptor> {
                Ok(TypeDescriptor::sized_int($signed, $storage))
            }
            fn to_typed(&self) -> TypedValue {
                TypedValue::Int(i128::from(*self))
            }
            fn from_typed(value: TypedValue) -> Result<Self> {
                match value {
                    TypedValue::Int(i) => <$ty>::try_from(i)
                        .map_err(|_| CodecError::invalid($label, format!("{i} is out of range"))),
                    other => wrong(other, $label, "an `int` value"),
                }
            }
        }
    )+};
}

impl_int! {
    i8 => true, 1, "int8";
    i16 => true, 2, "int16";
    i32 => true, 4, "int32";
    i64 => true, 8, "int64";
    u8 => false, 1, "uint8";
    u16 => false, 2, "uint16";
    u32 => false, 4, "uint32";
    u64 => false, 8, "uint64";
}

impl Typed for f64 {
    fn describe(_: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::float())
    }
    fn to_typed(&self) -> TypedValue {
        TypedValue::float(*self)
    }
    fn from_typed(value: TypedValue) -> Result<Self> {
        match value {
            TypedValue::Float(f) => Ok(f.0),
            TypedValue::Int(i) => Ok(i as f64),
            other => wrong(other, "float", "a `float` value"),
        }
    }
}

impl Typed for f32 {
    fn describe(_: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::float().annotated(|a| a.storage = Some(4)))
    }
    fn to_typed(&self) -> TypedValue {
        TypedValue::float(f64::from(*self))
    }
    fn from_typed(value: TypedValue) -> Result<Self> {
        f64::from_typed(value).map(|f| f as f32)
    }
}

impl Typed for String {
    fn describe(_: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::string())
    }
    fn to_typed(&self) -> TypedValue {
        TypedValue::String(self.clone())
    }
    fn from_typed(value: TypedValue) -> Result<Self> {
        match value {
            TypedValue::String(s) => Ok(s),
            other => wrong(other, "str", "a `str` value"),
        }
    }
}

impl Typed for Bytes {
    fn describe(_: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::bytes())
    }
    fn to_typed(&self) -> TypedValue {
        TypedValue::Bytes(self.0.clone())
    }
    fn from_typed(value: TypedValue) -> Result<Self> {
        match value {
            TypedValue::Bytes(b) => Ok(Bytes(b)),
            other => wrong(other, "bytes", "a `bytes` value"),
        }
    }
}

impl Typed for Uuid {
    fn describe(_: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::uuid())
    }
    fn to_typed(&self) -> TypedValue {
        TypedValue::Uuid(*self)
    }
    fn from_typed(value: TypedValue) -> Result<Self> {
        match value {
            TypedValue::Uuid(u) => Ok(u),
            other => wrong(other, "UUID", "a `UUID` value"),
        }
    }
}

// ------------------------------- Temporal ---------------------------------- //

impl Typed for DateTime<FixedOffset> {
    fn describe(_: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::datetime())
    }
    fn to_typed(&self) -> TypedValue {
        TypedValue::DateTime(*self)
    }
    fn from_typed(value: TypedValue) -> Result<Self> {
        match value {
            TypedValue::DateTime(dt) => Ok(dt),
            other => wrong(other, "datetime", "a `datetime` value"),
        }
    }
}

impl Typed for DateTime<Utc> {
    fn describe(_: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::datetime())
    }
    fn to_typed(&self) -> TypedValue {
        TypedValue::DateTime(self.fixed_offset())
    }
    fn from_typed(value: TypedValue) -> Result<Self> {
        DateTime::<FixedOffset>::from_typed(value).map(|dt| dt.with_timezone(&Utc))
    }
}

/// A naive timestamp describes as `datetime` but cannot be generated:
/// the engine insists on an explicit offset.
impl Typed for NaiveDateTime {
    fn describe(_: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::datetime())
    }
    fn to_typed(&self) -> TypedValue {
        TypedValue::LocalDateTime(*self)
    }
    fn from_typed(value: TypedValue) -> Result<Self> {
        match value {
            TypedValue::LocalDateTime(n) => Ok(n),
            TypedValue::DateTime(dt) => Ok(dt.naive_local()),
            other => wrong(other, "datetime", "a `datetime` value"),
        }
    }
}

impl Typed for NaiveDate {
    fn describe(_: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::date())
    }
    fn to_typed(&self) -> TypedValue {
        TypedValue::Date(*self)
    }
    fn from_typed(value: TypedValue) -> Result<Self> {
        match value {
            TypedValue::Date(d) => Ok(d),
            other => wrong(other, "date", "a `date` value"),
        }
    }
}

impl Typed for NaiveTime {
    fn describe(_: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::time())
    }
    fn to_typed(&self) -> TypedValue {
        TypedValue::Time(*self)
    }
    fn from_typed(value: TypedValue) -> Result<Self> {
        match value {
            TypedValue::Time(t) => Ok(t),
            other => wrong(other, "time", "a `time` value"),
        }
    }
}

// ------------------------------ Wrappers ----------------------------------- //

impl<T: Typed> Typed for Option<T> {
    fn describe(r: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::optional(r.resolve::<T>()?))
    }
    fn to_typed(&self) -> TypedValue {
        match self {
            Some(v) => v.to_typed(),
            None => TypedValue::Absent,
        }
    }
    fn from_typed(value: TypedValue) -> Result<Self> {
        match value {
            TypedValue::Absent | TypedValue::Null => Ok(None),
            v => T::from_typed(v).map(Some),
        }
    }
}

impl<T: Typed> Typed for Box<T> {
    fn describe(r: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        r.resolve::<T>()
    }
    fn to_typed(&self) -> TypedValue {
        (**self).to_typed()
    }
    fn from_typed(value: TypedValue) -> Result<Self> {
        T::from_typed(value).map(Box::new)
    }
}

// ----------------------------- Collections --------------------------------- //

fn items_of(value: TypedValue, type_name: &str) -> Result<Vec<TypedValue>> {
    match value {
        TypedValue::List(items) => Ok(items),
        other => wrong(other, type_name, "a `list` value"),
    }
}

fn members_of(value: TypedValue, type_name: &str) -> Result<Vec<TypedValue>> {
    match value {
        TypedValue::Set(items) => Ok(items),
        other => wrong(other, type_name, "a `set` value"),
    }
}

fn entries_of(value: TypedValue, type_name: &str) -> Result<Vec<(TypedValue, TypedValue)>> {
    match value {
        TypedValue::Dict(entries) => Ok(entries),
        other => wrong(other, type_name, "a `dict` value"),
    }
}

impl<T: Typed> Typed for Vec<T> {
    fn describe(r: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::list(r.resolve::<T>()?))
    }
    fn to_typed(&self) -> TypedValue {
        TypedValue::List(self.iter().map(Typed::to_typed).collect())
    }
    fn from_typed(value: TypedValue) -> Result<Self> {
        items_of(value, type_name::<Self>())?.into_iter().map(T::from_typed).collect()
    }
}

impl<T: Typed> Typed for VecDeque<T> {
    fn describe(r: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::list(r.resolve::<T>()?))
    }
    fn to_typed(&self) -> TypedValue {
        TypedValue::List(self.iter().map(Typed::to_typed).collect())
    }
    fn from_typed(value: TypedValue) -> Result<Self> {
        items_of(value, type_name::<Self>())?.into_iter().map(T::from_typed).collect()
    }
}

impl<T: Typed + Eq + Hash> Typed for HashSet<T> {
    fn describe(r: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::set(r.resolve::<T>()?))
    }
    fn to_typed(&self) -> TypedValue {
        TypedValue::Set(self.iter().map(Typed::to_typed).collect())
    }
    fn from_typed(value: TypedValue) -> Result<Self> {
        members_of(value, type_name::<Self>())?.into_iter().map(T::from_typed).collect()
    }
}

impl<T: Typed + Ord> Typed for BTreeSet<T> {
    fn describe(r: &mut Resolver<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::set(r.resolve::<T>()?))
    }
    fn to_typed(&self) -> TypedValue {
        TypedValue::Set(self.iter().map(Typed::to_typed).collect())
    }
    fn from_typed(value: TypedValue) -> Result<Self> {
        members_of(value, type_name::<Self>())?.into_iter().map(T::from_typed).collect()
    }
}

macro_rules! impl_map {
    ($($map:ident<K: $($bound:path),+>;)+) => {$(
        impl<K: Typed $(+ $bound)+, V: Typed> Typed for $map<K, V> {
            fn describe(r: &mut Resolver<'_>) -> Result<TypeDescriptor> {
                Ok(TypeDescriptor::dict(r.resolve::<K>()?, r.resolve::<V>()?))
            }
            fn to_typed(&self) -> TypedValue {
                TypedValue::Dict(self.iter().map(|(k, v)| (k.to_typed(), v.to_typed())).collect())
            }
            fn from_typed(value: TypedValue) -> Result<Self> {
                entries_of(value, type_name::<Self>())?
                    .into_iter()
                    .map(|(k, v)| Ok((K::from_typed(k)?, V::from_typed(v)?)))
                    .collect()
            }
        }
    )+};
}

impl_map! {
    HashMap<K: Eq, Hash>;
    BTreeMap<K: Ord>;
    IndexMap<K: Eq, Hash>;
}

// ------------------------------- Tuples ------------------------------------ //

macro_rules! impl_tuple {
    ($len:expr => $($name:ident . $idx:tt),+) => {
        impl<$($name: Typed),+> Typed for ($($name,)+) {
            fn describe(r: &mut Resolver<'_>) -> Result<TypeDescriptor> {
                Ok(TypeDescriptor::tuple([$(r.resolve::<$name>()?),+]))
            }
            fn to_typed(&self) -> TypedValue {
                TypedValue::Tuple(vec![$(self.$idx.to_typed()),+])
            }
            fn from_typed(value: TypedValue) -> Result<Self> {
                match value {
                    TypedValue::Tuple(items) if items.len() == $len => {
                        let mut items = items.into_iter();
                        Ok(($($name::from_typed(items.next().unwrap_or(TypedValue::Absent))?,)+))
                    }
                    TypedValue::Tuple(items) => Err(CodecError::invalid(
                        type_name::<Self>(),
                        format!("expected a tuple of length {} but received length {}", $len, items.len()),
                    )),
                    other => wrong(other, type_name::<Self>(), "a `tuple` value"),
                }
            }
        }
    };
}

impl_tuple!(1 => A.0);
impl_tuple!(2 => A.0, B.1);
impl_tuple!(3 => A.0, B.1, C.2);
impl_tuple!(4 => A.0, B.1, C.2, D.3);
impl_tuple!(5 => A.0, B.1, C.2, D.3, E.4);
impl_tuple!(6 => A.0, B.1, C.2, D.3, E.4, F.5);
