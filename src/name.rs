//! Human-readable type names, e.g. `Dict[str, List[Person]]` or `uint16`.
//!
//! These names appear in every error message and in `describe` output.

use std::fmt;

use crate::descriptor::{Annotations, Primitive, PrimitiveKind, TypeDescriptor};

impl PrimitiveKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Null => "None",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "str",
            Self::Bytes => "bytes",
            Self::DateTime => "datetime",
            Self::Date => "date",
            Self::Time => "time",
            Self::Uuid => "UUID",
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Compact alias for a sized integer, if the annotations say nothing else.
fn sized_int_name(a: &Annotations) -> Option<&'static str> {
    if a.precision.is_some() || a.max_length.is_some() || a.range.is_some() {
        return None;
    }
    let name = match (a.signed?, a.storage?) {
        (true, 1) => "int8",
        (true, 2) => "int16",
        (true, 4) => "int32",
        (true, 8) => "int64",
        (false, 1) => "uint8",
        (false, 2) => "uint16",
        (false, 4) => "uint32",
        (false, 8) => "uint64",
        _ => return None,
    };
    Some(name)
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let a = &self.annotations;
        if a.is_empty() {
            return f.write_str(self.kind.name());
        }
        if self.kind == PrimitiveKind::Int {
            if let Some(name) = sized_int_name(a) {
                return f.write_str(name);
            }
        }
        write!(f, "Annotated[{}", self.kind)?;
        if let Some(signed) = a.signed {
            write!(f, ", Signed({signed})")?;
        }
        if let Some(bytes) = a.storage {
            write!(f, ", Storage({bytes})")?;
        }
        if let Some(p) = a.precision {
            write!(f, ", Precision({}, {})", p.significant_digits, p.decimal_digits)?;
        }
        if let Some(n) = a.max_length {
            write!(f, ", MaxLength({n})")?;
        }
        if let Some(r) = a.range {
            write!(f, ", IntegerRange({}, {})", r.minimum, r.maximum)?;
        }
        f.write_str("]")
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, head: &str, items: &[TypeDescriptor]) -> fmt::Result {
    write!(f, "{head}[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str("]")
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(p) => write!(f, "{p}"),
            Self::Optional(inner) => write!(f, "Optional[{inner}]"),
            Self::List(item) => write!(f, "List[{item}]"),
            Self::Set(member) => write!(f, "Set[{member}]"),
            Self::Dict(key, value) => write!(f, "Dict[{key}, {value}]"),
            Self::Tuple(items) => write_list(f, "Tuple", items),
            Self::Union(members) => write_list(f, "Union", members),
            Self::Enum(e) => f.write_str(&e.name),
            Self::Record(r) => f.write_str(&r.name),
            Self::Custom(c) => f.write_str(&c.name),
        }
    }
}
