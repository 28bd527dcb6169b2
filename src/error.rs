use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Crate-local result type.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Longest rendering of an offending value kept in an error message.
const RECEIVED_MAX_CHARS: usize = 96;

/// Errors produced while resolving types, building codecs, and converting values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    /// The type has no representable shape (raised while building a codec).
    #[error("unsupported type `{type_name}`: {reason}")]
    UnsupportedType {
        /// Name of the offending type.
        type_name: String,
        /// Why no codec can be built.
        reason: String,
    },
    /// The value's kind disagrees with the shape the codec expects.
    #[error("type `{type_name}` expects {expected} but instead received: {received}")]
    TypeMismatch {
        /// Name of the expected type.
        type_name: String,
        /// Expected kind, e.g. "JSON `object`".
        expected: &'static str,
        /// Compact rendering of what arrived.
        received: String,
    },
    /// A required structural element is absent, an unexpected one is present,
    /// or no union member applies.
    #[error("{reason} for type `{type_name}`: {}", keys.join(", "))]
    KeyMissing {
        /// Name of the record or union type.
        type_name: String,
        /// Which structural rule failed.
        reason: MissingReason,
        /// Offending keys, or the candidate member types for a union.
        keys: Vec<String>,
    },
    /// Shape is right but the content violates a semantic rule.
    #[error("invalid value for type `{type_name}`: {reason}")]
    ValueInvalid {
        /// Name of the type being converted.
        type_name: String,
        /// What is wrong with the content.
        reason: String,
    },
}

/// Sub-classification of [`CodecError::KeyMissing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingReason {
    /// A required field is absent from the object.
    RequiredField,
    /// The object carries keys the record does not declare.
    UnknownField,
    /// No union member could be instantiated.
    NoUnionMember,
}

impl fmt::Display for MissingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequiredField => f.write_str("missing required property"),
            Self::UnknownField => f.write_str("unrecognized fields in JSON object"),
            Self::NoUnionMember => f.write_str("no member could be instantiated"),
        }
    }
}

impl CodecError {
    pub fn unsupported(type_name: impl fmt::Display, reason: impl Into<String>) -> Self {
        Self::UnsupportedType { type_name: type_name.to_string(), reason: reason.into() }
    }

    pub fn mismatch(type_name: impl fmt::Display, expected: &'static str, received: &Value) -> Self {
        Self::TypeMismatch {
            type_name: type_name.to_string(),
            expected,
            received: render_received(received),
        }
    }

    /// Mismatch on the generate side, where the offending input is a typed value.
    pub fn mismatch_typed(type_name: impl fmt::Display, expected: &'static str, received: &str) -> Self {
        Self::TypeMismatch {
            type_name: type_name.to_string(),
            expected,
            received: received.to_owned(),
        }
    }

    pub fn missing(type_name: impl fmt::Display, reason: MissingReason, keys: Vec<String>) -> Self {
        Self::KeyMissing { type_name: type_name.to_string(), reason, keys }
    }

    pub fn invalid(type_name: impl fmt::Display, reason: impl Into<String>) -> Self {
        Self::ValueInvalid { type_name: type_name.to_string(), reason: reason.into() }
    }

    /// True when an enclosing union should try its next member.
    ///
    /// `ValueInvalid` is deliberately excluded: the member matched structurally,
    /// so its validation failure is the answer.
    pub fn is_fallthrough(&self) -> bool {
        matches!(self, Self::TypeMismatch { .. } | Self::KeyMissing { .. })
    }

    /// Name of the type the error is reported against.
    pub fn type_name(&self) -> &str {
        match self {
            Self::UnsupportedType { type_name, .. }
            | Self::TypeMismatch { type_name, .. }
            | Self::KeyMissing { type_name, .. }
            | Self::ValueInvalid { type_name, .. } => type_name,
        }
    }

    /// Short category label, e.g. for test fixtures and CLI reports.
    pub fn category(&self) -> &'static str {
        match self {
            Self::UnsupportedType { .. } => "UnsupportedType",
            Self::TypeMismatch { .. } => "TypeMismatch",
            Self::KeyMissing { .. } => "KeyMissing",
            Self::ValueInvalid { .. } => "ValueInvalid",
        }
    }
}

/// Compact JSON rendering, truncated on a char boundary.
pub(crate) fn render_received(value: &Value) -> String {
    let text = value.to_string();
    if text.chars().count() <= RECEIVED_MAX_CHARS {
        return text;
    }
    let mut short: String = text.chars().take(RECEIVED_MAX_CHARS).collect();
    short.push('…');
    short
}
