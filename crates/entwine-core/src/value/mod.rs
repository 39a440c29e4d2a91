//! Module: value
//! Responsibility: the closed dynamic-value vocabulary entities expose
//! through field accessors, plus kind tags and canonical text forms.
//! Does not own: field metadata, wire encoding, or relation handles.


use indexmap::IndexMap;
use serde::Serialize;
use std::fmt::{self, Display};
use thiserror::Error as ThisError;
use ulid::Ulid;

///
/// ValueMap
///
/// Ordered field-name → value map. Insertion order is preserved so key
/// ordinals and declared field order survive a round-trip.
///

pub type ValueMap = IndexMap<String, Value>;

///
/// ValueParseError
///

#[derive(Debug, ThisError)]
pub enum ValueParseError {
    #[error("cannot parse '{text}' as {kind}")]
    Unparseable { kind: ValueKind, text: String },

    #[error("{tag} has no canonical text form")]
    NoTextForm { tag: &'static str },
}

///
/// ValueKind
///
/// Declared type tag for a field. `List` nests its element kind; maps
/// appear only in generic decode output and are never a declared kind.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize)]
pub enum ValueKind {
    Blob,
    Bool,
    Float,
    Int,
    List(Box<ValueKind>),
    Text,
    Uint,
    Ulid,
}

impl ValueKind {
    /// Whether a runtime value is acceptable for this declared kind.
    ///
    /// `Null` is always admitted here; nullability is a separate field
    /// property enforced by the catalog and the serializer.
    #[must_use]
    pub fn admits(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (Self::Blob, Value::Blob(_))
            | (Self::Bool, Value::Bool(_))
            | (Self::Float, Value::Float(_))
            | (Self::Int, Value::Int(_))
            | (Self::Text, Value::Text(_))
            | (Self::Uint, Value::Uint(_))
            | (Self::Ulid, Value::Ulid(_)) => true,
            (Self::List(elem), Value::List(items)) => items.iter().all(|v| elem.admits(v)),
            _ => false,
        }
    }
}

impl Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blob => f.write_str("blob"),
            Self::Bool => f.write_str("bool"),
            Self::Float => f.write_str("float"),
            Self::Int => f.write_str("int"),
            Self::List(elem) => write!(f, "list<{elem}>"),
            Self::Text => f.write_str("text"),
            Self::Uint => f.write_str("uint"),
            Self::Ulid => f.write_str("ulid"),
        }
    }
}

///
/// Value
///
/// Null → the field's value is absent (Option::None on the entity).
/// Map  → generic decode output only; fields never declare a map kind.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Blob(Vec<u8>),
    Bool(bool),
    Float(f64),
    Int(i64),
    List(Vec<Self>),
    Map(ValueMap),
    Null,
    Text(String),
    Uint(u64),
    Ulid(Ulid),
}

impl Value {
    /// Stable variant tag for diagnostics.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Blob(_) => "blob",
            Self::Bool(_) => "bool",
            Self::Float(_) => "float",
            Self::Int(_) => "int",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Null => "null",
            Self::Text(_) => "text",
            Self::Uint(_) => "uint",
            Self::Ulid(_) => "ulid",
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Canonical text form for scalar values.
    ///
    /// The markup codec carries every scalar as element text; this is
    /// the single place that defines the on-wire text for each kind.
    pub fn to_text(&self) -> Result<String, ValueParseError> {
        match self {
            Self::Blob(bytes) => Ok(hex_encode(bytes)),
            Self::Bool(v) => Ok(v.to_string()),
            Self::Float(v) => Ok(v.to_string()),
            Self::Int(v) => Ok(v.to_string()),
            Self::Text(v) => Ok(v.clone()),
            Self::Uint(v) => Ok(v.to_string()),
            Self::Ulid(v) => Ok(v.to_string()),
            Self::List(_) | Self::Map(_) | Self::Null => {
                Err(ValueParseError::NoTextForm { tag: self.tag() })
            }
        }
    }

    /// Parse the canonical text form back into a typed value.
    pub fn parse_text(kind: &ValueKind, text: &str) -> Result<Self, ValueParseError> {
        let unparseable = || ValueParseError::Unparseable {
            kind: kind.clone(),
            text: text.to_string(),
        };

        match kind {
            ValueKind::Blob => hex_decode(text).map(Self::Blob).ok_or_else(unparseable),
            ValueKind::Bool => match text {
                "true" => Ok(Self::Bool(true)),
                "false" => Ok(Self::Bool(false)),
                _ => Err(unparseable()),
            },
            ValueKind::Float => text.parse().map(Self::Float).map_err(|_| unparseable()),
            ValueKind::Int => text.parse().map(Self::Int).map_err(|_| unparseable()),
            ValueKind::Text => Ok(Self::Text(text.to_string())),
            ValueKind::Uint => text.parse().map(Self::Uint).map_err(|_| unparseable()),
            ValueKind::Ulid => Ulid::from_string(text)
                .map(Self::Ulid)
                .map_err(|_| unparseable()),
            ValueKind::List(_) => Err(unparseable()),
        }
    }

    /// Widen a numeric value toward a declared numeric kind where the
    /// conversion is exact. Returns the value unchanged otherwise.
    #[must_use]
    pub fn coerce_numeric(self, kind: &ValueKind) -> Self {
        match (kind, self) {
            (ValueKind::Uint, Self::Int(v)) if v >= 0 => Self::Uint(v as u64),
            (ValueKind::Int, Self::Uint(v)) if i64::try_from(v).is_ok() => Self::Int(v as i64),
            (ValueKind::Float, Self::Int(v)) => Self::Float(v as f64),
            (ValueKind::Float, Self::Uint(v)) => Self::Float(v as f64),
            (ValueKind::List(elem), Self::List(items)) => {
                Self::List(items.into_iter().map(|v| v.coerce_numeric(elem)).collect())
            }
            (_, value) => value,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_text() {
            Ok(text) => f.write_str(&text),
            Err(_) => f.write_str(self.tag()),
        }
    }
}

// ── Hex helpers for the blob text form ─────────────────

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

fn hex_decode(text: &str) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 {
        return None;
    }

    let mut out = Vec::with_capacity(text.len() / 2);
    let bytes = text.as_bytes();
    for pair in bytes.chunks_exact(2) {
        let hi = (pair[0] as char).to_digit(16)?;
        let lo = (pair[1] as char).to_digit(16)?;
        out.push(((hi << 4) | lo) as u8);
    }

    Some(out)
}
