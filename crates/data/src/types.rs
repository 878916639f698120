//! Column types
//!
//! [`ColumnType`] is a sum type rather than a trait object: composite types
//! (Array, Nullable, Tuple, Nested) own their children by value, and the
//! bulk codecs dispatch with a plain `match`. Instances are immutable and
//! shared behind `Arc` by the parser registry.

use crate::value::Value;
use chrono::NaiveDate;

/// External type tag from the host-interface's closed set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Float,
    Double,
    Varchar,
    Date,
    Timestamp,
    Array,
    Struct,
    Other,
}

/// Capability object for a single column type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    /// Exactly N bytes on the wire, right-padded with NUL on write
    FixedString(usize),
    /// u16 days since 1970-01-01
    Date,
    /// i32 seconds since the Unix epoch; the optional timezone name is
    /// presentation-only and does not affect the wire format
    DateTime(Option<String>),
    Uuid,
    /// Symbolic names with i8 discriminants, in declaration order
    Enum8(Vec<(String, i8)>),
    /// Symbolic names with i16 discriminants, in declaration order
    Enum16(Vec<(String, i16)>),
    Array(Box<ColumnType>),
    Nullable(Box<ColumnType>),
    Tuple(Vec<ColumnType>),
    /// Wire-identical to `Array(Tuple(..))` with declared member names
    Nested(Vec<(String, ColumnType)>),
}

impl ColumnType {
    /// Canonical descriptor string. Feeding it back through the parser
    /// yields an equal type.
    pub fn name(&self) -> String {
        match self {
            ColumnType::UInt8 => "UInt8".to_string(),
            ColumnType::UInt16 => "UInt16".to_string(),
            ColumnType::UInt32 => "UInt32".to_string(),
            ColumnType::UInt64 => "UInt64".to_string(),
            ColumnType::Int8 => "Int8".to_string(),
            ColumnType::Int16 => "Int16".to_string(),
            ColumnType::Int32 => "Int32".to_string(),
            ColumnType::Int64 => "Int64".to_string(),
            ColumnType::Float32 => "Float32".to_string(),
            ColumnType::Float64 => "Float64".to_string(),
            ColumnType::String => "String".to_string(),
            ColumnType::FixedString(len) => format!("FixedString({})", len),
            ColumnType::Date => "Date".to_string(),
            ColumnType::DateTime(None) => "DateTime".to_string(),
            ColumnType::DateTime(Some(tz)) => format!("DateTime('{}')", tz),
            ColumnType::Uuid => "UUID".to_string(),
            ColumnType::Enum8(entries) => format!("Enum8({})", enum_body(entries)),
            ColumnType::Enum16(entries) => format!("Enum16({})", enum_body(entries)),
            ColumnType::Array(inner) => format!("Array({})", inner.name()),
            ColumnType::Nullable(inner) => format!("Nullable({})", inner.name()),
            ColumnType::Tuple(members) => {
                let names: Vec<_> = members.iter().map(|m| m.name()).collect();
                format!("Tuple({})", names.join(", "))
            }
            ColumnType::Nested(members) => {
                let names: Vec<_> = members
                    .iter()
                    .map(|(name, ty)| format!("{} {}", name, ty.name()))
                    .collect();
                format!("Nested({})", names.join(", "))
            }
        }
    }

    /// External type tag for the host interface.
    pub fn sql_type(&self) -> SqlType {
        match self {
            ColumnType::UInt8 | ColumnType::Int8 => SqlType::TinyInt,
            ColumnType::UInt16 | ColumnType::Int16 => SqlType::SmallInt,
            ColumnType::UInt32 | ColumnType::Int32 => SqlType::Integer,
            ColumnType::UInt64 | ColumnType::Int64 => SqlType::BigInt,
            ColumnType::Float32 => SqlType::Float,
            ColumnType::Float64 => SqlType::Double,
            ColumnType::String
            | ColumnType::FixedString(_)
            | ColumnType::Enum8(_)
            | ColumnType::Enum16(_)
            | ColumnType::Uuid => SqlType::Varchar,
            ColumnType::Date => SqlType::Date,
            ColumnType::DateTime(_) => SqlType::Timestamp,
            ColumnType::Array(_) | ColumnType::Nested(_) => SqlType::Array,
            ColumnType::Tuple(_) => SqlType::Struct,
            ColumnType::Nullable(inner) => inner.sql_type(),
        }
    }

    /// Default value of the type: zero, empty, the epoch, the first enum
    /// entry, or NULL for Nullable.
    pub fn default_value(&self) -> Value {
        match self {
            ColumnType::UInt8 => Value::UInt8(0),
            ColumnType::UInt16 => Value::UInt16(0),
            ColumnType::UInt32 => Value::UInt32(0),
            ColumnType::UInt64 => Value::UInt64(0),
            ColumnType::Int8 => Value::Int8(0),
            ColumnType::Int16 => Value::Int16(0),
            ColumnType::Int32 => Value::Int32(0),
            ColumnType::Int64 => Value::Int64(0),
            ColumnType::Float32 => Value::Float32(0.0),
            ColumnType::Float64 => Value::Float64(0.0),
            ColumnType::String => Value::String(Vec::new()),
            ColumnType::FixedString(len) => Value::String(vec![0u8; *len]),
            ColumnType::Date => Value::Date(epoch_date()),
            ColumnType::DateTime(_) => Value::DateTime(epoch_date().and_hms_opt(0, 0, 0).unwrap_or_default()),
            ColumnType::Uuid => Value::Uuid(uuid::Uuid::nil()),
            ColumnType::Enum8(entries) => first_enum_name(entries.iter().map(|(n, _)| n)),
            ColumnType::Enum16(entries) => first_enum_name(entries.iter().map(|(n, _)| n)),
            ColumnType::Array(_) | ColumnType::Nested(_) => Value::Array(Vec::new()),
            ColumnType::Nullable(_) => Value::Null,
            ColumnType::Tuple(members) => {
                Value::Tuple(members.iter().map(|m| m.default_value()).collect())
            }
        }
    }

    /// Attribute names of a record-shaped type: `_1`, `_2`, … for Tuple,
    /// the declared member names for Nested.
    pub fn attribute_names(&self) -> Option<Vec<String>> {
        match self {
            ColumnType::Tuple(members) => Some(
                (1..=members.len()).map(|index| format!("_{}", index)).collect(),
            ),
            ColumnType::Nested(members) => {
                Some(members.iter().map(|(name, _)| name.clone()).collect())
            }
            _ => None,
        }
    }

    /// The `Array(Tuple(..))` a Nested column is transferred as.
    pub(crate) fn nested_wire_type(members: &[(String, ColumnType)]) -> ColumnType {
        ColumnType::Array(Box::new(ColumnType::Tuple(
            members.iter().map(|(_, ty)| ty.clone()).collect(),
        )))
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn enum_body<V: std::fmt::Display>(entries: &[(String, V)]) -> String {
    let pairs: Vec<_> = entries
        .iter()
        .map(|(name, value)| format!("'{}' = {}", escape_quotes(name), value))
        .collect();
    pairs.join(", ")
}

fn escape_quotes(name: &str) -> String {
    name.replace('\\', "\\\\").replace('\'', "\\'")
}

fn first_enum_name<'a>(mut names: impl Iterator<Item = &'a String>) -> Value {
    match names.next() {
        Some(name) => Value::String(name.clone().into_bytes()),
        None => Value::String(Vec::new()),
    }
}

fn epoch_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}
