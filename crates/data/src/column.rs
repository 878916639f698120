//! Per-type column (de)serialisation
//!
//! Binary single-value and bulk operations for every [`ColumnType`], plus
//! the text-quoted literal parser used by the insert path and the value
//! coercion applied when building blocks from caller-supplied rows.
//!
//! Bulk serialisation visits composites top-down: Nullable writes its null
//! map first and delegates the full value run (defaults standing in at null
//! positions) to the inner type; Array writes cumulative u64 offsets and
//! recurses with the total inner count; Tuple writes each member's run
//! independently. Deserialisation mirrors this exactly and re-materialises
//! NULLs from the null map regardless of the placeholder bytes underneath.

use crate::error::{DataError, Result};
use crate::lexer::{QuotedLexer, QuotedToken};
use crate::types::ColumnType;
use crate::value::Value;
use chrono::{Days, NaiveDate, NaiveDateTime};
use clickhouse_native_wire::{WireReader, WireWriter};
use std::io::{Read, Write};

/// Upper bound on the flattened element count of a single array column.
const MAX_ARRAY_ELEMENTS: u64 = 1 << 32;

impl ColumnType {
    /// Serialise one value. Only defined for scalar types; composite types
    /// are bulk-only inside blocks.
    pub fn write_value<W: Write>(&self, value: &Value, writer: &mut WireWriter<W>) -> Result<()> {
        match (self, value) {
            (ColumnType::UInt8, Value::UInt8(v)) => writer.write_u8(*v)?,
            (ColumnType::UInt16, Value::UInt16(v)) => writer.write_u16(*v)?,
            (ColumnType::UInt32, Value::UInt32(v)) => writer.write_u32(*v)?,
            (ColumnType::UInt64, Value::UInt64(v)) => writer.write_u64(*v)?,
            (ColumnType::Int8, Value::Int8(v)) => writer.write_i8(*v)?,
            (ColumnType::Int16, Value::Int16(v)) => writer.write_i16(*v)?,
            (ColumnType::Int32, Value::Int32(v)) => writer.write_i32(*v)?,
            (ColumnType::Int64, Value::Int64(v)) => writer.write_i64(*v)?,
            (ColumnType::Float32, Value::Float32(v)) => writer.write_f32(*v)?,
            (ColumnType::Float64, Value::Float64(v)) => writer.write_f64(*v)?,
            (ColumnType::String, Value::String(bytes)) => writer.write_byte_string(bytes)?,
            (ColumnType::FixedString(len), Value::String(bytes)) => {
                if bytes.len() > *len {
                    return Err(DataError::DomainError(format!(
                        "value of {} bytes exceeds FixedString({})",
                        bytes.len(),
                        len
                    )));
                }
                writer.write_bytes(bytes)?;
                writer.write_bytes(&vec![0u8; len - bytes.len()])?;
            }
            (ColumnType::Date, Value::Date(date)) => {
                writer.write_u16(date_to_days(date)?)?;
            }
            (ColumnType::DateTime(_), Value::DateTime(ts)) => {
                writer.write_i32(datetime_to_seconds(ts)?)?;
            }
            (ColumnType::Uuid, Value::Uuid(uuid)) => {
                let bits = uuid.as_u128();
                writer.write_u64((bits >> 64) as u64)?;
                writer.write_u64(bits as u64)?;
            }
            (ColumnType::Enum8(entries), Value::String(name)) => {
                writer.write_i8(enum_value(entries, name)?)?;
            }
            (ColumnType::Enum16(entries), Value::String(name)) => {
                writer.write_i16(enum_value(entries, name)?)?;
            }
            (
                ColumnType::Array(_)
                | ColumnType::Nullable(_)
                | ColumnType::Tuple(_)
                | ColumnType::Nested(_),
                _,
            ) => {
                return Err(DataError::mismatch(
                    self.name(),
                    "single-value encoding of a composite type",
                ));
            }
            (_, other) => return Err(DataError::mismatch(self.name(), other.kind())),
        }
        Ok(())
    }

    /// Deserialise one value. Only defined for scalar types.
    pub fn read_value<R: Read>(&self, reader: &mut WireReader<R>) -> Result<Value> {
        match self {
            ColumnType::UInt8 => Ok(Value::UInt8(reader.read_u8()?)),
            ColumnType::UInt16 => Ok(Value::UInt16(reader.read_u16()?)),
            ColumnType::UInt32 => Ok(Value::UInt32(reader.read_u32()?)),
            ColumnType::UInt64 => Ok(Value::UInt64(reader.read_u64()?)),
            ColumnType::Int8 => Ok(Value::Int8(reader.read_i8()?)),
            ColumnType::Int16 => Ok(Value::Int16(reader.read_i16()?)),
            ColumnType::Int32 => Ok(Value::Int32(reader.read_i32()?)),
            ColumnType::Int64 => Ok(Value::Int64(reader.read_i64()?)),
            ColumnType::Float32 => Ok(Value::Float32(reader.read_f32()?)),
            ColumnType::Float64 => Ok(Value::Float64(reader.read_f64()?)),
            ColumnType::String => Ok(Value::String(reader.read_byte_string()?)),
            // Verbatim, trailing NUL padding retained.
            ColumnType::FixedString(len) => Ok(Value::String(reader.read_fixed(*len)?)),
            ColumnType::Date => {
                let days = reader.read_u16()?;
                days_to_date(days).map(Value::Date)
            }
            ColumnType::DateTime(_) => {
                let seconds = reader.read_i32()?;
                seconds_to_datetime(seconds).map(Value::DateTime)
            }
            ColumnType::Uuid => {
                let high = reader.read_u64()?;
                let low = reader.read_u64()?;
                let bits = (u128::from(high) << 64) | u128::from(low);
                Ok(Value::Uuid(uuid::Uuid::from_u128(bits)))
            }
            ColumnType::Enum8(entries) => {
                let value = reader.read_i8()?;
                enum_name(entries, value).map(Value::String)
            }
            ColumnType::Enum16(entries) => {
                let value = reader.read_i16()?;
                enum_name(entries, value).map(Value::String)
            }
            ColumnType::Array(_)
            | ColumnType::Nullable(_)
            | ColumnType::Tuple(_)
            | ColumnType::Nested(_) => Err(DataError::mismatch(
                self.name(),
                "single-value decoding of a composite type",
            )),
        }
    }

    /// Serialise a full column of values.
    pub fn write_column<W: Write>(
        &self,
        values: &[Value],
        writer: &mut WireWriter<W>,
    ) -> Result<()> {
        match self {
            ColumnType::Nullable(inner) => {
                for value in values {
                    writer.write_u8(u8::from(value.is_null()))?;
                }
                let materialised: Vec<Value> = values
                    .iter()
                    .map(|value| {
                        if value.is_null() {
                            inner.default_value()
                        } else {
                            value.clone()
                        }
                    })
                    .collect();
                inner.write_column(&materialised, writer)
            }
            ColumnType::Array(inner) => {
                let mut total = 0u64;
                for value in values {
                    let items = value
                        .as_array()
                        .ok_or_else(|| DataError::mismatch(self.name(), value.kind()))?;
                    total += items.len() as u64;
                    writer.write_u64(total)?;
                }
                let mut flattened = Vec::with_capacity(total as usize);
                for value in values {
                    if let Value::Array(items) = value {
                        flattened.extend_from_slice(items);
                    }
                }
                inner.write_column(&flattened, writer)
            }
            ColumnType::Tuple(members) => {
                let mut member_column = Vec::with_capacity(values.len());
                for (index, member) in members.iter().enumerate() {
                    member_column.clear();
                    for value in values {
                        match value {
                            Value::Tuple(fields) if fields.len() == members.len() => {
                                member_column.push(fields[index].clone());
                            }
                            other => {
                                return Err(DataError::mismatch(self.name(), other.kind()));
                            }
                        }
                    }
                    member.write_column(&member_column, writer)?;
                }
                Ok(())
            }
            ColumnType::Nested(members) => {
                ColumnType::nested_wire_type(members).write_column(values, writer)
            }
            _ => {
                for value in values {
                    self.write_value(value, writer)?;
                }
                Ok(())
            }
        }
    }

    /// Deserialise a column of `rows` values.
    pub fn read_column<R: Read>(
        &self,
        rows: usize,
        reader: &mut WireReader<R>,
    ) -> Result<Vec<Value>> {
        match self {
            ColumnType::Nullable(inner) => {
                let mut null_map = Vec::with_capacity(rows);
                for _ in 0..rows {
                    null_map.push(match reader.read_u8()? {
                        0 => false,
                        1 => true,
                        other => {
                            return Err(DataError::Wire(
                                clickhouse_native_wire::WireError::MalformedFrame(format!(
                                    "null-map byte {} is neither 0 nor 1",
                                    other
                                )),
                            ));
                        }
                    });
                }
                let inner_values = inner.read_column(rows, reader)?;
                Ok(null_map
                    .into_iter()
                    .zip(inner_values)
                    .map(|(is_null, value)| if is_null { Value::Null } else { value })
                    .collect())
            }
            ColumnType::Array(inner) => {
                let mut offsets = Vec::with_capacity(rows);
                let mut previous = 0u64;
                for _ in 0..rows {
                    let offset = reader.read_u64()?;
                    if offset < previous || offset > MAX_ARRAY_ELEMENTS {
                        return Err(DataError::Wire(
                            clickhouse_native_wire::WireError::MalformedFrame(format!(
                                "array offset {} after {} is invalid",
                                offset, previous
                            )),
                        ));
                    }
                    offsets.push(offset);
                    previous = offset;
                }
                let mut flattened = inner.read_column(previous as usize, reader)?.into_iter();
                let mut out = Vec::with_capacity(rows);
                let mut start = 0u64;
                for offset in offsets {
                    let len = (offset - start) as usize;
                    out.push(Value::Array(flattened.by_ref().take(len).collect()));
                    start = offset;
                }
                Ok(out)
            }
            ColumnType::Tuple(members) => {
                let mut columns = Vec::with_capacity(members.len());
                for member in members {
                    columns.push(member.read_column(rows, reader)?);
                }
                let mut out = Vec::with_capacity(rows);
                for row in 0..rows {
                    out.push(Value::Tuple(
                        columns.iter().map(|column| column[row].clone()).collect(),
                    ));
                }
                Ok(out)
            }
            ColumnType::Nested(members) => {
                ColumnType::nested_wire_type(members).read_column(rows, reader)
            }
            _ => (0..rows).map(|_| self.read_value(reader)).collect(),
        }
    }

    /// Parse one quoted literal into this type's logical value. Used for
    /// parameter substitution in client-side prepared inserts; blocks never
    /// go through this path.
    pub fn parse_text(&self, lexer: &mut QuotedLexer) -> Result<Value> {
        match self {
            ColumnType::UInt8
            | ColumnType::UInt16
            | ColumnType::UInt32
            | ColumnType::UInt64
            | ColumnType::Int8
            | ColumnType::Int16
            | ColumnType::Int32
            | ColumnType::Int64 => {
                let text = self.expect_number(lexer)?;
                let wide = text.parse::<i128>().map_err(|_| {
                    DataError::DomainError(format!("invalid integer literal {}", text))
                })?;
                self.integer_from(wide)
            }
            ColumnType::Float32 => {
                let text = self.expect_number(lexer)?;
                let value = text.parse::<f32>().map_err(|_| {
                    DataError::DomainError(format!("invalid float literal {}", text))
                })?;
                Ok(Value::Float32(value))
            }
            ColumnType::Float64 => {
                let text = self.expect_number(lexer)?;
                let value = text.parse::<f64>().map_err(|_| {
                    DataError::DomainError(format!("invalid float literal {}", text))
                })?;
                Ok(Value::Float64(value))
            }
            ColumnType::String => Ok(Value::String(self.expect_string(lexer)?.into_bytes())),
            ColumnType::FixedString(len) => {
                let text = self.expect_string(lexer)?;
                if text.len() > *len {
                    return Err(DataError::DomainError(format!(
                        "literal of {} bytes exceeds FixedString({})",
                        text.len(),
                        len
                    )));
                }
                Ok(Value::String(text.into_bytes()))
            }
            ColumnType::Date => {
                let text = self.expect_string(lexer)?;
                NaiveDate::parse_from_str(&text, "%Y-%m-%d")
                    .map(Value::Date)
                    .map_err(|_| DataError::DomainError(format!("invalid date literal {}", text)))
            }
            ColumnType::DateTime(_) => {
                let text = self.expect_string(lexer)?;
                NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S")
                    .map(Value::DateTime)
                    .map_err(|_| {
                        DataError::DomainError(format!("invalid datetime literal {}", text))
                    })
            }
            ColumnType::Uuid => {
                let text = self.expect_string(lexer)?;
                uuid::Uuid::parse_str(&text)
                    .map(Value::Uuid)
                    .map_err(|_| DataError::DomainError(format!("invalid UUID literal {}", text)))
            }
            ColumnType::Enum8(entries) => {
                let text = self.expect_string(lexer)?;
                enum_value(entries, text.as_bytes())?;
                Ok(Value::String(text.into_bytes()))
            }
            ColumnType::Enum16(entries) => {
                let text = self.expect_string(lexer)?;
                enum_value(entries, text.as_bytes())?;
                Ok(Value::String(text.into_bytes()))
            }
            ColumnType::Nullable(inner) => {
                if let QuotedToken::Identifier(word) = lexer.peek()? {
                    if word.eq_ignore_ascii_case("null") {
                        lexer.next_token()?;
                        return Ok(Value::Null);
                    }
                }
                inner.parse_text(lexer)
            }
            ColumnType::Array(_) | ColumnType::Tuple(_) | ColumnType::Nested(_) => Err(
                DataError::mismatch(self.name(), "quoted-literal text (composite types)"),
            ),
        }
    }

    /// Convert a caller-supplied value into this type's logical shape.
    /// Integers cross-coerce with range checks; everything else must match.
    pub fn coerce(&self, value: Value) -> Result<Value> {
        match self {
            ColumnType::UInt8
            | ColumnType::UInt16
            | ColumnType::UInt32
            | ColumnType::UInt64
            | ColumnType::Int8
            | ColumnType::Int16
            | ColumnType::Int32
            | ColumnType::Int64 => match value.integer_value() {
                Some(wide) => self.integer_from(wide),
                None => Err(DataError::mismatch(self.name(), value.kind())),
            },
            ColumnType::Float32 => match value {
                Value::Float32(v) => Ok(Value::Float32(v)),
                Value::Float64(v) => Ok(Value::Float32(v as f32)),
                other => match other.integer_value() {
                    Some(wide) => Ok(Value::Float32(wide as f32)),
                    None => Err(DataError::mismatch(self.name(), other.kind())),
                },
            },
            ColumnType::Float64 => match value {
                Value::Float64(v) => Ok(Value::Float64(v)),
                Value::Float32(v) => Ok(Value::Float64(f64::from(v))),
                other => match other.integer_value() {
                    Some(wide) => Ok(Value::Float64(wide as f64)),
                    None => Err(DataError::mismatch(self.name(), other.kind())),
                },
            },
            ColumnType::String => match value {
                Value::String(bytes) => Ok(Value::String(bytes)),
                other => Err(DataError::mismatch(self.name(), other.kind())),
            },
            ColumnType::FixedString(len) => match value {
                Value::String(bytes) if bytes.len() <= *len => Ok(Value::String(bytes)),
                Value::String(bytes) => Err(DataError::DomainError(format!(
                    "value of {} bytes exceeds FixedString({})",
                    bytes.len(),
                    len
                ))),
                other => Err(DataError::mismatch(self.name(), other.kind())),
            },
            ColumnType::Date => match value {
                Value::Date(d) => Ok(Value::Date(d)),
                other => Err(DataError::mismatch(self.name(), other.kind())),
            },
            ColumnType::DateTime(_) => match value {
                Value::DateTime(ts) => Ok(Value::DateTime(ts)),
                other => Err(DataError::mismatch(self.name(), other.kind())),
            },
            ColumnType::Uuid => match value {
                Value::Uuid(u) => Ok(Value::Uuid(u)),
                other => Err(DataError::mismatch(self.name(), other.kind())),
            },
            ColumnType::Enum8(entries) => match value {
                Value::String(name) => {
                    enum_value(entries, &name)?;
                    Ok(Value::String(name))
                }
                other => Err(DataError::mismatch(self.name(), other.kind())),
            },
            ColumnType::Enum16(entries) => match value {
                Value::String(name) => {
                    enum_value(entries, &name)?;
                    Ok(Value::String(name))
                }
                other => Err(DataError::mismatch(self.name(), other.kind())),
            },
            ColumnType::Nullable(inner) => {
                if value.is_null() {
                    Ok(Value::Null)
                } else {
                    inner.coerce(value)
                }
            }
            ColumnType::Array(inner) => match value {
                Value::Array(items) => Ok(Value::Array(
                    items
                        .into_iter()
                        .map(|item| inner.coerce(item))
                        .collect::<Result<_>>()?,
                )),
                other => Err(DataError::mismatch(self.name(), other.kind())),
            },
            ColumnType::Tuple(members) => match value {
                Value::Tuple(fields) if fields.len() == members.len() => Ok(Value::Tuple(
                    members
                        .iter()
                        .zip(fields)
                        .map(|(member, field)| member.coerce(field))
                        .collect::<Result<_>>()?,
                )),
                other => Err(DataError::mismatch(self.name(), other.kind())),
            },
            ColumnType::Nested(members) => {
                ColumnType::nested_wire_type(members).coerce(value)
            }
        }
    }

    fn integer_from(&self, wide: i128) -> Result<Value> {
        let (min, max) = match self {
            ColumnType::UInt8 => (0, i128::from(u8::MAX)),
            ColumnType::UInt16 => (0, i128::from(u16::MAX)),
            ColumnType::UInt32 => (0, i128::from(u32::MAX)),
            ColumnType::UInt64 => (0, i128::from(u64::MAX)),
            ColumnType::Int8 => (i128::from(i8::MIN), i128::from(i8::MAX)),
            ColumnType::Int16 => (i128::from(i16::MIN), i128::from(i16::MAX)),
            ColumnType::Int32 => (i128::from(i32::MIN), i128::from(i32::MAX)),
            ColumnType::Int64 => (i128::from(i64::MIN), i128::from(i64::MAX)),
            _ => return Err(DataError::mismatch(self.name(), "integer")),
        };
        if wide < min || wide > max {
            return Err(DataError::DomainError(format!(
                "{} does not fit {}",
                wide,
                self.name()
            )));
        }
        Ok(match self {
            ColumnType::UInt8 => Value::UInt8(wide as u8),
            ColumnType::UInt16 => Value::UInt16(wide as u16),
            ColumnType::UInt32 => Value::UInt32(wide as u32),
            ColumnType::UInt64 => Value::UInt64(wide as u64),
            ColumnType::Int8 => Value::Int8(wide as i8),
            ColumnType::Int16 => Value::Int16(wide as i16),
            ColumnType::Int32 => Value::Int32(wide as i32),
            _ => Value::Int64(wide as i64),
        })
    }

    fn expect_number(&self, lexer: &mut QuotedLexer) -> Result<String> {
        match lexer.next_token()? {
            QuotedToken::Number(text) => Ok(text),
            other => Err(DataError::mismatch(self.name(), other.describe())),
        }
    }

    fn expect_string(&self, lexer: &mut QuotedLexer) -> Result<String> {
        match lexer.next_token()? {
            QuotedToken::StringLiteral(text) => Ok(text),
            other => Err(DataError::mismatch(self.name(), other.describe())),
        }
    }
}

fn date_to_days(date: &NaiveDate) -> Result<u16> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    let days = date.signed_duration_since(epoch).num_days();
    u16::try_from(days)
        .map_err(|_| DataError::DomainError(format!("date {} outside the u16 day range", date)))
}

fn days_to_date(days: u16) -> Result<NaiveDate> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    epoch
        .checked_add_days(Days::new(u64::from(days)))
        .ok_or_else(|| DataError::DomainError(format!("{} days out of calendar range", days)))
}

fn datetime_to_seconds(ts: &NaiveDateTime) -> Result<i32> {
    let seconds = ts.and_utc().timestamp();
    i32::try_from(seconds).map_err(|_| {
        DataError::DomainError(format!("timestamp {} outside the i32 second range", ts))
    })
}

fn seconds_to_datetime(seconds: i32) -> Result<NaiveDateTime> {
    chrono::DateTime::from_timestamp(i64::from(seconds), 0)
        .map(|ts| ts.naive_utc())
        .ok_or_else(|| DataError::DomainError(format!("{} seconds out of range", seconds)))
}

fn enum_value<V: Copy>(entries: &[(String, V)], name: &[u8]) -> Result<V> {
    entries
        .iter()
        .find(|(entry, _)| entry.as_bytes() == name)
        .map(|(_, value)| *value)
        .ok_or_else(|| {
            DataError::EnumDomain(format!(
                "'{}' is not an enum entry",
                String::from_utf8_lossy(name)
            ))
        })
}

fn enum_name<V: Copy + PartialEq + std::fmt::Display>(
    entries: &[(String, V)],
    value: V,
) -> Result<Vec<u8>> {
    entries
        .iter()
        .find(|(_, entry)| *entry == value)
        .map(|(name, _)| name.clone().into_bytes())
        .ok_or_else(|| DataError::EnumDomain(format!("{} is not an enum discriminant", value)))
}
