//! Type-descriptor parser and process-wide registry
//!
//! The server describes every column with a textual descriptor such as
//! `Array(Nullable(FixedString(3)))`. Parsed types are interned in a
//! process-wide cache keyed by the descriptor string; repeated columns of
//! the same type share one `Arc<ColumnType>`.

use crate::error::{DataError, Result};
use crate::lexer::{QuotedLexer, QuotedToken};
use crate::types::ColumnType;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

static REGISTRY: OnceLock<Mutex<HashMap<String, Arc<ColumnType>>>> = OnceLock::new();

fn registry() -> &'static Mutex<HashMap<String, Arc<ColumnType>>> {
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Parse a type descriptor, returning the shared instance for it.
pub fn parse_type(descriptor: &str) -> Result<Arc<ColumnType>> {
    if let Some(cached) = registry().lock().get(descriptor) {
        return Ok(Arc::clone(cached));
    }

    let mut lexer = QuotedLexer::new(descriptor);
    let parsed = parse_inner(&mut lexer)?;
    match lexer.next_token()? {
        QuotedToken::Eof => {}
        trailing => {
            return Err(DataError::UnknownType(format!(
                "{}: trailing {}",
                descriptor,
                trailing.describe()
            )));
        }
    }

    let shared = Arc::new(parsed);
    // A racing parse of the same descriptor produced an equal type; either
    // instance is fine to keep.
    registry()
        .lock()
        .entry(descriptor.to_string())
        .or_insert_with(|| Arc::clone(&shared));
    Ok(shared)
}

fn parse_inner(lexer: &mut QuotedLexer) -> Result<ColumnType> {
    let token = lexer.next_token()?;
    let name = match token {
        QuotedToken::Identifier(name) => name,
        other => {
            return Err(DataError::UnknownType(format!(
                "expected a type name, found {}",
                other.describe()
            )));
        }
    };

    match name.as_str() {
        "UInt8" => Ok(ColumnType::UInt8),
        "UInt16" => Ok(ColumnType::UInt16),
        "UInt32" => Ok(ColumnType::UInt32),
        "UInt64" => Ok(ColumnType::UInt64),
        "Int8" => Ok(ColumnType::Int8),
        "Int16" => Ok(ColumnType::Int16),
        "Int32" => Ok(ColumnType::Int32),
        "Int64" => Ok(ColumnType::Int64),
        "Float32" => Ok(ColumnType::Float32),
        "Float64" => Ok(ColumnType::Float64),
        "String" => Ok(ColumnType::String),
        "Date" => Ok(ColumnType::Date),
        "UUID" => Ok(ColumnType::Uuid),
        "FixedString" => parse_fixed_string(lexer),
        "DateTime" => parse_date_time(lexer),
        "Enum8" => {
            let entries = parse_enum_entries(lexer, i64::from(i8::MIN), i64::from(i8::MAX))?;
            Ok(ColumnType::Enum8(
                entries.into_iter().map(|(n, v)| (n, v as i8)).collect(),
            ))
        }
        "Enum16" => {
            let entries = parse_enum_entries(lexer, i64::from(i16::MIN), i64::from(i16::MAX))?;
            Ok(ColumnType::Enum16(
                entries.into_iter().map(|(n, v)| (n, v as i16)).collect(),
            ))
        }
        "Array" => {
            expect(lexer, QuotedToken::OpeningRoundBracket)?;
            let inner = parse_inner(lexer)?;
            expect(lexer, QuotedToken::ClosingRoundBracket)?;
            Ok(ColumnType::Array(Box::new(inner)))
        }
        "Nullable" => {
            expect(lexer, QuotedToken::OpeningRoundBracket)?;
            let inner = parse_inner(lexer)?;
            expect(lexer, QuotedToken::ClosingRoundBracket)?;
            // The server rejects nullable composites; mirror that here so
            // the failure happens before any wire traffic.
            if matches!(inner, ColumnType::Nullable(_) | ColumnType::Array(_)) {
                return Err(DataError::UnknownType(format!(
                    "Nullable({}) is not a valid type",
                    inner.name()
                )));
            }
            Ok(ColumnType::Nullable(Box::new(inner)))
        }
        "Tuple" => parse_tuple(lexer),
        "Nested" => parse_nested(lexer),
        other => Err(DataError::UnknownType(other.to_string())),
    }
}

fn parse_fixed_string(lexer: &mut QuotedLexer) -> Result<ColumnType> {
    expect(lexer, QuotedToken::OpeningRoundBracket)?;
    let len = match lexer.next_token()? {
        QuotedToken::Number(text) => text.parse::<usize>().map_err(|_| {
            DataError::UnknownType(format!("invalid FixedString length {}", text))
        })?,
        other => {
            return Err(DataError::UnknownType(format!(
                "expected FixedString length, found {}",
                other.describe()
            )));
        }
    };
    expect(lexer, QuotedToken::ClosingRoundBracket)?;
    if len == 0 {
        return Err(DataError::UnknownType(
            "FixedString length must be positive".to_string(),
        ));
    }
    Ok(ColumnType::FixedString(len))
}

fn parse_date_time(lexer: &mut QuotedLexer) -> Result<ColumnType> {
    if lexer.peek()? != QuotedToken::OpeningRoundBracket {
        return Ok(ColumnType::DateTime(None));
    }
    lexer.next_token()?;
    let timezone = match lexer.next_token()? {
        QuotedToken::StringLiteral(tz) => tz,
        other => {
            return Err(DataError::UnknownType(format!(
                "expected DateTime timezone literal, found {}",
                other.describe()
            )));
        }
    };
    expect(lexer, QuotedToken::ClosingRoundBracket)?;
    Ok(ColumnType::DateTime(Some(timezone)))
}

fn parse_enum_entries(
    lexer: &mut QuotedLexer,
    min: i64,
    max: i64,
) -> Result<Vec<(String, i64)>> {
    expect(lexer, QuotedToken::OpeningRoundBracket)?;
    let mut entries: Vec<(String, i64)> = Vec::new();

    loop {
        let name = match lexer.next_token()? {
            QuotedToken::StringLiteral(name) => name,
            other => {
                return Err(DataError::UnknownType(format!(
                    "expected enum entry name, found {}",
                    other.describe()
                )));
            }
        };
        expect(lexer, QuotedToken::Equals)?;
        let value = match lexer.next_token()? {
            QuotedToken::Number(text) => text.parse::<i64>().map_err(|_| {
                DataError::UnknownType(format!("invalid enum value {}", text))
            })?,
            other => {
                return Err(DataError::UnknownType(format!(
                    "expected enum value, found {}",
                    other.describe()
                )));
            }
        };
        if value < min || value > max {
            return Err(DataError::DomainError(format!(
                "enum value {} outside [{}, {}]",
                value, min, max
            )));
        }
        if entries.iter().any(|(existing, _)| *existing == name) {
            return Err(DataError::UnknownType(format!(
                "duplicate enum entry name '{}'",
                name
            )));
        }
        entries.push((name, value));

        match lexer.next_token()? {
            QuotedToken::Comma => continue,
            QuotedToken::ClosingRoundBracket => return Ok(entries),
            other => {
                return Err(DataError::UnknownType(format!(
                    "expected ',' or ')' in enum entries, found {}",
                    other.describe()
                )));
            }
        }
    }
}

fn parse_tuple(lexer: &mut QuotedLexer) -> Result<ColumnType> {
    expect(lexer, QuotedToken::OpeningRoundBracket)?;
    let mut members = vec![parse_inner(lexer)?];
    loop {
        match lexer.next_token()? {
            QuotedToken::Comma => members.push(parse_inner(lexer)?),
            QuotedToken::ClosingRoundBracket => return Ok(ColumnType::Tuple(members)),
            other => {
                return Err(DataError::UnknownType(format!(
                    "expected ',' or ')' in tuple members, found {}",
                    other.describe()
                )));
            }
        }
    }
}

fn parse_nested(lexer: &mut QuotedLexer) -> Result<ColumnType> {
    expect(lexer, QuotedToken::OpeningRoundBracket)?;
    let mut members = Vec::new();
    loop {
        let name = match lexer.next_token()? {
            QuotedToken::Identifier(name) => name,
            other => {
                return Err(DataError::UnknownType(format!(
                    "expected nested member name, found {}",
                    other.describe()
                )));
            }
        };
        let ty = parse_inner(lexer)?;
        if members.iter().any(|(existing, _)| *existing == name) {
            return Err(DataError::UnknownType(format!(
                "duplicate nested member name '{}'",
                name
            )));
        }
        members.push((name, ty));

        match lexer.next_token()? {
            QuotedToken::Comma => continue,
            QuotedToken::ClosingRoundBracket => return Ok(ColumnType::Nested(members)),
            other => {
                return Err(DataError::UnknownType(format!(
                    "expected ',' or ')' in nested members, found {}",
                    other.describe()
                )));
            }
        }
    }
}

fn expect(lexer: &mut QuotedLexer, expected: QuotedToken) -> Result<()> {
    let token = lexer.next_token()?;
    if token == expected {
        Ok(())
    } else {
        Err(DataError::UnknownType(format!(
            "expected {}, found {}",
            expected.describe(),
            token.describe()
        )))
    }
}
