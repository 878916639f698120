//! Insert input sources and the block-building adapter
//!
//! The insert path turns caller-supplied rows into blocks matching the
//! server's sample header. Two sources ship: [`Rows`], an in-memory vector
//! of rows, and [`ValuesInput`], which parses the literal text after an
//! INSERT statement's `VALUES (` marker with each target column's
//! text-quoted parser.

use crate::error::Result;
use clickhouse_native_data::{Block, DataError, QuotedLexer, QuotedToken, Row};

/// A source of insert rows, drawn batch by batch against the sample
/// header's schema.
pub trait RowInput {
    /// The next row, or `None` once the source is exhausted.
    fn next_row(&mut self, header: &Block) -> Result<Option<Row>>;
}

/// In-memory row source
pub struct Rows {
    rows: std::vec::IntoIter<Row>,
}

impl Rows {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: rows.into_iter(),
        }
    }
}

impl RowInput for Rows {
    fn next_row(&mut self, _header: &Block) -> Result<Option<Row>> {
        Ok(self.rows.next())
    }
}

/// Row source over the literal text following `VALUES (` in an INSERT
/// statement: `1, 'a'), (2, 'b')` for a two-column target.
pub struct ValuesInput {
    lexer: QuotedLexer,
    first_row: bool,
}

impl ValuesInput {
    /// `tail` is the statement text after the opening parenthesis of the
    /// first row.
    pub fn new(tail: &str) -> Self {
        Self {
            lexer: QuotedLexer::new(tail),
            first_row: true,
        }
    }

    fn expect(&mut self, expected: QuotedToken) -> Result<()> {
        let token = self.lexer.next_token()?;
        if token == expected {
            Ok(())
        } else {
            Err(DataError::DomainError(format!(
                "VALUES syntax: expected {}, found {}",
                expected.describe(),
                token.describe()
            ))
            .into())
        }
    }
}

impl RowInput for ValuesInput {
    fn next_row(&mut self, header: &Block) -> Result<Option<Row>> {
        if self.first_row {
            self.first_row = false;
        } else {
            match self.lexer.next_token()? {
                QuotedToken::Eof => return Ok(None),
                QuotedToken::Comma => self.expect(QuotedToken::OpeningRoundBracket)?,
                other => {
                    return Err(DataError::DomainError(format!(
                        "VALUES syntax: expected ',' between rows, found {}",
                        other.describe()
                    ))
                    .into());
                }
            }
        }

        let mut row = Vec::with_capacity(header.column_count());
        for (index, column) in header.columns().iter().enumerate() {
            if index > 0 {
                self.expect(QuotedToken::Comma)?;
            }
            row.push(column.column_type().parse_text(&mut self.lexer)?);
        }
        self.expect(QuotedToken::ClosingRoundBracket)?;
        Ok(Some(row))
    }
}

/// Draw up to `batch_size` rows from `input` and build a block matching
/// the sample header's schema. A zero-row result is the insert terminator.
pub fn next_block(
    header: &Block,
    input: &mut dyn RowInput,
    batch_size: usize,
) -> Result<Block> {
    let mut columns: Vec<Vec<clickhouse_native_data::Value>> =
        vec![Vec::new(); header.column_count()];
    let mut row_index = 0usize;

    while row_index < batch_size {
        let row = match input.next_row(header)? {
            Some(row) => row,
            None => break,
        };
        if row.len() != header.column_count() {
            return Err(DataError::DomainError(format!(
                "row {} has {} values, target table has {} columns",
                row_index,
                row.len(),
                header.column_count()
            ))
            .into());
        }
        for (column_index, (value, column)) in
            row.into_iter().zip(header.columns()).enumerate()
        {
            let coerced = column.column_type().coerce(value).map_err(|error| {
                locate_mismatch(error, column_index, row_index)
            })?;
            columns[column_index].push(coerced);
        }
        row_index += 1;
    }

    let mut block = Block::new();
    for (column, values) in header.columns().iter().zip(columns) {
        block.append_column(
            column.name(),
            std::sync::Arc::clone(column.column_type()),
            values,
        )?;
    }
    Ok(block)
}

/// Attach the failing column and row index to a coercion error.
fn locate_mismatch(error: DataError, column_index: usize, row_index: usize) -> DataError {
    match error {
        DataError::TypeMismatch { expected, found } => DataError::TypeMismatch {
            expected,
            found: format!("{} (column {}, row {})", found, column_index, row_index),
        },
        other => other,
    }
}
