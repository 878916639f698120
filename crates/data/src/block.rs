//! Column-oriented blocks and their wire codec
//!
//! A [`Block`] is an ordered set of equally sized, uniquely named columns.
//! The server's sample header for an insert is a block with zero rows that
//! still carries the full target schema.
//!
//! The codec here covers the block body: the BlockInfo tag sequence
//! followed by the column/row counts and each column's name, type
//! descriptor and bulk payload. When compression is negotiated only the
//! counts and columns are wrapped in a compressed frame; the packet tag,
//! table name and BlockInfo stay as plain bytes. The surrounding Data
//! packet framing (tag and table name) belongs to the protocol layer.

use crate::error::{DataError, Result};
use crate::parser::parse_type;
use crate::types::ColumnType;
use crate::value::{Row, Value};
use clickhouse_native_wire::{
    CompressionMethod, WireError, WireReader, WireWriter, read_compressed, write_compressed,
};
use std::io::{Cursor, Read, Write};
use std::sync::Arc;

const FIELD_IS_OVERFLOWS: u64 = 1;
const FIELD_BUCKET_NUM: u64 = 2;
const FIELD_END: u64 = 0;

const MAX_COLUMNS: u64 = 1 << 16;
const MAX_ROWS: u64 = 1 << 30;

/// Auxiliary block metadata carried on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    pub is_overflows: bool,
    pub bucket_num: i32,
}

impl Default for BlockInfo {
    fn default() -> Self {
        Self {
            is_overflows: false,
            bucket_num: -1,
        }
    }
}

impl BlockInfo {
    fn write<W: Write>(&self, writer: &mut WireWriter<W>) -> Result<()> {
        writer.write_var_uint(FIELD_IS_OVERFLOWS)?;
        writer.write_u8(u8::from(self.is_overflows))?;
        writer.write_var_uint(FIELD_BUCKET_NUM)?;
        writer.write_i32(self.bucket_num)?;
        writer.write_var_uint(FIELD_END)?;
        Ok(())
    }

    fn read<R: Read>(reader: &mut WireReader<R>) -> Result<Self> {
        let mut info = BlockInfo::default();
        loop {
            match reader.read_var_uint()? {
                FIELD_END => return Ok(info),
                FIELD_IS_OVERFLOWS => info.is_overflows = reader.read_u8()? != 0,
                FIELD_BUCKET_NUM => info.bucket_num = reader.read_i32()?,
                other => {
                    return Err(DataError::Wire(WireError::MalformedFrame(format!(
                        "unknown block-info field {}",
                        other
                    ))));
                }
            }
        }
    }
}

/// One named column of a block
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    column_type: Arc<ColumnType>,
    values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: Arc<ColumnType>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            column_type,
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> &Arc<ColumnType> {
        &self.column_type
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

/// A columnar batch of rows with its schema
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    info: BlockInfo,
    columns: Vec<Column>,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column, enforcing the block invariants: unique names and
    /// equal value counts across columns.
    pub fn append_column(
        &mut self,
        name: impl Into<String>,
        column_type: Arc<ColumnType>,
        values: Vec<Value>,
    ) -> Result<()> {
        let name = name.into();
        if self.columns.iter().any(|column| column.name == name) {
            return Err(DataError::DomainError(format!(
                "duplicate column name '{}'",
                name
            )));
        }
        if !self.columns.is_empty() && values.len() != self.row_count() {
            return Err(DataError::DomainError(format!(
                "column '{}' has {} values, block has {} rows",
                name,
                values.len(),
                self.row_count()
            )));
        }
        self.columns.push(Column::new(name, column_type, values));
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.columns
            .first()
            .map(|column| column.values.len())
            .unwrap_or(0)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Materialise one row across all columns.
    pub fn row(&self, index: usize) -> Option<Row> {
        if index >= self.row_count() {
            return None;
        }
        Some(
            self.columns
                .iter()
                .map(|column| column.values[index].clone())
                .collect(),
        )
    }

    /// A zero-row block with the same schema, as the server sends before
    /// accepting insert data.
    pub fn header(&self) -> Block {
        Block {
            info: self.info,
            columns: self
                .columns
                .iter()
                .map(|column| {
                    Column::new(
                        column.name.clone(),
                        Arc::clone(&column.column_type),
                        Vec::new(),
                    )
                })
                .collect(),
        }
    }

    /// Encode the block body, compressing the counts and columns when a
    /// method is negotiated.
    pub fn write<W: Write>(
        &self,
        writer: &mut WireWriter<W>,
        compression: Option<CompressionMethod>,
    ) -> Result<()> {
        self.info.write(writer)?;
        match compression {
            Some(method) => {
                let mut body = WireWriter::new(Vec::new());
                self.write_columns(&mut body)?;
                write_compressed(writer, method, &body.into_inner())?;
                Ok(())
            }
            None => self.write_columns(writer),
        }
    }

    fn write_columns<W: Write>(&self, writer: &mut WireWriter<W>) -> Result<()> {
        writer.write_var_uint(self.column_count() as u64)?;
        writer.write_var_uint(self.row_count() as u64)?;
        for column in &self.columns {
            writer.write_string(&column.name)?;
            writer.write_string(&column.column_type.name())?;
            column.column_type.write_column(&column.values, writer)?;
        }
        Ok(())
    }

    /// Decode a block body, decompressing the counts and columns when a
    /// method is negotiated.
    pub fn read<R: Read>(reader: &mut WireReader<R>, compressed: bool) -> Result<Block> {
        let info = BlockInfo::read(reader)?;
        let mut block = Block {
            info,
            columns: Vec::new(),
        };
        if compressed {
            let body = read_compressed(reader)?;
            let mut body_reader = WireReader::new(Cursor::new(body));
            block.read_columns(&mut body_reader)?;
        } else {
            block.read_columns(reader)?;
        }
        Ok(block)
    }

    fn read_columns<R: Read>(&mut self, reader: &mut WireReader<R>) -> Result<()> {
        let num_columns = reader.read_var_uint()?;
        let num_rows = reader.read_var_uint()?;
        if num_columns > MAX_COLUMNS || num_rows > MAX_ROWS {
            return Err(DataError::Wire(WireError::MalformedFrame(format!(
                "implausible block shape ({} columns, {} rows)",
                num_columns, num_rows
            ))));
        }
        if num_columns == 0 && num_rows != 0 {
            return Err(DataError::Wire(WireError::MalformedFrame(
                "rows without columns".to_string(),
            )));
        }
        for _ in 0..num_columns {
            let name = reader.read_string()?;
            let descriptor = reader.read_string()?;
            let column_type = parse_type(&descriptor)?;
            let values = column_type.read_column(num_rows as usize, reader)?;
            self.append_column(name, column_type, values)?;
        }
        Ok(())
    }
}
