//! Logical values, column types and the columnar block model
//!
//! This crate provides the data layer of the native protocol:
//! - [`Value`], the logical value shape handed to and returned from columns;
//! - [`ColumnType`], the capability object for a single column type, with
//!   binary single-value, binary bulk and text-quoted operations;
//! - the type-descriptor lexer and parser with its process-wide registry
//!   (`Array(Nullable(FixedString(3)))` and friends);
//! - [`Block`], the column-oriented batch of rows, and its wire codec.

pub mod block;
pub mod column;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod types;
pub mod value;

pub use block::{Block, BlockInfo, Column};
pub use error::{DataError, Result};
pub use lexer::{QuotedLexer, QuotedToken};
pub use parser::parse_type;
pub use types::{ColumnType, SqlType};
pub use value::{Row, Value};
