//! Bulk row transports.
//!
//! A reader is bound to a schema once and then fills a caller owned [Row]
//! in place per entry, a writer is bound once and then reads rows in place.
//! Rows never hold on to the transport.

mod csv_file;
mod memory;

use std::io;

use evmix_schema::{Row, Schema, SchemaError};

pub use self::csv_file::{CsvRowReader, CsvRowWriter};
pub use self::memory::{MemoryRowReader, MemoryRowWriter};

#[derive(Debug, thiserror::Error)]
/// An error that can occur while reading or writing rows.
pub enum IoError {
    #[error("IO Error: {0}")]
    /// The underlying file could not be accessed.
    Io(#[from] io::Error),
    #[error("CSV Error: {0}")]
    /// The CSV stream is malformed.
    Csv(#[from] ::csv::Error),
    #[error("Schema Error: {0}")]
    /// A value could not be parsed into its column type.
    Schema(#[from] SchemaError),
    #[error("Column {0:?} is not present in the source")]
    /// The bound schema requires a column the source does not provide.
    MissingColumn(String),
    #[error("Entry {entry} out of range for {len} entries")]
    /// The requested entry does not exist.
    EntryOutOfRange { entry: usize, len: usize },
    #[error("Transport has not been bound to a schema")]
    /// A read or write was attempted before calling `bind`.
    Unbound,
    #[error("Record {entry} has {actual} fields, expected {expected}")]
    /// A record is shorter than the header.
    ShortRecord {
        entry: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Row has {actual} columns, writer is bound to {expected}")]
    /// The written row does not match the bound schema width.
    WidthMismatch { expected: usize, actual: usize },
}

/// A source of rows addressed by entry number.
pub trait RowReader {
    /// Resolves the columns of the schema against the source.
    ///
    /// Must be called before [RowReader::read_into].
    fn bind(&mut self, schema: &Schema) -> Result<(), IoError>;

    /// The number of entries in the source.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fills the slots of `row` with the values of the given entry.
    ///
    /// The row must have been created from the bound schema.
    fn read_into(&mut self, entry: usize, row: &mut Row) -> Result<(), IoError>;
}

/// A sink of rows.
pub trait RowWriter {
    /// Prepares the sink for rows of the given schema.
    ///
    /// Must be called before [RowWriter::write_row].
    fn bind(&mut self, schema: &Schema) -> Result<(), IoError>;

    /// Appends a row laid out as the bound schema.
    fn write_row(&mut self, row: &Row) -> Result<(), IoError>;

    /// Flushes any buffered rows.
    fn finish(&mut self) -> Result<(), IoError>;
}
