use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use evmix_schema::{ColumnType, Row, Schema};
use tracing::debug;

use super::{IoError, RowReader, RowWriter};

/// A [RowReader] over a CSV document with a header line.
///
/// The whole document is loaded when opened so entries can be read in any
/// order, values are parsed into their column type when read.
pub struct CsvRowReader {
    headers: StringRecord,
    records: Vec<StringRecord>,
    bound: Option<Vec<(usize, ColumnType)>>,
}

impl CsvRowReader {
    /// Opens and loads the CSV file at the given path.
    pub fn open(path: &Path) -> Result<Self, IoError> {
        let file = File::open(path)?;
        let reader = Self::from_reader(file)?;
        debug!(path = %path.display(), entries = reader.len(), "Loaded CSV input");
        Ok(reader)
    }

    /// Loads a CSV document from any reader.
    pub fn from_reader<R: Read>(source: R) -> Result<Self, IoError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(source);

        let headers = reader.headers()?.clone();
        let records = reader.records().collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            headers,
            records,
            bound: None,
        })
    }

    /// The column names found in the header line.
    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.headers.iter()
    }
}

impl RowReader for CsvRowReader {
    fn bind(&mut self, schema: &Schema) -> Result<(), IoError> {
        let bound = schema
            .columns()
            .iter()
            .map(|column| {
                self.headers
                    .iter()
                    .position(|name| name == column.name())
                    .map(|position| (position, column.ty()))
                    .ok_or_else(|| IoError::MissingColumn(column.name().to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.bound = Some(bound);
        Ok(())
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn read_into(&mut self, entry: usize, row: &mut Row) -> Result<(), IoError> {
        let bound = self.bound.as_ref().ok_or(IoError::Unbound)?;
        let record = self.records.get(entry).ok_or(IoError::EntryOutOfRange {
            entry,
            len: self.records.len(),
        })?;

        for (slot, &(position, ty)) in bound.iter().enumerate() {
            let raw = record.get(position).ok_or(IoError::ShortRecord {
                entry,
                expected: self.headers.len(),
                actual: record.len(),
            })?;
            row.set_at(slot, ty.parse_value(raw)?)?;
        }

        Ok(())
    }
}

/// A [RowWriter] producing a CSV document with a header line.
pub struct CsvRowWriter<W: Write = BufWriter<File>> {
    writer: csv::Writer<W>,
    width: Option<usize>,
    record: Vec<String>,
}

impl CsvRowWriter {
    /// Creates or truncates the file at the given path.
    pub fn create(path: &Path) -> Result<Self, IoError> {
        let file = File::create(path)?;
        Ok(Self::from_writer(BufWriter::new(file)))
    }
}

impl<W: Write> CsvRowWriter<W> {
    pub fn from_writer(sink: W) -> Self {
        Self {
            writer: WriterBuilder::new().has_headers(false).from_writer(sink),
            width: None,
            record: Vec::new(),
        }
    }

    /// Flushes and returns the underlying sink.
    pub fn into_inner(self) -> Result<W, IoError> {
        self.writer
            .into_inner()
            .map_err(|err| IoError::Io(io::Error::from(err.into_error())))
    }
}

impl<W: Write> RowWriter for CsvRowWriter<W> {
    fn bind(&mut self, schema: &Schema) -> Result<(), IoError> {
        self.writer
            .write_record(schema.columns().iter().map(|column| column.name()))?;
        self.width = Some(schema.len());
        Ok(())
    }

    fn write_row(&mut self, row: &Row) -> Result<(), IoError> {
        let width = self.width.ok_or(IoError::Unbound)?;
        if row.values().len() != width {
            return Err(IoError::WidthMismatch {
                expected: width,
                actual: row.values().len(),
            });
        }

        self.record.clear();
        self.record
            .extend(row.values().iter().map(|value| value.to_string()));
        self.writer.write_record(&self.record)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), IoError> {
        self.writer.flush()?;
        Ok(())
    }
}
