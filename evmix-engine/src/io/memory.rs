use evmix_schema::{ColumnValue, Row, Schema};

use super::{IoError, RowReader, RowWriter};

#[derive(Debug, Clone, Default)]
/// A [RowReader] over named columns held in memory.
pub struct MemoryRowReader {
    columns: Vec<String>,
    records: Vec<Vec<ColumnValue>>,
    projection: Option<Vec<usize>>,
}

impl MemoryRowReader {
    /// Creates a new reader, every record holds one value per column.
    pub fn new(columns: Vec<String>, records: Vec<Vec<ColumnValue>>) -> Self {
        Self {
            columns,
            records,
            projection: None,
        }
    }
}

impl RowReader for MemoryRowReader {
    fn bind(&mut self, schema: &Schema) -> Result<(), IoError> {
        let projection = schema
            .columns()
            .iter()
            .map(|column| {
                self.columns
                    .iter()
                    .position(|name| name == column.name())
                    .ok_or_else(|| IoError::MissingColumn(column.name().to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.projection = Some(projection);
        Ok(())
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn read_into(&mut self, entry: usize, row: &mut Row) -> Result<(), IoError> {
        let projection = self.projection.as_ref().ok_or(IoError::Unbound)?;
        let record = self.records.get(entry).ok_or(IoError::EntryOutOfRange {
            entry,
            len: self.records.len(),
        })?;

        for (slot, &source) in projection.iter().enumerate() {
            let value = record.get(source).ok_or(IoError::ShortRecord {
                entry,
                expected: self.columns.len(),
                actual: record.len(),
            })?;
            row.set_at(slot, value.clone())?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
/// A [RowWriter] collecting rows in memory.
pub struct MemoryRowWriter {
    columns: Option<Vec<String>>,
    rows: Vec<Row>,
    finished: bool,
}

impl MemoryRowWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The column names of the bound schema.
    pub fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    /// The rows written so far.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

impl RowWriter for MemoryRowWriter {
    fn bind(&mut self, schema: &Schema) -> Result<(), IoError> {
        let columns = schema
            .columns()
            .iter()
            .map(|column| column.name().to_string())
            .collect();
        self.columns = Some(columns);
        Ok(())
    }

    fn write_row(&mut self, row: &Row) -> Result<(), IoError> {
        let columns = self.columns.as_ref().ok_or(IoError::Unbound)?;
        if columns.len() != row.values().len() {
            return Err(IoError::WidthMismatch {
                expected: columns.len(),
                actual: row.values().len(),
            });
        }

        self.rows.push(row.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), IoError> {
        self.finished = true;
        Ok(())
    }
}
