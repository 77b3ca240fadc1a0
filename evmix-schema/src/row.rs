use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::{ColumnScalar, ColumnValue, DictionaryEntry, Schema, SchemaError};

#[derive(Debug, Clone, PartialEq)]
/// A dynamically typed record.
///
/// A row is an ordered mapping from column name to a typed scalar slot,
/// the layout is defined by a shared [Schema]. Cloning a row copies the
/// values but only bumps the reference count of the schema.
///
/// Rows never own a transport: readers fill the slots in place and writers
/// read them in place, see `RowReader` and `RowWriter` in the engine crate.
pub struct Row {
    schema: Arc<Schema>,
    values: Box<[ColumnValue]>,
}

impl Row {
    /// Creates a zero-valued row over the given schema.
    pub fn new(schema: Arc<Schema>) -> Self {
        let values = schema
            .columns()
            .iter()
            .map(|column| ColumnValue::zero(column.ty()))
            .collect();
        Self { schema, values }
    }

    /// Creates a zero-valued row with one typed slot per dictionary entry.
    pub fn from_dictionary(entries: &[DictionaryEntry]) -> Result<Self, SchemaError> {
        let schema = Schema::from_dictionary(entries)?;
        Ok(Self::new(Arc::new(schema)))
    }

    #[inline]
    /// Returns the schema of the row.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    #[inline]
    /// Returns the values in schema order.
    pub fn values(&self) -> &[ColumnValue] {
        &self.values
    }

    #[inline]
    /// Returns the value at the given position.
    ///
    /// Positions should be resolved with [Schema::index_of].
    pub fn value(&self, index: usize) -> Option<&ColumnValue> {
        self.values.get(index)
    }

    /// Returns the value of the column with the given name.
    pub fn get(&self, name: &str) -> Result<&ColumnValue, SchemaError> {
        let index = self.schema.index_of(name)?;
        Ok(&self.values[index])
    }

    /// Returns the typed value of the column with the given name.
    pub fn get_as<T: ColumnScalar>(&self, name: &str) -> Result<T, SchemaError> {
        let value = self.get(name)?;
        T::from_value(value).ok_or_else(|| SchemaError::TypeMismatch {
            column: name.to_string(),
            expected: T::TYPE,
            actual: value.column_type(),
        })
    }

    /// Sets the value of the column with the given name.
    ///
    /// The value tag must match the column type.
    pub fn set(&mut self, name: &str, value: impl Into<ColumnValue>) -> Result<(), SchemaError> {
        let index = self.schema.index_of(name)?;
        self.set_at(index, value)
    }

    /// Sets the value at the given position.
    ///
    /// The value tag must match the column type.
    pub fn set_at(
        &mut self,
        index: usize,
        value: impl Into<ColumnValue>,
    ) -> Result<(), SchemaError> {
        let value = value.into();
        let Some(column) = self.schema.column(index) else {
            return Err(SchemaError::UnknownColumn(format!("#{index}")));
        };

        if column.ty() != value.column_type() {
            return Err(SchemaError::TypeMismatch {
                column: column.name().to_string(),
                expected: column.ty(),
                actual: value.column_type(),
            });
        }

        self.values[index] = value;
        Ok(())
    }

    /// Returns the value of the named column coerced to a float.
    pub fn get_f64(&self, name: &str) -> Result<f64, SchemaError> {
        let index = self.schema.index_of(name)?;
        self.f64_at(index)
    }

    /// Returns the value at the given position coerced to a float.
    pub fn f64_at(&self, index: usize) -> Result<f64, SchemaError> {
        let Some(value) = self.values.get(index) else {
            return Err(SchemaError::UnknownColumn(format!("#{index}")));
        };

        value.as_f64().ok_or_else(|| SchemaError::NonNumeric {
            column: self.schema.columns()[index].name().to_string(),
            ty: value.column_type(),
        })
    }

    /// Compares one column of two rows by tag and value.
    pub fn column_eq(&self, other: &Row, name: &str) -> Result<bool, SchemaError> {
        Ok(self.get(name)? == other.get(name)?)
    }

    /// Overwrites the slots at the given positions with the values of `other`.
    ///
    /// Both rows are expected to share the same schema layout.
    pub fn copy_columns_from(&mut self, other: &Row, indices: &[usize]) {
        debug_assert!(Arc::ptr_eq(&self.schema, &other.schema) || self.schema == other.schema);
        for &index in indices {
            self.values[index].clone_from(&other.values[index]);
        }
    }

    /// Iterates over `(name, value)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnValue)> {
        self.schema
            .columns()
            .iter()
            .map(|column| column.name())
            .zip(self.values.iter())
    }
}

impl Display for Row {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[ ")?;
        for (name, value) in self.iter() {
            write!(f, "{name}: {value}, ")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ColumnType;

    fn sample_row() -> Row {
        let entries: Vec<DictionaryEntry> = ["x/D", "n/I", "flag/O", "label/C"]
            .iter()
            .map(|line| line.parse().unwrap())
            .collect();
        Row::from_dictionary(&entries).unwrap()
    }

    #[test]
    fn test_row_from_dictionary_is_zero_valued() {
        let row = sample_row();
        assert_eq!(
            row.values(),
            &[
                ColumnValue::F64(0.0),
                ColumnValue::I32(0),
                ColumnValue::Bool(false),
                ColumnValue::String("".into()),
            ]
        );
    }

    #[rstest::rstest]
    #[case(&["x/Z"], "Z")]
    #[case(&["x/D", "n/I", "y/Z"], "Z")]
    #[case(&["x/D", "flag/DD"], "DD")]
    fn test_dictionary_with_unsupported_type_builds_no_row(
        #[case] lines: &[&str],
        #[case] code: &str,
    ) {
        let expected = SchemaError::UnsupportedType(code.into());
        assert_eq!(Schema::parse_dictionary(lines).unwrap_err(), expected);

        let entries: Result<Vec<DictionaryEntry>, _> =
            lines.iter().map(|line| line.parse()).collect();
        let err = entries
            .and_then(|entries| Row::from_dictionary(&entries))
            .unwrap_err();
        assert_eq!(err, expected);
    }

    #[test]
    fn test_row_typed_access() {
        let mut row = sample_row();
        row.set("x", 2.5f64).unwrap();
        row.set("n", 7i32).unwrap();
        row.set("label", "he3").unwrap();

        assert_eq!(row.get_as::<f64>("x"), Ok(2.5));
        assert_eq!(row.get_as::<i32>("n"), Ok(7));
        assert_eq!(row.get_as::<String>("label"), Ok("he3".to_string()));
        assert_eq!(
            row.get_as::<u32>("n"),
            Err(SchemaError::TypeMismatch {
                column: "n".into(),
                expected: ColumnType::U32,
                actual: ColumnType::I32,
            })
        );
    }

    #[test]
    fn test_row_set_rejects_wrong_type() {
        let mut row = sample_row();
        let err = row.set("x", 1i32).unwrap_err();
        assert!(matches!(err, SchemaError::TypeMismatch { .. }), "{err:?}");
        assert_eq!(row.get("x"), Ok(&ColumnValue::F64(0.0)));

        let err = row.set("missing", 1i32).unwrap_err();
        assert_eq!(err, SchemaError::UnknownColumn("missing".into()));
    }

    #[test]
    fn test_row_float_coercion() {
        let mut row = sample_row();
        row.set("n", -4i32).unwrap();
        row.set("flag", true).unwrap();

        assert_eq!(row.get_f64("n"), Ok(-4.0));
        assert_eq!(row.get_f64("flag"), Ok(1.0));
        assert_eq!(
            row.get_f64("label"),
            Err(SchemaError::NonNumeric {
                column: "label".into(),
                ty: ColumnType::String,
            })
        );
    }

    #[test]
    fn test_row_column_eq() {
        let mut a = sample_row();
        let mut b = sample_row();
        a.set("n", 3i32).unwrap();
        b.set("n", 3i32).unwrap();
        assert_eq!(a.column_eq(&b, "n"), Ok(true));

        b.set("n", 4i32).unwrap();
        assert_eq!(a.column_eq(&b, "n"), Ok(false));
    }

    #[test]
    fn test_row_copy_columns_from() {
        let mut current = sample_row();
        let mut partner = sample_row();
        current.set("x", 1.0f64).unwrap();
        current.set("n", 1i32).unwrap();
        partner.set("x", 2.0f64).unwrap();
        partner.set("n", 2i32).unwrap();

        let n = current.schema().index_of("n").unwrap();
        current.copy_columns_from(&partner, &[n]);
        assert_eq!(current.get_as::<f64>("x"), Ok(1.0));
        assert_eq!(current.get_as::<i32>("n"), Ok(2));
    }

    #[test]
    fn test_row_clone_is_independent() {
        let mut live = sample_row();
        live.set("n", 1i32).unwrap();
        let retained = live.clone();
        live.set("n", 2i32).unwrap();
        assert_eq!(retained.get_as::<i32>("n"), Ok(1));
    }

    #[test]
    fn test_row_display() {
        let mut row = sample_row();
        row.set("x", 0.5f64).unwrap();
        assert_eq!(row.to_string(), "[ x: 0.5, n: 0, flag: false, label: , ]");
    }
}
