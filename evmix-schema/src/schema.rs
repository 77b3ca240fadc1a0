use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde_derive::{Deserialize, Serialize};

use crate::ColumnType;

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
/// An error that can occur when building or accessing a schema.
pub enum SchemaError {
    #[error("Unsupported column type code: {0:?}")]
    /// The dictionary used a type code that is not recognised.
    UnsupportedType(String),
    #[error("Malformed dictionary entry {0:?}, expected `name/TYPE`")]
    /// The dictionary entry is not of the `name/TYPE` form.
    MalformedEntry(String),
    #[error("Duplicate column in dictionary: {0:?}")]
    /// The same column name was declared twice.
    DuplicateColumn(String),
    #[error("Unknown column: {0:?}")]
    /// No column with the given name exists in the schema.
    UnknownColumn(String),
    #[error("Column {column:?} of type {ty:?} cannot be coerced to a float")]
    /// A float coercion was requested on a non-numeric column.
    NonNumeric { column: String, ty: ColumnType },
    #[error("Column {column:?} has type {actual:?}, expected {expected:?}")]
    /// A typed access or assignment used the wrong type.
    TypeMismatch {
        column: String,
        expected: ColumnType,
        actual: ColumnType,
    },
    #[error("Cannot parse {value:?} as {ty:?}")]
    /// A raw value could not be parsed into the column type.
    InvalidValue { value: String, ty: ColumnType },
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
/// A single `name/TYPE` dictionary line describing one column.
pub struct DictionaryEntry {
    name: String,
    ty: ColumnType,
}

impl DictionaryEntry {
    /// Creates a new entry from its parts.
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    #[inline]
    /// The column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    /// The column type.
    pub fn ty(&self) -> ColumnType {
        self.ty
    }
}

impl FromStr for DictionaryEntry {
    type Err = SchemaError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let Some((name, code)) = line.split_once('/') else {
            return Err(SchemaError::MalformedEntry(line.to_string()));
        };

        let name = name.trim();
        if name.is_empty() {
            return Err(SchemaError::MalformedEntry(line.to_string()));
        }

        let ty = ColumnType::from_code(code.trim())?;
        Ok(Self::new(name, ty))
    }
}

impl TryFrom<String> for DictionaryEntry {
    type Error = SchemaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DictionaryEntry> for String {
    fn from(value: DictionaryEntry) -> Self {
        value.to_string()
    }
}

impl Display for DictionaryEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.name, self.ty.code())
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
/// A named and typed column within a [Schema].
pub struct ColumnDef {
    name: Box<str>,
    ty: ColumnType,
}

impl ColumnDef {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn ty(&self) -> ColumnType {
        self.ty
    }
}

#[derive(Debug)]
/// The ordered set of columns a [Row](crate::Row) carries.
///
/// Schemas are immutable once created and are shared between rows,
/// column positions can be resolved once with [Schema::index_of] and then
/// used for positional access in hot loops.
pub struct Schema {
    columns: Box<[ColumnDef]>,
    lookup: ahash::HashMap<Box<str>, usize>,
}

impl Schema {
    /// Builds a schema from an ordered list of dictionary entries.
    pub fn from_dictionary(entries: &[DictionaryEntry]) -> Result<Self, SchemaError> {
        let mut columns = Vec::with_capacity(entries.len());
        let mut lookup = ahash::HashMap::default();

        for (position, entry) in entries.iter().enumerate() {
            let name: Box<str> = Box::from(entry.name());
            if lookup.insert(name.clone(), position).is_some() {
                return Err(SchemaError::DuplicateColumn(entry.name().to_string()));
            }
            columns.push(ColumnDef { name, ty: entry.ty() });
        }

        Ok(Self {
            columns: columns.into_boxed_slice(),
            lookup,
        })
    }

    /// Parses raw `name/TYPE` lines and builds a schema from them.
    pub fn parse_dictionary<S: AsRef<str>>(lines: &[S]) -> Result<Self, SchemaError> {
        let entries = lines
            .iter()
            .map(|line| line.as_ref().parse())
            .collect::<Result<Vec<DictionaryEntry>, _>>()?;
        Self::from_dictionary(&entries)
    }

    #[inline]
    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    #[inline]
    /// Returns the columns in dictionary order.
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    #[inline]
    pub fn column(&self, index: usize) -> Option<&ColumnDef> {
        self.columns.get(index)
    }

    /// Returns the position of the column with the given name.
    pub fn index_of(&self, name: &str) -> Result<usize, SchemaError> {
        self.lookup
            .get(name)
            .copied()
            .ok_or_else(|| SchemaError::UnknownColumn(name.to_string()))
    }

    /// Returns the position of the column with the given name, ensuring
    /// it can be coerced to a float.
    pub fn numeric_index_of(&self, name: &str) -> Result<usize, SchemaError> {
        let index = self.index_of(name)?;
        let ty = self.columns[index].ty;
        if !ty.is_numeric() {
            return Err(SchemaError::NonNumeric {
                column: name.to_string(),
                ty,
            });
        }
        Ok(index)
    }

    /// Returns the dictionary entries describing this schema.
    pub fn dictionary(&self) -> Vec<DictionaryEntry> {
        self.columns
            .iter()
            .map(|column| DictionaryEntry::new(column.name(), column.ty()))
            .collect()
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns
    }
}

impl Eq for Schema {}
