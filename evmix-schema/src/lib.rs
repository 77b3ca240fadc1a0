//! Dynamically typed rows for tabular event data.
//!
//! The layout of a row is not known at build time, it is described by a
//! dictionary of `name/TYPE` entries loaded from configuration. This crate
//! provides the tagged [ColumnValue], the shared [Schema] built from a
//! dictionary and the [Row] record itself.

mod datatype;
mod row;
mod schema;
mod value;

pub use self::datatype::ColumnType;
pub use self::row::Row;
pub use self::schema::{ColumnDef, DictionaryEntry, Schema, SchemaError};
pub use self::value::{ColumnScalar, ColumnValue};
