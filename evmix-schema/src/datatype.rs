use std::fmt::{Display, Formatter};

use crate::{ColumnValue, SchemaError};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
/// The data type of a column as declared in a dictionary.
///
/// Every type has a single character code which is used by dictionary
/// entries of the form `name/CODE`:
///
/// | Code | Type   | Code | Type   |
/// |------|--------|------|--------|
/// | `B`  | `i8`   | `b`  | `u8`   |
/// | `S`  | `i16`  | `s`  | `u16`  |
/// | `I`  | `i32`  | `i`  | `u32`  |
/// | `L`  | `i64`  | `l`  | `u64`  |
/// | `G`  | `i64`  | `g`  | `u64`  |
/// | `F`  | `f32`  | `D`  | `f64`  |
/// | `O`  | `bool` | `C`  | string |
///
/// `G` and `g` are accepted as aliases of the 64-bit integer types.
pub enum ColumnType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Bool,
    String,
}

macro_rules! parse_numeric {
    ($raw:expr, $ty:expr, $variant:ident) => {{
        $raw.parse()
            .map(ColumnValue::$variant)
            .map_err(|_| SchemaError::InvalidValue {
                value: $raw.to_string(),
                ty: $ty,
            })
    }};
}

impl ColumnType {
    /// Resolves a type from its dictionary code.
    ///
    /// Returns [SchemaError::UnsupportedType] if the code is not recognised.
    pub fn from_code(code: &str) -> Result<Self, SchemaError> {
        let ty = match code {
            "B" => Self::I8,
            "b" => Self::U8,
            "S" => Self::I16,
            "s" => Self::U16,
            "I" => Self::I32,
            "i" => Self::U32,
            "L" | "G" => Self::I64,
            "l" | "g" => Self::U64,
            "F" => Self::F32,
            "D" => Self::F64,
            "O" => Self::Bool,
            "C" => Self::String,
            other => return Err(SchemaError::UnsupportedType(other.to_string())),
        };
        Ok(ty)
    }

    /// Returns the canonical dictionary code of the type.
    pub fn code(&self) -> char {
        match self {
            Self::I8 => 'B',
            Self::U8 => 'b',
            Self::I16 => 'S',
            Self::U16 => 's',
            Self::I32 => 'I',
            Self::U32 => 'i',
            Self::I64 => 'L',
            Self::U64 => 'l',
            Self::F32 => 'F',
            Self::F64 => 'D',
            Self::Bool => 'O',
            Self::String => 'C',
        }
    }

    #[inline]
    /// Returns if values of this type can be coerced to a float.
    ///
    /// Booleans coerce to `0.0` / `1.0`.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Self::String)
    }

    /// Parses a raw text value into a typed [ColumnValue].
    ///
    /// Booleans accept `true`, `false`, `1` and `0`.
    pub fn parse_value(&self, raw: &str) -> Result<ColumnValue, SchemaError> {
        match self {
            Self::I8 => parse_numeric!(raw, *self, I8),
            Self::U8 => parse_numeric!(raw, *self, U8),
            Self::I16 => parse_numeric!(raw, *self, I16),
            Self::U16 => parse_numeric!(raw, *self, U16),
            Self::I32 => parse_numeric!(raw, *self, I32),
            Self::U32 => parse_numeric!(raw, *self, U32),
            Self::I64 => parse_numeric!(raw, *self, I64),
            Self::U64 => parse_numeric!(raw, *self, U64),
            Self::F32 => parse_numeric!(raw, *self, F32),
            Self::F64 => parse_numeric!(raw, *self, F64),
            Self::Bool => match raw {
                "true" | "1" => Ok(ColumnValue::Bool(true)),
                "false" | "0" => Ok(ColumnValue::Bool(false)),
                _ => Err(SchemaError::InvalidValue {
                    value: raw.to_string(),
                    ty: *self,
                }),
            },
            Self::String => Ok(ColumnValue::String(Box::from(raw))),
        }
    }
}

impl Display for ColumnType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}
