use std::fmt::{Display, Formatter};

use crate::ColumnType;

#[derive(Debug, Clone, PartialEq)]
/// A single typed scalar held by a [Row](crate::Row) slot.
///
/// Equality compares both the tag and the value, an `I32(1)` is never
/// equal to an `I64(1)`.
pub enum ColumnValue {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Bool(bool),
    String(Box<str>),
}

impl ColumnValue {
    /// Returns the zero value for the given column type.
    pub fn zero(ty: ColumnType) -> Self {
        match ty {
            ColumnType::I8 => Self::I8(0),
            ColumnType::U8 => Self::U8(0),
            ColumnType::I16 => Self::I16(0),
            ColumnType::U16 => Self::U16(0),
            ColumnType::I32 => Self::I32(0),
            ColumnType::U32 => Self::U32(0),
            ColumnType::I64 => Self::I64(0),
            ColumnType::U64 => Self::U64(0),
            ColumnType::F32 => Self::F32(0.0),
            ColumnType::F64 => Self::F64(0.0),
            ColumnType::Bool => Self::Bool(false),
            ColumnType::String => Self::String(Box::from("")),
        }
    }

    /// Returns the [ColumnType] tag of the value.
    pub fn column_type(&self) -> ColumnType {
        match self {
            Self::I8(_) => ColumnType::I8,
            Self::U8(_) => ColumnType::U8,
            Self::I16(_) => ColumnType::I16,
            Self::U16(_) => ColumnType::U16,
            Self::I32(_) => ColumnType::I32,
            Self::U32(_) => ColumnType::U32,
            Self::I64(_) => ColumnType::I64,
            Self::U64(_) => ColumnType::U64,
            Self::F32(_) => ColumnType::F32,
            Self::F64(_) => ColumnType::F64,
            Self::Bool(_) => ColumnType::Bool,
            Self::String(_) => ColumnType::String,
        }
    }

    /// Coerces the value to a float.
    ///
    /// Returns `None` for strings.
    pub fn as_f64(&self) -> Option<f64> {
        let v = match self {
            Self::I8(v) => *v as f64,
            Self::U8(v) => *v as f64,
            Self::I16(v) => *v as f64,
            Self::U16(v) => *v as f64,
            Self::I32(v) => *v as f64,
            Self::U32(v) => *v as f64,
            Self::I64(v) => *v as f64,
            Self::U64(v) => *v as f64,
            Self::F32(v) => *v as f64,
            Self::F64(v) => *v,
            Self::Bool(v) => {
                if *v {
                    1.0
                } else {
                    0.0
                }
            },
            Self::String(_) => return None,
        };
        Some(v)
    }
}

impl Display for ColumnValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::I8(v) => write!(f, "{v}"),
            Self::U8(v) => write!(f, "{v}"),
            Self::I16(v) => write!(f, "{v}"),
            Self::U16(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::F32(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::String(v) => f.write_str(v),
        }
    }
}

/// A Rust scalar that can be stored in a [ColumnValue] slot.
///
/// This is what powers the typed accessors on [Row](crate::Row).
pub trait ColumnScalar: Sized {
    /// The column type that stores this scalar.
    const TYPE: ColumnType;

    /// Extracts the scalar if the value carries the matching tag.
    fn from_value(value: &ColumnValue) -> Option<Self>;

    /// Wraps the scalar in its tagged value.
    fn into_value(self) -> ColumnValue;
}

macro_rules! column_scalar {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl ColumnScalar for $t {
                const TYPE: ColumnType = ColumnType::$variant;

                #[inline]
                fn from_value(value: &ColumnValue) -> Option<Self> {
                    match value {
                        ColumnValue::$variant(v) => Some(*v),
                        _ => None,
                    }
                }

                #[inline]
                fn into_value(self) -> ColumnValue {
                    ColumnValue::$variant(self)
                }
            }

            impl From<$t> for ColumnValue {
                fn from(value: $t) -> Self {
                    ColumnValue::$variant(value)
                }
            }
        )*
    };
}

column_scalar!(
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    bool => Bool,
);

impl ColumnScalar for String {
    const TYPE: ColumnType = ColumnType::String;

    fn from_value(value: &ColumnValue) -> Option<Self> {
        match value {
            ColumnValue::String(v) => Some(v.to_string()),
            _ => None,
        }
    }

    fn into_value(self) -> ColumnValue {
        ColumnValue::String(self.into_boxed_str())
    }
}

impl From<String> for ColumnValue {
    fn from(value: String) -> Self {
        Self::String(value.into_boxed_str())
    }
}

impl From<&str> for ColumnValue {
    fn from(value: &str) -> Self {
        Self::String(Box::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_matches_type() {
        let types = [
            ColumnType::I8,
            ColumnType::U8,
            ColumnType::I16,
            ColumnType::U16,
            ColumnType::I32,
            ColumnType::U32,
            ColumnType::I64,
            ColumnType::U64,
            ColumnType::F32,
            ColumnType::F64,
            ColumnType::Bool,
            ColumnType::String,
        ];
        for ty in types {
            assert_eq!(ColumnValue::zero(ty).column_type(), ty);
        }
    }

    #[rstest::rstest]
    #[case(ColumnValue::I8(-3), Some(-3.0))]
    #[case(ColumnValue::U64(7), Some(7.0))]
    #[case(ColumnValue::F32(0.5), Some(0.5))]
    #[case(ColumnValue::Bool(true), Some(1.0))]
    #[case(ColumnValue::Bool(false), Some(0.0))]
    #[case(ColumnValue::String("x".into()), None)]
    fn test_as_f64(#[case] value: ColumnValue, #[case] expected: Option<f64>) {
        assert_eq!(value.as_f64(), expected);
    }

    #[test]
    fn test_equality_compares_tag() {
        assert_eq!(ColumnValue::I32(1), ColumnValue::I32(1));
        assert_ne!(ColumnValue::I32(1), ColumnValue::I64(1));
        assert_ne!(ColumnValue::I32(1), ColumnValue::I32(2));
    }

    #[test]
    fn test_scalar_round_trip_through_tag() {
        let value = 12u16.into_value();
        assert_eq!(value, ColumnValue::U16(12));
        assert_eq!(u16::from_value(&value), Some(12));
        assert_eq!(i32::from_value(&value), None);
    }
}
