/// CellTable Column Storage
///
/// A column's raw values live in a `ColumnData`, a tagged container with one
/// variant per element type. All variants share the same access surface:
/// every element can be read or written as a float, as a string, or as a
/// `ColumnValue`, so aggregation and grouping code never switches on type.

use crate::error::{Result, TableError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Column element types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    String,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
}

impl ColumnType {
    /// True for integer and floating point types (not bool, not string).
    pub fn is_numeric(&self) -> bool {
        !matches!(self, ColumnType::String | ColumnType::Bool)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, ColumnType::Float32 | ColumnType::Float64)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Bool => "bool",
            ColumnType::Int8 => "int8",
            ColumnType::Int16 => "int16",
            ColumnType::Int32 => "int32",
            ColumnType::Int64 => "int64",
            ColumnType::UInt8 => "uint8",
            ColumnType::UInt16 => "uint16",
            ColumnType::UInt32 => "uint32",
            ColumnType::UInt64 => "uint64",
            ColumnType::Float32 => "float32",
            ColumnType::Float64 => "float64",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColumnType {
    type Err = TableError;

    /// Accepts the names produced by `name()`, case-insensitive, plus the
    /// common aliases `str`, `int`, `float` and `double`.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "string" | "str" => Ok(ColumnType::String),
            "bool" => Ok(ColumnType::Bool),
            "int8" => Ok(ColumnType::Int8),
            "int16" => Ok(ColumnType::Int16),
            "int32" => Ok(ColumnType::Int32),
            "int64" | "int" => Ok(ColumnType::Int64),
            "uint8" => Ok(ColumnType::UInt8),
            "uint16" => Ok(ColumnType::UInt16),
            "uint32" => Ok(ColumnType::UInt32),
            "uint64" => Ok(ColumnType::UInt64),
            "float32" => Ok(ColumnType::Float32),
            "float64" | "float" | "double" => Ok(ColumnType::Float64),
            _ => Err(TableError::InvalidArgument(format!(
                "unknown column type: '{}'",
                s
            ))),
        }
    }
}

/// A single cell element, used for typed reads and writes.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    String(String),
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Null,
}

impl ColumnValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }

    /// Numeric view of the value. Bools map to 0/1; strings and nulls to None.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ColumnValue::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            ColumnValue::Int8(v) => Some(*v as f64),
            ColumnValue::Int16(v) => Some(*v as f64),
            ColumnValue::Int32(v) => Some(*v as f64),
            ColumnValue::Int64(v) => Some(*v as f64),
            ColumnValue::UInt8(v) => Some(*v as f64),
            ColumnValue::UInt16(v) => Some(*v as f64),
            ColumnValue::UInt32(v) => Some(*v as f64),
            ColumnValue::UInt64(v) => Some(*v as f64),
            ColumnValue::Float32(v) => Some(*v as f64),
            ColumnValue::Float64(v) => Some(*v),
            ColumnValue::String(_) | ColumnValue::Null => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ColumnValue::Int8(v) => Some(*v as i64),
            ColumnValue::Int16(v) => Some(*v as i64),
            ColumnValue::Int32(v) => Some(*v as i64),
            ColumnValue::Int64(v) => Some(*v),
            ColumnValue::UInt8(v) => Some(*v as i64),
            ColumnValue::UInt16(v) => Some(*v as i64),
            ColumnValue::UInt32(v) => Some(*v as i64),
            ColumnValue::UInt64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            ColumnValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ColumnValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// String rendering used for grouping keys and string columns. Null renders as "".
    pub fn render(&self) -> String {
        match self {
            ColumnValue::String(v) => v.clone(),
            ColumnValue::Bool(v) => v.to_string(),
            ColumnValue::Int8(v) => v.to_string(),
            ColumnValue::Int16(v) => v.to_string(),
            ColumnValue::Int32(v) => v.to_string(),
            ColumnValue::Int64(v) => v.to_string(),
            ColumnValue::UInt8(v) => v.to_string(),
            ColumnValue::UInt16(v) => v.to_string(),
            ColumnValue::UInt32(v) => v.to_string(),
            ColumnValue::UInt64(v) => v.to_string(),
            ColumnValue::Float32(v) => v.to_string(),
            ColumnValue::Float64(v) => v.to_string(),
            ColumnValue::Null => String::new(),
        }
    }
}

impl From<f64> for ColumnValue {
    fn from(v: f64) -> Self {
        ColumnValue::Float64(v)
    }
}

impl From<i64> for ColumnValue {
    fn from(v: i64) -> Self {
        ColumnValue::Int64(v)
    }
}

impl From<bool> for ColumnValue {
    fn from(v: bool) -> Self {
        ColumnValue::Bool(v)
    }
}

impl From<&str> for ColumnValue {
    fn from(v: &str) -> Self {
        ColumnValue::String(v.to_string())
    }
}

impl From<String> for ColumnValue {
    fn from(v: String) -> Self {
        ColumnValue::String(v)
    }
}

/// Dispatches over the ten numeric variants with one body, and over the
/// string and bool variants with their own bodies.
macro_rules! dispatch {
    ($data:expr, $v:ident => $num:expr, $s:ident => $string:expr, $b:ident => $boolean:expr) => {
        match $data {
            ColumnData::Int8($v) => $num,
            ColumnData::Int16($v) => $num,
            ColumnData::Int32($v) => $num,
            ColumnData::Int64($v) => $num,
            ColumnData::UInt8($v) => $num,
            ColumnData::UInt16($v) => $num,
            ColumnData::UInt32($v) => $num,
            ColumnData::UInt64($v) => $num,
            ColumnData::Float32($v) => $num,
            ColumnData::Float64($v) => $num,
            ColumnData::String($s) => $string,
            ColumnData::Bool($b) => $boolean,
        }
    };
}

/// Flat, typed element storage for one column (all rows, all cell elements).
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    String(Vec<String>),
    Bool(Vec<bool>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

impl ColumnData {
    /// Zero-valued storage of `len` elements.
    pub fn new(column_type: ColumnType, len: usize) -> Self {
        match column_type {
            ColumnType::String => ColumnData::String(vec![String::new(); len]),
            ColumnType::Bool => ColumnData::Bool(vec![false; len]),
            ColumnType::Int8 => ColumnData::Int8(vec![0; len]),
            ColumnType::Int16 => ColumnData::Int16(vec![0; len]),
            ColumnType::Int32 => ColumnData::Int32(vec![0; len]),
            ColumnType::Int64 => ColumnData::Int64(vec![0; len]),
            ColumnType::UInt8 => ColumnData::UInt8(vec![0; len]),
            ColumnType::UInt16 => ColumnData::UInt16(vec![0; len]),
            ColumnType::UInt32 => ColumnData::UInt32(vec![0; len]),
            ColumnType::UInt64 => ColumnData::UInt64(vec![0; len]),
            ColumnType::Float32 => ColumnData::Float32(vec![0.0; len]),
            ColumnType::Float64 => ColumnData::Float64(vec![0.0; len]),
        }
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            ColumnData::String(_) => ColumnType::String,
            ColumnData::Bool(_) => ColumnType::Bool,
            ColumnData::Int8(_) => ColumnType::Int8,
            ColumnData::Int16(_) => ColumnType::Int16,
            ColumnData::Int32(_) => ColumnType::Int32,
            ColumnData::Int64(_) => ColumnType::Int64,
            ColumnData::UInt8(_) => ColumnType::UInt8,
            ColumnData::UInt16(_) => ColumnType::UInt16,
            ColumnData::UInt32(_) => ColumnType::UInt32,
            ColumnData::UInt64(_) => ColumnType::UInt64,
            ColumnData::Float32(_) => ColumnType::Float32,
            ColumnData::Float64(_) => ColumnType::Float64,
        }
    }

    pub fn len(&self) -> usize {
        dispatch!(self, v => v.len(), s => s.len(), b => b.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Grows (zero-filling) or truncates to `len` elements.
    pub fn resize(&mut self, len: usize) {
        dispatch!(
            self,
            v => v.resize(len, Default::default()),
            s => s.resize(len, String::new()),
            b => b.resize(len, false)
        )
    }

    /// Float view of element `i`. Strings parse, yielding NaN when they are not numbers.
    #[inline]
    pub fn float_at(&self, i: usize) -> f64 {
        dispatch!(
            self,
            v => v[i] as f64,
            s => s[i].trim().parse().unwrap_or(f64::NAN),
            b => if b[i] { 1.0 } else { 0.0 }
        )
    }

    pub fn set_float(&mut self, i: usize, value: f64) {
        dispatch!(
            self,
            v => v[i] = value as _,
            s => s[i] = value.to_string(),
            b => b[i] = value != 0.0
        )
    }

    pub fn string_at(&self, i: usize) -> String {
        dispatch!(self, v => v[i].to_string(), s => s[i].clone(), b => b[i].to_string())
    }

    /// Writes a string into element `i`, parsing it for numeric and bool storage.
    pub fn set_string(&mut self, i: usize, value: &str) -> Result<()> {
        let column_type = self.column_type();
        dispatch!(
            self,
            v => {
                let parsed: f64 = value.trim().parse().map_err(|_| {
                    TableError::TypeMismatch(format!(
                        "cannot parse '{}' as {}",
                        value, column_type
                    ))
                })?;
                v[i] = parsed as _;
            },
            s => s[i] = value.to_string(),
            b => {
                b[i] = match value.trim().to_lowercase().as_str() {
                    "true" | "1" => true,
                    "false" | "0" | "" => false,
                    _ => {
                        return Err(TableError::TypeMismatch(format!(
                            "cannot parse '{}' as bool",
                            value
                        )))
                    }
                }
            }
        );
        Ok(())
    }

    pub fn value_at(&self, i: usize) -> ColumnValue {
        match self {
            ColumnData::String(v) => ColumnValue::String(v[i].clone()),
            ColumnData::Bool(v) => ColumnValue::Bool(v[i]),
            ColumnData::Int8(v) => ColumnValue::Int8(v[i]),
            ColumnData::Int16(v) => ColumnValue::Int16(v[i]),
            ColumnData::Int32(v) => ColumnValue::Int32(v[i]),
            ColumnData::Int64(v) => ColumnValue::Int64(v[i]),
            ColumnData::UInt8(v) => ColumnValue::UInt8(v[i]),
            ColumnData::UInt16(v) => ColumnValue::UInt16(v[i]),
            ColumnData::UInt32(v) => ColumnValue::UInt32(v[i]),
            ColumnData::UInt64(v) => ColumnValue::UInt64(v[i]),
            ColumnData::Float32(v) => ColumnValue::Float32(v[i]),
            ColumnData::Float64(v) => ColumnValue::Float64(v[i]),
        }
    }

    /// Writes a non-null value into element `i`, converting between numeric types.
    /// Nulls are tracked by the owning tensor, not here.
    pub fn set_value(&mut self, i: usize, value: &ColumnValue) -> Result<()> {
        match value {
            ColumnValue::Null => Err(TableError::TypeMismatch(
                "null cannot be stored as element data".to_string(),
            )),
            ColumnValue::String(s) => self.set_string(i, s),
            ColumnValue::Bool(x) if self.column_type() == ColumnType::Bool => {
                if let ColumnData::Bool(b) = self {
                    b[i] = *x;
                }
                Ok(())
            }
            other => {
                if let ColumnData::String(s) = self {
                    s[i] = other.render();
                } else if let Some(f) = other.as_f64() {
                    self.set_float(i, f);
                }
                Ok(())
            }
        }
    }

    /// Copies `n` elements from `src[from..]` into `self[to..]`. Matching
    /// types copy directly; otherwise values are converted element-wise.
    pub fn copy_range_from(&mut self, src: &ColumnData, to: usize, from: usize, n: usize) {
        macro_rules! same_type {
            ($data:expr; $($variant:ident),*) => {
                match (&mut *$data, src) {
                    $((ColumnData::$variant(d), ColumnData::$variant(s)) => {
                        d[to..to + n].clone_from_slice(&s[from..from + n]);
                        return;
                    })*
                    _ => {}
                }
            };
        }
        same_type!(
            self; String, Bool, Int8, Int16, Int32, Int64, UInt8, UInt16, UInt32, UInt64, Float32,
            Float64
        );

        if let ColumnData::String(d) = self {
            for k in 0..n {
                d[to + k] = src.string_at(from + k);
            }
            return;
        }
        for k in 0..n {
            self.set_float(to + k, src.float_at(from + k));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_type_parse() {
        assert_eq!("Float64".parse::<ColumnType>().unwrap(), ColumnType::Float64);
        assert_eq!("int".parse::<ColumnType>().unwrap(), ColumnType::Int64);
        assert!("complex".parse::<ColumnType>().is_err());
        assert!(ColumnType::UInt16.is_numeric());
        assert!(!ColumnType::Bool.is_numeric());
        assert!(!ColumnType::String.is_numeric());
    }

    #[test]
    fn test_column_data_float_access() {
        let mut data = ColumnData::new(ColumnType::Int32, 3);
        data.set_float(0, 10.0);
        data.set_float(1, 20.7);
        assert_eq!(data.float_at(0), 10.0);
        assert_eq!(data.float_at(1), 20.0);
        assert_eq!(data.value_at(1), ColumnValue::Int32(20));
        assert_eq!(data.string_at(2), "0");
    }

    #[test]
    fn test_column_data_string_access() {
        let mut data = ColumnData::new(ColumnType::String, 2);
        data.set_string(0, "2.5").unwrap();
        data.set_string(1, "abc").unwrap();
        assert_eq!(data.float_at(0), 2.5);
        assert!(data.float_at(1).is_nan());

        let mut nums = ColumnData::new(ColumnType::Float64, 1);
        nums.set_string(0, " 3.25 ").unwrap();
        assert_eq!(nums.float_at(0), 3.25);
        assert!(matches!(
            nums.set_string(0, "oops"),
            Err(TableError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_column_data_set_value() {
        let mut data = ColumnData::new(ColumnType::Bool, 2);
        data.set_value(0, &ColumnValue::Bool(true)).unwrap();
        data.set_value(1, &ColumnValue::Int64(0)).unwrap();
        assert_eq!(data.value_at(0), ColumnValue::Bool(true));
        assert_eq!(data.value_at(1), ColumnValue::Bool(false));
        assert!(data.set_value(0, &ColumnValue::Null).is_err());

        let mut strings = ColumnData::new(ColumnType::String, 1);
        strings.set_value(0, &ColumnValue::Float64(2000.0)).unwrap();
        assert_eq!(strings.string_at(0), "2000");
    }

    #[test]
    fn test_column_data_resize_and_copy() {
        let mut data = ColumnData::new(ColumnType::Float64, 2);
        data.set_float(1, 4.0);
        data.resize(4);
        assert_eq!(data.len(), 4);
        assert_eq!(data.float_at(3), 0.0);

        let mut target = ColumnData::new(ColumnType::Float64, 2);
        target.copy_range_from(&data, 0, 1, 2);
        assert_eq!(target.float_at(0), 4.0);
        assert_eq!(target.float_at(1), 0.0);

        let mut as_text = ColumnData::new(ColumnType::String, 1);
        as_text.copy_range_from(&data, 0, 1, 1);
        assert_eq!(as_text.string_at(0), "4");
    }
}
