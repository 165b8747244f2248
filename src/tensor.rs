/// CellTable Tensor Storage
///
/// A `CellTensor` is a typed, shaped n-dimensional array. When it backs a
/// table column, the outermost dimension is the row dimension and the
/// remaining dimensions form the cell shape of every row.

use crate::column::{ColumnData, ColumnType, ColumnValue};
use crate::error::{Result, TableError};
use serde::{Deserialize, Serialize};

/// Dimension sizes, element strides and optional dimension names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    sizes: Vec<usize>,
    strides: Vec<usize>,
    names: Vec<String>,
}

fn row_major_strides(sizes: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; sizes.len()];
    for d in (0..sizes.len().saturating_sub(1)).rev() {
        strides[d] = strides[d + 1] * sizes[d + 1];
    }
    strides
}

fn column_major_strides(sizes: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; sizes.len()];
    for d in 1..sizes.len() {
        strides[d] = strides[d - 1] * sizes[d - 1];
    }
    strides
}

fn padded_names(names: Vec<String>, dims: usize) -> Vec<String> {
    let mut names = names;
    names.resize(dims, String::new());
    names
}

impl Shape {
    /// Row-major shape: the last dimension varies fastest.
    pub fn row_major(sizes: Vec<usize>, names: Vec<String>) -> Self {
        let names = padded_names(names, sizes.len());
        let strides = row_major_strides(&sizes);
        Shape { sizes, strides, names }
    }

    /// Column-major shape: the first dimension varies fastest.
    pub fn column_major(sizes: Vec<usize>, names: Vec<String>) -> Self {
        let names = padded_names(names, sizes.len());
        let strides = column_major_strides(&sizes);
        Shape { sizes, strides, names }
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn num_dims(&self) -> usize {
        self.sizes.len()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.sizes.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_row_major(&self) -> bool {
        self.strides == row_major_strides(&self.sizes)
    }

    /// Flat element offset of an n-dimensional index.
    pub fn offset(&self, index: &[usize]) -> usize {
        index.iter().zip(&self.strides).map(|(i, s)| i * s).sum()
    }

    fn set_outer_size(&mut self, n: usize) {
        if self.sizes.is_empty() {
            self.sizes.push(n);
            self.names.push(String::new());
        } else {
            self.sizes[0] = n;
        }
        self.strides = if self.is_row_major() || self.strides.len() != self.sizes.len() {
            row_major_strides(&self.sizes)
        } else {
            column_major_strides(&self.sizes)
        };
    }
}

/// Typed n-dimensional array with optional per-element null flags.
///
/// # Examples
///
/// ```
/// use celltable::{CellTensor, ColumnType};
///
/// let mut images = CellTensor::new(ColumnType::Float32, &[3, 2, 2], &["row", "y", "x"]);
/// assert_eq!(images.rows(), 3);
/// assert_eq!(images.cell_shape(), &[2, 2]);
/// assert_eq!(images.cell_size(), 4);
///
/// images.set_float_1d(5, 1.5);
/// assert_eq!(images.sub_space(1).float_value_1d(1), 1.5);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CellTensor {
    shape: Shape,
    data: ColumnData,
    nulls: Option<Vec<bool>>,
}

impl CellTensor {
    /// Zero-filled row-major tensor.
    pub fn new(column_type: ColumnType, sizes: &[usize], dim_names: &[&str]) -> Self {
        let shape = Shape::row_major(
            sizes.to_vec(),
            dim_names.iter().map(|n| n.to_string()).collect(),
        );
        Self::with_shape(column_type, shape)
    }

    /// Zero-filled tensor with an explicit (possibly column-major) shape.
    pub fn with_shape(column_type: ColumnType, shape: Shape) -> Self {
        let data = ColumnData::new(column_type, shape.len());
        CellTensor { shape, data, nulls: None }
    }

    /// Wraps existing element storage in a row-major shape.
    pub fn from_data(data: ColumnData, sizes: &[usize]) -> Result<Self> {
        let shape = Shape::row_major(sizes.to_vec(), Vec::new());
        if shape.len() != data.len() {
            return Err(TableError::Shape(format!(
                "shape {:?} holds {} elements but data has {}",
                sizes,
                shape.len(),
                data.len()
            )));
        }
        Ok(CellTensor { shape, data, nulls: None })
    }

    pub fn from_f64s(values: Vec<f64>) -> Self {
        let n = values.len();
        CellTensor {
            shape: Shape::row_major(vec![n], Vec::new()),
            data: ColumnData::Float64(values),
            nulls: None,
        }
    }

    pub fn from_i64s(values: Vec<i64>) -> Self {
        let n = values.len();
        CellTensor {
            shape: Shape::row_major(vec![n], Vec::new()),
            data: ColumnData::Int64(values),
            nulls: None,
        }
    }

    pub fn from_bools(values: Vec<bool>) -> Self {
        let n = values.len();
        CellTensor {
            shape: Shape::row_major(vec![n], Vec::new()),
            data: ColumnData::Bool(values),
            nulls: None,
        }
    }

    pub fn from_strings<S: Into<String>>(values: Vec<S>) -> Self {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        let n = values.len();
        CellTensor {
            shape: Shape::row_major(vec![n], Vec::new()),
            data: ColumnData::String(values),
            nulls: None,
        }
    }

    pub fn column_type(&self) -> ColumnType {
        self.data.column_type()
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn is_row_major(&self) -> bool {
        self.shape.is_row_major()
    }

    /// Size of the outermost dimension.
    pub fn rows(&self) -> usize {
        self.shape.sizes.first().copied().unwrap_or(0)
    }

    /// Dimensions after the row dimension; empty for scalar cells.
    pub fn cell_shape(&self) -> &[usize] {
        self.shape.sizes.get(1..).unwrap_or(&[])
    }

    /// Number of elements per row (1 for scalar cells).
    pub fn cell_size(&self) -> usize {
        self.cell_shape().iter().product()
    }

    pub fn num_dims(&self) -> usize {
        self.shape.num_dims()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Float value at flat offset `i`. Null elements read as NaN.
    #[inline]
    pub fn float_value_1d(&self, i: usize) -> f64 {
        if self.is_null_1d(i) {
            return f64::NAN;
        }
        self.data.float_at(i)
    }

    pub fn set_float_1d(&mut self, i: usize, value: f64) {
        self.data.set_float(i, value);
        self.clear_null(i);
    }

    /// String value at flat offset `i`. Null elements read as "".
    pub fn string_value_1d(&self, i: usize) -> String {
        if self.is_null_1d(i) {
            return String::new();
        }
        self.data.string_at(i)
    }

    pub fn set_string_1d(&mut self, i: usize, value: &str) -> Result<()> {
        self.data.set_string(i, value)?;
        self.clear_null(i);
        Ok(())
    }

    pub fn value_1d(&self, i: usize) -> ColumnValue {
        if self.is_null_1d(i) {
            return ColumnValue::Null;
        }
        self.data.value_at(i)
    }

    /// Writes a value at flat offset `i`; `ColumnValue::Null` marks the element null.
    pub fn set_value_1d(&mut self, i: usize, value: &ColumnValue) -> Result<()> {
        if value.is_null() {
            self.set_null_1d(i, true);
            return Ok(());
        }
        self.data.set_value(i, value)?;
        self.clear_null(i);
        Ok(())
    }

    #[inline]
    pub fn is_null_1d(&self, i: usize) -> bool {
        match &self.nulls {
            Some(flags) => flags[i],
            None => false,
        }
    }

    pub fn set_null_1d(&mut self, i: usize, null: bool) {
        if !null && self.nulls.is_none() {
            return;
        }
        let len = self.data.len();
        let flags = self.nulls.get_or_insert_with(|| vec![false; len]);
        flags[i] = null;
    }

    fn clear_null(&mut self, i: usize) {
        if let Some(flags) = &mut self.nulls {
            flags[i] = false;
        }
    }

    /// Copy of one row's cell as its own tensor (shape = cell shape, or `[1]` for scalars).
    pub fn sub_space(&self, row: usize) -> CellTensor {
        let cell_size = self.cell_size();
        let sizes = if self.cell_shape().is_empty() {
            vec![1]
        } else {
            self.cell_shape().to_vec()
        };
        let names = self.shape.names.get(1..).map(|n| n.to_vec()).unwrap_or_default();
        let mut cell = CellTensor::with_shape(self.column_type(), Shape::row_major(sizes, names));
        cell.data.copy_range_from(&self.data, 0, row * cell_size, cell_size);
        if let Some(flags) = &self.nulls {
            let start = row * cell_size;
            if flags[start..start + cell_size].iter().any(|&f| f) {
                cell.nulls = Some(flags[start..start + cell_size].to_vec());
            }
        }
        cell
    }

    /// Overwrites one row's cell with the elements of `cell`.
    pub fn set_sub_space(&mut self, row: usize, cell: &CellTensor) -> Result<()> {
        let cell_size = self.cell_size();
        if cell.len() != cell_size {
            return Err(TableError::Shape(format!(
                "cell has {} elements, column cells hold {}",
                cell.len(),
                cell_size
            )));
        }
        let start = row * cell_size;
        self.data.copy_range_from(&cell.data, start, 0, cell_size);
        for k in 0..cell_size {
            let null = cell.is_null_1d(k);
            self.set_null_1d(start + k, null);
        }
        Ok(())
    }

    /// Copies the cell at `from_row` of `src` into the cell at `to_row`.
    pub fn copy_cells_from(&mut self, src: &CellTensor, to_row: usize, from_row: usize) -> Result<()> {
        let cell_size = self.cell_size();
        if src.cell_size() != cell_size {
            return Err(TableError::Shape(format!(
                "cannot copy cells of size {} into cells of size {}",
                src.cell_size(),
                cell_size
            )));
        }
        let (to, from) = (to_row * cell_size, from_row * cell_size);
        self.data.copy_range_from(&src.data, to, from, cell_size);
        if src.nulls.is_some() || self.nulls.is_some() {
            for k in 0..cell_size {
                let null = src.is_null_1d(from + k);
                self.set_null_1d(to + k, null);
            }
        }
        Ok(())
    }

    /// Resizes the row dimension, zero-filling new rows.
    pub fn set_num_rows(&mut self, rows: usize) {
        self.shape.set_outer_size(rows);
        let len = self.shape.len();
        self.data.resize(len);
        if let Some(flags) = &mut self.nulls {
            flags.resize(len, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_strides() {
        let shape = Shape::row_major(vec![2, 3, 4], Vec::new());
        assert_eq!(shape.strides(), &[12, 4, 1]);
        assert_eq!(shape.len(), 24);
        assert_eq!(shape.offset(&[1, 2, 3]), 23);
        assert!(shape.is_row_major());
        assert_eq!(shape.names().len(), 3);

        let col = Shape::column_major(vec![2, 3], vec!["r".to_string()]);
        assert_eq!(col.strides(), &[1, 2]);
        assert!(!col.is_row_major());
    }

    #[test]
    fn test_tensor_cell_geometry() {
        let scalar = CellTensor::from_f64s(vec![1.0, 2.0, 3.0]);
        assert_eq!(scalar.rows(), 3);
        assert_eq!(scalar.cell_size(), 1);
        assert!(scalar.cell_shape().is_empty());

        let matrix = CellTensor::new(ColumnType::Float64, &[4, 2, 3], &[]);
        assert_eq!(matrix.rows(), 4);
        assert_eq!(matrix.cell_shape(), &[2, 3]);
        assert_eq!(matrix.cell_size(), 6);
        assert_eq!(matrix.len(), 24);
    }

    #[test]
    fn test_from_data_rejects_bad_length() {
        let data = ColumnData::Float64(vec![0.0; 5]);
        assert!(matches!(
            CellTensor::from_data(data, &[2, 3]),
            Err(TableError::Shape(_))
        ));
        let data = ColumnData::Float64(vec![0.0; 6]);
        assert_eq!(CellTensor::from_data(data, &[2, 3]).unwrap().cell_size(), 3);
    }

    #[test]
    fn test_nulls() {
        let mut t = CellTensor::from_f64s(vec![1.0, 2.0]);
        assert!(!t.is_null_1d(0));
        t.set_null_1d(1, true);
        assert!(t.is_null_1d(1));
        assert!(t.float_value_1d(1).is_nan());
        assert_eq!(t.string_value_1d(1), "");
        assert_eq!(t.value_1d(1), ColumnValue::Null);

        t.set_float_1d(1, 7.0);
        assert!(!t.is_null_1d(1));
        assert_eq!(t.float_value_1d(1), 7.0);

        t.set_value_1d(0, &ColumnValue::Null).unwrap();
        assert!(t.is_null_1d(0));
    }

    #[test]
    fn test_string_conversions() {
        let mut t = CellTensor::from_strings(vec!["1.5", "x"]);
        assert_eq!(t.float_value_1d(0), 1.5);
        assert!(t.float_value_1d(1).is_nan());
        t.set_float_1d(1, 2.0);
        assert_eq!(t.string_value_1d(1), "2");
    }

    #[test]
    fn test_sub_space_round_trip() {
        let mut t = CellTensor::new(ColumnType::Int32, &[2, 3], &[]);
        for i in 0..6 {
            t.set_float_1d(i, i as f64);
        }
        let cell = t.sub_space(1);
        assert_eq!(cell.shape().sizes(), &[3]);
        assert_eq!(cell.float_value_1d(0), 3.0);

        t.set_sub_space(0, &cell).unwrap();
        assert_eq!(t.float_value_1d(2), 5.0);

        let wrong = CellTensor::from_f64s(vec![1.0]);
        assert!(t.set_sub_space(0, &wrong).is_err());
    }

    #[test]
    fn test_set_num_rows() {
        let mut t = CellTensor::new(ColumnType::Float64, &[2, 2], &[]);
        t.set_float_1d(3, 9.0);
        t.set_null_1d(0, true);
        t.set_num_rows(3);
        assert_eq!(t.rows(), 3);
        assert_eq!(t.len(), 6);
        assert_eq!(t.float_value_1d(3), 9.0);
        assert!(t.is_null_1d(0));
        assert!(!t.is_null_1d(5));
        assert!(t.is_row_major());

        t.set_num_rows(1);
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn test_copy_cells_from() {
        let src = CellTensor::from_f64s(vec![1.0, 2.0, 3.0]);
        let mut dst = CellTensor::new(ColumnType::Float64, &[2], &[]);
        dst.copy_cells_from(&src, 0, 2).unwrap();
        dst.copy_cells_from(&src, 1, 0).unwrap();
        assert_eq!(dst.float_value_1d(0), 3.0);
        assert_eq!(dst.float_value_1d(1), 1.0);

        let wide = CellTensor::new(ColumnType::Float64, &[1, 2], &[]);
        assert!(dst.copy_cells_from(&wide, 0, 0).is_err());
    }
}
