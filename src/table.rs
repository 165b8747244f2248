/// CellTable Table Implementation
///
/// A Table is an ordered set of named columns, each one a `CellTensor` whose
/// outermost dimension is the row dimension. Cells may be scalars or
/// n-dimensional (for example one small image per row).
///
/// # Examples
///
/// ```
/// use celltable::{Table, Schema, ColumnSpec, ColumnType};
///
/// let schema = Schema::new(vec![
///     ColumnSpec::scalar("method", ColumnType::String),
///     ColumnSpec::scalar("year", ColumnType::Float64),
///     ColumnSpec::tensor("image", ColumnType::Float32, vec![2, 2], Vec::new()),
/// ]);
///
/// let mut table = Table::from_schema(&schema, 3).unwrap();
/// table.set_cell_string("method", 0, "A").unwrap();
/// table.set_cell_float("year", 0, 2000.0).unwrap();
///
/// assert_eq!(table.rows(), 3);
/// assert_eq!(table.cell_string("method", 0).unwrap(), "A");
/// assert_eq!(table.schema(), schema);
/// ```

use crate::column::{ColumnType, ColumnValue};
use crate::error::{Result, TableError};
use crate::tensor::CellTensor;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata key for the table name.
pub const META_NAME: &str = "name";
/// Metadata key for the table description.
pub const META_DESC: &str = "desc";
pub const META_READ_ONLY: &str = "read-only";
pub const META_PRECISION: &str = "precision";

/// Description of one column: name, element type and cell shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub column_type: ColumnType,
    /// Dimensions after the row dimension; empty for scalar columns.
    #[serde(default)]
    pub cell_shape: Vec<usize>,
    #[serde(default)]
    pub dim_names: Vec<String>,
}

impl ColumnSpec {
    pub fn scalar(name: &str, column_type: ColumnType) -> Self {
        ColumnSpec {
            name: name.to_string(),
            column_type,
            cell_shape: Vec::new(),
            dim_names: Vec::new(),
        }
    }

    pub fn tensor(
        name: &str,
        column_type: ColumnType,
        cell_shape: Vec<usize>,
        dim_names: Vec<String>,
    ) -> Self {
        ColumnSpec {
            name: name.to_string(),
            column_type,
            cell_shape,
            dim_names,
        }
    }

    pub fn cell_size(&self) -> usize {
        self.cell_shape.iter().product()
    }

    pub fn is_scalar(&self) -> bool {
        self.cell_size() == 1
    }
}

/// Ordered list of column descriptions, used to build tables and exchanged
/// with text codecs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<ColumnSpec>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Schema { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn get_column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn get_column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Column-oriented table owning its data.
///
/// The logical row count may be 0 while every column keeps one physical row,
/// since tensors never shrink their row dimension below 1.
#[derive(Clone, Default)]
pub struct Table {
    names: Vec<String>,
    columns: Vec<CellTensor>,
    rows: usize,
    metadata: HashMap<String, String>,
    /// Bumped on every structural change (column add, row resize)
    generation: u64,
}

impl Table {
    pub fn new() -> Self {
        Table::default()
    }

    /// Creates a table with one zero-filled column per schema entry.
    pub fn from_schema(schema: &Schema, rows: usize) -> Result<Self> {
        let mut table = Table::new();
        table.rows = rows;
        for spec in schema.columns() {
            table.add_empty_column(&spec.name, spec.column_type, &spec.cell_shape, &spec.dim_names)?;
        }
        Ok(table)
    }

    /// Logical number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.names.iter().map(|n| n.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| TableError::ColumnNotFound(name.to_string()))
    }

    pub fn column_indices(&self, names: &[&str]) -> Result<Vec<usize>> {
        names.iter().map(|n| self.column_index(n)).collect()
    }

    /// Column tensor by position. Panics if `idx` is out of range.
    pub fn column(&self, idx: usize) -> &CellTensor {
        &self.columns[idx]
    }

    pub fn column_by_name(&self, name: &str) -> Result<&CellTensor> {
        let idx = self.column_index(name)?;
        Ok(&self.columns[idx])
    }

    pub(crate) fn column_mut(&mut self, idx: usize) -> &mut CellTensor {
        &mut self.columns[idx]
    }

    pub fn column_name(&self, idx: usize) -> &str {
        &self.names[idx]
    }

    /// Adds a column. The first column of a table sets its row count; later
    /// columns must match it. The tensor must be row-major.
    pub fn add_column(&mut self, name: &str, tensor: CellTensor) -> Result<()> {
        if self.names.iter().any(|n| n == name) {
            return Err(TableError::DuplicateColumn(name.to_string()));
        }
        if !tensor.is_row_major() {
            return Err(TableError::Shape(format!(
                "column '{}' is not row-major",
                name
            )));
        }
        if tensor.num_dims() == 0 {
            return Err(TableError::Shape(format!(
                "column '{}' has no row dimension",
                name
            )));
        }

        let mut tensor = tensor;
        if self.columns.is_empty() {
            self.rows = tensor.rows();
            if tensor.rows() == 0 {
                tensor.set_num_rows(1);
            }
        } else if tensor.rows() != self.rows.max(1) {
            return Err(TableError::Shape(format!(
                "column '{}' has {} rows, table has {}",
                name,
                tensor.rows(),
                self.rows
            )));
        }

        log::trace!("add column '{}' ({}, cell shape {:?})", name, tensor.column_type(), tensor.cell_shape());
        self.names.push(name.to_string());
        self.columns.push(tensor);
        self.generation += 1;
        Ok(())
    }

    /// Adds a zero-filled column sized to the current row count.
    pub fn add_empty_column(
        &mut self,
        name: &str,
        column_type: ColumnType,
        cell_shape: &[usize],
        dim_names: &[String],
    ) -> Result<()> {
        let rows = self.rows;
        let mut sizes = vec![rows.max(1)];
        sizes.extend_from_slice(cell_shape);
        let mut names = vec!["row"];
        names.extend(dim_names.iter().map(|n| n.as_str()));
        let tensor = CellTensor::new(column_type, &sizes, &names);
        self.add_column(name, tensor)?;
        self.rows = rows;
        Ok(())
    }

    /// Resizes every column. Physical tensors keep at least one row.
    pub fn set_row_count(&mut self, rows: usize) {
        let physical = rows.max(1);
        for column in &mut self.columns {
            column.set_num_rows(physical);
        }
        self.rows = rows;
        self.generation += 1;
    }

    /// Appends `n` zero-filled rows and returns the index of the first one.
    pub fn add_rows(&mut self, n: usize) -> usize {
        let start = self.rows;
        self.set_row_count(start + n);
        start
    }

    pub fn schema(&self) -> Schema {
        let columns = self
            .names
            .iter()
            .zip(&self.columns)
            .map(|(name, tensor)| ColumnSpec {
                name: name.clone(),
                column_type: tensor.column_type(),
                cell_shape: tensor.cell_shape().to_vec(),
                dim_names: cell_dim_names(tensor),
            })
            .collect();
        Schema::new(columns)
    }

    fn scalar_column(&self, name: &str) -> Result<usize> {
        let idx = self.column_index(name)?;
        if self.columns[idx].cell_size() != 1 {
            return Err(TableError::TypeMismatch(format!(
                "column '{}' has tensor cells, not scalars",
                name
            )));
        }
        Ok(idx)
    }

    fn tensor_column(&self, name: &str) -> Result<usize> {
        let idx = self.column_index(name)?;
        if self.columns[idx].cell_shape().is_empty() {
            return Err(TableError::TypeMismatch(format!(
                "column '{}' has scalar cells, not tensors",
                name
            )));
        }
        Ok(idx)
    }

    pub fn cell_float(&self, column: &str, row: usize) -> Result<f64> {
        let idx = self.scalar_column(column)?;
        Ok(self.columns[idx].float_value_1d(row))
    }

    pub fn set_cell_float(&mut self, column: &str, row: usize, value: f64) -> Result<()> {
        let idx = self.scalar_column(column)?;
        self.columns[idx].set_float_1d(row, value);
        Ok(())
    }

    pub fn cell_string(&self, column: &str, row: usize) -> Result<String> {
        let idx = self.scalar_column(column)?;
        Ok(self.columns[idx].string_value_1d(row))
    }

    pub fn set_cell_string(&mut self, column: &str, row: usize, value: &str) -> Result<()> {
        let idx = self.scalar_column(column)?;
        self.columns[idx].set_string_1d(row, value)
    }

    pub fn cell_value(&self, column: &str, row: usize) -> Result<ColumnValue> {
        let idx = self.scalar_column(column)?;
        Ok(self.columns[idx].value_1d(row))
    }

    pub fn set_cell_value(&mut self, column: &str, row: usize, value: ColumnValue) -> Result<()> {
        let idx = self.scalar_column(column)?;
        self.columns[idx].set_value_1d(row, &value)
    }

    /// Copy of a tensor cell.
    pub fn cell_tensor(&self, column: &str, row: usize) -> Result<CellTensor> {
        let idx = self.tensor_column(column)?;
        Ok(self.columns[idx].sub_space(row))
    }

    pub fn set_cell_tensor(&mut self, column: &str, row: usize, cell: &CellTensor) -> Result<()> {
        let idx = self.tensor_column(column)?;
        self.columns[idx].set_sub_space(row, cell)
    }

    /// True when every element of the cell is null.
    pub fn is_null(&self, column: &str, row: usize) -> Result<bool> {
        let tensor = self.column_by_name(column)?;
        let cell_size = tensor.cell_size();
        Ok((0..cell_size).all(|k| tensor.is_null_1d(row * cell_size + k)))
    }

    /// Marks every element of the cell null.
    pub fn set_null(&mut self, column: &str, row: usize) -> Result<()> {
        let idx = self.column_index(column)?;
        let tensor = &mut self.columns[idx];
        let cell_size = tensor.cell_size();
        for k in 0..cell_size {
            tensor.set_null_1d(row * cell_size + k, true);
        }
        Ok(())
    }

    /// Copies the cell of `column` at `from_row` in `src` into `to_row` here.
    pub fn copy_cell(&mut self, column: &str, to_row: usize, src: &Table, from_row: usize) -> Result<()> {
        let idx = self.column_index(column)?;
        let src_column = src.column_by_name(column)?;
        self.columns[idx].copy_cells_from(src_column, to_row, from_row)
    }

    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(|v| v.as_str())
    }

    pub fn set_meta(&mut self, key: &str, value: &str) {
        self.metadata.insert(key.to_string(), value.to_string());
    }

    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    /// Column-level metadata, stored under `"column:key"`.
    pub fn column_meta(&self, column: &str, key: &str) -> Option<&str> {
        self.meta(&format!("{}:{}", column, key))
    }

    pub fn set_column_meta(&mut self, column: &str, key: &str, value: &str) {
        self.set_meta(&format!("{}:{}", column, key), value);
    }

    pub fn name(&self) -> &str {
        self.meta(META_NAME).unwrap_or("")
    }

    pub fn set_name(&mut self, name: &str) {
        self.set_meta(META_NAME, name);
    }

    /// Exports rows as a JSON array of objects. Tensor cells become nested
    /// arrays following the cell shape; null elements become `null`.
    ///
    /// # Example
    ///
    /// ```
    /// use celltable::{Table, CellTensor};
    ///
    /// let mut table = Table::new();
    /// table.add_column("name", CellTensor::from_strings(vec!["Alice"])).unwrap();
    /// table.add_column("score", CellTensor::from_f64s(vec![95.5])).unwrap();
    ///
    /// let json = table.to_json().unwrap();
    /// assert!(json.contains("\"name\": \"Alice\""));
    /// assert!(json.contains("\"score\": 95.5"));
    /// ```
    pub fn to_json(&self) -> Result<String> {
        let rows: Vec<serde_json::Value> = (0..self.rows)
            .map(|row| {
                let obj: serde_json::Map<String, serde_json::Value> = self
                    .names
                    .iter()
                    .zip(&self.columns)
                    .map(|(name, tensor)| {
                        let cell_size = tensor.cell_size();
                        let value = nested_json(tensor, row * cell_size, tensor.cell_shape());
                        (name.clone(), value)
                    })
                    .collect();
                serde_json::Value::Object(obj)
            })
            .collect();
        Ok(serde_json::to_string_pretty(&rows)?)
    }
}

/// Names of the cell dimensions, or none when all of them are blank.
fn cell_dim_names(tensor: &CellTensor) -> Vec<String> {
    let names = tensor.shape().names().get(1..).unwrap_or(&[]);
    if names.iter().all(|n| n.is_empty()) {
        Vec::new()
    } else {
        names.to_vec()
    }
}

fn element_json(tensor: &CellTensor, i: usize) -> serde_json::Value {
    match tensor.value_1d(i) {
        ColumnValue::Null => serde_json::Value::Null,
        ColumnValue::String(s) => serde_json::Value::String(s),
        ColumnValue::Bool(b) => serde_json::Value::Bool(b),
        other => match other.as_i64() {
            Some(n) if !tensor.column_type().is_float() => serde_json::Value::Number(n.into()),
            _ => other
                .as_f64()
                .and_then(serde_json::Number::from_f64)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
        },
    }
}

fn nested_json(tensor: &CellTensor, offset: usize, dims: &[usize]) -> serde_json::Value {
    match dims.split_first() {
        None => element_json(tensor, offset),
        Some((&outer, inner)) => {
            let stride: usize = inner.iter().product();
            serde_json::Value::Array(
                (0..outer)
                    .map(|k| nested_json(tensor, offset + k * stride, inner))
                    .collect(),
            )
        }
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Table {{ name: '{}', columns: {:?}, rows: {} }}",
            self.name(),
            self.names,
            self.rows
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::Shape;

    fn method_year() -> Table {
        let mut table = Table::new();
        table
            .add_column("method", CellTensor::from_strings(vec!["A", "A", "B"]))
            .unwrap();
        table
            .add_column("year", CellTensor::from_f64s(vec![2000.0, 2010.0, 2005.0]))
            .unwrap();
        table
    }

    #[test]
    fn test_table_basic() {
        let table = method_year();
        assert_eq!(table.rows(), 3);
        assert_eq!(table.num_columns(), 2);
        assert_eq!(table.column_names(), vec!["method", "year"]);
        assert_eq!(table.cell_string("method", 2).unwrap(), "B");
        assert_eq!(table.cell_float("year", 1).unwrap(), 2010.0);
        assert_eq!(table.column_indices(&["year", "method"]).unwrap(), vec![1, 0]);
    }

    #[test]
    fn test_add_column_errors() {
        let mut table = method_year();
        assert!(matches!(
            table.add_column("year", CellTensor::from_f64s(vec![0.0; 3])),
            Err(TableError::DuplicateColumn(_))
        ));
        assert!(matches!(
            table.add_column("short", CellTensor::from_f64s(vec![0.0; 2])),
            Err(TableError::Shape(_))
        ));

        let shape = Shape::column_major(vec![3, 2], Vec::new());
        let col_major = CellTensor::with_shape(ColumnType::Float64, shape);
        assert!(matches!(
            table.add_column("cm", col_major),
            Err(TableError::Shape(_))
        ));
        assert!(matches!(
            table.column_index("missing"),
            Err(TableError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_zero_rows_keep_one_physical_row() {
        let mut table = method_year();
        table.set_row_count(0);
        assert_eq!(table.rows(), 0);
        assert!(table.is_empty());
        assert_eq!(table.column(0).rows(), 1);
        assert_eq!(table.column(1).rows(), 1);

        // an empty table still accepts columns with one physical row
        table.add_column("extra", CellTensor::from_f64s(vec![0.0])).unwrap();
        assert_eq!(table.rows(), 0);

        let first = table.add_rows(2);
        assert_eq!(first, 0);
        assert_eq!(table.rows(), 2);
        assert!(table.columns.iter().all(|c| c.rows() == 2));
    }

    #[test]
    fn test_generation_tracks_structure() {
        let mut table = method_year();
        let g = table.generation();
        table.set_cell_float("year", 0, 1999.0).unwrap();
        assert_eq!(table.generation(), g);
        table.add_rows(1);
        assert!(table.generation() > g);
    }

    #[test]
    fn test_schema_round_trip() {
        let schema = Schema::new(vec![
            ColumnSpec::scalar("name", ColumnType::String),
            ColumnSpec::tensor(
                "img",
                ColumnType::Float32,
                vec![2, 3],
                vec!["y".to_string(), "x".to_string()],
            ),
        ]);
        let table = Table::from_schema(&schema, 4).unwrap();
        assert_eq!(table.rows(), 4);
        assert_eq!(table.column(1).cell_size(), 6);
        assert_eq!(table.schema(), schema);

        let json = schema.to_json().unwrap();
        assert_eq!(Schema::from_json(&json).unwrap(), schema);

        let empty = Table::from_schema(&schema, 0).unwrap();
        assert_eq!(empty.rows(), 0);
        assert_eq!(empty.column(0).rows(), 1);
    }

    #[test]
    fn test_scalar_and_tensor_accessors() {
        let schema = Schema::new(vec![
            ColumnSpec::scalar("x", ColumnType::Float64),
            ColumnSpec::tensor("v", ColumnType::Float64, vec![2], Vec::new()),
        ]);
        let mut table = Table::from_schema(&schema, 2).unwrap();

        assert!(matches!(
            table.cell_float("v", 0),
            Err(TableError::TypeMismatch(_))
        ));
        assert!(matches!(
            table.cell_tensor("x", 0),
            Err(TableError::TypeMismatch(_))
        ));

        let cell = CellTensor::from_f64s(vec![1.0, 2.0]);
        table.set_cell_tensor("v", 1, &cell).unwrap();
        let back = table.cell_tensor("v", 1).unwrap();
        assert_eq!(back.float_value_1d(1), 2.0);

        table.set_cell_value("x", 0, ColumnValue::Int64(3)).unwrap();
        assert_eq!(table.cell_value("x", 0).unwrap(), ColumnValue::Float64(3.0));
    }

    #[test]
    fn test_nulls_and_copy_cell() {
        let mut table = method_year();
        table.set_null("year", 1).unwrap();
        assert!(table.is_null("year", 1).unwrap());
        assert!(!table.is_null("year", 0).unwrap());
        assert!(table.cell_float("year", 1).unwrap().is_nan());

        let src = method_year();
        table.copy_cell("year", 1, &src, 2).unwrap();
        assert!(!table.is_null("year", 1).unwrap());
        assert_eq!(table.cell_float("year", 1).unwrap(), 2005.0);
    }

    #[test]
    fn test_metadata_and_clone() {
        let mut table = method_year();
        table.set_name("results");
        table.set_meta(META_DESC, "simulation runs");
        table.set_column_meta("year", "precision", "4");
        assert_eq!(table.name(), "results");
        assert_eq!(table.column_meta("year", META_PRECISION), Some("4"));
        assert_eq!(table.meta("year:precision"), Some("4"));

        let copy = table.clone();
        table.set_cell_float("year", 0, 0.0).unwrap();
        table.set_name("changed");
        assert_eq!(copy.cell_float("year", 0).unwrap(), 2000.0);
        assert_eq!(copy.name(), "results");
        assert_eq!(copy.meta(META_DESC), Some("simulation runs"));
    }

    #[test]
    fn test_to_json() {
        let mut table = method_year();
        let mut vectors = CellTensor::new(ColumnType::Int32, &[3, 2], &[]);
        vectors.set_float_1d(1, 7.0);
        table.add_column("v", vectors).unwrap();
        table.set_null("year", 2).unwrap();

        let json = table.to_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["method"], "A");
        assert_eq!(parsed[0]["year"], 2000.0);
        assert_eq!(parsed[0]["v"], serde_json::json!([0, 7]));
        assert!(parsed[2]["year"].is_null());
    }

    #[test]
    fn test_debug_format() {
        let mut table = method_year();
        table.set_name("t");
        let debug = format!("{:?}", table);
        assert!(debug.contains("name: 't'"));
        assert!(debug.contains("rows: 3"));
    }
}
