/// CellTable View Implementation
///
/// An `IndexView` is a list of row indices over a shared table. Sorting and
/// filtering only touch the index list, so many views can look at the same
/// rows in different orders without copying any column data.

use crate::column::ColumnType;
use crate::error::{Result, TableError};
use crate::table::Table;
use crate::tensor::CellTensor;
use rand::seq::SliceRandom;
use rand::Rng;
use std::cell::{Ref, RefCell};
use std::cmp::Ordering;
use std::rc::Rc;

/// Sort direction for column-based sorts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    /// Parse a sort order from a string.
    ///
    /// Accepts: "asc", "ascending", "desc", "descending"
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Ascending),
            "desc" | "descending" => Ok(SortOrder::Descending),
            _ => Err(TableError::InvalidArgument(format!(
                "unknown sort order: '{}'. Use 'asc' or 'desc'",
                s
            ))),
        }
    }

    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}

/// String matching options for `filter_column`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterOptions {
    /// Keep the rows that do NOT match.
    pub exclude: bool,
    /// Match on substring rather than whole value.
    pub contains: bool,
    pub ignore_case: bool,
}

fn string_matches(value: &str, pattern: &str, contains: bool, ignore_case: bool) -> bool {
    match (contains, ignore_case) {
        (true, true) => value.to_lowercase().contains(&pattern.to_lowercase()),
        (true, false) => value.contains(pattern),
        (false, true) => value.to_lowercase() == pattern.to_lowercase(),
        (false, false) => value == pattern,
    }
}

/// Total order on a numeric scalar column: numbers first, then NaN, then
/// null. Rows compare Equal only when they render to the same string.
fn compare_numeric(tensor: &CellTensor, a: usize, b: usize) -> Ordering {
    let rank = |i: usize| {
        if tensor.is_null_1d(i) {
            2
        } else if tensor.float_value_1d(i).is_nan() {
            1
        } else {
            0
        }
    };
    let (rank_a, rank_b) = (rank(a), rank(b));
    if rank_a != 0 || rank_b != 0 {
        return rank_a.cmp(&rank_b);
    }
    let ord = tensor.float_value_1d(a).total_cmp(&tensor.float_value_1d(b));
    if ord == Ordering::Equal && !tensor.column_type().is_float() {
        // 64-bit integers past 2^53 share a float value
        return tensor.string_value_1d(a).cmp(&tensor.string_value_1d(b));
    }
    ord
}

/// Compares two table rows on the given scalar columns in priority order.
/// String columns compare lexicographically, all others by float value with
/// NaN and null after every number.
pub fn compare_rows(table: &Table, columns: &[usize], a: usize, b: usize) -> Ordering {
    for &c in columns {
        let tensor = table.column(c);
        let ord = if tensor.column_type() == ColumnType::String {
            tensor.string_value_1d(a).cmp(&tensor.string_value_1d(b))
        } else {
            compare_numeric(tensor, a, b)
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Every index addresses a physical row (tables keep at least one).
fn indices_in_range(table: &Table, indices: &[usize]) -> bool {
    let rows = table.rows().max(1);
    indices.iter().all(|&row| row < rows)
}

/// A sortable, filterable list of row indices into a shared table.
///
/// Indices may repeat and appear in any order; `len()` is the number of
/// indices, not the number of table rows. A view is not invalidated when the
/// table shrinks: check `is_stale()` and call `drop_invalid()` to reconcile.
///
/// # Examples
///
/// ```
/// use celltable::{Table, CellTensor, IndexView, SortOrder};
/// use std::rc::Rc;
/// use std::cell::RefCell;
///
/// let mut table = Table::new();
/// table.add_column("x", CellTensor::from_f64s(vec![3.0, 1.0, 2.0])).unwrap();
/// let table = Rc::new(RefCell::new(table));
///
/// let mut view = IndexView::new(table.clone());
/// view.sort_by_column("x", SortOrder::Ascending).unwrap();
/// assert_eq!(view.indices(), &[1, 2, 0]);
///
/// view.filter(|t, row| t.column(0).float_value_1d(row) > 1.5);
/// assert_eq!(view.indices(), &[2, 0]);
/// ```
#[derive(Clone)]
pub struct IndexView {
    table: Rc<RefCell<Table>>,
    indices: Vec<usize>,
    /// Table generation the indices were last reconciled against
    synced_generation: u64,
}

impl IndexView {
    /// Sequential view over every row of `table`.
    pub fn new(table: Rc<RefCell<Table>>) -> Self {
        let mut view = IndexView::from_indices(table, Vec::new());
        view.sequential();
        view
    }

    pub fn from_indices(table: Rc<RefCell<Table>>, indices: Vec<usize>) -> Self {
        let generation = table.borrow().generation();
        debug_assert!(indices_in_range(&table.borrow(), &indices));
        IndexView {
            table,
            indices,
            synced_generation: generation,
        }
    }

    pub fn table(&self) -> &Rc<RefCell<Table>> {
        &self.table
    }

    pub fn borrow_table(&self) -> Ref<'_, Table> {
        self.table.borrow()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Table row at view position `i`.
    pub fn index(&self, i: usize) -> usize {
        self.indices[i]
    }

    /// Resets to `[0, rows)`.
    pub fn sequential(&mut self) {
        let table = self.table.borrow();
        self.indices = (0..table.rows()).collect();
        self.synced_generation = table.generation();
    }

    /// Resets to a random permutation of `[0, rows)`.
    pub fn permuted<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.sequential();
        self.indices.shuffle(rng);
    }

    pub fn add_index(&mut self, row: usize) {
        debug_assert!(row < self.table.borrow().rows());
        self.indices.push(row);
    }

    /// Restores native table order, keeping the current subset.
    pub fn sort_indices(&mut self) {
        self.indices.sort_unstable();
    }

    /// Sorts with a comparator over table row numbers.
    pub fn sort_by<F>(&mut self, mut compare: F)
    where
        F: FnMut(&Table, usize, usize) -> Ordering,
    {
        let table = self.table.borrow();
        debug_assert!(indices_in_range(&table, &self.indices));
        self.indices.sort_unstable_by(|&a, &b| compare(&table, a, b));
    }

    /// Stable variant of `sort_by`: rows that compare equal keep their order.
    pub fn sort_stable_by<F>(&mut self, mut compare: F)
    where
        F: FnMut(&Table, usize, usize) -> Ordering,
    {
        let table = self.table.borrow();
        debug_assert!(indices_in_range(&table, &self.indices));
        self.indices.sort_by(|&a, &b| compare(&table, a, b));
    }

    /// Resolves columns that can be used as sort or group keys.
    pub(crate) fn key_columns(&self, names: &[&str]) -> Result<Vec<usize>> {
        let table = self.table.borrow();
        let columns = table.column_indices(names)?;
        for (&c, name) in columns.iter().zip(names) {
            if table.column(c).cell_size() != 1 {
                return Err(TableError::NotApplicable(format!(
                    "column '{}' has tensor cells and cannot be used as a key",
                    name
                )));
            }
        }
        Ok(columns)
    }

    pub fn sort_by_column(&mut self, column: &str, order: SortOrder) -> Result<()> {
        self.sort_by_columns(&[column], order)
    }

    /// Sorts on several columns, later columns breaking ties of earlier ones.
    pub fn sort_by_columns(&mut self, columns: &[&str], order: SortOrder) -> Result<()> {
        let columns = self.key_columns(columns)?;
        self.sort_by(|t, a, b| order.apply(compare_rows(t, &columns, a, b)));
        Ok(())
    }

    pub fn sort_stable_by_column(&mut self, column: &str, order: SortOrder) -> Result<()> {
        self.sort_stable_by_columns(&[column], order)
    }

    pub fn sort_stable_by_columns(&mut self, columns: &[&str], order: SortOrder) -> Result<()> {
        let columns = self.key_columns(columns)?;
        self.sort_stable_by(|t, a, b| order.apply(compare_rows(t, &columns, a, b)));
        Ok(())
    }

    /// Keeps the rows for which `predicate(table, row)` is true, preserving order.
    pub fn filter<F>(&mut self, mut predicate: F)
    where
        F: FnMut(&Table, usize) -> bool,
    {
        let table = self.table.borrow();
        debug_assert!(indices_in_range(&table, &self.indices));
        self.indices.retain(|&row| predicate(&table, row));
    }

    /// Keeps rows whose string value in `column` matches `value`.
    pub fn filter_column(&mut self, column: &str, value: &str, options: FilterOptions) -> Result<()> {
        let c = self.key_columns(&[column])?[0];
        self.filter(|t, row| {
            let cell = t.column(c).string_value_1d(row);
            string_matches(&cell, value, options.contains, options.ignore_case) != options.exclude
        });
        Ok(())
    }

    /// View positions whose string value in `column` matches `value`.
    pub fn rows_by_string(
        &self,
        column: &str,
        value: &str,
        contains: bool,
        ignore_case: bool,
    ) -> Result<Vec<usize>> {
        let c = self.key_columns(&[column])?[0];
        let table = self.table.borrow();
        let tensor = table.column(c);
        Ok(self
            .indices
            .iter()
            .enumerate()
            .filter_map(|(pos, &row)| {
                string_matches(&tensor.string_value_1d(row), value, contains, ignore_case).then_some(pos)
            })
            .collect())
    }

    /// Appends `n` new rows to the table and to the end of this view.
    pub fn add_rows(&mut self, n: usize) {
        let mut table = self.table.borrow_mut();
        let start = table.add_rows(n);
        self.indices.extend(start..start + n);
        self.synced_generation = table.generation();
    }

    /// Appends `n` new rows to the table and inserts them at view position `at`.
    pub fn insert_rows(&mut self, at: usize, n: usize) {
        let mut table = self.table.borrow_mut();
        let start = table.add_rows(n);
        self.indices.splice(at..at, start..start + n);
        self.synced_generation = table.generation();
    }

    /// Removes `n` indices starting at view position `at`. Table rows are untouched.
    pub fn delete_rows(&mut self, at: usize, n: usize) {
        self.indices.drain(at..at + n);
    }

    /// True when the table changed structurally since the indices were last reconciled.
    pub fn is_stale(&self) -> bool {
        self.table.borrow().generation() != self.synced_generation
    }

    /// Drops indices that no longer address a table row and marks the view current.
    pub fn drop_invalid(&mut self) -> usize {
        let table = self.table.borrow();
        let rows = table.rows();
        let before = self.indices.len();
        self.indices.retain(|&row| row < rows);
        self.synced_generation = table.generation();
        let dropped = before - self.indices.len();
        if dropped > 0 {
            log::debug!("dropped {} stale indices ({} table rows)", dropped, rows);
        }
        dropped
    }

    /// Reduction driver: folds every non-null, non-NaN element of column
    /// `column` into one accumulator per cell position. The fold receives the
    /// flat element offset, the value and the current accumulator.
    pub fn agg_column<F>(&self, column: usize, init: f64, mut fold: F) -> Vec<f64>
    where
        F: FnMut(usize, f64, f64) -> f64,
    {
        let table = self.table.borrow();
        let tensor = table.column(column);
        let cell_size = tensor.cell_size();
        let mut acc = vec![init; cell_size];
        for &row in &self.indices {
            let start = row * cell_size;
            for (j, slot) in acc.iter_mut().enumerate() {
                let i = start + j;
                if tensor.is_null_1d(i) {
                    continue;
                }
                let value = tensor.float_value_1d(i);
                if value.is_nan() {
                    continue;
                }
                *slot = fold(i, value, *slot);
            }
        }
        acc
    }

    /// Builds a standalone table holding the view's rows in view order.
    pub fn materialize(&self) -> Result<Table> {
        let src = self.table.borrow();
        let mut out = Table::from_schema(&src.schema(), self.indices.len())?;
        for c in 0..src.num_columns() {
            let column = src.column(c);
            let target = out.column_mut(c);
            for (to, &from) in self.indices.iter().enumerate() {
                target.copy_cells_from(column, to, from)?;
            }
        }
        for (key, value) in src.metadata() {
            out.set_meta(key, value);
        }
        log::debug!("materialized {} of {} rows", self.indices.len(), src.rows());
        Ok(out)
    }
}

impl std::fmt::Debug for IndexView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "IndexView {{ rows: {}, table: {:?} }}",
            self.indices.len(),
            self.table.borrow()
        )
    }
}
