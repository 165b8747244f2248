/// CellTable - Columnar Tables with Tensor Cells
///
/// An in-memory column-oriented table whose cells may be n-dimensional
/// arrays, with index views for sorting and filtering without copying data,
/// group-by splits, and per-cell aggregation including quantiles.
///
/// # Examples
///
/// ```
/// use celltable::{agg, group, Agg, AggNaming, CellTensor, IndexView, Table};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let mut table = Table::new();
/// table.add_column("method", CellTensor::from_strings(vec!["A", "A", "B"])).unwrap();
/// table.add_column("year", CellTensor::from_f64s(vec![2000.0, 2010.0, 2005.0])).unwrap();
///
/// let view = IndexView::new(Rc::new(RefCell::new(table)));
/// assert_eq!(agg::mean(&view, "year").unwrap(), vec![2005.0]);
///
/// let mut splits = group::group_by(&view, &["method"]).unwrap();
/// splits.add_aggregate("year", Agg::Max).unwrap();
/// let summary = splits.to_table(AggNaming::ColumnNameOnly).unwrap();
/// assert_eq!(summary.cell_float("year", 0).unwrap(), 2010.0);
/// ```

pub mod error;
pub mod column;
pub mod tensor;
pub mod table;
pub mod view;
pub mod agg;
pub mod desc;
pub mod splits;
pub mod group;
pub mod header;

pub use error::{Result, TableError};
pub use column::{ColumnData, ColumnType, ColumnValue};
pub use tensor::{CellTensor, Shape};
pub use table::{ColumnSpec, Schema, Table, META_DESC, META_NAME, META_PRECISION, META_READ_ONLY};
pub use view::{FilterOptions, IndexView, SortOrder};
pub use agg::Agg;
pub use desc::{describe_all, describe_column, mean_tables};
pub use splits::{AggNaming, SplitAgg, Splits};
pub use group::{group_all, group_by, group_by_func, group_by_index, permuted};
