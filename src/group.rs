/// CellTable Grouping
///
/// Builders that partition an `IndexView` into `Splits`, and helpers that
/// run aggregations over every group.
///
/// Groups are independent index lists, so read-only reductions over
/// different groups do not interact. Views share their table through an
/// `Rc`, which keeps them on one thread; a caller that wants to reduce
/// groups in parallel can copy each group's `indices()` (or `materialize()`
/// it) and hand those to worker threads.
///
/// # Examples
///
/// ```
/// use celltable::{group, Agg, Table, CellTensor, IndexView};
/// use std::rc::Rc;
/// use std::cell::RefCell;
///
/// let mut table = Table::new();
/// table.add_column("method", CellTensor::from_strings(vec!["A", "A", "B"])).unwrap();
/// table.add_column("year", CellTensor::from_f64s(vec![2000.0, 2010.0, 2005.0])).unwrap();
/// let view = IndexView::new(Rc::new(RefCell::new(table)));
///
/// let mut splits = group::group_by(&view, &["method"]).unwrap();
/// assert_eq!(splits.len(), 2);
/// let mean = splits.add_aggregate("year", Agg::Mean).unwrap();
/// assert_eq!(mean.values, vec![vec![2005.0], vec![2005.0]]);
/// ```

use crate::agg::Agg;
use crate::desc::{DESC_AGGS, DESC_AGGS_ND};
use crate::error::{Result, TableError};
use crate::splits::{SplitAgg, Splits};
use crate::table::Table;
use crate::view::{compare_rows, IndexView, SortOrder};
use rand::Rng;

/// Single group named "All" holding every row of the view.
pub fn group_all(view: &IndexView) -> Splits {
    let mut splits = Splits::new(view.table().clone(), vec!["All".to_string()]);
    splits.push_group(vec!["All".to_string()], view.indices().to_vec());
    splits
}

/// Groups rows by the string values of the named columns. Groups come out
/// in ascending key order.
pub fn group_by(view: &IndexView, columns: &[&str]) -> Result<Splits> {
    if columns.is_empty() {
        return Err(TableError::EmptyInput("no columns to group by".to_string()));
    }
    let indices = view.key_columns(columns)?;
    group_by_index(view, &indices)
}

/// `group_by` with columns given by position.
pub fn group_by_index(view: &IndexView, columns: &[usize]) -> Result<Splits> {
    if columns.is_empty() {
        return Err(TableError::EmptyInput("no columns to group by".to_string()));
    }
    let levels: Vec<String> = {
        let table = view.borrow_table();
        let mut levels = Vec::with_capacity(columns.len());
        for &c in columns {
            if table.column(c).cell_size() != 1 {
                return Err(TableError::NotApplicable(format!(
                    "cannot group by column '{}' with tensor cells",
                    table.column_name(c)
                )));
            }
            levels.push(table.column_name(c).to_string());
        }
        levels
    };

    let mut sorted = view.clone();
    sorted.sort_stable_by(|t, a, b| SortOrder::Ascending.apply(compare_rows(t, columns, a, b)));

    let mut splits = Splits::new(view.table().clone(), levels);
    {
        let table = view.borrow_table();
        let key_of = |row: usize| -> Vec<String> {
            columns
                .iter()
                .map(|&c| table.column(c).string_value_1d(row))
                .collect()
        };
        let mut last: Option<Vec<String>> = None;
        let mut rows = Vec::new();
        for &row in sorted.indices() {
            let key = key_of(row);
            if last.as_ref() != Some(&key) {
                if let Some(prev) = last.replace(key) {
                    splits.push_group(prev, std::mem::take(&mut rows));
                }
            }
            rows.push(row);
        }
        if let Some(prev) = last {
            splits.push_group(prev, rows);
        }
    }
    log::debug!("grouped {} rows by {:?} into {} groups", view.len(), splits.levels(), splits.len());
    Ok(splits)
}

/// Groups rows by the keys `key(table, row)` returns. Every key must have
/// the same number of values; a mismatch fails with `KeyArity`. The result
/// has no level names: set them with `Splits::set_levels`.
pub fn group_by_func<F>(view: &IndexView, mut key: F) -> Result<Splits>
where
    F: FnMut(&Table, usize) -> Vec<String>,
{
    let keys: Vec<Vec<String>> = {
        let table = view.borrow_table();
        view.indices().iter().map(|&row| key(&table, row)).collect()
    };
    if let Some(first) = keys.first() {
        let expected = first.len();
        if let Some((pos, bad)) = keys.iter().enumerate().find(|(_, k)| k.len() != expected) {
            return Err(TableError::KeyArity {
                row: view.index(pos),
                expected,
                actual: bad.len(),
            });
        }
    }

    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&a, &b| keys[a].cmp(&keys[b]));

    let mut splits = Splits::new(view.table().clone(), Vec::new());
    let mut start = 0;
    while start < order.len() {
        let current = &keys[order[start]];
        let end = order[start..]
            .iter()
            .position(|&p| keys[p] != *current)
            .map_or(order.len(), |n| start + n);
        let rows = order[start..end].iter().map(|&p| view.index(p)).collect();
        splits.push_group(current.clone(), rows);
        start = end;
    }
    log::debug!("grouped {} rows by key function into {} groups", view.len(), splits.len());
    Ok(splits)
}

/// Random partition of the view's rows with sizes proportional to `probs`
/// (normalized to sum to 1). Groups are named by `names` when given, else
/// `p=<probability>`; the single level is "permuted".
pub fn permuted<R: Rng + ?Sized>(
    view: &IndexView,
    probs: &[f64],
    names: Option<&[&str]>,
    rng: &mut R,
) -> Result<Splits> {
    if view.is_empty() {
        return Err(TableError::EmptyInput("cannot split an empty view".to_string()));
    }
    if probs.is_empty() {
        return Err(TableError::EmptyInput("no split probabilities".to_string()));
    }
    if let Some(names) = names {
        if names.len() != probs.len() {
            return Err(TableError::InvalidArgument(format!(
                "{} names for {} probabilities",
                names.len(),
                probs.len()
            )));
        }
    }
    let total: f64 = probs.iter().sum();
    if total == 0.0 {
        return Err(TableError::EmptyInput("split probabilities sum to 0".to_string()));
    }

    let rows = view.len();
    let mut sizes = vec![0usize; probs.len()];
    let mut taken = 0;
    for (size, p) in sizes.iter_mut().zip(probs) {
        let mut n = (p / total * rows as f64).round().max(0.0) as usize;
        if taken + n > rows {
            n = rows - taken;
            if n == 0 {
                break;
            }
        }
        *size = n;
        taken += n;
    }

    let mut shuffled = view.clone();
    shuffled.permuted(rng);
    let mut splits = Splits::new(view.table().clone(), vec!["permuted".to_string()]);
    let mut start = 0;
    for (i, &n) in sizes.iter().enumerate() {
        let name = match names {
            Some(names) => names[i].to_string(),
            None => format!("p={}", probs[i] / total),
        };
        splits.push_group(vec![name], shuffled.indices()[start..start + n].to_vec());
        start += n;
    }
    Ok(splits)
}

/// Runs `agg` on `column` for every group of `splits`.
pub fn aggregate<'a>(splits: &'a mut Splits, column: &str, agg: Agg) -> Result<&'a SplitAgg> {
    splits.add_aggregate(column, agg)
}

/// Runs `agg` on every numeric column.
pub fn aggregate_all_numeric(splits: &mut Splits, agg: Agg) -> Result<()> {
    let names: Vec<String> = {
        let table = splits.table().borrow();
        (0..table.num_columns())
            .filter(|&c| table.column(c).column_type().is_numeric())
            .map(|c| table.column_name(c).to_string())
            .collect()
    };
    for name in &names {
        splits.add_aggregate(name, agg)?;
    }
    Ok(())
}

/// Adds the standard descriptive aggregates of `column` (no quantiles for
/// columns with tensor cells).
pub fn describe(splits: &mut Splits, column: &str) -> Result<()> {
    let scalar = {
        let table = splits.table().borrow();
        table.column_by_name(column)?.num_dims() == 1
    };
    let aggs: &[Agg] = if scalar { &DESC_AGGS } else { &DESC_AGGS_ND };
    for &agg in aggs {
        splits.add_aggregate(column, agg)?;
    }
    Ok(())
}
