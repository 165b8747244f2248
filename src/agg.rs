/// CellTable Aggregation
///
/// Reductions over the rows of an `IndexView`. Every reduction returns one
/// value per cell position: a single value for scalar columns and N values
/// for columns whose cells hold N elements. Null and NaN elements are
/// skipped, never reported as errors.
///
/// # Examples
///
/// ```
/// use celltable::{agg, Agg, Table, CellTensor, IndexView};
/// use std::rc::Rc;
/// use std::cell::RefCell;
///
/// let mut table = Table::new();
/// table.add_column("x", CellTensor::from_f64s(vec![1.0, 2.0, 3.0, 4.0, 5.0])).unwrap();
/// let view = IndexView::new(Rc::new(RefCell::new(table)));
///
/// assert_eq!(agg::sum(&view, "x").unwrap(), vec![15.0]);
/// assert_eq!(agg::var(&view, "x").unwrap(), vec![2.5]);
/// assert_eq!(agg::agg(&view, "x", "median".parse::<Agg>().unwrap()).unwrap(), vec![3.0]);
/// ```

use crate::error::{Result, TableError};
use crate::view::IndexView;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// The standard reductions, selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Agg {
    /// Number of non-null, non-NaN elements
    Count,
    Sum,
    /// Product of elements
    Prod,
    Min,
    Max,
    Mean,
    /// Sample variance (squared deviations divided by n-1)
    Var,
    /// Sample standard deviation
    Std,
    /// Sample standard error of the mean (Std / sqrt(n))
    Sem,
    /// Population variance (squared deviations divided by n)
    VarPop,
    StdPop,
    SemPop,
    Median,
    /// First quartile (0.25 quantile)
    Q1,
    /// Third quartile (0.75 quantile)
    Q3,
    /// Sum of squares
    SumSq,
}

impl Agg {
    pub const ALL: [Agg; 16] = [
        Agg::Count,
        Agg::Sum,
        Agg::Prod,
        Agg::Min,
        Agg::Max,
        Agg::Mean,
        Agg::Var,
        Agg::Std,
        Agg::Sem,
        Agg::VarPop,
        Agg::StdPop,
        Agg::SemPop,
        Agg::Median,
        Agg::Q1,
        Agg::Q3,
        Agg::SumSq,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Agg::Count => "Count",
            Agg::Sum => "Sum",
            Agg::Prod => "Prod",
            Agg::Min => "Min",
            Agg::Max => "Max",
            Agg::Mean => "Mean",
            Agg::Var => "Var",
            Agg::Std => "Std",
            Agg::Sem => "Sem",
            Agg::VarPop => "VarPop",
            Agg::StdPop => "StdPop",
            Agg::SemPop => "SemPop",
            Agg::Median => "Median",
            Agg::Q1 => "Q1",
            Agg::Q3 => "Q3",
            Agg::SumSq => "SumSq",
        }
    }

    /// Order statistics need a sort and only work on scalar columns.
    pub fn is_quantile(&self) -> bool {
        matches!(self, Agg::Median | Agg::Q1 | Agg::Q3)
    }
}

impl fmt::Display for Agg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Agg {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        let agg = match lower.as_str() {
            "prod" | "product" => Agg::Prod,
            "var" | "variance" => Agg::Var,
            "var_pop" | "variancepop" => Agg::VarPop,
            "25%" | "1q" => Agg::Q1,
            "50%" | "2q" => Agg::Median,
            "75%" | "3q" => Agg::Q3,
            "sum_sq" => Agg::SumSq,
            _ => *Agg::ALL
                .iter()
                .find(|a| a.name().to_lowercase() == lower)
                .ok_or_else(|| {
                    TableError::InvalidArgument(format!("unknown aggregation: '{}'", s))
                })?,
        };
        Ok(agg)
    }
}

// Primitive folds, `(element offset, value, accumulator) -> accumulator`.

pub fn count_fn(_idx: usize, _val: f64, acc: f64) -> f64 {
    acc + 1.0
}

pub fn sum_fn(_idx: usize, val: f64, acc: f64) -> f64 {
    acc + val
}

pub fn prod_fn(_idx: usize, val: f64, acc: f64) -> f64 {
    acc * val
}

pub fn min_fn(_idx: usize, val: f64, acc: f64) -> f64 {
    acc.min(val)
}

pub fn max_fn(_idx: usize, val: f64, acc: f64) -> f64 {
    acc.max(val)
}

pub fn sum_sq_fn(_idx: usize, val: f64, acc: f64) -> f64 {
    acc + val * val
}

fn count_index(view: &IndexView, column: usize) -> Vec<f64> {
    view.agg_column(column, 0.0, count_fn)
}

fn sum_index(view: &IndexView, column: usize) -> Vec<f64> {
    view.agg_column(column, 0.0, sum_fn)
}

fn mean_index(view: &IndexView, column: usize) -> Vec<f64> {
    let count = count_index(view, column);
    let mut mean = sum_index(view, column);
    for (m, &n) in mean.iter_mut().zip(&count) {
        if n > 0.0 {
            *m /= n;
        }
    }
    mean
}

/// Variance from a second pass over the data. `population` divides by n,
/// otherwise by n-1; cells with too few values stay 0.
fn var_index(view: &IndexView, column: usize, population: bool) -> Vec<f64> {
    let count = count_index(view, column);
    let mean = mean_index(view, column);
    let cell_size = mean.len();
    let mut var = view.agg_column(column, 0.0, |idx, val, acc| {
        let dev = val - mean[idx % cell_size];
        acc + dev * dev
    });
    for (v, &n) in var.iter_mut().zip(&count) {
        let denom = if population { n } else { n - 1.0 };
        if denom > 0.0 {
            *v /= denom;
        }
    }
    var
}

fn std_index(view: &IndexView, column: usize, population: bool) -> Vec<f64> {
    var_index(view, column, population)
        .into_iter()
        .map(f64::sqrt)
        .collect()
}

fn sem_index(view: &IndexView, column: usize, population: bool) -> Vec<f64> {
    let count = count_index(view, column);
    let mut sem = std_index(view, column, population);
    for (s, &n) in sem.iter_mut().zip(&count) {
        if n > 0.0 {
            *s /= n.sqrt();
        }
    }
    sem
}

/// Quantiles of the non-null, non-NaN values of a scalar column, by linear
/// interpolation between order statistics. One sort serves all of `qs`.
/// An empty selection yields NaN for every quantile; a NaN or infinite `q`
/// is an `InvalidArgument`. Values outside `[0, 1]` clamp to the extremes.
pub fn quantiles_index(view: &IndexView, column: usize, qs: &[f64]) -> Result<Vec<f64>> {
    if qs.is_empty() {
        return Err(TableError::EmptyInput("no quantiles requested".to_string()));
    }
    if let Some(q) = qs.iter().find(|q| !q.is_finite()) {
        return Err(TableError::InvalidArgument(format!("quantile {} is not finite", q)));
    }
    {
        let table = view.borrow_table();
        if table.column(column).num_dims() > 1 {
            return Err(TableError::NotApplicable(format!(
                "quantiles of column '{}' with tensor cells",
                table.column_name(column)
            )));
        }
    }

    let mut sorted = view.clone();
    sorted.filter(|t, row| !t.column(column).float_value_1d(row).is_nan());
    sorted.sort_stable_by(|t, a, b| {
        let tensor = t.column(column);
        tensor
            .float_value_1d(a)
            .partial_cmp(&tensor.float_value_1d(b))
            .unwrap_or(Ordering::Equal)
    });

    if sorted.is_empty() {
        return Ok(vec![f64::NAN; qs.len()]);
    }
    let table = sorted.borrow_table();
    let tensor = table.column(column);
    let value = |pos: usize| tensor.float_value_1d(sorted.index(pos));
    let last = sorted.len() - 1;

    let values = qs
        .iter()
        .map(|&q| {
            let position = q * last as f64;
            let lower = position.floor();
            if lower < 0.0 {
                return value(0);
            }
            let lo = lower as usize;
            if lo >= last {
                value(last)
            } else {
                let phi = position - lower;
                (1.0 - phi) * value(lo) + phi * value(lo + 1)
            }
        })
        .collect();
    Ok(values)
}

/// Reduction `agg` over column `column` (by position).
pub fn agg_index(view: &IndexView, column: usize, agg: Agg) -> Result<Vec<f64>> {
    let values = match agg {
        Agg::Count => count_index(view, column),
        Agg::Sum => sum_index(view, column),
        Agg::Prod => view.agg_column(column, 1.0, prod_fn),
        Agg::Min => view.agg_column(column, f64::MAX, min_fn),
        Agg::Max => view.agg_column(column, -f64::MAX, max_fn),
        Agg::Mean => mean_index(view, column),
        Agg::Var => var_index(view, column, false),
        Agg::Std => std_index(view, column, false),
        Agg::Sem => sem_index(view, column, false),
        Agg::VarPop => var_index(view, column, true),
        Agg::StdPop => std_index(view, column, true),
        Agg::SemPop => sem_index(view, column, true),
        Agg::Median => quantiles_index(view, column, &[0.5])?,
        Agg::Q1 => quantiles_index(view, column, &[0.25])?,
        Agg::Q3 => quantiles_index(view, column, &[0.75])?,
        Agg::SumSq => view.agg_column(column, 0.0, sum_sq_fn),
    };
    Ok(values)
}

fn resolve(view: &IndexView, column: &str) -> Result<usize> {
    view.borrow_table().column_index(column)
}

/// Reduction `agg` over the named column.
pub fn agg(view: &IndexView, column: &str, agg: Agg) -> Result<Vec<f64>> {
    agg_index(view, resolve(view, column)?, agg)
}

macro_rules! named_aggs {
    ($($(#[$doc:meta])* $name:ident => $agg:expr;)*) => {
        $(
            $(#[$doc])*
            pub fn $name(view: &IndexView, column: &str) -> Result<Vec<f64>> {
                agg(view, column, $agg)
            }
        )*
    };
}

named_aggs! {
    count => Agg::Count;
    sum => Agg::Sum;
    prod => Agg::Prod;
    /// Minimum; `f64::MAX` for cells without any value.
    min => Agg::Min;
    /// Maximum; `-f64::MAX` for cells without any value.
    max => Agg::Max;
    mean => Agg::Mean;
    var => Agg::Var;
    std => Agg::Std;
    sem => Agg::Sem;
    var_pop => Agg::VarPop;
    std_pop => Agg::StdPop;
    sem_pop => Agg::SemPop;
    sum_sq => Agg::SumSq;
    median => Agg::Median;
    q1 => Agg::Q1;
    q3 => Agg::Q3;
}

pub fn quantiles(view: &IndexView, column: &str, qs: &[f64]) -> Result<Vec<f64>> {
    quantiles_index(view, resolve(view, column)?, qs)
}

/// Number of elements per cell position for which `pred(offset, value)` holds.
pub fn count_if<F>(view: &IndexView, column: &str, mut pred: F) -> Result<Vec<f64>>
where
    F: FnMut(usize, f64) -> bool,
{
    let c = resolve(view, column)?;
    Ok(view.agg_column(c, 0.0, |idx, val, acc| if pred(idx, val) { acc + 1.0 } else { acc }))
}

/// Proportion (0..1) of elements per cell position for which `pred` holds.
pub fn prop_if<F>(view: &IndexView, column: &str, pred: F) -> Result<Vec<f64>>
where
    F: FnMut(usize, f64) -> bool,
{
    let count = count(view, column)?;
    let mut prop = count_if(view, column, pred)?;
    for (p, &n) in prop.iter_mut().zip(&count) {
        if n > 0.0 {
            *p /= n;
        }
    }
    Ok(prop)
}

/// Percentage (0..100) of elements per cell position for which `pred` holds.
pub fn pct_if<F>(view: &IndexView, column: &str, pred: F) -> Result<Vec<f64>>
where
    F: FnMut(usize, f64) -> bool,
{
    Ok(prop_if(view, column, pred)?
        .into_iter()
        .map(|p| p * 100.0)
        .collect())
}
