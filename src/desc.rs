/// CellTable Descriptive Statistics
///
/// Summary tables of the standard statistics, one row per statistic.

use crate::agg::{agg_index, quantiles_index, Agg};
use crate::column::ColumnType;
use crate::error::{Result, TableError};
use crate::table::{ColumnSpec, Schema, Table};
use crate::view::IndexView;

/// Statistics reported by `describe_all`, in row order.
pub const DESC_AGGS: [Agg; 9] = [
    Agg::Count,
    Agg::Mean,
    Agg::Std,
    Agg::Sem,
    Agg::Min,
    Agg::Q1,
    Agg::Median,
    Agg::Q3,
    Agg::Max,
];

/// Statistics available for columns with tensor cells (no quantiles).
pub const DESC_AGGS_ND: [Agg; 6] = [Agg::Count, Agg::Mean, Agg::Std, Agg::Sem, Agg::Min, Agg::Max];

fn summary_schema(table: &Table, columns: &[usize]) -> Schema {
    let mut specs = vec![ColumnSpec::scalar("Agg", ColumnType::String)];
    for &c in columns {
        let tensor = table.column(c);
        specs.push(ColumnSpec::tensor(
            table.column_name(c),
            ColumnType::Float64,
            tensor.cell_shape().to_vec(),
            Vec::new(),
        ));
    }
    Schema::new(specs)
}

fn write_row(out: &mut Table, out_col: usize, row: usize, values: &[f64]) {
    let target = out.column_mut(out_col);
    let cell_size = target.cell_size();
    for (j, &v) in values.iter().enumerate().take(cell_size) {
        target.set_float_1d(row * cell_size + j, v);
    }
}

/// Table of `DESC_AGGS` for every numeric column of the view. Quantile rows
/// of columns with tensor cells are NaN. The first column, `Agg`, names the
/// statistic of each row.
pub fn describe_all(view: &IndexView) -> Result<Table> {
    let numeric: Vec<usize> = {
        let table = view.borrow_table();
        (0..table.num_columns())
            .filter(|&c| table.column(c).column_type().is_numeric())
            .collect()
    };
    let schema = summary_schema(&view.borrow_table(), &numeric);
    let mut out = Table::from_schema(&schema, DESC_AGGS.len())?;
    for (i, agg) in DESC_AGGS.iter().enumerate() {
        out.set_cell_string("Agg", i, agg.name())?;
    }

    for (k, &c) in numeric.iter().enumerate() {
        let scalar = view.borrow_table().column(c).num_dims() == 1;
        let cell_size = out.column(k + 1).cell_size();
        for (i, &agg) in DESC_AGGS.iter().enumerate() {
            let values = if agg.is_quantile() && !scalar {
                vec![f64::NAN; cell_size]
            } else {
                agg_index(view, c, agg)?
            };
            write_row(&mut out, k + 1, i, &values);
        }
    }
    log::debug!("described {} numeric columns over {} rows", numeric.len(), view.len());
    Ok(out)
}

/// Summary table for one column: `DESC_AGGS` for scalar columns, with min
/// and max taken as the 0 and 1 quantiles, or `DESC_AGGS_ND` for columns
/// with tensor cells.
pub fn describe_column(view: &IndexView, column: &str) -> Result<Table> {
    let c = view.borrow_table().column_index(column)?;
    let scalar = view.borrow_table().column(c).num_dims() == 1;
    let aggs: &[Agg] = if scalar { &DESC_AGGS } else { &DESC_AGGS_ND };

    let schema = summary_schema(&view.borrow_table(), &[c]);
    let mut out = Table::from_schema(&schema, aggs.len())?;

    if scalar {
        let qs = quantiles_index(view, c, &[0.0, 0.25, 0.5, 0.75, 1.0])?;
        let quantile_of = |agg: Agg| match agg {
            Agg::Min => Some(qs[0]),
            Agg::Q1 => Some(qs[1]),
            Agg::Median => Some(qs[2]),
            Agg::Q3 => Some(qs[3]),
            Agg::Max => Some(qs[4]),
            _ => None,
        };
        for (i, &agg) in aggs.iter().enumerate() {
            out.set_cell_string("Agg", i, agg.name())?;
            let values = match quantile_of(agg) {
                Some(q) => vec![q],
                None => agg_index(view, c, agg)?,
            };
            write_row(&mut out, 1, i, &values);
        }
    } else {
        for (i, &agg) in aggs.iter().enumerate() {
            out.set_cell_string("Agg", i, agg.name())?;
            write_row(&mut out, 1, i, &agg_index(view, c, agg)?);
        }
    }
    Ok(out)
}

/// Row-wise mean of the float columns across tables with the same columns.
/// Tables may differ in length: the result has as many rows as the longest
/// one, and each row averages only the tables that have it. Other columns
/// are taken from the longest table.
pub fn mean_tables(tables: &[Table]) -> Result<Table> {
    let (longest, base) = tables
        .iter()
        .enumerate()
        .max_by_key(|(i, t)| (t.rows(), std::cmp::Reverse(*i)))
        .ok_or_else(|| TableError::EmptyInput("no tables to average".to_string()))?;
    let names = base.column_names();
    for t in tables {
        if t.column_names() != names {
            return Err(TableError::Shape(format!(
                "tables have different columns: {:?} vs {:?}",
                names,
                t.column_names()
            )));
        }
    }

    let max_rows = base.rows();
    let mut out = base.clone();
    let mut samples = vec![0.0f64; max_rows];
    for t in tables {
        for s in samples.iter_mut().take(t.rows()) {
            *s += 1.0;
        }
    }

    for c in 0..out.num_columns() {
        if !out.column(c).column_type().is_float() {
            continue;
        }
        let cell_size = out.column(c).cell_size();
        for (i, t) in tables.iter().enumerate() {
            if i == longest {
                continue;
            }
            let src = t.column(c);
            if src.cell_size() != cell_size {
                return Err(TableError::Shape(format!(
                    "column '{}' has cells of size {} and {}",
                    out.column_name(c),
                    cell_size,
                    src.cell_size()
                )));
            }
            let target = out.column_mut(c);
            for k in 0..t.rows() * cell_size {
                let sum = target.float_value_1d(k) + src.float_value_1d(k);
                target.set_float_1d(k, sum);
            }
        }
        let target = out.column_mut(c);
        for (row, &n) in samples.iter().enumerate() {
            for j in 0..cell_size {
                let k = row * cell_size + j;
                let mean = target.float_value_1d(k) / n;
                target.set_float_1d(k, mean);
            }
        }
    }
    Ok(out)
}
