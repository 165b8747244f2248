/// CellTable Splits
///
/// A `Splits` is the result of a group-by: an ordered list of groups, each
/// an `IndexView` over the same table tagged with the values of its grouping
/// levels, plus any aggregates computed per group.
///
/// Aggregates are stored positionally, one entry per group, so any change to
/// the set or order of groups clears them.

use crate::agg::{agg_index, Agg};
use crate::column::ColumnType;
use crate::error::{Result, TableError};
use crate::table::{ColumnSpec, Schema, Table};
use crate::view::IndexView;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::rc::Rc;

/// Aggregate results for one column: `values[g]` holds the per-cell values
/// for group `g`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitAgg {
    /// Name of the aggregation, e.g. "Mean"
    pub name: String,
    /// Index of the aggregated column in the source table
    pub column: usize,
    pub values: Vec<Vec<f64>>,
}

/// Column naming for tables built from aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggNaming {
    /// Columns are named after the source column only.
    #[default]
    ColumnNameOnly,
    /// Columns are named `column:Agg`.
    WithAggName,
}

/// Groups of rows, their level values and per-group aggregates.
#[derive(Clone)]
pub struct Splits {
    table: Rc<RefCell<Table>>,
    groups: Vec<IndexView>,
    levels: Vec<String>,
    values: Vec<Vec<String>>,
    aggs: Vec<SplitAgg>,
}

impl Splits {
    pub fn new(table: Rc<RefCell<Table>>, levels: Vec<String>) -> Self {
        Splits {
            table,
            groups: Vec::new(),
            levels,
            values: Vec::new(),
            aggs: Vec::new(),
        }
    }

    pub fn table(&self) -> &Rc<RefCell<Table>> {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn groups(&self) -> &[IndexView] {
        &self.groups
    }

    pub fn group(&self, idx: usize) -> &IndexView {
        &self.groups[idx]
    }

    pub fn values(&self) -> &[Vec<String>] {
        &self.values
    }

    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    /// Sets the level names. Must match the arity of the group values.
    pub fn set_levels(&mut self, levels: Vec<String>) {
        self.levels = levels;
    }

    pub fn aggregates(&self) -> &[SplitAgg] {
        &self.aggs
    }

    pub fn clear_aggregates(&mut self) {
        if !self.aggs.is_empty() {
            log::trace!("clearing {} aggregates", self.aggs.len());
        }
        self.aggs.clear();
    }

    /// Appends a group with the given level values and rows.
    pub fn push_group(&mut self, values: Vec<String>, rows: Vec<usize>) -> &mut IndexView {
        self.clear_aggregates();
        self.values.push(values);
        self.groups.push(IndexView::from_indices(self.table.clone(), rows));
        let last = self.groups.len() - 1;
        &mut self.groups[last]
    }

    /// Positions of the groups whose values start with `values`. An empty
    /// string matches anything, and levels past the end of `values` match.
    pub fn by_value(&self, values: &[&str]) -> Vec<usize> {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, group)| {
                group
                    .iter()
                    .zip(values)
                    .all(|(have, want)| want.is_empty() || have == want)
            })
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn delete(&mut self, idx: usize) {
        self.clear_aggregates();
        self.groups.remove(idx);
        self.values.remove(idx);
    }

    /// Keeps the groups for which `keep(group, values)` is true.
    pub fn filter<F>(&mut self, mut keep: F)
    where
        F: FnMut(&IndexView, &[String]) -> bool,
    {
        self.clear_aggregates();
        let flags: Vec<bool> = self
            .groups
            .iter()
            .zip(&self.values)
            .map(|(g, v)| keep(g, v))
            .collect();
        let mut it = flags.iter();
        self.groups.retain(|_| *it.next().unwrap_or(&false));
        let mut it = flags.iter();
        self.values.retain(|_| *it.next().unwrap_or(&false));
    }

    /// Stable sort of the groups by a comparator over group positions.
    pub fn sort_by<F>(&mut self, mut compare: F)
    where
        F: FnMut(&Splits, usize, usize) -> Ordering,
    {
        self.clear_aggregates();
        let mut order: Vec<usize> = (0..self.groups.len()).collect();
        order.sort_by(|&a, &b| compare(self, a, b));
        self.groups = order.iter().map(|&i| self.groups[i].clone()).collect();
        self.values = order.iter().map(|&i| self.values[i].clone()).collect();
    }

    /// Sorts groups by their values, first level outermost.
    pub fn sort_levels(&mut self) {
        self.sort_by(|s, a, b| s.values[a].cmp(&s.values[b]));
    }

    fn check_level_indices(&self, levels: &[usize]) -> Result<()> {
        let mut seen = HashSet::new();
        for &l in levels {
            if l >= self.levels.len() || !seen.insert(l) {
                return Err(TableError::InvalidLevels(format!(
                    "level index {} is out of range or repeated ({} levels)",
                    l,
                    self.levels.len()
                )));
            }
        }
        Ok(())
    }

    /// Sorts groups by a subset of levels, in the given priority order.
    pub fn sort_order(&mut self, order: &[usize]) -> Result<()> {
        if order.is_empty() || order.len() > self.levels.len() {
            return Err(TableError::InvalidLevels(format!(
                "sort order needs 1 to {} levels, got {}",
                self.levels.len(),
                order.len()
            )));
        }
        self.check_level_indices(order)?;
        let order = order.to_vec();
        self.sort_by(|s, a, b| {
            order
                .iter()
                .map(|&l| s.values[a][l].cmp(&s.values[b][l]))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
        Ok(())
    }

    /// Moves level `i` to position `order[i]`, rewriting level names and
    /// group values. Groups keep their positions, so aggregates stay valid.
    pub fn reorder_levels(&mut self, order: &[usize]) -> Result<()> {
        if order.len() != self.levels.len() {
            return Err(TableError::InvalidLevels(format!(
                "reorder needs {} level positions, got {}",
                self.levels.len(),
                order.len()
            )));
        }
        self.check_level_indices(order)?;
        let reorder = |old: &[String]| {
            let mut new = old.to_vec();
            for (i, &to) in order.iter().enumerate() {
                new[to] = old[i].clone();
            }
            new
        };
        self.levels = reorder(&self.levels[..]);
        for v in &mut self.values {
            *v = reorder(&v[..]);
        }
        Ok(())
    }

    /// New splits keeping only `levels` (in that order). Groups that become
    /// equal under the reduced key are merged by concatenating their rows.
    /// Aggregates are not carried over.
    pub fn extract_levels(&self, levels: &[usize]) -> Result<Splits> {
        if levels.is_empty() || levels.len() >= self.levels.len() {
            return Err(TableError::InvalidLevels(format!(
                "extract needs 1 to {} levels, got {}",
                self.levels.len().saturating_sub(1),
                levels.len()
            )));
        }
        self.check_level_indices(levels)?;

        let mut sorted = Splits {
            aggs: Vec::new(),
            ..self.clone()
        };
        sorted.sort_order(levels)?;

        let names = levels.iter().map(|&l| self.levels[l].clone()).collect();
        let mut out = Splits::new(self.table.clone(), names);
        let mut current: Option<(Vec<String>, Vec<usize>)> = None;
        for (group, values) in sorted.groups.iter().zip(&sorted.values) {
            let key: Vec<String> = levels.iter().map(|&l| values[l].clone()).collect();
            let merge = matches!(&current, Some((k, _)) if *k == key);
            if merge {
                if let Some((_, rows)) = current.as_mut() {
                    rows.extend_from_slice(group.indices());
                }
            } else if let Some((k, rows)) = current.replace((key, group.indices().to_vec())) {
                out.push_group(k, rows);
            }
        }
        if let Some((k, rows)) = current {
            out.push_group(k, rows);
        }
        log::debug!("extracted {} of {} levels: {} -> {} groups", levels.len(), self.levels.len(), self.len(), out.len());
        Ok(out)
    }

    /// Runs `agg` on `column` for every group and records the results under
    /// the aggregation's name.
    pub fn add_aggregate(&mut self, column: &str, agg: Agg) -> Result<&SplitAgg> {
        let c = self.table.borrow().column_index(column)?;
        let values = self
            .groups
            .iter()
            .map(|g| agg_index(g, c, agg))
            .collect::<Result<Vec<_>>>()?;
        self.aggs.push(SplitAgg {
            name: agg.name().to_string(),
            column: c,
            values,
        });
        let last = self.aggs.len() - 1;
        Ok(&self.aggs[last])
    }

    /// Aggregate by its aggregation name alone, e.g. "Mean".
    pub fn aggregate_by_name(&self, name: &str) -> Result<&SplitAgg> {
        self.aggs
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| TableError::InvalidArgument(format!("no aggregate named '{}'", name)))
    }

    /// Aggregate by column name, optionally qualified as `column:Agg`.
    pub fn aggregate_by_column_name(&self, name: &str) -> Result<&SplitAgg> {
        let (column, agg_name) = match name.split_once(':') {
            Some((c, a)) => (c, Some(a)),
            None => (name, None),
        };
        let c = self.table.borrow().column_index(column)?;
        self.aggs
            .iter()
            .find(|a| a.column == c && agg_name.map_or(true, |n| a.name == n))
            .ok_or_else(|| TableError::InvalidArgument(format!("no aggregate for '{}'", name)))
    }

    fn aggregate_schema(&self, naming: AggNaming) -> Schema {
        let table = self.table.borrow();
        let mut specs: Vec<ColumnSpec> = self
            .levels
            .iter()
            .map(|l| ColumnSpec::scalar(l, ColumnType::String))
            .collect();
        for a in &self.aggs {
            let source = table.column(a.column);
            let mut name = table.column_name(a.column).to_string();
            if naming == AggNaming::WithAggName {
                name = format!("{}:{}", name, a.name);
            }
            specs.push(ColumnSpec::tensor(
                &name,
                ColumnType::Float64,
                source.cell_shape().to_vec(),
                Vec::new(),
            ));
        }
        Schema::new(specs)
    }

    fn fill_aggregates(&self, out: &mut Table) -> Result<()> {
        for (g, values) in self.values.iter().enumerate() {
            for (l, v) in values.iter().enumerate().take(self.levels.len()) {
                out.column_mut(l).set_string_1d(g, v)?;
            }
            for (k, a) in self.aggs.iter().enumerate() {
                let target = out.column_mut(self.levels.len() + k);
                let cell_size = target.cell_size();
                for (j, &v) in a.values[g].iter().enumerate().take(cell_size) {
                    target.set_float_1d(g * cell_size + j, v);
                }
            }
        }
        Ok(())
    }

    /// One row per group: level values as string columns followed by one
    /// float column per aggregate.
    pub fn to_table(&self, naming: AggNaming) -> Result<Table> {
        let mut out = Table::from_schema(&self.aggregate_schema(naming), self.len())?;
        self.fill_aggregates(&mut out)?;
        Ok(out)
    }

    /// Like `to_table`, plus every remaining source column filled from the
    /// first row of each group.
    pub fn to_table_with_first_rows(&self, naming: AggNaming) -> Result<Table> {
        let table = self.table.borrow();
        let mut used: HashSet<String> = self.levels.iter().cloned().collect();
        used.extend(self.aggs.iter().map(|a| table.column_name(a.column).to_string()));

        let source_schema = table.schema();
        let copied: Vec<&ColumnSpec> = source_schema
            .columns()
            .iter()
            .filter(|c| !used.contains(&c.name))
            .collect();
        let mut specs = self.aggregate_schema(naming).columns().to_vec();
        specs.extend(copied.iter().map(|c| (*c).clone()));

        let mut out = Table::from_schema(&Schema::new(specs), self.len())?;
        self.fill_aggregates(&mut out)?;
        for (g, group) in self.groups.iter().enumerate() {
            if let Some(&first) = group.indices().first() {
                for c in &copied {
                    out.copy_cell(&c.name, g, &table, first)?;
                }
            }
        }
        Ok(out)
    }
}

impl std::fmt::Debug for Splits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Splits")
            .field("levels", &self.levels)
            .field("values", &self.values)
            .field("sizes", &self.groups.iter().map(|g| g.len()).collect::<Vec<_>>())
            .field("aggs", &self.aggs.iter().map(|a| a.name.as_str()).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::CellTensor;

    fn shared_table() -> Rc<RefCell<Table>> {
        let mut table = Table::new();
        table
            .add_column("cond", CellTensor::from_strings(vec!["a", "a", "b", "b", "a", "b"]))
            .unwrap();
        table
            .add_column("run", CellTensor::from_strings(vec!["1", "2", "1", "2", "1", "1"]))
            .unwrap();
        table
            .add_column("err", CellTensor::from_f64s(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]))
            .unwrap();
        Rc::new(RefCell::new(table))
    }

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    /// Groups by (cond, run) laid out by hand.
    fn two_level() -> Splits {
        let mut s = Splits::new(shared_table(), strings(&["cond", "run"]));
        s.push_group(strings(&["b", "2"]), vec![3]);
        s.push_group(strings(&["a", "1"]), vec![0, 4]);
        s.push_group(strings(&["b", "1"]), vec![2, 5]);
        s.push_group(strings(&["a", "2"]), vec![1]);
        s
    }

    #[test]
    fn test_push_and_by_value() {
        let s = two_level();
        assert_eq!(s.len(), 4);
        assert_eq!(s.group(1).indices(), &[0, 4]);
        assert_eq!(s.by_value(&["a"]), vec![1, 3]);
        assert_eq!(s.by_value(&["", "1"]), vec![1, 2]);
        assert_eq!(s.by_value(&["b", "2"]), vec![0]);
        assert_eq!(s.by_value(&[]), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_sort_levels_and_order() {
        let mut s = two_level();
        s.sort_levels();
        assert_eq!(
            s.values(),
            &[strings(&["a", "1"]), strings(&["a", "2"]), strings(&["b", "1"]), strings(&["b", "2"])]
        );
        assert_eq!(s.group(0).indices(), &[0, 4]);

        s.sort_order(&[1]).unwrap();
        assert_eq!(
            s.values(),
            &[strings(&["a", "1"]), strings(&["b", "1"]), strings(&["a", "2"]), strings(&["b", "2"])]
        );
        assert!(matches!(s.sort_order(&[]), Err(TableError::InvalidLevels(_))));
        assert!(matches!(s.sort_order(&[2]), Err(TableError::InvalidLevels(_))));
    }

    #[test]
    fn test_aggregates_cleared_on_structure_change() {
        let mut s = two_level();
        s.add_aggregate("err", Agg::Mean).unwrap();
        assert_eq!(s.aggregates()[0].values, vec![vec![4.0], vec![3.0], vec![4.5], vec![2.0]]);

        s.delete(0);
        assert!(s.aggregates().is_empty());
        assert_eq!(s.len(), 3);

        s.add_aggregate("err", Agg::Sum).unwrap();
        s.filter(|g, _| g.len() > 1);
        assert!(s.aggregates().is_empty());
        assert_eq!(s.values(), &[strings(&["a", "1"]), strings(&["b", "1"])]);

        s.add_aggregate("err", Agg::Count).unwrap();
        s.sort_levels();
        assert!(s.aggregates().is_empty());

        s.add_aggregate("err", Agg::Count).unwrap();
        s.push_group(strings(&["c", "1"]), Vec::new());
        assert!(s.aggregates().is_empty());
    }

    #[test]
    fn test_reorder_levels_keeps_aggregates() {
        let mut s = two_level();
        s.add_aggregate("err", Agg::Max).unwrap();
        s.reorder_levels(&[1, 0]).unwrap();
        assert_eq!(s.levels(), &strings(&["run", "cond"]));
        assert_eq!(s.values()[0], strings(&["2", "b"]));
        assert_eq!(s.aggregates().len(), 1);

        assert!(matches!(s.reorder_levels(&[0]), Err(TableError::InvalidLevels(_))));
        assert!(matches!(s.reorder_levels(&[0, 0]), Err(TableError::InvalidLevels(_))));
    }

    #[test]
    fn test_extract_levels_merges_groups() {
        let mut s = two_level();
        s.add_aggregate("err", Agg::Mean).unwrap();
        let by_cond = s.extract_levels(&[0]).unwrap();
        assert_eq!(by_cond.levels(), &strings(&["cond"]));
        assert_eq!(by_cond.values(), &[strings(&["a"]), strings(&["b"])]);
        assert_eq!(by_cond.group(0).indices(), &[0, 4, 1]);
        // stable sort keeps ("b", "2") ahead of ("b", "1")
        assert_eq!(by_cond.group(1).indices(), &[3, 2, 5]);
        assert!(by_cond.aggregates().is_empty());
        // the source keeps its aggregates
        assert_eq!(s.aggregates().len(), 1);

        assert!(matches!(s.extract_levels(&[]), Err(TableError::InvalidLevels(_))));
        assert!(matches!(s.extract_levels(&[0, 1]), Err(TableError::InvalidLevels(_))));
        assert!(matches!(s.extract_levels(&[5]), Err(TableError::InvalidLevels(_))));
    }

    #[test]
    fn test_aggregate_lookup() {
        let mut s = two_level();
        s.add_aggregate("err", Agg::Mean).unwrap();
        s.add_aggregate("err", Agg::Std).unwrap();
        assert_eq!(s.aggregate_by_name("Std").unwrap().name, "Std");
        assert_eq!(s.aggregate_by_column_name("err").unwrap().name, "Mean");
        assert_eq!(s.aggregate_by_column_name("err:Std").unwrap().name, "Std");
        assert!(s.aggregate_by_column_name("err:Q1").is_err());
        assert!(matches!(
            s.aggregate_by_column_name("nope"),
            Err(TableError::ColumnNotFound(_))
        ));
        assert!(s.aggregate_by_name("Median").is_err());
    }

    #[test]
    fn test_to_table() {
        let mut s = two_level();
        s.sort_levels();
        s.add_aggregate("err", Agg::Mean).unwrap();
        s.add_aggregate("err", Agg::Max).unwrap();

        let t = s.to_table(AggNaming::WithAggName).unwrap();
        assert_eq!(t.column_names(), vec!["cond", "run", "err:Mean", "err:Max"]);
        assert_eq!(t.rows(), 4);
        assert_eq!(t.cell_string("cond", 2).unwrap(), "b");
        assert_eq!(t.cell_float("err:Mean", 0).unwrap(), 3.0);
        assert_eq!(t.cell_float("err:Max", 2).unwrap(), 6.0);

        // two aggregates of one column cannot share a bare column name
        assert!(matches!(
            s.to_table(AggNaming::ColumnNameOnly),
            Err(TableError::DuplicateColumn(_))
        ));
    }

    #[test]
    fn test_to_table_with_first_rows() {
        let mut s = Splits::new(shared_table(), strings(&["cond"]));
        s.push_group(strings(&["a"]), vec![1, 0, 4]);
        s.push_group(strings(&["b"]), vec![5, 2]);
        s.add_aggregate("err", Agg::Sum).unwrap();

        let t = s.to_table_with_first_rows(AggNaming::ColumnNameOnly).unwrap();
        assert_eq!(t.column_names(), vec!["cond", "err", "run"]);
        assert_eq!(t.cell_float("err", 0).unwrap(), 8.0);
        assert_eq!(t.cell_string("run", 0).unwrap(), "2");
        assert_eq!(t.cell_string("run", 1).unwrap(), "1");
    }

    #[test]
    fn test_empty_splits_to_table() {
        let s = Splits::new(shared_table(), strings(&["cond"]));
        let t = s.to_table(AggNaming::ColumnNameOnly).unwrap();
        assert_eq!(t.rows(), 0);
        assert_eq!(t.column_names(), vec!["cond"]);
    }
}
