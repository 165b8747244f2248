use celltable::{agg, group_by, Agg, CellTensor, ColumnType, IndexView, SortOrder, Table};
use proptest::prelude::*;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

fn keyed_view(keys: &[String], values: &[f64]) -> IndexView {
    let mut table = Table::new();
    table
        .add_column("key", CellTensor::from_strings(keys.to_vec()))
        .unwrap();
    table
        .add_column("value", CellTensor::from_f64s(values.to_vec()))
        .unwrap();
    IndexView::new(Rc::new(RefCell::new(table)))
}

fn rows_strategy() -> impl Strategy<Value = (Vec<String>, Vec<f64>)> {
    (1usize..40).prop_flat_map(|n| {
        (
            proptest::collection::vec("[a-d]", n),
            proptest::collection::vec(-1.0e6..1.0e6f64, n),
        )
    })
}

/// Key codes 0..4 are numbers, 4 is NaN and 5 is null.
fn sparse_view(codes: &[u8]) -> IndexView {
    let values = codes
        .iter()
        .map(|&c| if c == 4 { f64::NAN } else { f64::from(c) })
        .collect();
    let mut table = Table::new();
    table.add_column("k", CellTensor::from_f64s(values)).unwrap();
    for (row, _) in codes.iter().enumerate().filter(|(_, c)| **c == 5) {
        table.set_null("k", row).unwrap();
    }
    IndexView::new(Rc::new(RefCell::new(table)))
}

#[derive(Debug, Clone)]
enum Resize {
    AddColumn(usize),
    SetRows(usize),
    AddRows(usize),
}

fn resize_strategy() -> impl Strategy<Value = Resize> {
    prop_oneof![
        (1usize..4).prop_map(Resize::AddColumn),
        (0usize..20).prop_map(Resize::SetRows),
        (0usize..5).prop_map(Resize::AddRows),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        rng_seed: proptest::test_runner::RngSeed::Fixed(0),
        failure_persistence: None,
        .. ProptestConfig::default()
    })]

    #[test]
    fn columns_track_row_count(ops in proptest::collection::vec(resize_strategy(), 1..12)) {
        let mut table = Table::new();
        for (i, op) in ops.iter().enumerate() {
            match op {
                Resize::AddColumn(cell) => {
                    let rows = table.rows().max(1);
                    let tensor = CellTensor::new(ColumnType::Float64, &[rows, *cell], &[]);
                    table.add_column(&format!("c{}", i), tensor).unwrap();
                }
                Resize::SetRows(n) => table.set_row_count(*n),
                Resize::AddRows(n) => {
                    table.add_rows(*n);
                }
            }
            for c in 0..table.num_columns() {
                prop_assert_eq!(table.column(c).rows(), table.rows().max(1));
            }
        }
    }

    #[test]
    fn sorting_a_clone_leaves_original(( keys, values) in rows_strategy()) {
        let mut view = keyed_view(&keys, &values);
        view.filter(|t, row| t.column(1).float_value_1d(row) > -5.0e5);
        let before = view.indices().to_vec();
        let mut copy = view.clone();
        copy.sort_by_column("value", SortOrder::Descending).unwrap();
        prop_assert_eq!(view.indices(), &before[..]);
    }

    #[test]
    fn filter_is_idempotent((keys, values) in rows_strategy(), threshold in -1.0e6..1.0e6f64) {
        let mut once = keyed_view(&keys, &values);
        once.filter(|t, row| t.column(1).float_value_1d(row) < threshold);
        let mut twice = once.clone();
        twice.filter(|t, row| t.column(1).float_value_1d(row) < threshold);
        prop_assert_eq!(once.indices(), twice.indices());
    }

    #[test]
    fn sort_orders_adjacent_rows((keys, values) in rows_strategy(), descending in any::<bool>()) {
        let order = if descending { SortOrder::Descending } else { SortOrder::Ascending };
        let mut view = keyed_view(&keys, &values);
        view.sort_by_columns(&["key", "value"], order).unwrap();
        let table = view.borrow_table();
        for pair in view.indices().windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let cmp = table.column(0).string_value_1d(a).cmp(&table.column(0).string_value_1d(b))
                .then(table.column(1).float_value_1d(a)
                    .partial_cmp(&table.column(1).float_value_1d(b))
                    .unwrap_or(Ordering::Equal));
            if descending {
                prop_assert!(cmp != Ordering::Less);
            } else {
                prop_assert!(cmp != Ordering::Greater);
            }
        }
    }

    #[test]
    fn quantile_bounds_are_min_and_max((keys, values) in rows_strategy()) {
        let view = keyed_view(&keys, &values);
        let qs = agg::quantiles(&view, "value", &[0.0, 1.0]).unwrap();
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        prop_assert_eq!(qs, vec![min, max]);
    }

    #[test]
    fn groups_cover_every_row((keys, values) in rows_strategy()) {
        let mut view = keyed_view(&keys, &values);
        view.filter(|t, row| t.column(1).float_value_1d(row) >= 0.0);
        let splits = group_by(&view, &["key"]).unwrap();
        let total: usize = splits.groups().iter().map(|g| g.len()).sum();
        prop_assert_eq!(total, view.len());
        prop_assert_eq!(splits.values().len(), splits.len());
    }

    #[test]
    fn missing_keys_sort_last_and_group_once(codes in proptest::collection::vec(0u8..6, 1..40)) {
        let mut view = sparse_view(&codes);
        view.sort_by_column("k", SortOrder::Ascending).unwrap();
        let sorted: Vec<u8> = view.indices().iter().map(|&row| codes[row]).collect();
        for pair in sorted.windows(2) {
            prop_assert!(pair[0] <= pair[1], "out of order: {:?}", sorted);
        }

        let splits = group_by(&view, &["k"]).unwrap();
        let mut distinct = codes.clone();
        distinct.sort_unstable();
        distinct.dedup();
        prop_assert_eq!(splits.len(), distinct.len());
        let total: usize = splits.groups().iter().map(|g| g.len()).sum();
        prop_assert_eq!(total, codes.len());
    }

    #[test]
    fn aggregates_stay_aligned((keys, values) in rows_strategy()) {
        let view = keyed_view(&keys, &values);
        let mut splits = group_by(&view, &["key"]).unwrap();
        splits.add_aggregate("value", Agg::Mean).unwrap();
        splits.add_aggregate("value", Agg::Count).unwrap();
        for a in splits.aggregates() {
            prop_assert_eq!(a.values.len(), splits.len());
        }
        splits.filter(|g, _| g.len() > 1);
        prop_assert!(splits.aggregates().is_empty());
    }
}

#[test]
fn median_of_four_interpolates() {
    let keys: Vec<String> = vec!["a".into(); 4];
    let view = keyed_view(&keys, &[4.0, 1.0, 3.0, 2.0]);
    assert_eq!(agg::median(&view, "value").unwrap(), vec![2.5]);
}
