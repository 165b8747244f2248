/// Grouping Example
///
/// This example demonstrates:
/// - Grouping a view by columns and by a key function
/// - Adding aggregates and flattening them into a summary table
/// - Reordering and extracting grouping levels
/// - Random train/test splits and descriptive statistics

use celltable::{describe_all, group, Agg, AggNaming, CellTensor, ColumnType, IndexView, Table};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cell::RefCell;
use std::rc::Rc;

fn print_table(table: &Table) {
    let names = table.column_names();
    println!("   {}", names.join(" | "));
    for row in 0..table.rows() {
        let cells: Vec<String> = (0..table.num_columns())
            .map(|c| {
                let column = table.column(c);
                let size = column.cell_size();
                let parts: Vec<String> = (0..size)
                    .map(|k| {
                        let i = row * size + k;
                        if column.column_type() == ColumnType::String {
                            column.string_value_1d(i)
                        } else {
                            format!("{:.3}", column.float_value_1d(i))
                        }
                    })
                    .collect();
                parts.join(",")
            })
            .collect();
        println!("   {}", cells.join(" | "));
    }
}

fn main() -> celltable::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::new().default_filter_or("debug")).init();

    println!("=== CellTable Grouping Example ===\n");

    // 1. Simulation results: condition, run, error and a 2-unit activation
    println!("1. Creating results table...");
    let conds = ["fast", "slow", "fast", "slow", "fast", "slow", "fast", "slow"];
    let mut table = Table::new();
    table.add_column("cond", CellTensor::from_strings(conds.to_vec()))?;
    table.add_column("run", CellTensor::from_i64s(vec![0, 0, 1, 1, 0, 0, 1, 1]))?;
    table.add_column("err", CellTensor::from_f64s(vec![0.2, 0.4, 0.1, 0.5, 0.3, 0.35, 0.15, 0.45]))?;
    let mut act = CellTensor::new(ColumnType::Float32, &[8, 2], &[]);
    for i in 0..act.len() {
        act.set_float_1d(i, (i % 5) as f64 / 4.0);
    }
    table.add_column("act", act)?;
    let view = IndexView::new(Rc::new(RefCell::new(table)));
    println!("   {} rows\n", view.len());

    // 2. Group by two columns
    println!("2. Grouping by cond and run...");
    let mut splits = group::group_by(&view, &["cond", "run"])?;
    splits.add_aggregate("err", Agg::Mean)?;
    splits.add_aggregate("act", Agg::Mean)?;
    print_table(&splits.to_table(AggNaming::WithAggName)?);
    println!();

    // 3. Collapse the run level
    println!("3. Extracting the cond level...");
    let mut by_cond = splits.extract_levels(&[0])?;
    group::describe(&mut by_cond, "err")?;
    print_table(&by_cond.to_table(AggNaming::WithAggName)?);
    println!();

    // 4. Put run first
    println!("4. Reordering levels to run, cond...");
    splits.reorder_levels(&[1, 0])?;
    splits.sort_levels();
    splits.add_aggregate("err", Agg::Max)?;
    print_table(&splits.to_table(AggNaming::WithAggName)?);
    println!();

    // 5. Group by a computed key
    println!("5. Grouping by error band...");
    let mut bands = group::group_by_func(&view, |t, row| {
        let err = t.column(2).float_value_1d(row);
        vec![if err < 0.3 { "low" } else { "high" }.to_string()]
    })?;
    bands.set_levels(vec!["band".to_string()]);
    group::aggregate(&mut bands, "err", Agg::Count)?;
    print_table(&bands.to_table(AggNaming::ColumnNameOnly)?);
    println!();

    // 6. Random split
    println!("6. Random 75/25 split...");
    let mut rng = StdRng::seed_from_u64(2024);
    let mut halves = group::permuted(&view, &[0.75, 0.25], Some(&["train", "test"]), &mut rng)?;
    group::aggregate_all_numeric(&mut halves, Agg::Mean)?;
    print_table(&halves.to_table(AggNaming::WithAggName)?);
    println!();

    // 7. Describe everything
    println!("7. Descriptive statistics...");
    print_table(&describe_all(&view)?);
    println!();

    println!("=== Example Complete ===");
    Ok(())
}
