/// Performance Example
///
/// This example demonstrates:
/// - Cost of view operations compared to materializing data
/// - Scalar and tensor column reductions
/// - Group-by over a large table

use celltable::{agg, group, Agg, AggNaming, CellTensor, ColumnType, IndexView, SortOrder, Table};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

fn main() -> celltable::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::new().default_filter_or("info")).init();

    println!("=== CellTable Performance Example ===\n");

    let n = 100_000;
    let mut rng = StdRng::seed_from_u64(7);

    // 1. Build the table
    println!("1. Building a {} row table", n);
    let start = Instant::now();
    let mut table = Table::new();
    table.add_column(
        "cond",
        CellTensor::from_strings((0..n).map(|i| format!("c{:02}", i % 50)).collect::<Vec<_>>()),
    )?;
    table.add_column("value", CellTensor::from_f64s((0..n).map(|_| rng.gen::<f64>()).collect()))?;
    let mut image = CellTensor::new(ColumnType::Float32, &[n, 8, 8], &[]);
    for i in 0..image.len() {
        image.set_float_1d(i, rng.gen::<f64>());
    }
    table.add_column("image", image)?;
    let table = Rc::new(RefCell::new(table));
    println!("   Built in {:?}\n", start.elapsed());

    // 2. Views only touch indices
    println!("2. View operations");
    let mut view = IndexView::new(table.clone());
    let start = Instant::now();
    view.sort_by_column("value", SortOrder::Ascending)?;
    println!("   Sort by value: {:?}", start.elapsed());

    let start = Instant::now();
    view.filter(|t, row| t.column(1).float_value_1d(row) > 0.5);
    println!("   Filter value > 0.5 ({} rows left): {:?}", view.len(), start.elapsed());

    let start = Instant::now();
    let baked = view.materialize()?;
    println!("   Materialize {} rows: {:?}\n", baked.rows(), start.elapsed());

    // 3. Reductions
    println!("3. Reductions");
    let start = Instant::now();
    let mean = agg::mean(&view, "value")?;
    println!("   Mean of value {:.4}: {:?}", mean[0], start.elapsed());

    let start = Instant::now();
    let quartiles = agg::quantiles(&view, "value", &[0.25, 0.5, 0.75])?;
    println!("   Quartiles {:?}: {:?}", quartiles, start.elapsed());

    let start = Instant::now();
    let image_mean = agg::mean(&view, "image")?;
    println!("   Per-pixel mean over {} cells: {:?}\n", image_mean.len(), start.elapsed());

    // 4. Grouping
    println!("4. Grouping");
    let start = Instant::now();
    let mut splits = group::group_by(&view, &["cond"])?;
    println!("   Group by cond ({} groups): {:?}", splits.len(), start.elapsed());

    let start = Instant::now();
    splits.add_aggregate("value", Agg::Std)?;
    splits.add_aggregate("image", Agg::Mean)?;
    let summary = splits.to_table(AggNaming::WithAggName)?;
    println!("   Aggregate and flatten ({} rows): {:?}\n", summary.rows(), start.elapsed());

    println!("=== Example Complete ===");
    Ok(())
}
