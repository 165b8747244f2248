/// Views Example
///
/// This example demonstrates:
/// - Sorting an IndexView by one or more columns
/// - Filtering by predicate and by string match
/// - Cloning views without touching the shared table
/// - Materializing a view into a standalone table

use celltable::{agg, CellTensor, FilterOptions, IndexView, SortOrder, Table};
use std::cell::RefCell;
use std::rc::Rc;

fn print_view(label: &str, view: &IndexView) {
    let table = view.borrow_table();
    println!("   {} ({} rows):", label, view.len());
    for &row in view.indices() {
        println!(
            "     {:<10} {:<12} {:>8.2} {:>4}",
            table.column(0).string_value_1d(row),
            table.column(1).string_value_1d(row),
            table.column(2).float_value_1d(row),
            table.column(3).string_value_1d(row),
        );
    }
}

fn main() -> celltable::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::new().default_filter_or("info")).init();

    println!("=== CellTable Views Example ===\n");

    // 1. Create a sales table
    println!("1. Creating sales table...");
    let items = vec![
        ("Laptop", "Electronics", 999.99, 5),
        ("Mouse", "Electronics", 29.99, 20),
        ("Desk", "Furniture", 299.99, 3),
        ("Chair", "Furniture", 199.99, 8),
        ("Monitor", "Electronics", 399.99, 10),
    ];
    let mut table = Table::new();
    table.add_column("product", CellTensor::from_strings(items.iter().map(|i| i.0).collect::<Vec<_>>()))?;
    table.add_column("category", CellTensor::from_strings(items.iter().map(|i| i.1).collect::<Vec<_>>()))?;
    table.add_column("price", CellTensor::from_f64s(items.iter().map(|i| i.2).collect()))?;
    table.add_column("quantity", CellTensor::from_i64s(items.iter().map(|i| i.3).collect()))?;
    let table = Rc::new(RefCell::new(table));
    println!("   Added {} products\n", table.borrow().rows());

    // 2. Sort by price
    println!("2. Sorting by price (descending)...");
    let mut by_price = IndexView::new(table.clone());
    by_price.sort_by_column("price", SortOrder::Descending)?;
    print_view("by price", &by_price);
    println!();

    // 3. Sort by category, then quantity
    println!("3. Sorting by category, then quantity...");
    let mut by_category = IndexView::new(table.clone());
    by_category.sort_stable_by_columns(&["category", "quantity"], SortOrder::Ascending)?;
    print_view("by category", &by_category);
    println!();

    // 4. Filter with a predicate on a clone
    println!("4. Filtering a clone to quantity >= 8...");
    let mut busy = by_price.clone();
    busy.filter(|t, row| t.column(3).float_value_1d(row) >= 8.0);
    print_view("busy", &busy);
    println!("   original still has {} rows\n", by_price.len());

    // 5. Filter by string
    println!("5. Filtering products containing 'o' (case-insensitive)...");
    let mut with_o = IndexView::new(table.clone());
    with_o.filter_column(
        "product",
        "O",
        FilterOptions {
            contains: true,
            ignore_case: true,
            ..Default::default()
        },
    )?;
    print_view("contains o", &with_o);
    println!();

    // 6. Aggregates over a view
    println!("6. Aggregating the busy view...");
    println!("   mean price: {:?}", agg::mean(&busy, "price")?);
    println!("   total quantity: {:?}", agg::sum(&busy, "quantity")?);
    println!("   median price: {:?}\n", agg::median(&busy, "price")?);

    // 7. Materialize
    println!("7. Materializing the busy view...");
    let baked = busy.materialize()?;
    println!("   new table has {} rows, first product '{}'\n", baked.rows(), baked.cell_string("product", 0)?);

    // 8. Shrinking the table leaves stale views
    println!("8. Shrinking the table...");
    table.borrow_mut().set_row_count(3);
    println!("   by_price stale: {}", by_price.is_stale());
    let dropped = by_price.drop_invalid();
    println!("   dropped {} indices, {} remain\n", dropped, by_price.len());

    println!("=== Example Complete ===");
    Ok(())
}
