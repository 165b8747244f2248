/// Basic Table Operations Example
///
/// This example demonstrates:
/// - Creating a table from a schema, including a tensor column
/// - Setting and reading scalar and tensor cells
/// - Nulls, metadata and JSON export

use celltable::{header, CellTensor, ColumnSpec, ColumnType, ColumnValue, Schema, Table, META_DESC};

fn main() -> celltable::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::new().default_filter_or("info")).init();

    println!("=== CellTable Basic Table Example ===\n");

    // 1. Create a schema
    println!("1. Creating schema...");
    let schema = Schema::new(vec![
        ColumnSpec::scalar("name", ColumnType::String),
        ColumnSpec::scalar("age", ColumnType::Int32),
        ColumnSpec::tensor("scores", ColumnType::Float32, vec![3], vec!["test".to_string()]),
    ]);
    println!("   Schema created with {} columns\n", schema.len());

    // 2. Create a table
    println!("2. Creating table...");
    let mut users = Table::from_schema(&schema, 3)?;
    users.set_name("users");
    users.set_meta(META_DESC, "example users");
    println!("   Table '{}' created with {} rows\n", users.name(), users.rows());

    // 3. Fill cells
    println!("3. Filling cells...");
    let people = [("Alice", 30, [0.9, 0.8, 0.95]), ("Bob", 0, [0.5, 0.6, 0.7]), ("Charlie", 25, [0.7, 0.75, 0.8])];
    for (row, (name, age, scores)) in people.iter().enumerate() {
        users.set_cell_string("name", row, name)?;
        users.set_cell_value("age", row, ColumnValue::Int32(*age))?;
        users.set_cell_tensor("scores", row, &CellTensor::from_f64s(scores.to_vec()))?;
    }
    users.set_null("age", 1)?;
    println!("   Filled {} rows\n", users.rows());

    // 4. Query data
    println!("4. Querying data...");
    for row in 0..users.rows() {
        let age = if users.is_null("age", row)? {
            "N/A".to_string()
        } else {
            users.cell_string("age", row)?
        };
        let scores = users.cell_tensor("scores", row)?;
        let values: Vec<f64> = (0..scores.len()).map(|i| scores.float_value_1d(i)).collect();
        println!("   Row {}: {} (age: {}) scores {:?}", row, users.cell_string("name", row)?, age, values);
    }
    println!();

    // 5. Grow the table
    println!("5. Adding a row...");
    let row = users.add_rows(1);
    users.set_cell_string("name", row, "Dana")?;
    users.set_cell_float("age", row, 41.0)?;
    println!("   Table now has {} rows\n", users.rows());

    // 6. Schema headers
    println!("6. Schema headers...");
    println!("   {}\n", header::schema_headers(&users.schema()).join(" "));

    // 7. JSON export
    println!("7. JSON export...");
    println!("{}\n", users.to_json()?);

    println!("=== Example Complete ===");
    Ok(())
}
