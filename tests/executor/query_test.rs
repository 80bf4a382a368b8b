use litescan::{
    config::OutputMode,
    executor::query::{QueryContext, QueryExecutor, QueryOutput},
    planner::query::QuerySpec,
    types::{
        error::{DatabaseError, ErrorKind},
        value::Value,
    },
    utils::mock::{DatabaseBuilder, TableFixture},
};

use crate::fixtures::orchard;

fn lines(spec: &QuerySpec) -> Result<Vec<String>, DatabaseError> {
    let db = orchard().build()?;
    let storage = db.open()?;
    Ok(QueryExecutor::new(&storage).execute(spec)?.to_lines("|"))
}

#[test]
fn test_filter_and_project() -> Result<(), DatabaseError> {
    let spec = QuerySpec::select("apples", ["name"]).filter("color", "yellow");
    assert_eq!(lines(&spec)?, vec!["Banana"]);
    Ok(())
}

#[test]
fn test_count_star() -> Result<(), DatabaseError> {
    let db = orchard().build()?;
    let storage = db.open()?;
    let output = QueryExecutor::new(&storage).execute(&QuerySpec::count("apples"))?;
    assert_eq!(output, QueryOutput::Count(2));
    assert_eq!(output.to_lines("|"), vec!["2"]);
    Ok(())
}

#[test]
fn test_count_ignores_predicate() -> Result<(), DatabaseError> {
    // COUNT(*) counts leaf cells without decoding, so WHERE never narrows it
    for color in ["red", "yellow", "blue"] {
        let spec = QuerySpec::count("apples").filter("color", color);
        assert_eq!(lines(&spec)?, vec!["2"], "{color}");
    }
    let spec = QuerySpec::count("apples").filter("taste", "sweet");
    assert_eq!(lines(&spec)?, vec!["2"]);
    Ok(())
}

#[test]
fn test_rowid_alias_reads_rowid() -> Result<(), DatabaseError> {
    let spec = QuerySpec::select("apples", ["id", "name"]);
    assert_eq!(lines(&spec)?, vec!["1|Apple", "2|Banana"]);

    let spec = QuerySpec::select("apples", ["name"]).filter("id", "2");
    assert_eq!(lines(&spec)?, vec!["Banana"]);
    Ok(())
}

#[test]
fn test_select_all_columns() -> Result<(), DatabaseError> {
    assert_eq!(
        lines(&QuerySpec::select_all("apples"))?,
        vec!["1|Apple|red", "2|Banana|yellow"]
    );
    Ok(())
}

#[test]
fn test_projection_order_and_case() -> Result<(), DatabaseError> {
    let spec = QuerySpec::select("apples", ["COLOR", "Name"]);
    assert_eq!(lines(&spec)?, vec!["red|Apple", "yellow|Banana"]);
    Ok(())
}

#[test]
fn test_limit() -> Result<(), DatabaseError> {
    assert_eq!(lines(&QuerySpec::select("apples", ["name"]).limit(1))?, vec!["Apple"]);
    assert!(lines(&QuerySpec::select("apples", ["name"]).limit(0))?.is_empty());
    assert_eq!(lines(&QuerySpec::select("apples", ["name"]).limit(10))?.len(), 2);
    Ok(())
}

#[test]
fn test_where_compares_rendered_text() -> Result<(), DatabaseError> {
    let spec = QuerySpec::select("prices", ["item"]).filter("price", "1.5");
    assert!(lines(&spec)?.is_empty());

    let spec = QuerySpec::select("prices", ["item"]).filter("price", "1.500000");
    assert_eq!(lines(&spec)?, vec!["pear"]);

    let spec = QuerySpec::select("prices", ["item"]).filter("stock", "-3");
    assert_eq!(lines(&spec)?, vec!["plum"]);
    Ok(())
}

#[test]
fn test_short_record_reads_null() -> Result<(), DatabaseError> {
    let spec = QuerySpec::select("prices", ["item", "stock", "price"]);
    assert_eq!(
        lines(&spec)?,
        vec!["pear|12|1.500000", "plum|-3|2.000000", "fig||4.250000"]
    );

    let spec = QuerySpec::select("prices", ["item"]).filter("stock", "");
    assert_eq!(lines(&spec)?, vec!["fig"]);
    Ok(())
}

#[test]
fn test_unknown_table_and_columns() -> Result<(), DatabaseError> {
    let db = orchard().build()?;
    let storage = db.open()?;
    let executor = QueryExecutor::new(&storage);

    let err = executor.execute(&QuerySpec::count("pears")).unwrap_err();
    assert!(matches!(err, DatabaseError::TableNotFound { .. }));

    let err = executor
        .execute(&QuerySpec::select("apples", ["taste"]))
        .unwrap_err();
    assert!(matches!(err, DatabaseError::ColumnNotFound { .. }));

    let err = executor
        .execute(&QuerySpec::select("apples", ["name"]).filter("taste", "sweet"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // indexes are not tables
    let err = executor
        .execute(&QuerySpec::count("idx_apples_color"))
        .unwrap_err();
    assert!(matches!(err, DatabaseError::TableNotFound { .. }));
    Ok(())
}

#[test]
fn test_multi_level_table() -> Result<(), DatabaseError> {
    let table = TableFixture::new("readings", "CREATE TABLE readings (id integer primary key, n integer)")
        .generated_rows(300, |i| vec![Value::Null, Value::Integer(i as i64 * 10)]);
    let db = DatabaseBuilder::new()
        .max_leaf_cells(5)
        .max_interior_cells(4)
        .table(table)
        .build()?;
    let storage = db.open()?;
    let executor = QueryExecutor::new(&storage);

    assert_eq!(
        executor.execute(&QuerySpec::count("readings"))?,
        QueryOutput::Count(300)
    );
    let output = executor.execute(&QuerySpec::select("readings", ["id"]).filter("n", "1500"))?;
    assert_eq!(output.to_lines("|"), vec!["150"]);

    let output = executor.execute(&QuerySpec::select("readings", ["id"]))?;
    assert_eq!(output.row_count(), 300);
    assert_eq!(output.to_lines("|").last().map(String::as_str), Some("300"));
    Ok(())
}

#[test]
fn test_overflow_row_fails_the_query() -> Result<(), DatabaseError> {
    let table = TableFixture::new("notes", "CREATE TABLE notes (body text)")
        .row(vec![Value::from("y".repeat(8_000))]);
    let db = DatabaseBuilder::new().table(table).build()?;
    let storage = db.open()?;

    let err = QueryExecutor::new(&storage)
        .execute(&QuerySpec::select_all("notes"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedFeature);
    Ok(())
}

#[test]
fn test_streaming_rows() -> Result<(), DatabaseError> {
    let db = orchard().build()?;
    let storage = db.open()?;
    let mut rows = Vec::new();
    let columns = QueryExecutor::new(&storage).for_each_row(
        &QuerySpec::select("apples", ["name", "id"]),
        |row| {
            rows.push(row);
            Ok(())
        },
    )?;

    assert_eq!(columns, vec!["name", "id"]);
    assert_eq!(
        rows,
        vec![
            vec![Value::from("Apple"), Value::Integer(1)],
            vec![Value::from("Banana"), Value::Integer(2)],
        ]
    );
    Ok(())
}

#[test]
fn test_output_modes() -> Result<(), DatabaseError> {
    let db = orchard().build()?;
    let storage = db.open()?;
    let output = QueryExecutor::new(&storage).execute(&QuerySpec::select_all("prices").limit(1))?;

    assert_eq!(output.to_lines("\t"), vec!["pear\t1.500000\t12"]);

    let mut buffer = Vec::new();
    output.write_to(&mut buffer, OutputMode::List, ",")?;
    assert_eq!(String::from_utf8_lossy(&buffer), "pear,1.500000,12\n");

    let mut buffer = Vec::new();
    output.write_to(&mut buffer, OutputMode::Json, "|")?;
    assert_eq!(String::from_utf8_lossy(&buffer), "[\"pear\",1.5,12]\n");

    let mut buffer = Vec::new();
    QueryOutput::Count(7).write_to(&mut buffer, OutputMode::Json, "|")?;
    assert_eq!(String::from_utf8_lossy(&buffer), "7\n");
    Ok(())
}

#[test]
fn test_query_context_resolution() -> Result<(), DatabaseError> {
    let db = orchard().build()?;
    let storage = db.open()?;
    let schema = storage.schema().table_schema("apples")?;
    let context = QueryContext::resolve(
        schema,
        &QuerySpec::select("apples", ["color", "id"]).filter("name", "Apple"),
    )?;

    assert_eq!(context.column_names(), vec!["color", "id"]);
    assert_eq!(context.columns[0].index, 2);
    assert!(context.columns[1].rowid_alias);
    assert_eq!(context.predicate.as_ref().map(|p| p.column.index), Some(1));
    assert_eq!(context.limit, None);
    Ok(())
}

#[test]
fn test_write_results_streams_rows() -> Result<(), DatabaseError> {
    let db = orchard().build()?;
    let storage = db.open()?;
    let executor = QueryExecutor::new(&storage);
    let spec = QuerySpec::select("apples", ["id", "name"]);

    let mut buffer = Vec::new();
    let written = executor.write_results(&spec, &mut buffer, OutputMode::List, "|")?;
    assert_eq!(written, 2);
    assert_eq!(String::from_utf8_lossy(&buffer), "1|Apple\n2|Banana\n");

    let mut buffer = Vec::new();
    executor.write_results(&spec.clone().limit(1), &mut buffer, OutputMode::Json, "|")?;
    assert_eq!(String::from_utf8_lossy(&buffer), "[1,\"Apple\"]\n");

    let mut buffer = Vec::new();
    let written = executor.write_results(
        &QuerySpec::count("apples").filter("color", "red"),
        &mut buffer,
        OutputMode::Json,
        "|",
    )?;
    assert_eq!(written, 1);
    assert_eq!(String::from_utf8_lossy(&buffer), "2\n");
    Ok(())
}

#[test]
fn test_sink_error_stops_scan() -> Result<(), DatabaseError> {
    let db = orchard().build()?;
    let storage = db.open()?;
    let mut seen = 0;
    let err = QueryExecutor::new(&storage)
        .for_each_row(&QuerySpec::select_all("apples"), |_| {
            seen += 1;
            Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe).into())
        })
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Io);
    assert_eq!(seen, 1);
    Ok(())
}
