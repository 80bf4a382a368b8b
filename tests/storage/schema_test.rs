use litescan::{
    storage::schema::{SchemaEntry, TableSchema},
    types::{
        SCHEMA_ROOT_PAGE,
        error::{DatabaseError, ErrorKind},
        page::PageType,
        record::Record,
        value::Value,
    },
    utils::mock::{DatabaseBuilder, TableFixture},
};

fn builder() -> DatabaseBuilder {
    DatabaseBuilder::new()
        .table(
            TableFixture::new(
                "apples",
                "CREATE TABLE apples\n(\n\tid integer primary key autoincrement,\n\tname text,\n\tcolor text\n)",
            )
            .row(vec![Value::Null, Value::from("Granny Smith"), Value::from("Light Green")]),
        )
        .table(TableFixture::new("sqlite_sequence", "CREATE TABLE sqlite_sequence(name,seq)"))
        .index("idx_apples_color", "apples", "CREATE INDEX idx_apples_color on apples (color)")
        .table(TableFixture::new("oranges", "CREATE TABLE oranges (id integer primary key, name text)"))
}

#[test]
fn test_entries_in_catalog_order() -> Result<(), DatabaseError> {
    let db = builder().build()?;
    let storage = db.open()?;
    let entries = storage.schema().entries()?;

    let summary: Vec<(&str, &str)> = entries
        .iter()
        .map(|entry| (entry.entry_type.as_str(), entry.name.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("table", "apples"),
            ("table", "sqlite_sequence"),
            ("index", "idx_apples_color"),
            ("table", "oranges"),
        ]
    );
    assert_eq!(entries[2].tbl_name, "apples");
    assert!(entries.iter().all(|entry| entry.root_page > SCHEMA_ROOT_PAGE));
    assert_eq!(storage.schema().tables()?.len(), 3);
    Ok(())
}

#[test]
fn test_find_matches_tables_exactly() -> Result<(), DatabaseError> {
    let db = builder().build()?;
    let storage = db.open()?;
    let catalog = storage.schema();

    let apples = catalog.find("apples")?;
    assert_eq!(apples.entry_type, "table");
    assert!(apples.sql.as_deref().is_some_and(|sql| sql.contains("color text")));

    for missing in ["pears", "APPLES", "idx_apples_color"] {
        let err = catalog.find(missing).unwrap_err();
        assert!(matches!(err, DatabaseError::TableNotFound { .. }), "{missing}");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
    Ok(())
}

#[test]
fn test_schema_spanning_several_pages() -> Result<(), DatabaseError> {
    let mut builder = DatabaseBuilder::new().max_leaf_cells(3).max_interior_cells(2);
    for i in 0..40 {
        builder = builder.table(
            TableFixture::new(format!("t{i}"), format!("CREATE TABLE t{i} (a text, b integer)"))
                .row(vec![Value::from(format!("row of t{i}")), Value::Integer(i)]),
        );
    }
    let db = builder.build()?;
    let storage = db.open()?;

    assert_eq!(storage.read_page(SCHEMA_ROOT_PAGE)?.page_type, PageType::InteriorTable);
    assert_eq!(storage.schema().tables()?.len(), 40);

    let schema = storage.schema().table_schema("t39")?;
    assert_eq!(schema.column_names(), vec!["a", "b"]);
    let mut rows = Vec::new();
    storage.btree(schema.root_page_id).traverse(|record| {
        rows.push(record);
        true
    })?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].values[0].render(), "row of t39");
    Ok(())
}

#[test]
fn test_table_schema_columns() -> Result<(), DatabaseError> {
    let schema = TableSchema::from_sql(
        "t",
        2,
        "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)",
    )?;
    assert_eq!(schema.column_index("name"), Some(1));
    assert_eq!(schema.column_index("NAME"), Some(1));
    assert_eq!(schema.column_index("missing"), None);
    assert!(schema.is_rowid_alias("id"));
    assert!(!schema.is_rowid_alias("name"));
    assert!(schema.columns[0].rowid_alias);
    assert!(!schema.columns[1].rowid_alias);
    Ok(())
}

#[test]
fn test_quoted_column_names() -> Result<(), DatabaseError> {
    let schema = TableSchema::from_sql(
        "q",
        2,
        r#"CREATE TABLE q ("first" text, [second] int, `third` blob, 'fourth')"#,
    )?;
    assert_eq!(schema.column_names(), vec!["first", "second", "third", "fourth"]);
    Ok(())
}

#[test]
fn test_unknown_column() -> Result<(), DatabaseError> {
    let schema = TableSchema::from_sql("t", 2, "CREATE TABLE t (a, b)")?;
    let err = schema.resolve_column("c").unwrap_err();
    assert!(matches!(
        err,
        DatabaseError::ColumnNotFound { ref name, ref table } if name == "c" && table == "t"
    ));
    Ok(())
}

#[test]
fn test_ddl_without_column_list() {
    let err = TableSchema::from_sql("v", 2, "CREATE VIEW v AS SELECT 1").unwrap_err();
    assert!(matches!(err, DatabaseError::MalformedSchema { .. }));
}

#[test]
fn test_schema_entry_requires_five_columns() {
    let record = Record::new(1, vec![Value::from("table"), Value::from("t")]);
    let err = SchemaEntry::from_record(&record).unwrap_err();
    assert!(matches!(err, DatabaseError::MalformedSchema { .. }));

    let record = Record::new(
        1,
        vec![
            Value::from("table"),
            Value::from("t"),
            Value::from("t"),
            Value::from("two"),
            Value::Null,
        ],
    );
    assert!(SchemaEntry::from_record(&record).is_err());
}

#[test]
fn test_schema_entry_rootpage() -> Result<(), DatabaseError> {
    let entry = |rootpage: Value| {
        SchemaEntry::from_record(&Record::new(
            1,
            vec![
                Value::from("view"),
                Value::from("v"),
                Value::from("v"),
                rootpage,
                Value::Null,
            ],
        ))
    };

    assert_eq!(entry(Value::Integer(4))?.root_page, 4);
    assert_eq!(entry(Value::Null)?.root_page, 0);
    for bad in [Value::Integer(-1), Value::Real(2.0), Value::from("2")] {
        let err = entry(bad).unwrap_err();
        assert!(matches!(err, DatabaseError::MalformedSchema { .. }));
    }
    Ok(())
}
