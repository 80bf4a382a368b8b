use litescan::planner::{
    error::PlannerError,
    parser::SqlParser,
    query::{Projection, QuerySpec},
};

fn parse(sql: &str) -> Result<QuerySpec, PlannerError> {
    SqlParser::new().parse_query(sql)
}

#[test]
fn test_select_with_equality_filter() -> Result<(), PlannerError> {
    assert_eq!(
        parse("SELECT name FROM apples WHERE color = 'yellow'")?,
        QuerySpec::select("apples", ["name"]).filter("color", "yellow")
    );
    Ok(())
}

#[test]
fn test_count_star_any_case() -> Result<(), PlannerError> {
    assert_eq!(parse("select count(*) from apples")?, QuerySpec::count("apples"));
    assert_eq!(parse("SELECT COUNT(*) FROM oranges")?.projection, Projection::CountStar);
    Ok(())
}

#[test]
fn test_select_star_and_limit() -> Result<(), PlannerError> {
    assert_eq!(
        parse("SELECT * FROM apples LIMIT 3")?,
        QuerySpec::select_all("apples").limit(3)
    );
    Ok(())
}

#[test]
fn test_literal_forms() -> Result<(), PlannerError> {
    let literal = |sql: &str| -> Result<String, PlannerError> {
        Ok(parse(sql)?.predicate.map(|p| p.literal).unwrap_or_default())
    };
    assert_eq!(literal("SELECT a FROM t WHERE id = 42")?, "42");
    assert_eq!(literal("SELECT a FROM t WHERE id = -7")?, "-7");
    assert_eq!(literal("SELECT a FROM t WHERE p = 1.5")?, "1.5");
    assert_eq!(literal("SELECT a FROM t WHERE c = \"Light Green\"")?, "Light Green");
    assert_eq!(literal("SELECT a FROM t WHERE (c = 'x')")?, "x");
    Ok(())
}

#[test]
fn test_multiple_columns() -> Result<(), PlannerError> {
    let spec = parse("SELECT id, name, color FROM apples")?;
    assert_eq!(
        spec.projection,
        Projection::Columns(vec!["id".into(), "name".into(), "color".into()])
    );
    assert_eq!(spec.predicate, None);
    Ok(())
}

#[test]
fn test_unsupported_where_clauses() {
    for sql in [
        "SELECT a FROM t WHERE a = 1 AND b = 2",
        "SELECT a FROM t WHERE a = 1 OR b = 2",
        "SELECT a FROM t WHERE a > 1",
    ] {
        assert!(
            matches!(parse(sql), Err(PlannerError::UnsupportedFeature(_))),
            "{sql}"
        );
    }
}

#[test]
fn test_unsupported_query_shapes() {
    for sql in [
        "SELECT a FROM t ORDER BY a",
        "SELECT a FROM t JOIN u ON t.id = u.id",
        "SELECT COUNT(*), a FROM t",
        "SELECT a FROM t UNION SELECT a FROM u",
        "SELECT a FROM t GROUP BY a",
        "SELECT DISTINCT a FROM t",
    ] {
        assert!(
            matches!(parse(sql), Err(PlannerError::UnsupportedFeature(_))),
            "{sql}"
        );
    }
}

#[test]
fn test_rejected_statements() {
    assert!(matches!(
        parse("INSERT INTO t VALUES (1)"),
        Err(PlannerError::UnsupportedStatement(_))
    ));
    assert!(matches!(
        parse("SELECT a FROM t; SELECT b FROM t"),
        Err(PlannerError::InvalidQuery(_))
    ));
    assert!(matches!(parse("SELECT a FROM t, u"), Err(PlannerError::InvalidQuery(_))));
    assert!(matches!(parse("SELEKT a FROM t"), Err(PlannerError::SqlParser(_))));
}
