use crate::planner::{
    error::PlannerError,
    query::{EqualityPredicate, Projection, QuerySpec},
};
use sqlparser::{
    ast::{
        BinaryOperator, Expr, Function, FunctionArg, FunctionArgExpr, FunctionArguments,
        GroupByExpr, Query, Select, SelectItem, SetExpr, Statement, TableFactor, UnaryOperator,
        Value as SqlValue,
    },
    dialect::SQLiteDialect,
    parser::Parser,
};

/// Translates `SELECT <* | COUNT(*) | col, ...> FROM <table> [WHERE <col> = <literal>] [LIMIT n]`
/// into a [`QuerySpec`]. Nothing outside this module sees sqlparser types.
pub struct SqlParser;

impl SqlParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_query(&self, sql: &str) -> Result<QuerySpec, PlannerError> {
        let dialect = SQLiteDialect {};
        let statements = Parser::parse_sql(&dialect, sql)?;

        if statements.len() != 1 {
            return Err(PlannerError::InvalidQuery(
                "Expected exactly one statement".to_string(),
            ));
        }

        match &statements[0] {
            Statement::Query(query) => self.query_to_spec(query),
            other => Err(PlannerError::UnsupportedStatement(other.to_string())),
        }
    }

    fn query_to_spec(&self, query: &Query) -> Result<QuerySpec, PlannerError> {
        if query.with.is_some() {
            return Err(PlannerError::UnsupportedFeature("WITH clause".to_string()));
        }
        if query.order_by.is_some() {
            return Err(PlannerError::UnsupportedFeature("ORDER BY".to_string()));
        }
        if query.offset.is_some() {
            return Err(PlannerError::UnsupportedFeature("OFFSET".to_string()));
        }

        let SetExpr::Select(select) = query.body.as_ref() else {
            return Err(PlannerError::UnsupportedFeature(
                "compound or non-SELECT query body".to_string(),
            ));
        };

        if select.distinct.is_some() {
            return Err(PlannerError::UnsupportedFeature("DISTINCT".to_string()));
        }
        if !matches!(&select.group_by, GroupByExpr::Expressions(exprs, _) if exprs.is_empty()) {
            return Err(PlannerError::UnsupportedFeature("GROUP BY".to_string()));
        }
        if select.having.is_some() {
            return Err(PlannerError::UnsupportedFeature("HAVING".to_string()));
        }

        let limit = query.limit.as_ref().map(parse_limit).transpose()?;

        Ok(QuerySpec {
            table: self.table_name(select)?,
            projection: self.projection(select)?,
            predicate: select.selection.as_ref().map(parse_predicate).transpose()?,
            limit,
        })
    }

    fn table_name(&self, select: &Select) -> Result<String, PlannerError> {
        let [from] = select.from.as_slice() else {
            return Err(PlannerError::InvalidQuery(
                "Expected exactly one table in FROM".to_string(),
            ));
        };
        if !from.joins.is_empty() {
            return Err(PlannerError::UnsupportedFeature("JOIN".to_string()));
        }
        match &from.relation {
            TableFactor::Table { name, .. } => name
                .0
                .last()
                .map(|ident| ident.value.clone())
                .ok_or_else(|| PlannerError::InvalidQuery("Empty table name".to_string())),
            other => Err(PlannerError::UnsupportedFeature(format!(
                "table source {other}"
            ))),
        }
    }

    fn projection(&self, select: &Select) -> Result<Projection, PlannerError> {
        let mut columns = Vec::with_capacity(select.projection.len());
        let mut count_star = false;
        let mut wildcard = false;

        for item in &select.projection {
            let expr = match item {
                SelectItem::Wildcard(_) => {
                    wildcard = true;
                    continue;
                }
                SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. } => expr,
                other => {
                    return Err(PlannerError::UnsupportedExpression(other.to_string()));
                }
            };
            match expr {
                Expr::Function(function) if is_count_star(function) => count_star = true,
                other => columns.push(column_name(other)?),
            }
        }

        match (count_star, wildcard, columns.is_empty()) {
            (true, false, true) => Ok(Projection::CountStar),
            (false, true, true) => Ok(Projection::AllColumns),
            (false, false, false) => Ok(Projection::Columns(columns)),
            _ => Err(PlannerError::UnsupportedFeature(
                "mixing COUNT(*), * and column names in one projection".to_string(),
            )),
        }
    }
}

impl Default for SqlParser {
    fn default() -> Self {
        Self::new()
    }
}

fn is_count_star(function: &Function) -> bool {
    if !function.name.to_string().eq_ignore_ascii_case("count") {
        return false;
    }
    match &function.args {
        FunctionArguments::List(list) => {
            list.args.len() == 1
                && matches!(&list.args[0], FunctionArg::Unnamed(FunctionArgExpr::Wildcard))
        }
        _ => false,
    }
}

fn column_name(expr: &Expr) -> Result<String, PlannerError> {
    match expr {
        Expr::Identifier(ident) => Ok(ident.value.clone()),
        Expr::CompoundIdentifier(parts) => parts
            .last()
            .map(|ident| ident.value.clone())
            .ok_or_else(|| PlannerError::InvalidQuery("Empty column name".to_string())),
        other => Err(PlannerError::UnsupportedExpression(other.to_string())),
    }
}

fn parse_predicate(expr: &Expr) -> Result<EqualityPredicate, PlannerError> {
    match expr {
        Expr::Nested(inner) => parse_predicate(inner),
        Expr::BinaryOp {
            left,
            op: BinaryOperator::Eq,
            right,
        } => Ok(EqualityPredicate {
            column: column_name(left)?,
            literal: literal_text(right)?,
        }),
        Expr::BinaryOp {
            op: BinaryOperator::And | BinaryOperator::Or,
            ..
        } => Err(PlannerError::UnsupportedFeature(
            "more than one WHERE predicate".to_string(),
        )),
        Expr::BinaryOp { op, .. } => Err(PlannerError::UnsupportedFeature(format!(
            "WHERE operator {op}, only = is supported"
        ))),
        other => Err(PlannerError::UnsupportedExpression(other.to_string())),
    }
}

fn literal_text(expr: &Expr) -> Result<String, PlannerError> {
    match expr {
        Expr::Value(SqlValue::SingleQuotedString(s) | SqlValue::DoubleQuotedString(s)) => {
            Ok(s.clone())
        }
        Expr::Value(SqlValue::Number(n, _)) => Ok(n.clone()),
        // SQLite reads an unresolvable "double quoted" identifier as a string literal
        Expr::Identifier(ident) if ident.quote_style.is_some() => Ok(ident.value.clone()),
        Expr::UnaryOp {
            op: UnaryOperator::Minus,
            expr,
        } => match expr.as_ref() {
            Expr::Value(SqlValue::Number(n, _)) => Ok(format!("-{n}")),
            other => Err(PlannerError::UnsupportedExpression(other.to_string())),
        },
        other => Err(PlannerError::UnsupportedExpression(other.to_string())),
    }
}

fn parse_limit(expr: &Expr) -> Result<u64, PlannerError> {
    match expr {
        Expr::Value(SqlValue::Number(n, _)) => n
            .parse()
            .map_err(|_| PlannerError::InvalidQuery(format!("Invalid LIMIT value: {n}"))),
        other => Err(PlannerError::UnsupportedExpression(other.to_string())),
    }
}
