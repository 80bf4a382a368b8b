use serde::{Deserialize, Serialize};

/// What a query returns for each surviving row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Projection {
    CountStar,
    AllColumns,
    Columns(Vec<String>),
}

/// `WHERE <column> = <literal>`. The literal is kept as source text with any
/// surrounding quotes removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EqualityPredicate {
    pub column: String,
    pub literal: String,
}

/// A parsed SELECT, independent of the parser that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub table: String,
    pub projection: Projection,
    pub predicate: Option<EqualityPredicate>,
    pub limit: Option<u64>,
}

impl QuerySpec {
    pub fn count(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            projection: Projection::CountStar,
            predicate: None,
            limit: None,
        }
    }

    pub fn select<I, S>(table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            table: table.into(),
            projection: Projection::Columns(columns.into_iter().map(Into::into).collect()),
            predicate: None,
            limit: None,
        }
    }

    pub fn select_all(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            projection: Projection::AllColumns,
            predicate: None,
            limit: None,
        }
    }

    pub fn filter(mut self, column: impl Into<String>, literal: impl Into<String>) -> Self {
        self.predicate = Some(EqualityPredicate {
            column: column.into(),
            literal: literal.into(),
        });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}
