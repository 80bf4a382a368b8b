use crate::{
    planner::query::EqualityPredicate,
    storage::schema::TableSchema,
    types::{error::Result, record::Record, value::Value},
};

/// A column of the table resolved to its record slot.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedColumn {
    pub name: String,
    pub index: usize,
    pub rowid_alias: bool,
}

impl ResolvedColumn {
    pub fn resolve(name: &str, schema: &TableSchema) -> Result<Self> {
        let column = schema.resolve_column(name)?;
        Ok(Self {
            name: column.name.clone(),
            index: column.position,
            rowid_alias: column.rowid_alias,
        })
    }

    /// The column's value in `record`. Rowid aliases read the rowid; slots
    /// past the end of a short record read as NULL.
    pub fn value_of(&self, record: &Record) -> Value {
        if self.rowid_alias {
            return Value::Integer(record.row_id as i64);
        }
        record.get_value(self.index).cloned().unwrap_or(Value::Null)
    }
}

/// `column = literal`, evaluated by comparing the column's canonical text
/// rendering with the literal. Comparison is textual: `1.0` does not match a
/// REAL column holding one (rendered `1.000000`), and `'01'` does not match
/// the integer 1.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPredicate {
    pub column: ResolvedColumn,
    pub literal: String,
}

impl ResolvedPredicate {
    pub fn resolve(predicate: &EqualityPredicate, schema: &TableSchema) -> Result<Self> {
        Ok(Self {
            column: ResolvedColumn::resolve(&predicate.column, schema)?,
            literal: predicate.literal.clone(),
        })
    }

    pub fn evaluate(&self, record: &Record) -> bool {
        self.column.value_of(record).render() == self.literal
    }
}
