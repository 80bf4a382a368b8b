use std::io::Write;

use tracing::info;

use crate::{
    config::OutputMode,
    executor::predicate::{ResolvedColumn, ResolvedPredicate},
    planner::query::{Projection, QuerySpec},
    storage::{schema::TableSchema, storage_manager::StorageManager},
    types::{
        error::{DatabaseError, Result},
        record::Record,
        value::Value,
    },
};

/// Write one projected row: `separator`-joined text in list mode, a JSON
/// array in JSON mode.
pub fn write_row<W: Write>(
    out: &mut W,
    row: &[Value],
    mode: OutputMode,
    separator: &str,
) -> std::io::Result<()> {
    match mode {
        OutputMode::List => {
            let line = row.iter().map(Value::render).collect::<Vec<_>>().join(separator);
            writeln!(out, "{line}")
        }
        OutputMode::Json => {
            serde_json::to_writer(&mut *out, row)?;
            writeln!(out)
        }
    }
}

/// Everything a row scan needs, resolved once before traversal starts.
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub schema: TableSchema,
    pub columns: Vec<ResolvedColumn>,
    pub predicate: Option<ResolvedPredicate>,
    pub limit: Option<u64>,
}

impl QueryContext {
    pub fn resolve(schema: TableSchema, spec: &QuerySpec) -> Result<Self> {
        let columns = match &spec.projection {
            Projection::AllColumns => schema
                .columns
                .iter()
                .map(|col| ResolvedColumn {
                    name: col.name.clone(),
                    index: col.position,
                    rowid_alias: col.rowid_alias,
                })
                .collect(),
            Projection::Columns(names) => names
                .iter()
                .map(|name| ResolvedColumn::resolve(name, &schema))
                .collect::<Result<Vec<_>>>()?,
            Projection::CountStar => Vec::new(),
        };
        let predicate = spec
            .predicate
            .as_ref()
            .map(|predicate| ResolvedPredicate::resolve(predicate, &schema))
            .transpose()?;

        Ok(Self {
            schema,
            columns,
            predicate,
            limit: spec.limit,
        })
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.predicate
            .as_ref()
            .is_none_or(|predicate| predicate.evaluate(record))
    }

    pub fn project(&self, record: &Record) -> Vec<Value> {
        self.columns.iter().map(|col| col.value_of(record)).collect()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|col| col.name.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    Count(u64),
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    },
}

impl QueryOutput {
    /// One line per row, values rendered to text and joined by `separator`.
    /// A count is a single line holding the decimal number.
    pub fn to_lines(&self, separator: &str) -> Vec<String> {
        match self {
            QueryOutput::Count(count) => vec![count.to_string()],
            QueryOutput::Rows { rows, .. } => rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(Value::render)
                        .collect::<Vec<_>>()
                        .join(separator)
                })
                .collect(),
        }
    }

    pub fn write_to<W: Write>(
        &self,
        out: &mut W,
        mode: OutputMode,
        separator: &str,
    ) -> std::io::Result<()> {
        match self {
            QueryOutput::Count(count) => writeln!(out, "{count}")?,
            QueryOutput::Rows { rows, .. } => {
                for row in rows {
                    write_row(out, row, mode, separator)?;
                }
            }
        }
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        match self {
            QueryOutput::Count(_) => 1,
            QueryOutput::Rows { rows, .. } => rows.len(),
        }
    }
}

pub struct QueryExecutor<'a> {
    storage: &'a StorageManager,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(storage: &'a StorageManager) -> Self {
        Self { storage }
    }

    pub fn execute(&self, spec: &QuerySpec) -> Result<QueryOutput> {
        if spec.projection == Projection::CountStar {
            return self.count(spec).map(QueryOutput::Count);
        }

        let mut rows = Vec::new();
        let columns = self.for_each_row(spec, |row| {
            rows.push(row);
            Ok(())
        })?;
        Ok(QueryOutput::Rows { columns, rows })
    }

    /// Run `spec` and write each row to `out` as soon as it is produced, so
    /// no result set is held in memory. Returns the number of lines written.
    pub fn write_results<W: Write>(
        &self,
        spec: &QuerySpec,
        out: &mut W,
        mode: OutputMode,
        separator: &str,
    ) -> Result<u64> {
        if spec.projection == Projection::CountStar {
            writeln!(out, "{}", self.count(spec)?)?;
            return Ok(1);
        }

        let mut written = 0;
        self.for_each_row(spec, |row| {
            write_row(out, &row, mode, separator)?;
            written += 1;
            Ok(())
        })?;
        Ok(written)
    }

    /// Stream projected rows to `sink` in ascending rowid order, returning the
    /// projected column names. The first error from `sink` stops the scan and
    /// is returned.
    pub fn for_each_row<F>(&self, spec: &QuerySpec, mut sink: F) -> Result<Vec<String>>
    where
        F: FnMut(Vec<Value>) -> Result<()>,
    {
        let schema = self.storage.schema().table_schema(&spec.table)?;
        let root_page = schema.root_page_id;
        let context = QueryContext::resolve(schema, spec)?;
        info!(table = %spec.table, root_page, "executing query");

        let mut emitted: u64 = 0;
        let mut sink_error: Option<DatabaseError> = None;
        if context.limit != Some(0) {
            self.storage.btree(root_page).traverse(|record| {
                if !context.matches(&record) {
                    return true;
                }
                if let Err(err) = sink(context.project(&record)) {
                    sink_error = Some(err);
                    return false;
                }
                emitted += 1;
                context.limit.is_none_or(|limit| emitted < limit)
            })?;
        }
        if let Some(err) = sink_error {
            return Err(err);
        }

        info!(table = %spec.table, rows = emitted, "query finished");
        Ok(context.column_names())
    }

    // COUNT(*) sums the leaf cell counts and never decodes a record, so a
    // WHERE clause has no effect on it.
    fn count(&self, spec: &QuerySpec) -> Result<u64> {
        let entry = self.storage.schema().find(&spec.table)?;
        let count = self.storage.btree(entry.root_page).count_rows()?;
        info!(table = %spec.table, root_page = entry.root_page, count, "counted rows");
        Ok(count)
    }
}
