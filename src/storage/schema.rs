use serde::Serialize;
use tracing::debug;

use crate::{
    executor::{scan::ScanIterator, sequential_scan::SequentialScanner},
    storage::storage_manager::StorageManager,
    types::{
        PageId, SCHEMA_ROOT_PAGE,
        error::{DatabaseError, Result},
        record::Record,
        value::Value,
    },
};

pub const SCHEMA_TABLE_NAME: &str = "sqlite_schema";

/// One row of the schema table: `(type, name, tbl_name, rootpage, sql)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaEntry {
    pub entry_type: String,
    pub name: String,
    pub tbl_name: String,
    pub root_page: PageId,
    pub sql: Option<String>,
}

impl SchemaEntry {
    pub fn from_record(record: &Record) -> Result<Self> {
        if record.values.len() < 5 {
            return Err(malformed(format!(
                "schema row {} has {} columns, expected 5",
                record.row_id,
                record.values.len()
            )));
        }

        let text_column = |index: usize, column: &str| {
            record.values[index]
                .as_text()
                .ok_or_else(|| malformed(format!("schema row {}: {column} is not text", record.row_id)))
        };

        // Views and triggers store NULL here.
        let root_page = match &record.values[3] {
            Value::Null => 0,
            value => {
                let page = value.as_integer().ok_or_else(|| {
                    malformed(format!("schema row {}: rootpage is not an integer", record.row_id))
                })?;
                PageId::try_from(page).map_err(|_| {
                    malformed(format!("schema row {}: rootpage {page} out of range", record.row_id))
                })?
            }
        };

        Ok(Self {
            entry_type: text_column(0, "type")?,
            name: text_column(1, "name")?,
            tbl_name: text_column(2, "tbl_name")?,
            root_page,
            sql: record.values[4].as_text(),
        })
    }

    pub fn is_table(&self) -> bool {
        self.entry_type == "table"
    }
}

fn malformed(reason: String) -> DatabaseError {
    DatabaseError::MalformedSchema {
        table: SCHEMA_TABLE_NAME.to_string(),
        reason,
    }
}

/// Lookups against the schema table, itself a table B-tree rooted at page 1.
pub struct SchemaCatalog<'a> {
    storage: &'a StorageManager,
}

impl<'a> SchemaCatalog<'a> {
    pub fn new(storage: &'a StorageManager) -> Self {
        Self { storage }
    }

    /// Every schema row, in rowid order.
    pub fn entries(&self) -> Result<Vec<SchemaEntry>> {
        let scanner = SequentialScanner::new(self.storage, SCHEMA_ROOT_PAGE);
        ScanIterator::new(scanner)
            .map(|record| record.and_then(|record| SchemaEntry::from_record(&record)))
            .collect()
    }

    /// Schema rows of type `table`, in rowid order.
    pub fn tables(&self) -> Result<Vec<SchemaEntry>> {
        Ok(self.entries()?.into_iter().filter(SchemaEntry::is_table).collect())
    }

    /// First table whose `tbl_name` equals `table_name` exactly.
    ///
    /// Only rows of type `table` match. Index rows carry their table's name in
    /// `tbl_name` too, and their pages hold no table rows.
    pub fn find(&self, table_name: &str) -> Result<SchemaEntry> {
        let mut found = None;
        let mut failure = None;
        self.storage
            .btree(SCHEMA_ROOT_PAGE)
            .traverse(|record| match SchemaEntry::from_record(&record) {
                Ok(entry) if entry.is_table() && entry.tbl_name == table_name => {
                    found = Some(entry);
                    false
                }
                Ok(_) => true,
                Err(e) => {
                    failure = Some(e);
                    false
                }
            })?;

        if let Some(e) = failure {
            return Err(e);
        }
        let entry = found.ok_or_else(|| DatabaseError::TableNotFound {
            name: table_name.to_string(),
        })?;
        debug!(table = table_name, root_page = entry.root_page, "resolved table");
        Ok(entry)
    }

    /// Resolve `table_name` and derive its column layout from the stored DDL.
    pub fn table_schema(&self, table_name: &str) -> Result<TableSchema> {
        let entry = self.find(table_name)?;
        let sql = entry.sql.ok_or_else(|| DatabaseError::MalformedSchema {
            table: table_name.to_string(),
            reason: "no CREATE TABLE statement stored".to_string(),
        })?;
        TableSchema::from_sql(entry.tbl_name, entry.root_page, sql)
    }
}

/// A column as declared in CREATE TABLE.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSchema {
    pub name: String,
    pub position: usize,
    /// Declared `<name> INTEGER PRIMARY KEY`: the record stores NULL and the
    /// real value is the rowid.
    pub rowid_alias: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSchema {
    pub table_name: String,
    pub root_page_id: PageId,
    pub sql: String,
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    /// Column names are the first token of each comma-separated segment
    /// between the first `(` and the last `)`.
    ///
    /// The split is not parenthesis-aware: definitions such as
    /// `CHECK(a, b)` or `DEFAULT (x, y)` are split in the wrong place, and
    /// table constraints (`PRIMARY KEY (a)`) show up as columns.
    pub fn from_sql(
        table_name: impl Into<String>,
        root_page_id: PageId,
        sql: impl Into<String>,
    ) -> Result<Self> {
        let table_name = table_name.into();
        let sql = sql.into();

        let body = match (sql.find('('), sql.rfind(')')) {
            (Some(open), Some(close)) if open < close => &sql[open + 1..close],
            _ => {
                return Err(DatabaseError::MalformedSchema {
                    table: table_name,
                    reason: "CREATE TABLE statement has no column list".to_string(),
                });
            }
        };

        let lowered_sql = sql.to_lowercase();
        let columns = body
            .split(',')
            .filter_map(|segment| segment.split_whitespace().next())
            .enumerate()
            .map(|(position, token)| ColumnSchema {
                name: unquote_identifier(token).to_string(),
                position,
                rowid_alias: lowered_sql
                    .contains(&format!("{} integer primary key", token.to_lowercase())),
            })
            .collect();

        Ok(Self {
            table_name,
            root_page_id,
            sql,
            columns,
        })
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|col| col.name.as_str()).collect()
    }

    /// Position of the first column whose name matches case-insensitively.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.get_column(name).map(|col| col.position)
    }

    pub fn get_column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns
            .iter()
            .find(|col| col.name.eq_ignore_ascii_case(name))
    }

    pub fn resolve_column(&self, name: &str) -> Result<&ColumnSchema> {
        self.get_column(name)
            .ok_or_else(|| DatabaseError::ColumnNotFound {
                name: name.to_string(),
                table: self.table_name.clone(),
            })
    }

    /// True iff the lower-cased DDL contains `"<name> integer primary key"`.
    pub fn is_rowid_alias(&self, name: &str) -> bool {
        self.sql
            .to_lowercase()
            .contains(&format!("{} integer primary key", name.to_lowercase()))
    }
}

fn unquote_identifier(token: &str) -> &str {
    let quoted = [('"', '"'), ('`', '`'), ('[', ']'), ('\'', '\'')];
    for (open, close) in quoted {
        if token.len() >= 2 && token.starts_with(open) && token.ends_with(close) {
            return &token[1..token.len() - 1];
        }
    }
    token
}
