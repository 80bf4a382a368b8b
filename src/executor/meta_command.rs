use crate::{
    storage::{schema::SchemaEntry, storage_manager::StorageManager},
    types::error::{DatabaseError, Result},
};

const INTERNAL_TABLE_PREFIX: &str = "sqlite_";

/// Dot-commands answered from the file header and the schema table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaCommand {
    DbInfo,
    Tables,
}

impl MetaCommand {
    /// `None` when `input` is not a dot-command at all; an error when it is
    /// one this tool does not know.
    pub fn parse(input: &str) -> Option<Result<Self>> {
        let command = input.trim();
        if !command.starts_with('.') {
            return None;
        }
        Some(match command {
            ".dbinfo" => Ok(MetaCommand::DbInfo),
            ".tables" => Ok(MetaCommand::Tables),
            other => Err(DatabaseError::unsupported(format!("meta command {other}"))),
        })
    }

    pub fn run(self, storage: &StorageManager) -> Result<Vec<String>> {
        match self {
            MetaCommand::DbInfo => {
                let tables = storage.schema().tables()?;
                Ok(vec![
                    format!("database page size: {}", storage.page_size()),
                    format!("number of tables: {}", tables.len()),
                ])
            }
            MetaCommand::Tables => {
                let names: Vec<String> = storage
                    .schema()
                    .tables()?
                    .into_iter()
                    .filter(is_user_table)
                    .map(|entry| entry.tbl_name)
                    .collect();
                Ok(vec![names.join(" ")])
            }
        }
    }
}

fn is_user_table(entry: &SchemaEntry) -> bool {
    !entry.tbl_name.starts_with(INTERNAL_TABLE_PREFIX)
}
