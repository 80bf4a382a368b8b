use thiserror::Error;

use crate::types::PageId;

/// Coarse classification of a [`DatabaseError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Format,
    TruncatedInput,
    NotFound,
    UnsupportedFeature,
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid database header: {reason}")]
    InvalidHeader { reason: String },

    #[error("Invalid page type 0x{page_type:02x} on page {page_id}")]
    InvalidPageType { page_id: PageId, page_type: u8 },

    #[error("Invalid serial type: {0}")]
    InvalidSerialType(u64),

    #[error("Malformed record: {reason}")]
    MalformedRecord { reason: String },

    #[error("Corrupted page: page_id={page_id}, reason={reason}")]
    CorruptedPage { page_id: PageId, reason: String },

    #[error("Malformed schema for table '{table}': {reason}")]
    MalformedSchema { table: String, reason: String },

    #[error("Truncated input while reading {context}: need {needed} bytes, {available} available")]
    TruncatedInput {
        context: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("Page {page_id} out of range (database has {page_count} pages)")]
    PageOutOfRange { page_id: PageId, page_count: u32 },

    #[error("Table '{name}' not found")]
    TableNotFound { name: String },

    #[error("Column '{name}' not found in table '{table}'")]
    ColumnNotFound { name: String, table: String },

    #[error("Unsupported feature: {feature}")]
    UnsupportedFeature { feature: String },
}

impl DatabaseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DatabaseError::Io(_) => ErrorKind::Io,
            DatabaseError::InvalidHeader { .. }
            | DatabaseError::InvalidPageType { .. }
            | DatabaseError::InvalidSerialType(_)
            | DatabaseError::MalformedRecord { .. }
            | DatabaseError::CorruptedPage { .. }
            | DatabaseError::MalformedSchema { .. }
            | DatabaseError::PageOutOfRange { .. } => ErrorKind::Format,
            DatabaseError::TruncatedInput { .. } => ErrorKind::TruncatedInput,
            DatabaseError::TableNotFound { .. } | DatabaseError::ColumnNotFound { .. } => {
                ErrorKind::NotFound
            }
            DatabaseError::UnsupportedFeature { .. } => ErrorKind::UnsupportedFeature,
        }
    }

    pub fn truncated(context: &'static str, needed: usize, available: usize) -> Self {
        Self::TruncatedInput {
            context,
            needed,
            available,
        }
    }

    pub fn unsupported(feature: impl Into<String>) -> Self {
        Self::UnsupportedFeature {
            feature: feature.into(),
        }
    }

    pub fn corrupted(page_id: PageId, reason: impl Into<String>) -> Self {
        Self::CorruptedPage {
            page_id,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DatabaseError>;
