pub mod btree;
pub mod header;
pub mod schema;
pub mod storage_manager;

pub const SQLITE_MAGIC: &[u8; 16] = b"SQLite format 3\0";
