pub mod error;
pub mod page;
pub mod record;
pub mod serial_type;
pub mod value;
pub mod varint;

// Common type aliases
pub type PageId = u32;
pub type RowId = u64;

// Constants following the SQLite file format
pub const HEADER_SIZE: usize = 100; // Database file header, precedes page 1's B-tree header
pub const LEAF_PAGE_HEADER_SIZE: usize = 8;
pub const INTERIOR_PAGE_HEADER_SIZE: usize = 12;
pub const CELL_POINTER_SIZE: usize = 2;
pub const CHILD_POINTER_SIZE: usize = 4;

pub const MIN_PAGE_SIZE: u32 = 512;
pub const MAX_PAGE_SIZE: u32 = 65536;

/// Largest B-tree depth a traversal will follow before treating the file as corrupt.
pub const MAX_BTREE_DEPTH: usize = 20;

/// Bytes subtracted from the usable page size to get the largest payload a
/// table-leaf cell may store without spilling to an overflow page.
pub const TABLE_LEAF_LOCAL_OVERHEAD: usize = 35;

pub const SCHEMA_ROOT_PAGE: PageId = 1;
