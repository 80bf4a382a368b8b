use tracing::debug;

use crate::{
    storage::storage_manager::StorageManager,
    types::{
        MAX_BTREE_DEPTH, PageId,
        error::{DatabaseError, Result},
        page::{Page, PageType},
        record::Record,
    },
};

/// A table B-tree rooted at `root_page_id`.
///
/// Interior cells are stored in ascending key order and the right-most child
/// holds every key above them, so visiting left children in pointer-array
/// order followed by the right child yields rows in ascending rowid order
/// without comparing keys.
pub struct BTree<'a> {
    storage: &'a StorageManager,
    root_page_id: PageId,
}

impl<'a> BTree<'a> {
    pub fn new(storage: &'a StorageManager, root_page_id: PageId) -> Self {
        Self {
            storage,
            root_page_id,
        }
    }

    pub fn root_page_id(&self) -> PageId {
        self.root_page_id
    }

    /// Call `visit` for every row in ascending rowid order until it returns
    /// `false`. Returns `false` if the walk was stopped early.
    pub fn traverse<F>(&self, mut visit: F) -> Result<bool>
    where
        F: FnMut(Record) -> bool,
    {
        self.traverse_page(self.root_page_id, 0, &mut visit)
    }

    fn traverse_page<F>(&self, page_id: PageId, depth: usize, visit: &mut F) -> Result<bool>
    where
        F: FnMut(Record) -> bool,
    {
        let page = load_table_page(self.storage, page_id, depth)?;
        match page.page_type {
            PageType::LeafTable => {
                let usable_size = self.storage.usable_size();
                for index in 0..page.cell_pointers.len() {
                    let record = Record::from_cell(page.leaf_cell(index, usable_size)?)?;
                    if !visit(record) {
                        debug!(page_id, "traversal stopped by visitor");
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            _ => {
                for child in page.child_pages()? {
                    if !self.traverse_page(child, depth + 1, visit)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }

    /// Number of rows in the tree. Leaf pages contribute their cell count
    /// without decoding any record.
    pub fn count_rows(&self) -> Result<u64> {
        self.count_page(self.root_page_id, 0)
    }

    fn count_page(&self, page_id: PageId, depth: usize) -> Result<u64> {
        let page = load_table_page(self.storage, page_id, depth)?;
        if page.is_leaf() {
            return Ok(u64::from(page.cell_count));
        }
        let mut total = 0;
        for child in page.child_pages()? {
            total += self.count_page(child, depth + 1)?;
        }
        Ok(total)
    }
}

/// Read a page that is expected to belong to a table B-tree `depth` levels
/// below the root.
pub(crate) fn load_table_page(
    storage: &StorageManager,
    page_id: PageId,
    depth: usize,
) -> Result<Page> {
    if depth > MAX_BTREE_DEPTH {
        return Err(DatabaseError::corrupted(
            page_id,
            format!("B-tree deeper than {MAX_BTREE_DEPTH} levels"),
        ));
    }
    let page = storage.read_page(page_id)?;
    if page.page_type.is_index() {
        return Err(DatabaseError::unsupported(format!(
            "index B-tree page {page_id} reached during table traversal"
        )));
    }
    Ok(page)
}
