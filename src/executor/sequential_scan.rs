use tracing::debug;

use crate::{
    executor::scan::Scanner,
    storage::{btree::load_table_page, storage_manager::StorageManager},
    types::{PageId, error::DatabaseError, page::Page, record::Record},
};

struct LeafCursor {
    page: Page,
    next_cell: usize,
}

/// Lazy, rowid-ordered scan of a table B-tree.
///
/// Pending subtrees are kept on an explicit stack rather than the call stack,
/// so memory grows with tree height times fan-out and never with recursion.
pub struct SequentialScanner<'a> {
    storage: &'a StorageManager,
    root_page_id: PageId,
    pending: Vec<(PageId, usize)>,
    current_leaf: Option<LeafCursor>,
    started: bool,
    is_exhausted: bool,
}

impl<'a> SequentialScanner<'a> {
    pub fn new(storage: &'a StorageManager, root_page_id: PageId) -> Self {
        Self {
            storage,
            root_page_id,
            pending: Vec::new(),
            current_leaf: None,
            started: false,
            is_exhausted: false,
        }
    }

    pub fn root_page_id(&self) -> PageId {
        self.root_page_id
    }

    // Descend until a leaf with at least one unread cell is current, or the
    // stack runs dry.
    fn advance_to_leaf(&mut self) -> Result<bool, DatabaseError> {
        while let Some((page_id, depth)) = self.pending.pop() {
            let page = load_table_page(self.storage, page_id, depth)?;
            if page.is_leaf() {
                if page.cell_pointers.is_empty() {
                    continue;
                }
                self.current_leaf = Some(LeafCursor { page, next_cell: 0 });
                return Ok(true);
            }
            // reversed so the left-most child is popped first
            for child in page.child_pages()?.into_iter().rev() {
                self.pending.push((child, depth + 1));
            }
        }
        Ok(false)
    }
}

impl Scanner for SequentialScanner<'_> {
    fn scan(&mut self) -> Result<Option<Record>, DatabaseError> {
        if self.is_exhausted {
            return Ok(None);
        }
        if !self.started {
            self.started = true;
            self.pending.push((self.root_page_id, 0));
        }

        let usable_size = self.storage.usable_size();
        loop {
            if let Some(leaf) = self.current_leaf.as_mut() {
                if leaf.next_cell < leaf.page.cell_pointers.len() {
                    let cell = leaf.page.leaf_cell(leaf.next_cell, usable_size)?;
                    let record = Record::from_cell(cell)?;
                    leaf.next_cell += 1;
                    return Ok(Some(record));
                }
                self.current_leaf = None;
            }

            if !self.advance_to_leaf()? {
                debug!(root_page = self.root_page_id, "scan exhausted");
                self.is_exhausted = true;
                return Ok(None);
            }
        }
    }

    fn scan_batch(&mut self, batch_size: usize) -> Result<Vec<Record>, DatabaseError> {
        let mut records = Vec::with_capacity(batch_size);
        for _ in 0..batch_size {
            match self.scan()? {
                Some(record) => records.push(record),
                None => break,
            }
        }
        Ok(records)
    }

    fn reset(&mut self) -> Result<(), DatabaseError> {
        self.pending.clear();
        self.current_leaf = None;
        self.started = false;
        self.is_exhausted = false;
        Ok(())
    }
}
