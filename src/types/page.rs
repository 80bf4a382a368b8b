use crate::types::{
    CELL_POINTER_SIZE, CHILD_POINTER_SIZE, HEADER_SIZE, INTERIOR_PAGE_HEADER_SIZE,
    LEAF_PAGE_HEADER_SIZE, PageId, TABLE_LEAF_LOCAL_OVERHEAD,
    error::{DatabaseError, Result},
    varint::decode_varint,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    InteriorIndex = 2,
    InteriorTable = 5,
    LeafIndex = 10,
    LeafTable = 13,
}

impl PageType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            2 => Some(PageType::InteriorIndex),
            5 => Some(PageType::InteriorTable),
            10 => Some(PageType::LeafIndex),
            13 => Some(PageType::LeafTable),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, PageType::LeafTable | PageType::LeafIndex)
    }

    pub fn is_index(&self) -> bool {
        matches!(self, PageType::InteriorIndex | PageType::LeafIndex)
    }

    pub fn header_size(&self) -> usize {
        if self.is_leaf() {
            LEAF_PAGE_HEADER_SIZE
        } else {
            INTERIOR_PAGE_HEADER_SIZE
        }
    }
}

/*
 * B-tree page layout (offsets relative to the page start; page 1 shifts the
 * header by the 100-byte file header)
 * ┌─────────────────────────────────────────────────────────────────┐
 * │  [file header, 100 bytes]                      (page 1 only)    │
 * ├─────────────────────────────────────────────────────────────────┤
 * │  PAGE HEADER (8 bytes leaf / 12 bytes interior)                 │
 * │  type(1) | first_freeblock(2) | cell_count(2) |                 │
 * │  content_start(2) | fragmented(1) | right_child(4, interior)    │
 * ├─────────────────────────────────────────────────────────────────┤
 * │  CELL POINTER ARRAY: cell_count x u16 big-endian page offsets   │
 * ├─────────────────────────────────────────────────────────────────┤
 * │                    FREE SPACE                                   │
 * ├─────────────────────────────────────────────────────────────────┤
 * │  CELL CONTENT                                                   │
 * │  leaf:     payload_len(varint) | rowid(varint) | record         │
 * │  interior: left_child(u32)     | key(varint)                    │
 * └─────────────────────────────────────────────────────────────────┘
 */

#[derive(Debug, Clone)]
pub struct Page {
    pub page_id: PageId,
    pub page_type: PageType,
    pub header_offset: usize,
    pub cell_count: u16,
    pub right_child: Option<PageId>,
    pub cell_pointers: Vec<u16>,
    pub data: Vec<u8>,
}

impl Page {
    pub fn from_bytes(page_id: PageId, data: Vec<u8>) -> Result<Self> {
        let header_offset = if page_id == 1 { HEADER_SIZE } else { 0 };
        if data.len() < header_offset + LEAF_PAGE_HEADER_SIZE {
            return Err(DatabaseError::truncated(
                "page header",
                header_offset + LEAF_PAGE_HEADER_SIZE,
                data.len(),
            ));
        }

        let header = &data[header_offset..];
        let page_type = PageType::from_u8(header[0]).ok_or(DatabaseError::InvalidPageType {
            page_id,
            page_type: header[0],
        })?;
        let cell_count = u16::from_be_bytes([header[3], header[4]]);

        let header_size = page_type.header_size();
        if header.len() < header_size {
            return Err(DatabaseError::truncated(
                "page header",
                header_offset + header_size,
                data.len(),
            ));
        }
        let right_child = if page_type.is_leaf() {
            None
        } else {
            Some(u32::from_be_bytes([header[8], header[9], header[10], header[11]]))
        };

        let array_start = header_offset + header_size;
        let array_end = array_start + cell_count as usize * CELL_POINTER_SIZE;
        if array_end > data.len() {
            return Err(DatabaseError::truncated(
                "cell pointer array",
                array_end,
                data.len(),
            ));
        }

        let mut cell_pointers = Vec::with_capacity(cell_count as usize);
        for chunk in data[array_start..array_end].chunks_exact(CELL_POINTER_SIZE) {
            let pointer = u16::from_be_bytes([chunk[0], chunk[1]]);
            if (pointer as usize) < array_end || pointer as usize >= data.len() {
                return Err(DatabaseError::corrupted(
                    page_id,
                    format!("cell pointer {pointer} outside cell content area"),
                ));
            }
            cell_pointers.push(pointer);
        }

        Ok(Self {
            page_id,
            page_type,
            header_offset,
            cell_count,
            right_child,
            cell_pointers,
            data,
        })
    }

    pub fn is_leaf(&self) -> bool {
        self.page_type.is_leaf()
    }

    /// Bytes from the start of cell `index` to the end of the page.
    pub fn cell(&self, index: usize) -> Result<&[u8]> {
        let pointer = self.cell_pointers.get(index).ok_or_else(|| {
            DatabaseError::corrupted(
                self.page_id,
                format!("cell index {index} out of range ({} cells)", self.cell_count),
            )
        })?;
        Ok(&self.data[*pointer as usize..])
    }

    /// Like [`cell`](Self::cell), but rejects table-leaf cells whose payload
    /// does not fit on this page.
    pub fn leaf_cell(&self, index: usize, usable_size: usize) -> Result<&[u8]> {
        let cell = self.cell(index)?;
        let (payload_len, _) = decode_varint(cell)?;
        let max_local = usable_size.saturating_sub(TABLE_LEAF_LOCAL_OVERHEAD) as u64;
        if payload_len > max_local {
            return Err(DatabaseError::unsupported(format!(
                "overflow pages (page {}, cell {index}: payload {payload_len} bytes exceeds local limit {max_local})",
                self.page_id
            )));
        }
        Ok(cell)
    }

    /// Left-child page number stored in the first four bytes of interior cell `index`.
    pub fn left_child(&self, index: usize) -> Result<PageId> {
        let cell = self.cell(index)?;
        if cell.len() < CHILD_POINTER_SIZE {
            return Err(DatabaseError::truncated(
                "child pointer",
                CHILD_POINTER_SIZE,
                cell.len(),
            ));
        }
        Ok(u32::from_be_bytes([cell[0], cell[1], cell[2], cell[3]]))
    }

    /// Child pages of an interior page in key order: every left child in
    /// pointer-array order, then the right-most child.
    pub fn child_pages(&self) -> Result<Vec<PageId>> {
        let Some(right_child) = self.right_child else {
            return Ok(Vec::new());
        };
        let mut children = Vec::with_capacity(self.cell_pointers.len() + 1);
        for index in 0..self.cell_pointers.len() {
            children.push(self.left_child(index)?);
        }
        children.push(right_child);
        Ok(children)
    }
}
