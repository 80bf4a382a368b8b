use std::{
    fs::OpenOptions,
    io::{self, Seek, SeekFrom, Write},
    path::Path,
};

use tempfile::NamedTempFile;

use crate::{
    storage::{SQLITE_MAGIC, storage_manager::StorageManager},
    types::{
        CELL_POINTER_SIZE, CHILD_POINTER_SIZE, HEADER_SIZE, PageId, RowId,
        TABLE_LEAF_LOCAL_OVERHEAD, error::Result, page::PageType, value::Value,
        varint::{encode_varint, varint_len},
    },
};

const DEFAULT_PAGE_SIZE: u32 = 4096;
const SQLITE_VERSION_NUMBER: u32 = 3_045_000;

/// A table and the rows to store in it, keyed by rowid.
#[derive(Debug, Clone)]
pub struct TableFixture {
    pub name: String,
    pub sql: String,
    pub rows: Vec<(RowId, Vec<Value>)>,
}

impl TableFixture {
    pub fn new(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
            rows: Vec::new(),
        }
    }

    /// Append a row with the next rowid after the current largest.
    pub fn row(mut self, values: Vec<Value>) -> Self {
        let row_id = self.rows.iter().map(|(id, _)| *id).max().unwrap_or(0) + 1;
        self.rows.push((row_id, values));
        self
    }

    pub fn row_with_id(mut self, row_id: RowId, values: Vec<Value>) -> Self {
        self.rows.push((row_id, values));
        self
    }

    /// Rows `1..=count`, each produced by `generate(rowid)`.
    pub fn generated_rows<F>(mut self, count: u64, mut generate: F) -> Self
    where
        F: FnMut(RowId) -> Vec<Value>,
    {
        for row_id in 1..=count {
            self.rows.push((row_id, generate(row_id)));
        }
        self
    }
}

#[derive(Debug, Clone)]
enum SchemaObject {
    Table(TableFixture),
    Index {
        name: String,
        table: String,
        sql: String,
    },
}

/// Writes a complete database file in the on-disk format: file header,
/// schema table rooted at page 1, one table B-tree per fixture and overflow
/// chains for payloads too large for a leaf.
///
/// Trees are built bottom-up. Cells are packed into a node until it is full
/// or holds the configured maximum, so small maximums produce deep trees
/// from a handful of rows.
#[derive(Debug, Clone)]
pub struct DatabaseBuilder {
    page_size: u32,
    reserved_space: u8,
    max_leaf_cells: usize,
    max_interior_cells: usize,
    objects: Vec<SchemaObject>,
}

impl Default for DatabaseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DatabaseBuilder {
    pub fn new() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            reserved_space: 0,
            max_leaf_cells: usize::MAX,
            max_interior_cells: usize::MAX,
            objects: Vec::new(),
        }
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn reserved_space(mut self, reserved_space: u8) -> Self {
        self.reserved_space = reserved_space;
        self
    }

    pub fn max_leaf_cells(mut self, max: usize) -> Self {
        self.max_leaf_cells = max.max(1);
        self
    }

    /// Interior nodes get at most `max` cells, so `max + 1` children.
    pub fn max_interior_cells(mut self, max: usize) -> Self {
        self.max_interior_cells = max.max(1);
        self
    }

    pub fn table(mut self, table: TableFixture) -> Self {
        self.objects.push(SchemaObject::Table(table));
        self
    }

    /// A schema row of type `index` whose root is an empty index leaf.
    pub fn index(
        mut self,
        name: impl Into<String>,
        table: impl Into<String>,
        sql: impl Into<String>,
    ) -> Self {
        self.objects.push(SchemaObject::Index {
            name: name.into(),
            table: table.into(),
            sql: sql.into(),
        });
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = PageWriter::new(self);
        // page 1 is claimed up front for the schema root
        writer.allocate();

        let mut schema_rows = Vec::with_capacity(self.objects.len());
        for object in &self.objects {
            let row = match object {
                SchemaObject::Table(table) => {
                    let mut rows = table.rows.clone();
                    rows.sort_by_key(|(row_id, _)| *row_id);
                    let root = writer.write_table(&rows, None);
                    schema_row("table", &table.name, &table.name, root, &table.sql)
                }
                SchemaObject::Index { name, table, sql } => {
                    let root = writer.allocate();
                    let page = writer.encode_node(&Node::leaf_index(), 0);
                    writer.put(root, page);
                    schema_row("index", name, table, root, sql)
                }
            };
            schema_rows.push(row);
        }

        let schema_rows: Vec<(RowId, Vec<Value>)> = schema_rows
            .into_iter()
            .enumerate()
            .map(|(i, values)| (i as RowId + 1, values))
            .collect();
        writer.write_table(&schema_rows, Some(1));
        writer.finish()
    }

    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        std::fs::write(path, self.to_bytes())
    }

    pub fn build(&self) -> io::Result<TempDatabase> {
        TempDatabase::from_bytes(&self.to_bytes())
    }
}

fn schema_row(kind: &str, name: &str, table: &str, root: PageId, sql: &str) -> Vec<Value> {
    vec![
        Value::from(kind),
        Value::from(name),
        Value::from(table),
        Value::Integer(i64::from(root)),
        Value::from(sql),
    ]
}

/// Encode `values` as a record: header length, serial types, then bodies.
/// Integers use the narrowest serial type, with 0 and 1 stored bodiless.
pub fn encode_record(values: &[Value]) -> Vec<u8> {
    let mut types = Vec::new();
    let mut body = Vec::new();

    for value in values {
        let code: u64 = match value {
            Value::Null => 0,
            Value::Integer(0) => 8,
            Value::Integer(1) => 9,
            Value::Integer(i) => {
                let (code, width) = integer_serial_type(*i);
                body.extend_from_slice(&i.to_be_bytes()[8 - width..]);
                code
            }
            Value::Real(r) => {
                body.extend_from_slice(&r.to_be_bytes());
                7
            }
            Value::Text(bytes) => {
                body.extend_from_slice(bytes);
                bytes.len() as u64 * 2 + 13
            }
            Value::Blob(bytes) => {
                body.extend_from_slice(bytes);
                bytes.len() as u64 * 2 + 12
            }
        };
        types.extend(encode_varint(code));
    }

    // the header length counts its own varint
    let mut header_len = types.len() + 1;
    while types.len() + varint_len(header_len as u64) != header_len {
        header_len = types.len() + varint_len(header_len as u64);
    }

    let mut record = encode_varint(header_len as u64);
    record.extend(types);
    record.extend(body);
    record
}

fn integer_serial_type(value: i64) -> (u64, usize) {
    const WIDTHS: [(u64, usize); 5] = [(1, 1), (2, 2), (3, 3), (4, 4), (5, 6)];
    for (code, width) in WIDTHS {
        let bits = width as u32 * 8;
        let min = -(1i64 << (bits - 1));
        let max = (1i64 << (bits - 1)) - 1;
        if (min..=max).contains(&value) {
            return (code, width);
        }
    }
    (6, 8)
}

struct Node {
    page_type: PageType,
    cells: Vec<Vec<u8>>,
    right_child: Option<PageId>,
    max_key: RowId,
}

impl Node {
    fn leaf_index() -> Self {
        Self {
            page_type: PageType::LeafIndex,
            cells: Vec::new(),
            right_child: None,
            max_key: 0,
        }
    }

    fn cells_size(&self) -> usize {
        self.cells.iter().map(|cell| cell.len() + CELL_POINTER_SIZE).sum()
    }
}

struct PageWriter {
    page_size: usize,
    usable_size: usize,
    reserved_space: u8,
    max_leaf_cells: usize,
    max_interior_cells: usize,
    pages: Vec<Vec<u8>>,
}

impl PageWriter {
    fn new(builder: &DatabaseBuilder) -> Self {
        let page_size = builder.page_size as usize;
        Self {
            page_size,
            usable_size: page_size - builder.reserved_space as usize,
            reserved_space: builder.reserved_space,
            max_leaf_cells: builder.max_leaf_cells,
            max_interior_cells: builder.max_interior_cells,
            pages: Vec::new(),
        }
    }

    fn allocate(&mut self) -> PageId {
        self.pages.push(vec![0; self.page_size]);
        self.pages.len() as PageId
    }

    fn put(&mut self, page_id: PageId, page: Vec<u8>) {
        self.pages[page_id as usize - 1] = page;
    }

    fn header_offset(page_id: PageId) -> usize {
        if page_id == 1 { HEADER_SIZE } else { 0 }
    }

    fn fits(&self, node: &Node, header_offset: usize) -> bool {
        header_offset + node.page_type.header_size() + node.cells_size() <= self.usable_size
    }

    /// Write a table B-tree holding `rows` (sorted by rowid) and return its
    /// root page. With `root` set, the root node lands on that page.
    fn write_table(&mut self, rows: &[(RowId, Vec<Value>)], root: Option<PageId>) -> PageId {
        let cells: Vec<(RowId, Vec<u8>)> = rows
            .iter()
            .map(|(row_id, values)| (*row_id, self.leaf_cell(*row_id, &encode_record(values))))
            .collect();

        let mut level = self.pack(PageType::LeafTable, cells, self.max_leaf_cells);
        loop {
            if level.len() == 1 {
                let node = level.remove(0);
                return self.write_root(node, root);
            }

            let mut children = Vec::with_capacity(level.len());
            for node in level {
                let page_id = self.allocate();
                let page = self.encode_node(&node, 0);
                self.put(page_id, page);
                children.push((page_id, node.max_key));
            }
            level = self.interior_level(children);
        }
    }

    fn write_root(&mut self, node: Node, root: Option<PageId>) -> PageId {
        let page_id = root.unwrap_or_else(|| self.allocate());
        if self.fits(&node, Self::header_offset(page_id)) {
            let page = self.encode_node(&node, Self::header_offset(page_id));
            self.put(page_id, page);
            return page_id;
        }

        // too large for page 1: push it down one level under an empty interior root
        let child = self.allocate();
        let page = self.encode_node(&node, 0);
        self.put(child, page);
        let interior = Node {
            page_type: PageType::InteriorTable,
            cells: Vec::new(),
            right_child: Some(child),
            max_key: node.max_key,
        };
        let page = self.encode_node(&interior, Self::header_offset(page_id));
        self.put(page_id, page);
        page_id
    }

    /// Group `(page, max_key)` children under interior nodes: each node keys
    /// its left children by their largest rowid and keeps the last child as
    /// its right-most pointer.
    fn interior_level(&self, children: Vec<(PageId, RowId)>) -> Vec<Node> {
        let close = |pending: &mut Vec<(PageId, RowId)>| {
            let (right_child, max_key) = pending.pop()?;
            Some(Node {
                page_type: PageType::InteriorTable,
                cells: pending
                    .drain(..)
                    .map(|(page, key)| interior_cell(page, key))
                    .collect(),
                right_child: Some(right_child),
                max_key,
            })
        };

        let header_size = PageType::InteriorTable.header_size();
        let mut nodes = Vec::new();
        let mut pending: Vec<(PageId, RowId)> = Vec::new();
        let mut pending_size = 0;

        for (page, key) in children {
            let cell_size = CHILD_POINTER_SIZE + varint_len(key) + CELL_POINTER_SIZE;
            // every pending child but the last is stored as a cell
            let full = pending.len() > self.max_interior_cells
                || header_size + pending_size + cell_size > self.usable_size;
            if full {
                nodes.extend(close(&mut pending));
                pending_size = 0;
            }
            pending.push((page, key));
            pending_size += cell_size;
        }
        nodes.extend(close(&mut pending));
        nodes
    }

    fn pack(&self, page_type: PageType, cells: Vec<(RowId, Vec<u8>)>, max_cells: usize) -> Vec<Node> {
        let empty = |page_type| Node {
            page_type,
            cells: Vec::new(),
            right_child: None,
            max_key: 0,
        };

        let mut nodes = Vec::new();
        let mut current = empty(page_type);
        for (key, cell) in cells {
            let full = current.cells.len() >= max_cells
                || current.cells_size() + cell.len() + CELL_POINTER_SIZE + page_type.header_size()
                    > self.usable_size;
            if full && !current.cells.is_empty() {
                nodes.push(std::mem::replace(&mut current, empty(page_type)));
            }
            current.cells.push(cell);
            current.max_key = key;
        }
        nodes.push(current);
        nodes
    }

    /// Leaf cell for one row. Payloads past the local limit keep their local
    /// prefix in the cell and spill the rest into a chain of overflow pages.
    fn leaf_cell(&mut self, row_id: RowId, payload: &[u8]) -> Vec<u8> {
        let mut cell = encode_varint(payload.len() as u64);
        cell.extend(encode_varint(row_id));

        let max_local = self.usable_size - TABLE_LEAF_LOCAL_OVERHEAD;
        if payload.len() <= max_local {
            cell.extend_from_slice(payload);
            return cell;
        }

        let min_local = (self.usable_size - 12) * 32 / 255 - 23;
        let spill = min_local + (payload.len() - min_local) % (self.usable_size - 4);
        let local = if spill <= max_local { spill } else { min_local };

        cell.extend_from_slice(&payload[..local]);
        let first_overflow = self.write_overflow_chain(&payload[local..]);
        cell.extend_from_slice(&first_overflow.to_be_bytes());
        cell
    }

    fn write_overflow_chain(&mut self, mut rest: &[u8]) -> PageId {
        let chunk_size = self.usable_size - CHILD_POINTER_SIZE;
        let first = self.allocate();
        let mut page_id = first;
        loop {
            let take = rest.len().min(chunk_size);
            let mut page = vec![0u8; self.page_size];
            page[CHILD_POINTER_SIZE..CHILD_POINTER_SIZE + take].copy_from_slice(&rest[..take]);
            rest = &rest[take..];

            if rest.is_empty() {
                self.put(page_id, page);
                return first;
            }
            let next = self.allocate();
            page[..CHILD_POINTER_SIZE].copy_from_slice(&next.to_be_bytes());
            self.put(page_id, page);
            page_id = next;
        }
    }

    /// Lay out a node: header, pointer array, then cells packed downwards
    /// from the end of the usable area in pointer order.
    fn encode_node(&self, node: &Node, header_offset: usize) -> Vec<u8> {
        let mut page = vec![0u8; self.page_size];
        let mut content_start = self.usable_size;
        let mut pointers = Vec::with_capacity(node.cells.len());
        for cell in &node.cells {
            content_start -= cell.len();
            page[content_start..content_start + cell.len()].copy_from_slice(cell);
            pointers.push(content_start as u16);
        }

        let header = &mut page[header_offset..];
        header[0] = node.page_type.as_u8();
        header[3..5].copy_from_slice(&(node.cells.len() as u16).to_be_bytes());
        // 65536 is stored as 0
        header[5..7].copy_from_slice(&(content_start as u16).to_be_bytes());
        if let Some(right_child) = node.right_child {
            header[8..12].copy_from_slice(&right_child.to_be_bytes());
        }

        let array_start = header_offset + node.page_type.header_size();
        for (i, pointer) in pointers.iter().enumerate() {
            let at = array_start + i * CELL_POINTER_SIZE;
            page[at..at + CELL_POINTER_SIZE].copy_from_slice(&pointer.to_be_bytes());
        }
        page
    }

    fn finish(mut self) -> Vec<u8> {
        let page_count = self.pages.len() as u32;
        let header = self.file_header(page_count);
        self.pages[0][..HEADER_SIZE].copy_from_slice(&header);
        self.pages.concat()
    }

    fn file_header(&self, page_count: u32) -> [u8; HEADER_SIZE] {
        let mut header = [0u8; HEADER_SIZE];
        header[..16].copy_from_slice(SQLITE_MAGIC);
        let stored_page_size = if self.page_size == 65536 { 1 } else { self.page_size as u16 };
        header[16..18].copy_from_slice(&stored_page_size.to_be_bytes());
        header[18] = 1;
        header[19] = 1;
        header[20] = self.reserved_space;
        header[21] = 64;
        header[22] = 32;
        header[23] = 32;
        header[24..28].copy_from_slice(&1u32.to_be_bytes());
        header[28..32].copy_from_slice(&page_count.to_be_bytes());
        header[40..44].copy_from_slice(&1u32.to_be_bytes());
        header[44..48].copy_from_slice(&4u32.to_be_bytes());
        header[56..60].copy_from_slice(&1u32.to_be_bytes());
        header[92..96].copy_from_slice(&1u32.to_be_bytes());
        header[96..100].copy_from_slice(&SQLITE_VERSION_NUMBER.to_be_bytes());
        header
    }
}

fn interior_cell(left_child: PageId, key: RowId) -> Vec<u8> {
    let mut cell = left_child.to_be_bytes().to_vec();
    cell.extend(encode_varint(key));
    cell
}

/// A database file in the system temp directory, removed on drop.
pub struct TempDatabase {
    file: NamedTempFile,
}

impl TempDatabase {
    pub fn from_bytes(bytes: &[u8]) -> io::Result<Self> {
        let mut file = NamedTempFile::new()?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn open(&self) -> Result<StorageManager> {
        StorageManager::open(self.path())
    }

    /// Overwrite bytes at an absolute file offset.
    pub fn patch(&self, offset: u64, bytes: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new().write(true).open(self.path())?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(bytes)
    }

    /// Overwrite bytes at `offset` within page `page_id`.
    pub fn patch_page(
        &self,
        page_size: u32,
        page_id: PageId,
        offset: usize,
        bytes: &[u8],
    ) -> io::Result<()> {
        let start = u64::from(page_id - 1) * u64::from(page_size) + offset as u64;
        self.patch(start, bytes)
    }
}
