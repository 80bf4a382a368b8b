use std::{
    fs::{File, OpenOptions},
    io::{ErrorKind, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use crate::{
    storage::{btree::BTree, header::DatabaseHeader, schema::SchemaCatalog},
    types::{
        HEADER_SIZE, PageId,
        error::{DatabaseError, Result},
        page::Page,
    },
};

pub struct DatabaseInfo {
    pub path: PathBuf,
    pub header: DatabaseHeader,
    pub page_count: u32,
    pub file_size: u64,
}

/// Read-only access to the pages of one database file.
///
/// Every page read is a positioned read against the single handle opened in
/// [`StorageManager::open`]; nothing is cached between reads.
pub struct StorageManager {
    pub db_info: DatabaseInfo,
    file: File,
}

impl StorageManager {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = OpenOptions::new().read(true).open(path)?;

        let mut header_buffer = vec![0u8; HEADER_SIZE];
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut header_buffer).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => DatabaseError::truncated(
                "file header",
                HEADER_SIZE,
                file.metadata().map(|m| m.len() as usize).unwrap_or(0),
            ),
            _ => DatabaseError::Io(e),
        })?;
        let header = DatabaseHeader::from_bytes(&header_buffer)?;

        let file_size = file.metadata()?.len();
        let page_count = (file_size / u64::from(header.page_size)) as u32;
        info!(
            path = %path.display(),
            page_size = header.page_size,
            page_count,
            "opened database"
        );

        Ok(Self {
            db_info: DatabaseInfo {
                path: path.to_path_buf(),
                header,
                page_count,
                file_size,
            },
            file,
        })
    }

    pub fn page_size(&self) -> u32 {
        self.db_info.header.page_size
    }

    pub fn usable_size(&self) -> usize {
        self.db_info.header.usable_size()
    }

    pub fn page_count(&self) -> u32 {
        self.db_info.page_count
    }

    pub fn header(&self) -> &DatabaseHeader {
        &self.db_info.header
    }

    fn page_offset(&self, page_id: PageId) -> u64 {
        u64::from(page_id - 1) * u64::from(self.page_size())
    }

    /// Load page `page_id` (1-based) and parse its B-tree header.
    pub fn read_page(&self, page_id: PageId) -> Result<Page> {
        if page_id == 0 || page_id > self.db_info.page_count {
            return Err(DatabaseError::PageOutOfRange {
                page_id,
                page_count: self.db_info.page_count,
            });
        }

        let page_size = self.page_size() as usize;
        let mut buffer = vec![0u8; page_size];
        // &File implements Read + Seek, so reads need no exclusive borrow
        let mut file = &self.file;
        file.seek(SeekFrom::Start(self.page_offset(page_id)))?;
        file.read_exact(&mut buffer).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => DatabaseError::truncated("page", page_size, 0),
            _ => DatabaseError::Io(e),
        })?;

        let page = Page::from_bytes(page_id, buffer)?;
        debug!(
            page_id,
            page_type = ?page.page_type,
            cell_count = page.cell_count,
            "loaded page"
        );
        Ok(page)
    }

    pub fn btree(&self, root_page_id: PageId) -> BTree<'_> {
        BTree::new(self, root_page_id)
    }

    pub fn schema(&self) -> SchemaCatalog<'_> {
        SchemaCatalog::new(self)
    }
}
