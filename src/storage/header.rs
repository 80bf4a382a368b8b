use crate::{
    storage::SQLITE_MAGIC,
    types::{
        HEADER_SIZE, MAX_PAGE_SIZE, MIN_PAGE_SIZE,
        error::{DatabaseError, Result},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Utf16le,
    Utf16be,
}

impl TextEncoding {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(TextEncoding::Utf8),
            2 => Some(TextEncoding::Utf16le),
            3 => Some(TextEncoding::Utf16be),
            _ => None,
        }
    }
}

/// The fields of the 100-byte file header this reader relies on.
#[derive(Debug, Clone)]
pub struct DatabaseHeader {
    pub page_size: u32,
    pub file_format_write_version: u8,
    pub file_format_read_version: u8,
    pub reserved_space: u8,
    pub file_change_counter: u32,
    pub database_size_pages: u32,
    pub schema_cookie: u32,
    pub schema_format_number: u32,
    pub text_encoding: TextEncoding,
    pub user_version: u32,
    pub sqlite_version_number: u32,
}

impl DatabaseHeader {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(DatabaseError::truncated("file header", HEADER_SIZE, bytes.len()));
        }
        if &bytes[0..16] != SQLITE_MAGIC {
            return Err(DatabaseError::InvalidHeader {
                reason: "missing 'SQLite format 3' magic string".to_string(),
            });
        }

        let page_size = match u16::from_be_bytes([bytes[16], bytes[17]]) {
            1 => MAX_PAGE_SIZE,
            raw => u32::from(raw),
        };
        if !page_size.is_power_of_two() || !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(DatabaseError::InvalidHeader {
                reason: format!("unsupported page size: {page_size}"),
            });
        }

        let reserved_space = bytes[20];
        if u32::from(reserved_space) > page_size - 480 {
            return Err(DatabaseError::InvalidHeader {
                reason: format!("reserved space {reserved_space} leaves too little usable space"),
            });
        }

        let text_encoding = match read_u32(bytes, 56) {
            // 0 is written by databases that have never stored text
            0 => TextEncoding::Utf8,
            raw => TextEncoding::from_u32(raw).ok_or_else(|| DatabaseError::InvalidHeader {
                reason: format!("invalid text encoding: {raw}"),
            })?,
        };

        Ok(Self {
            page_size,
            file_format_write_version: bytes[18],
            file_format_read_version: bytes[19],
            reserved_space,
            file_change_counter: read_u32(bytes, 24),
            database_size_pages: read_u32(bytes, 28),
            schema_cookie: read_u32(bytes, 40),
            schema_format_number: read_u32(bytes, 44),
            text_encoding,
            user_version: read_u32(bytes, 60),
            sqlite_version_number: read_u32(bytes, 96),
        })
    }

    /// Page size minus the per-page reserved region.
    pub fn usable_size(&self) -> usize {
        (self.page_size - u32::from(self.reserved_space)) as usize
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}
