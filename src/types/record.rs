use tracing::trace;

use crate::types::{
    RowId,
    error::{DatabaseError, Result},
    serial_type::SerialType,
    value::Value,
    varint::decode_varint,
};

/// One row of a table B-tree: the cell's rowid and its decoded columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub row_id: RowId,
    pub values: Vec<Value>,
}

impl Record {
    pub fn new(row_id: RowId, values: Vec<Value>) -> Self {
        Self { row_id, values }
    }

    /// Decode a table-leaf cell: payload length, rowid, then the record itself.
    ///
    /// `cell` starts at the cell's first byte and may extend past its end
    /// (typically to the end of the page); the payload length bounds the read.
    pub fn from_cell(cell: &[u8]) -> Result<Self> {
        let (payload_len, len_size) = decode_varint(cell)?;
        let (row_id, row_id_size) = decode_varint(&cell[len_size..])?;

        let start = len_size + row_id_size;
        let end = usize::try_from(payload_len)
            .ok()
            .and_then(|len| start.checked_add(len))
            .filter(|end| *end <= cell.len())
            .ok_or_else(|| {
                DatabaseError::truncated(
                    "record payload",
                    start.saturating_add(payload_len as usize),
                    cell.len(),
                )
            })?;

        trace!(row_id, payload_len, "decoding cell");
        Self::from_payload(row_id, &cell[start..end])
    }

    /// Decode a record payload (header followed by body) for a known rowid.
    pub fn from_payload(row_id: RowId, payload: &[u8]) -> Result<Self> {
        let (header_len, serial_types) = read_header(payload)?;

        let mut offset = header_len;
        let mut values = Vec::with_capacity(serial_types.len());
        for serial_type in serial_types {
            let size = serial_type.size();
            let end = offset + size;
            if end > payload.len() {
                return Err(DatabaseError::truncated("record body", end, payload.len()));
            }
            values.push(serial_type.decode(&payload[offset..end])?);
            offset = end;
        }

        Ok(Self { row_id, values })
    }

    pub fn get_value(&self, column_index: usize) -> Option<&Value> {
        self.values.get(column_index)
    }

    pub fn column_count(&self) -> usize {
        self.values.len()
    }
}

// The header is a length varint (counting itself) followed by one serial type
// varint per column; the column count is however many fit.
fn read_header(payload: &[u8]) -> Result<(usize, Vec<SerialType>)> {
    let (header_len, mut offset) = decode_varint(payload)?;
    let header_len = header_len as usize;
    if header_len < offset {
        return Err(DatabaseError::MalformedRecord {
            reason: format!("header length {header_len} shorter than its own varint"),
        });
    }
    if header_len > payload.len() {
        return Err(DatabaseError::truncated("record header", header_len, payload.len()));
    }

    let mut serial_types = Vec::new();
    while offset < header_len {
        let (code, size) = decode_varint(&payload[offset..])?;
        offset += size;
        if offset > header_len {
            return Err(DatabaseError::MalformedRecord {
                reason: format!("serial type varint crosses header end at byte {header_len}"),
            });
        }
        serial_types.push(SerialType::from_code(code)?);
    }
    Ok((header_len, serial_types))
}
