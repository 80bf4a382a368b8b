use crate::types::{
    error::{DatabaseError, Result},
    value::Value,
};

/// Storage class and width of one record column, as given by the serial type
/// code in the record header.
///
/// | code          | width       | meaning                      |
/// |---------------|-------------|------------------------------|
/// | 0             | 0           | NULL                         |
/// | 1..=4         | 1..=4       | big-endian signed integer    |
/// | 5             | 6           | 48-bit signed integer        |
/// | 6             | 8           | 64-bit signed integer        |
/// | 7             | 8           | IEEE-754 double, big-endian  |
/// | 8, 9          | 0           | integer constants 0 and 1    |
/// | 10, 11        | -           | reserved                     |
/// | N >= 12, even | (N - 12) / 2 | BLOB                        |
/// | N >= 13, odd  | (N - 13) / 2 | TEXT                        |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialType {
    Null,
    Int8,
    Int16,
    Int24,
    Int32,
    Int48,
    Int64,
    Float64,
    Zero,
    One,
    Blob(usize),
    Text(usize),
}

impl SerialType {
    pub fn from_code(code: u64) -> Result<Self> {
        match code {
            0 => Ok(Self::Null),
            1 => Ok(Self::Int8),
            2 => Ok(Self::Int16),
            3 => Ok(Self::Int24),
            4 => Ok(Self::Int32),
            5 => Ok(Self::Int48),
            6 => Ok(Self::Int64),
            7 => Ok(Self::Float64),
            8 => Ok(Self::Zero),
            9 => Ok(Self::One),
            10 | 11 => Err(DatabaseError::InvalidSerialType(code)),
            n if n % 2 == 0 => Ok(Self::Blob(((n - 12) / 2) as usize)),
            n => Ok(Self::Text(((n - 13) / 2) as usize)),
        }
    }

    /// Number of body bytes the column occupies.
    pub fn size(&self) -> usize {
        match *self {
            Self::Null | Self::Zero | Self::One => 0,
            Self::Int8 => 1,
            Self::Int16 => 2,
            Self::Int24 => 3,
            Self::Int32 => 4,
            Self::Int48 => 6,
            Self::Int64 | Self::Float64 => 8,
            Self::Blob(len) | Self::Text(len) => len,
        }
    }

    /// Decode this column from the front of `bytes`. Only the first
    /// [`size`](Self::size) bytes are read.
    pub fn decode(&self, bytes: &[u8]) -> Result<Value> {
        let size = self.size();
        if bytes.len() < size {
            return Err(DatabaseError::truncated("column value", size, bytes.len()));
        }
        let bytes = &bytes[..size];

        let value = match *self {
            Self::Null => Value::Null,
            Self::Int8 | Self::Int16 | Self::Int24 | Self::Int32 | Self::Int48 | Self::Int64 => {
                Value::Integer(read_signed_be(bytes))
            }
            Self::Float64 => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(bytes);
                Value::Real(f64::from_be_bytes(raw))
            }
            Self::Zero => Value::Integer(0),
            Self::One => Value::Integer(1),
            Self::Blob(_) => Value::Blob(bytes.to_vec()),
            Self::Text(_) => Value::Text(bytes.to_vec()),
        };
        Ok(value)
    }
}

/// Width in bytes of the column described by a raw serial type code.
pub fn serial_type_size(code: u64) -> Result<usize> {
    SerialType::from_code(code).map(|serial_type| serial_type.size())
}

// Big-endian two's complement of any width up to 8, sign-extended from the top
// bit of the first byte.
fn read_signed_be(bytes: &[u8]) -> i64 {
    let mut value: i64 = match bytes.first() {
        Some(first) if first & 0x80 != 0 => -1,
        _ => 0,
    };
    for &byte in bytes {
        value = (value << 8) | i64::from(byte);
    }
    value
}
