//! SQLite variable-length integers.
//!
//! A varint is 1-9 bytes, most significant group first. Each of the first
//! eight bytes contributes its low 7 bits and uses the high bit as a
//! continuation flag; a ninth byte, if reached, contributes all 8 bits.

use crate::types::error::{DatabaseError, Result};

pub const MAX_VARINT_LEN: usize = 9;

/// Decode a varint from the start of `bytes`, returning `(value, bytes_consumed)`.
pub fn decode_varint(bytes: &[u8]) -> Result<(u64, usize)> {
    let mut value: u64 = 0;
    for i in 0..MAX_VARINT_LEN - 1 {
        let Some(&byte) = bytes.get(i) else {
            return Err(DatabaseError::truncated("varint", i + 1, bytes.len()));
        };
        value = (value << 7) | u64::from(byte & 0x7F);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }

    let Some(&last) = bytes.get(MAX_VARINT_LEN - 1) else {
        return Err(DatabaseError::truncated("varint", MAX_VARINT_LEN, bytes.len()));
    };
    Ok(((value << 8) | u64::from(last), MAX_VARINT_LEN))
}

/// Number of bytes `encode_varint(value)` produces.
pub const fn varint_len(value: u64) -> usize {
    if value <= 0x7F {
        1
    } else if value <= 0x3FFF {
        2
    } else if value <= 0x001F_FFFF {
        3
    } else if value <= 0x0FFF_FFFF {
        4
    } else if value <= 0x07_FFFF_FFFF {
        5
    } else if value <= 0x03FF_FFFF_FFFF {
        6
    } else if value <= 0x01_FFFF_FFFF_FFFF {
        7
    } else if value <= 0xFF_FFFF_FFFF_FFFF {
        8
    } else {
        9
    }
}

pub fn encode_varint(value: u64) -> Vec<u8> {
    let len = varint_len(value);
    let mut buf = vec![0u8; len];

    if len == MAX_VARINT_LEN {
        buf[8] = value as u8;
        let mut rest = value >> 8;
        for i in (0..8).rev() {
            buf[i] = (rest as u8 & 0x7F) | 0x80;
            rest >>= 7;
        }
        return buf;
    }

    let mut rest = value;
    for i in (0..len).rev() {
        buf[i] = rest as u8 & 0x7F;
        if i != len - 1 {
            buf[i] |= 0x80;
        }
        rest >>= 7;
    }
    buf
}
