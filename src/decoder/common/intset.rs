use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use super::container_error;
use crate::errors::{RdbError, RdbResult};

/// Decode an intset blob: element width, count, then the elements, all
/// little-endian. Members come back rendered as decimal ASCII.
pub fn read_intset_strings(blob: &[u8]) -> RdbResult<Vec<Vec<u8>>> {
    decode_intset(blob).map_err(|e| container_error("intset", e))
}

fn decode_intset(blob: &[u8]) -> RdbResult<Vec<Vec<u8>>> {
    let mut reader = Cursor::new(blob);
    let byte_size = reader.read_u32::<LittleEndian>()?;
    let count = reader.read_u32::<LittleEndian>()?;

    if !matches!(byte_size, 2 | 4 | 8) {
        return Err(RdbError::BadEncoding {
            context: "intset",
            message: format!("unsupported element width {}", byte_size),
        });
    }

    let expected = blob.len().saturating_sub(8) / byte_size as usize;
    if count as usize != expected {
        log::warn!("intset header declared {} elements, blob holds {}", count, expected);
    }

    let mut members = Vec::with_capacity(expected);
    for _ in 0..count {
        let val = match byte_size {
            2 => reader.read_i16::<LittleEndian>()? as i64,
            4 => reader.read_i32::<LittleEndian>()? as i64,
            _ => reader.read_i64::<LittleEndian>()?,
        };
        members.push(val.to_string().into_bytes());
    }

    Ok(members)
}
