use std::io::{Cursor, Read};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};

use super::container_error;
use super::utils::read_exact;
use crate::errors::{RdbError, RdbResult};

/// Decode a whole listpack blob. Integer entries come back rendered as
/// decimal ASCII, so callers see one uniform byte-string sequence.
pub fn read_listpack_strings(blob: &[u8]) -> RdbResult<Vec<Vec<u8>>> {
    decode_listpack(blob).map_err(|e| container_error("listpack", e))
}

fn decode_listpack(blob: &[u8]) -> RdbResult<Vec<Vec<u8>>> {
    let mut reader = Cursor::new(blob);
    let _total_bytes = reader.read_u32::<LittleEndian>()?;
    let num_elements = reader.read_u16::<LittleEndian>()?;

    // 0xFFFF means the count outgrew the header field; scan to the terminator.
    let mut entries = if num_elements == 0xFFFF {
        Vec::new()
    } else {
        Vec::with_capacity(num_elements as usize)
    };

    loop {
        let lead = reader.read_u8()?;
        if lead == 0xFF {
            break;
        }
        entries.push(read_listpack_entry_as_string(&mut reader, lead)?);
    }

    if num_elements != 0xFFFF && entries.len() != num_elements as usize {
        log::warn!(
            "listpack header declared {} entries, found {}",
            num_elements,
            entries.len()
        );
    }
    let consumed = reader.position() as usize;
    if consumed < blob.len() {
        log::warn!("{} trailing bytes after listpack terminator", blob.len() - consumed);
    }

    Ok(entries)
}

/// Skip the backlen trailing an entry of `element_len` total bytes. The
/// backlen only serves reverse traversal; its content is not validated.
fn skip_backlen<R: Read>(reader: &mut R, element_len: u64) -> RdbResult<()> {
    let backlen = if element_len <= 127 {
        1
    } else if element_len < (1 << 14) - 1 {
        2
    } else if element_len < (1 << 21) - 1 {
        3
    } else if element_len < (1 << 28) - 1 {
        4
    } else {
        5
    };

    let mut buf = [0u8; 5];
    reader.read_exact(&mut buf[..backlen])?;
    Ok(())
}

/// `lead` is the entry's first byte, already consumed by the caller's
/// terminator check.
///
/// Encodings, by high bits of `lead`:
/// 0xxxxxxx           7-bit unsigned integer
/// 10xxxxxx           string, 6-bit length
/// 110xxxxx           13-bit signed integer
/// 1110xxxx           string, 12-bit length
/// 1111xxxx           string with 32-bit length, fixed-width integers
fn read_listpack_entry_as_string<R: Read>(reader: &mut R, lead: u8) -> RdbResult<Vec<u8>> {
    if lead & 0x80 == 0 {
        let value = lead & 0x7F;
        skip_backlen(reader, 1)?;
        return Ok(value.to_string().into_bytes());
    }

    if lead & 0xC0 == 0x80 {
        let len = (lead & 0x3F) as usize;
        let value = read_exact(reader, len)?;
        skip_backlen(reader, 1 + len as u64)?;
        return Ok(value);
    }

    if lead & 0xE0 == 0xC0 {
        let next = reader.read_u8()?;
        let raw = (((lead & 0x1F) as i32) << 8) | next as i32;
        // sign-extend from 13 bits
        let value = (raw << 19) >> 19;
        skip_backlen(reader, 2)?;
        return Ok(value.to_string().into_bytes());
    }

    if lead & 0xF0 == 0xE0 {
        let low = reader.read_u8()? as usize;
        let len = (((lead & 0x0F) as usize) << 8) | low;
        let value = read_exact(reader, len)?;
        skip_backlen(reader, 2 + len as u64)?;
        return Ok(value);
    }

    match lead & 0x0F {
        0x0 => {
            let len = reader.read_u32::<BigEndian>()? as usize;
            let value = read_exact(reader, len)?;
            skip_backlen(reader, 5 + len as u64)?;
            Ok(value)
        }
        0x1 => {
            let value = reader.read_i16::<LittleEndian>()?;
            skip_backlen(reader, 3)?;
            Ok(value.to_string().into_bytes())
        }
        0x2 => {
            let mut bytes = [0; 3];
            reader.read_exact(&mut bytes)?;
            let raw =
                (bytes[0] as i32) | ((bytes[1] as i32) << 8) | ((bytes[2] as i32) << 16);
            // sign-extend from 24 bits
            let value = (raw << 8) >> 8;
            skip_backlen(reader, 4)?;
            Ok(value.to_string().into_bytes())
        }
        0x3 => {
            let value = reader.read_i32::<LittleEndian>()?;
            skip_backlen(reader, 5)?;
            Ok(value.to_string().into_bytes())
        }
        0x4 => {
            let value = reader.read_i64::<LittleEndian>()?;
            skip_backlen(reader, 9)?;
            Ok(value.to_string().into_bytes())
        }
        other => Err(RdbError::BadEncoding {
            context: "listpack",
            message: format!("unknown entry header 0xf{:x}", other),
        }),
    }
}
