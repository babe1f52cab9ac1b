use std::io::{Cursor, Read};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};

use super::container_error;
use super::utils::read_exact;
use crate::errors::{RdbError, RdbResult};

#[derive(Debug, Clone)]
pub enum ZiplistEntry {
    String(Vec<u8>),
    Number(i64),
}

/// Header: total bytes, tail offset, entry count. All little-endian.
pub fn read_ziplist_metadata<T: Read>(input: &mut T) -> RdbResult<(u32, u32, u16)> {
    let zlbytes = input.read_u32::<LittleEndian>()?;
    let zltail = input.read_u32::<LittleEndian>()?;
    let zllen = input.read_u16::<LittleEndian>()?;

    Ok((zlbytes, zltail, zllen))
}

/// Decode a whole ziplist blob. Integer entries come back rendered as
/// decimal ASCII, so callers see one uniform byte-string sequence.
pub fn read_ziplist_strings(blob: &[u8]) -> RdbResult<Vec<Vec<u8>>> {
    decode_ziplist(blob).map_err(|e| container_error("ziplist", e))
}

fn decode_ziplist(blob: &[u8]) -> RdbResult<Vec<Vec<u8>>> {
    let mut reader = Cursor::new(blob);
    let (_zlbytes, _zltail, zllen) = read_ziplist_metadata(&mut reader)?;

    // 0xFFFF means the count outgrew the header field; scan to the terminator.
    let mut entries = if zllen == 0xFFFF {
        Vec::new()
    } else {
        Vec::with_capacity(zllen as usize)
    };

    loop {
        let lead = reader.read_u8()?;
        if lead == 0xFF {
            break;
        }
        entries.push(read_ziplist_entry_string(&mut reader, lead)?);
    }

    if zllen != 0xFFFF && entries.len() != zllen as usize {
        log::warn!(
            "ziplist header declared {} entries, found {}",
            zllen,
            entries.len()
        );
    }
    let consumed = reader.position() as usize;
    if consumed < blob.len() {
        log::warn!("{} trailing bytes after ziplist terminator", blob.len() - consumed);
    }

    Ok(entries)
}

fn read_ziplist_entry_string<R: Read>(input: &mut R, lead: u8) -> RdbResult<Vec<u8>> {
    match read_ziplist_entry(input, lead)? {
        ZiplistEntry::String(val) => Ok(val),
        ZiplistEntry::Number(val) => Ok(val.to_string().into_bytes()),
    }
}

/// `lead` is the first byte of the entry, the prevlen, already consumed by
/// the caller's terminator check.
fn read_ziplist_entry<R: Read>(input: &mut R, lead: u8) -> RdbResult<ZiplistEntry> {
    // 1. prevlen: one byte, or 0xFE plus four bytes
    if lead == 254 {
        let mut skipped = [0; 4];
        input.read_exact(&mut skipped)?;
    }

    // 2. encoding flag, or an inline number
    let flag = input.read_u8()?;

    let length: u64 = match (flag & 0xC0) >> 6 {
        0 => (flag & 0x3F) as u64,
        1 => {
            let next_byte = input.read_u8()?;
            (((flag & 0x3F) as u64) << 8) | next_byte as u64
        }
        2 => input.read_u32::<BigEndian>()? as u64,
        _ => {
            let number = match flag {
                0xC0 => input.read_i16::<LittleEndian>()? as i64,
                0xD0 => input.read_i32::<LittleEndian>()? as i64,
                0xE0 => input.read_i64::<LittleEndian>()?,
                0xF0 => {
                    let mut bytes = [0; 3];
                    input.read_exact(&mut bytes)?;
                    let raw = (bytes[0] as i32)
                        | ((bytes[1] as i32) << 8)
                        | ((bytes[2] as i32) << 16);
                    // sign-extend from 24 bits
                    ((raw << 8) >> 8) as i64
                }
                0xFE => input.read_i8()? as i64,
                0xF1..=0xFD => (flag & 0x0F) as i64 - 1,
                _ => {
                    return Err(RdbError::BadEncoding {
                        context: "ziplist",
                        message: format!("unknown entry flag 0x{:02x}", flag),
                    })
                }
            };

            return Ok(ZiplistEntry::Number(number));
        }
    };

    // 3. literal bytes
    let rawval = read_exact(input, length as usize)?;
    Ok(ZiplistEntry::String(rawval))
}
