use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};

use super::common::utils::{read_blob, read_length, skip};
use crate::errors::RdbResult;
use crate::types::RdbValue;

/// Stream payload revisions, by type tag.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub enum StreamFormat {
    V1,
    V2,
    V3,
}

/// Walk a stream payload without reconstructing it. Entry listpacks, entry
/// IDs, and consumer-group state are consumed so the cursor lands exactly on
/// the next top-level opcode; only a summary survives.
pub fn read_stream<R: Read>(input: &mut R, format: StreamFormat) -> RdbResult<RdbValue> {
    let listpacks = read_length(input)?;
    for _ in 0..listpacks {
        read_blob(input)?; // master entry id, 16 raw bytes
        read_blob(input)?; // the listpack holding the entries
    }

    let entries = read_length(input)?;
    read_length(input)?; // last entry id, ms
    read_length(input)?; // last entry id, seq

    if format >= StreamFormat::V2 {
        read_length(input)?; // first entry id, ms
        read_length(input)?; // first entry id, seq
        read_length(input)?; // max deleted entry id, ms
        read_length(input)?; // max deleted entry id, seq
        read_length(input)?; // entries added
    }

    let groups = read_length(input)?;
    for _ in 0..groups {
        read_blob(input)?; // group name
        read_length(input)?; // last delivered id, ms
        read_length(input)?; // last delivered id, seq
        if format >= StreamFormat::V2 {
            read_length(input)?; // entries read
        }

        let pending = read_length(input)?;
        for _ in 0..pending {
            skip(input, 16)?; // raw entry id
            input.read_u64::<LittleEndian>()?; // delivery time
            read_length(input)?; // delivery count
        }

        let consumers = read_length(input)?;
        for _ in 0..consumers {
            read_blob(input)?; // consumer name
            input.read_u64::<LittleEndian>()?; // seen time
            if format >= StreamFormat::V3 {
                input.read_u64::<LittleEndian>()?; // active time
            }

            // consumer PEL entries carry ids only, state lives in the
            // group-level PEL
            let pending = read_length(input)?;
            for _ in 0..pending {
                skip(input, 16)?;
            }
        }
    }

    Ok(RdbValue::Stream {
        summary: format!("<stream with {} elements>", entries),
        entries: Some(entries),
    })
}
