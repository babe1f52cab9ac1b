use std::io::Read;
use std::str;

use byteorder::{LittleEndian, ReadBytesExt};

use super::common::utils::{read_blob, read_blob_lossy, read_exact, read_length};
use super::common::{read_listpack_strings, read_ziplist_strings};
use crate::errors::{RdbError, RdbResult};
use crate::types::RdbValue;

/// Classic sorted set. `binary_scores` selects the v2 layout, where scores
/// are raw little-endian doubles instead of length-prefixed ASCII.
pub fn read_sorted_set<R: Read>(input: &mut R, binary_scores: bool) -> RdbResult<RdbValue> {
    let mut set_items = read_length(input)?;
    let mut values = Vec::new();

    while set_items > 0 {
        let member = read_blob_lossy(input)?;
        let score = if binary_scores {
            input.read_f64::<LittleEndian>()?
        } else {
            read_ascii_double(input)?
        };

        values.push((member, score));
        set_items -= 1;
    }

    Ok(RdbValue::SortedSet(values))
}

pub fn read_sorted_set_ziplist<R: Read>(input: &mut R) -> RdbResult<RdbValue> {
    let ziplist = read_blob(input)?;
    let entries = read_ziplist_strings(&ziplist)?;
    pairs_to_sorted_set(entries, "sorted set ziplist")
}

pub fn read_sorted_set_listpack<R: Read>(input: &mut R) -> RdbResult<RdbValue> {
    let listpack = read_blob(input)?;
    let entries = read_listpack_strings(&listpack)?;
    pairs_to_sorted_set(entries, "sorted set listpack")
}

/// One byte of length, then ASCII digits. Lengths 253 to 255 are the
/// non-finite specials.
fn read_ascii_double<R: Read>(input: &mut R) -> RdbResult<f64> {
    let score_length = input.read_u8()?;
    match score_length {
        253 => Ok(f64::NAN),
        254 => Ok(f64::INFINITY),
        255 => Ok(f64::NEG_INFINITY),
        _ => {
            let raw = read_exact(input, score_length as usize)?;
            parse_score(&raw, "sorted set")
        }
    }
}

fn pairs_to_sorted_set(entries: Vec<Vec<u8>>, context: &'static str) -> RdbResult<RdbValue> {
    if entries.len() % 2 != 0 {
        return Err(RdbError::BadEncoding {
            context,
            message: format!("odd number of entries ({})", entries.len()),
        });
    }

    let mut values = Vec::with_capacity(entries.len() / 2);
    let mut iter = entries.into_iter();
    while let (Some(member), Some(score)) = (iter.next(), iter.next()) {
        let score = parse_score(&score, context)?;
        values.push((member, score));
    }

    Ok(RdbValue::SortedSet(values))
}

fn parse_score(raw: &[u8], context: &'static str) -> RdbResult<f64> {
    str::from_utf8(raw)
        .ok()
        .and_then(|text| text.parse::<f64>().ok())
        .ok_or_else(|| RdbError::BadEncoding {
            context,
            message: format!("unparsable score {:?}", String::from_utf8_lossy(raw)),
        })
}
