use std::io::Read;

use indexmap::IndexMap;

use super::common::utils::{read_blob, read_blob_lossy, read_length};
use super::common::{read_listpack_strings, read_ziplist_strings};
use crate::errors::{RdbError, RdbResult};
use crate::types::RdbValue;

pub fn read_hash<R: Read>(input: &mut R) -> RdbResult<RdbValue> {
    let mut hash_items = read_length(input)?;
    let mut values = IndexMap::new();

    while hash_items > 0 {
        let field = read_blob_lossy(input)?;
        let val = read_blob_lossy(input)?;
        values.insert(field, val);
        hash_items -= 1;
    }

    Ok(RdbValue::Hash(values))
}

pub fn read_hash_ziplist<R: Read>(input: &mut R) -> RdbResult<RdbValue> {
    let ziplist = read_blob(input)?;
    let entries = read_ziplist_strings(&ziplist)?;
    Ok(RdbValue::Hash(pairs_to_hash(entries, "hash ziplist")?))
}

pub fn read_hash_listpack<R: Read>(input: &mut R) -> RdbResult<RdbValue> {
    let listpack = read_blob(input)?;
    let entries = read_listpack_strings(&listpack)?;
    Ok(RdbValue::Hash(pairs_to_hash(entries, "hash listpack")?))
}

fn pairs_to_hash(
    entries: Vec<Vec<u8>>,
    context: &'static str,
) -> RdbResult<IndexMap<Vec<u8>, Vec<u8>>> {
    if entries.len() % 2 != 0 {
        return Err(RdbError::BadEncoding {
            context,
            message: format!("odd number of entries ({})", entries.len()),
        });
    }

    let mut values = IndexMap::with_capacity(entries.len() / 2);
    let mut iter = entries.into_iter();
    while let (Some(field), Some(value)) = (iter.next(), iter.next()) {
        values.insert(field, value);
    }

    Ok(values)
}
