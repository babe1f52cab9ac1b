use std::io::Read;

use super::common::utils::{read_blob, read_blob_lossy, read_sequence};
use super::common::{read_intset_strings, read_listpack_strings};
use crate::errors::RdbResult;
use crate::types::RdbValue;

pub fn read_set<R: Read>(input: &mut R) -> RdbResult<RdbValue> {
    let members = read_sequence(input, |input| read_blob_lossy(input))?;
    Ok(RdbValue::Set(members))
}

pub fn read_set_intset<R: Read>(input: &mut R) -> RdbResult<RdbValue> {
    let intset = read_blob(input)?;
    Ok(RdbValue::Set(read_intset_strings(&intset)?))
}

pub fn read_set_listpack<R: Read>(input: &mut R) -> RdbResult<RdbValue> {
    let listpack = read_blob(input)?;
    Ok(RdbValue::Set(read_listpack_strings(&listpack)?))
}
