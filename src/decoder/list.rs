use std::io::Read;

use super::common::utils::{read_blob, read_blob_lossy, read_length, read_sequence};
use super::common::{read_listpack_strings, read_ziplist_strings};
use crate::errors::RdbResult;
use crate::types::RdbValue;

pub fn read_linked_list<R: Read>(input: &mut R) -> RdbResult<RdbValue> {
    let values = read_sequence(input, |input| read_blob_lossy(input))?;
    Ok(RdbValue::List(values))
}

pub fn read_list_ziplist<R: Read>(input: &mut R) -> RdbResult<RdbValue> {
    let ziplist = read_blob(input)?;
    Ok(RdbValue::List(read_ziplist_strings(&ziplist)?))
}

/// Payload layout of each node in a quicklist envelope.
#[derive(Debug, Clone, Copy)]
pub enum QuicklistNode {
    Ziplist,
    Listpack,
}

/// A quicklist is a length-prefixed run of nodes, each one a blob holding a
/// packed sequence. The logical value is the concatenation of all nodes'
/// entries.
pub fn read_quicklist<R: Read>(input: &mut R, node: QuicklistNode) -> RdbResult<RdbValue> {
    let len = read_length(input)?;
    let mut values = Vec::new();

    for i in 0..len {
        let blob = read_blob(input)?;
        let decoded = match node {
            QuicklistNode::Ziplist => read_ziplist_strings(&blob),
            QuicklistNode::Listpack => read_listpack_strings(&blob),
        };
        match decoded {
            Ok(mut entries) => values.append(&mut entries),
            // a bad node loses its own entries only; the outer cursor is
            // already past the blob
            Err(e) => log::warn!("quicklist node {} unreadable: {}", i, e),
        }
    }

    Ok(RdbValue::List(values))
}
