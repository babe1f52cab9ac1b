mod intset;
mod listpack;
pub mod utils;
mod ziplist;

pub use intset::read_intset_strings;
pub use listpack::read_listpack_strings;
pub use ziplist::{read_ziplist_metadata, read_ziplist_strings, ZiplistEntry};

use crate::errors::RdbError;

/// Containers decode from a bounded, already-consumed blob. Whatever goes
/// wrong inside one is a structural defect of that container, so every
/// escaping error is folded into `BadEncoding`, which the driver treats as
/// recoverable.
pub(crate) fn container_error(context: &'static str, err: RdbError) -> RdbError {
    match err {
        RdbError::BadEncoding { .. } => err,
        RdbError::Io(ref e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            RdbError::BadEncoding {
                context,
                message: "truncated".to_string(),
            }
        }
        other => RdbError::BadEncoding {
            context,
            message: other.to_string(),
        },
    }
}
