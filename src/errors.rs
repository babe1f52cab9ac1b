use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RdbError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("not an RDB snapshot: {0}")]
    MagicMismatch(&'static str),

    #[error("bad length prefix byte 0x{0:02x}")]
    BadLengthPrefix(u8),

    #[error("bad {context} encoding: {message}")]
    BadEncoding {
        context: &'static str,
        message: String,
    },

    #[error("lzf decompression failed: {0}")]
    BadLzf(String),

    #[error("string of {0} bytes exceeds the size ceiling")]
    SizeCeilingExceeded(u64),

    #[error("unexpected end of input while reading {0}")]
    UnexpectedEof(&'static str),
}

impl RdbError {
    /// Errors that abort the current value only. The driver emits a
    /// placeholder record and resumes at the next top-level opcode.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RdbError::BadEncoding { .. }
                | RdbError::BadLengthPrefix(_)
                | RdbError::SizeCeilingExceeded(_)
        )
    }
}

pub type RdbResult<T> = Result<T, RdbError>;

pub type RdbOk = RdbResult<()>;
