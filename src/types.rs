use std::fmt;

use indexmap::IndexMap;

use crate::constants::encoding_type;

/// A fully decoded value, independent of its on-disk encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum RdbValue {
    String(Vec<u8>),
    List(Vec<Vec<u8>>),
    /// Members in stored order. Duplicates are kept as found; a well-formed
    /// snapshot never contains any.
    Set(Vec<Vec<u8>>),
    /// (member, score) pairs in stored order.
    SortedSet(Vec<(Vec<u8>, f64)>),
    /// Field/value pairs in insertion order.
    Hash(IndexMap<Vec<u8>, Vec<u8>>),
    /// Streams are summarised, not reconstructed.
    Stream {
        summary: String,
        entries: Option<u64>,
    },
}

impl RdbValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            RdbValue::String(_) => "string",
            RdbValue::List(_) => "list",
            RdbValue::Set(_) => "set",
            RdbValue::SortedSet(_) => "zset",
            RdbValue::Hash(_) => "hash",
            RdbValue::Stream { .. } => "stream",
        }
    }
}

/// One key together with the metadata opcodes that preceded it.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyRecord {
    pub key: Vec<u8>,
    pub value: RdbValue,
    /// Absolute expiry, Unix milliseconds.
    pub expiry_ms: Option<u64>,
    pub idle_seconds: Option<u64>,
    pub freq: Option<u8>,
    pub db_index: u64,
}

/// One event emitted by the decoding pass, in input order.
#[derive(Debug, Clone, PartialEq)]
pub enum RdbItem {
    SelectDb(u64),
    /// Table size hints. Advisory only.
    ResizeDb { db_size: u64, expires_size: u64 },
    AuxField { key: Vec<u8>, value: Vec<u8> },
    Record(KeyRecord),
    /// A value was consumed but withheld by the active filter.
    Skipped,
    /// The trailing CRC bytes. Always the final event of a complete pass.
    Checksum(Vec<u8>),
}

/// The decoded snapshot as one tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub version: u32,
    /// Auxiliary metadata fields, insertion order kept, duplicates overwrite.
    pub aux: IndexMap<Vec<u8>, Vec<u8>>,
    pub keys: Vec<KeyRecord>,
    /// Raw trailing CRC bytes, possibly all zero.
    pub checksum: Vec<u8>,
    /// `None` when the checksum was not verified.
    pub checksum_ok: Option<bool>,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
    /// Byte offset in the input, when known.
    pub position: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    UnsupportedVersion,
    BadEncoding,
    SizeCeiling,
    DroppedMetadata,
    TrailingBytes,
    ModuleSkipped,
    StreamSummarised,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WarningKind::UnsupportedVersion => "unsupported-version",
            WarningKind::BadEncoding => "bad-encoding",
            WarningKind::SizeCeiling => "size-ceiling",
            WarningKind::DroppedMetadata => "dropped-metadata",
            WarningKind::TrailingBytes => "trailing-bytes",
            WarningKind::ModuleSkipped => "module-skipped",
            WarningKind::StreamSummarised => "stream-summarised",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    String,
    List,
    Set,
    SortedSet,
    Hash,
    Stream,
    Module,
}

impl Type {
    /// Map a top-level type tag to its logical type. `None` for bytes that
    /// are neither a known tag nor an opcode.
    pub fn from_tag(tag: u8) -> Option<Type> {
        match tag {
            encoding_type::STRING => Some(Type::String),
            encoding_type::LIST
            | encoding_type::LIST_ZIPLIST
            | encoding_type::LIST_QUICKLIST
            | encoding_type::LIST_QUICKLIST_2 => Some(Type::List),
            encoding_type::SET | encoding_type::SET_INTSET | encoding_type::SET_LIST_PACK => {
                Some(Type::Set)
            }
            encoding_type::ZSET
            | encoding_type::ZSET_2
            | encoding_type::ZSET_ZIPLIST
            | encoding_type::ZSET_LIST_PACK => Some(Type::SortedSet),
            encoding_type::HASH
            | encoding_type::HASH_ZIPLIST
            | encoding_type::HASH_ZIPLIST_OLD
            | encoding_type::HASH_LIST_PACK => Some(Type::Hash),
            encoding_type::STREAM_LIST_PACKS
            | encoding_type::STREAM_LIST_PACKS_2
            | encoding_type::STREAM_LIST_PACKS_3 => Some(Type::Stream),
            encoding_type::MODULE | encoding_type::MODULE_2 => Some(Type::Module),
            _ => None,
        }
    }
}
