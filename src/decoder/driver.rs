use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};

use super::common::utils::{
    read_blob_lossy, read_length, read_length_with_encoding, read_version, skip, verify_magic,
};
use super::list::QuicklistNode;
use super::stream::StreamFormat;
use super::{hash, list, module, set, sorted_set, stream};
use crate::constants::{encoding, encoding_type, op_code};
use crate::errors::{RdbError, RdbOk, RdbResult};
use crate::filter::Filter;
use crate::reader::SnapshotReader;
use crate::types::{KeyRecord, RdbItem, RdbValue, Type, Warning, WarningKind};

/// Metadata opcodes waiting for the key they describe. Each slot attaches to
/// the next key only and is cleared when anything else arrives first.
#[derive(Debug, Default)]
pub(crate) struct PendingMeta {
    expiry_ms: Option<u64>,
    idle_seconds: Option<u64>,
    freq: Option<u8>,
}

impl PendingMeta {
    fn take(&mut self) -> (Option<u64>, Option<u64>, Option<u8>) {
        (
            self.expiry_ms.take(),
            self.idle_seconds.take(),
            self.freq.take(),
        )
    }

    fn is_empty(&self) -> bool {
        self.expiry_ms.is_none() && self.idle_seconds.is_none() && self.freq.is_none()
    }
}

#[derive(Debug, Default)]
pub(crate) struct DecoderState {
    pub version: u32,
    pub current_database: u64,
    pub pending: PendingMeta,
    pub reached_eof: bool,
    pub warnings: Vec<Warning>,
}

impl DecoderState {
    pub fn warn(&mut self, kind: WarningKind, message: String, position: Option<u64>) {
        log::warn!("{}", message);
        self.warnings.push(Warning {
            kind,
            message,
            position,
        });
    }

    fn note(&mut self, kind: WarningKind, message: String, position: Option<u64>) {
        log::info!("{}", message);
        self.warnings.push(Warning {
            kind,
            message,
            position,
        });
    }

    fn drop_pending(&mut self, context: &str, position: u64) {
        if !self.pending.is_empty() {
            self.pending = PendingMeta::default();
            self.warn(
                WarningKind::DroppedMetadata,
                format!("key metadata not followed by a key, dropped at {}", context),
                Some(position),
            );
        }
    }
}

pub(crate) fn read_header<R: Read>(input: &mut SnapshotReader<R>) -> RdbResult<u32> {
    verify_magic(input)?;
    read_version(input)
}

pub(crate) fn process_next_operation<R: Read, F: Filter>(
    input: &mut SnapshotReader<R>,
    filter: &F,
    state: &mut DecoderState,
) -> RdbResult<RdbItem> {
    loop {
        let next_op = match input.read_u8() {
            Ok(op) => op,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                // the only legitimate end of stream sits behind the EOF opcode
                state.reached_eof = true;
                return Err(RdbError::UnexpectedEof("top-level opcode"));
            }
            Err(e) => return Err(e.into()),
        };

        match next_op {
            op_code::SELECTDB => {
                state.drop_pending("SELECTDB", input.position());
                state.current_database = read_length(input)?;
                return Ok(RdbItem::SelectDb(state.current_database));
            }
            op_code::EOF => {
                state.drop_pending("EOF", input.position());
                return read_checksum(input, state);
            }
            op_code::EXPIRETIME_MS => {
                let expiry = input.read_u64::<LittleEndian>()?;
                if state.pending.expiry_ms.replace(expiry).is_some() {
                    let position = input.position();
                    state.warn(
                        WarningKind::DroppedMetadata,
                        "expiry set twice before a key".to_string(),
                        Some(position),
                    );
                }
            }
            op_code::EXPIRETIME => {
                let expiry = input.read_u32::<LittleEndian>()? as u64 * 1000;
                if state.pending.expiry_ms.replace(expiry).is_some() {
                    let position = input.position();
                    state.warn(
                        WarningKind::DroppedMetadata,
                        "expiry set twice before a key".to_string(),
                        Some(position),
                    );
                }
            }
            op_code::IDLE => {
                let idle = read_length(input)?;
                if state.pending.idle_seconds.replace(idle).is_some() {
                    let position = input.position();
                    state.warn(
                        WarningKind::DroppedMetadata,
                        "idle time set twice before a key".to_string(),
                        Some(position),
                    );
                }
            }
            op_code::FREQ => {
                let freq = input.read_u8()?;
                if state.pending.freq.replace(freq).is_some() {
                    let position = input.position();
                    state.warn(
                        WarningKind::DroppedMetadata,
                        "frequency set twice before a key".to_string(),
                        Some(position),
                    );
                }
            }
            op_code::RESIZEDB => {
                state.drop_pending("RESIZEDB", input.position());
                let db_size = read_length(input)?;
                let expires_size = read_length(input)?;
                return Ok(RdbItem::ResizeDb {
                    db_size,
                    expires_size,
                });
            }
            op_code::AUX => {
                state.drop_pending("AUX", input.position());
                let key = read_blob_lossy(input)?;
                let value = read_blob_lossy(input)?;
                return Ok(RdbItem::AuxField { key, value });
            }
            value_type => return handle_value_type(input, filter, state, value_type),
        }
    }
}

fn read_checksum<R: Read>(
    input: &mut SnapshotReader<R>,
    state: &mut DecoderState,
) -> RdbResult<RdbItem> {
    let mut trailing = Vec::new();
    input.read_to_end(&mut trailing)?;

    if trailing.len() < 8 {
        let position = input.position();
        state.warn(
            WarningKind::TrailingBytes,
            format!("checksum truncated to {} bytes", trailing.len()),
            Some(position),
        );
    } else if trailing.len() > 8 {
        let position = input.position();
        state.warn(
            WarningKind::TrailingBytes,
            format!("{} bytes after the checksum", trailing.len() - 8),
            Some(position),
        );
        trailing.truncate(8);
    }

    state.reached_eof = true;
    Ok(RdbItem::Checksum(trailing))
}

fn handle_value_type<R: Read, F: Filter>(
    input: &mut SnapshotReader<R>,
    filter: &F,
    state: &mut DecoderState,
    value_type: u8,
) -> RdbResult<RdbItem> {
    let position = input.position();
    let typ = Type::from_tag(value_type).ok_or_else(|| RdbError::BadEncoding {
        context: "type tag",
        message: format!("unknown type tag {} at byte {}", value_type, position),
    })?;

    if !filter.matches_db(state.current_database) {
        skip_blob(input)?;
        skip_object(input, value_type)?;
        state.pending.take();
        return Ok(RdbItem::Skipped);
    }

    let key = read_blob_lossy(input)?;
    if !filter.matches_type(typ) || !filter.matches_key(&key) {
        skip_object(input, value_type)?;
        state.pending.take();
        return Ok(RdbItem::Skipped);
    }

    let value = match read_type(input, state, value_type) {
        Ok(value) => value,
        Err(e) if e.is_recoverable() => {
            let position = input.position();
            let kind = match e {
                RdbError::SizeCeilingExceeded(_) => WarningKind::SizeCeiling,
                _ => WarningKind::BadEncoding,
            };
            state.warn(
                kind,
                format!("key {:?}: {}", String::from_utf8_lossy(&key), e),
                Some(position),
            );
            RdbValue::String(format!("<decode error: {}>", e).into_bytes())
        }
        Err(e) => return Err(e),
    };

    let (expiry_ms, idle_seconds, freq) = state.pending.take();
    Ok(RdbItem::Record(KeyRecord {
        key,
        value,
        expiry_ms,
        idle_seconds,
        freq,
        db_index: state.current_database,
    }))
}

fn read_type<R: Read>(
    input: &mut SnapshotReader<R>,
    state: &mut DecoderState,
    value_type: u8,
) -> RdbResult<RdbValue> {
    match value_type {
        encoding_type::STRING => Ok(RdbValue::String(read_blob_lossy(input)?)),
        encoding_type::LIST => list::read_linked_list(input),
        encoding_type::SET => set::read_set(input),
        encoding_type::ZSET => sorted_set::read_sorted_set(input, false),
        encoding_type::ZSET_2 => sorted_set::read_sorted_set(input, true),
        encoding_type::HASH => hash::read_hash(input),
        encoding_type::HASH_ZIPLIST | encoding_type::HASH_ZIPLIST_OLD => {
            hash::read_hash_ziplist(input)
        }
        encoding_type::LIST_ZIPLIST => list::read_list_ziplist(input),
        encoding_type::SET_INTSET => set::read_set_intset(input),
        encoding_type::ZSET_ZIPLIST => sorted_set::read_sorted_set_ziplist(input),
        encoding_type::LIST_QUICKLIST => list::read_quicklist(input, QuicklistNode::Ziplist),
        encoding_type::LIST_QUICKLIST_2 => list::read_quicklist(input, QuicklistNode::Listpack),
        encoding_type::HASH_LIST_PACK => hash::read_hash_listpack(input),
        encoding_type::ZSET_LIST_PACK => sorted_set::read_sorted_set_listpack(input),
        encoding_type::SET_LIST_PACK => set::read_set_listpack(input),
        encoding_type::STREAM_LIST_PACKS => summarise_stream(input, state, StreamFormat::V1),
        encoding_type::STREAM_LIST_PACKS_2 => summarise_stream(input, state, StreamFormat::V2),
        encoding_type::STREAM_LIST_PACKS_3 => summarise_stream(input, state, StreamFormat::V3),
        encoding_type::MODULE | encoding_type::MODULE_2 => {
            let value = module::skip_module(input)?;
            let position = input.position();
            state.note(
                WarningKind::ModuleSkipped,
                "module value skipped".to_string(),
                Some(position),
            );
            Ok(value)
        }
        // unreachable behind Type::from_tag, kept as a guard
        unknown => Err(RdbError::BadEncoding {
            context: "type tag",
            message: format!("unknown type tag {}", unknown),
        }),
    }
}

fn summarise_stream<R: Read>(
    input: &mut SnapshotReader<R>,
    state: &mut DecoderState,
    format: StreamFormat,
) -> RdbResult<RdbValue> {
    let value = stream::read_stream(input, format)?;
    let position = input.position();
    state.note(
        WarningKind::StreamSummarised,
        "stream value summarised, not reconstructed".to_string(),
        Some(position),
    );
    Ok(value)
}

/// Advance past one string-encoded value without materialising it.
fn skip_blob<R: Read>(input: &mut SnapshotReader<R>) -> RdbOk {
    let (len, is_encoded) = read_length_with_encoding(input)?;

    let skip_bytes = if is_encoded {
        match len as u32 {
            encoding::INT8 => 1,
            encoding::INT16 => 2,
            encoding::INT32 => 4,
            encoding::LZF => {
                let compressed_length = read_length(input)?;
                let _real_length = read_length(input)?;
                compressed_length
            }
            other => {
                return Err(RdbError::BadEncoding {
                    context: "string",
                    message: format!("unknown special encoding {}", other),
                })
            }
        }
    } else {
        len
    };

    skip(input, skip_bytes)
}

/// Advance past one value of the given type without decoding it. Used for
/// filtered-out keys.
fn skip_object<R: Read>(input: &mut SnapshotReader<R>, value_type: u8) -> RdbOk {
    match value_type {
        encoding_type::STRING
        | encoding_type::HASH_ZIPLIST
        | encoding_type::HASH_ZIPLIST_OLD
        | encoding_type::LIST_ZIPLIST
        | encoding_type::SET_INTSET
        | encoding_type::ZSET_ZIPLIST
        | encoding_type::HASH_LIST_PACK
        | encoding_type::ZSET_LIST_PACK
        | encoding_type::SET_LIST_PACK => skip_blob(input),
        encoding_type::LIST | encoding_type::SET => {
            let len = read_length(input)?;
            for _ in 0..len {
                skip_blob(input)?;
            }
            Ok(())
        }
        encoding_type::HASH => {
            let len = read_length(input)?;
            for _ in 0..len {
                skip_blob(input)?;
                skip_blob(input)?;
            }
            Ok(())
        }
        encoding_type::ZSET => {
            let len = read_length(input)?;
            for _ in 0..len {
                skip_blob(input)?;
                skip_ascii_double(input)?;
            }
            Ok(())
        }
        encoding_type::ZSET_2 => {
            let len = read_length(input)?;
            for _ in 0..len {
                skip_blob(input)?;
                skip(input, 8)?;
            }
            Ok(())
        }
        encoding_type::LIST_QUICKLIST | encoding_type::LIST_QUICKLIST_2 => {
            let len = read_length(input)?;
            for _ in 0..len {
                skip_blob(input)?;
            }
            Ok(())
        }
        encoding_type::STREAM_LIST_PACKS => {
            stream::read_stream(input, StreamFormat::V1).map(|_| ())
        }
        encoding_type::STREAM_LIST_PACKS_2 => {
            stream::read_stream(input, StreamFormat::V2).map(|_| ())
        }
        encoding_type::STREAM_LIST_PACKS_3 => {
            stream::read_stream(input, StreamFormat::V3).map(|_| ())
        }
        encoding_type::MODULE | encoding_type::MODULE_2 => {
            module::skip_module(input).map(|_| ())
        }
        unknown => Err(RdbError::BadEncoding {
            context: "type tag",
            message: format!("unknown type tag {}", unknown),
        }),
    }
}

fn skip_ascii_double<R: Read>(input: &mut SnapshotReader<R>) -> RdbOk {
    let score_length = input.read_u8()?;
    match score_length {
        253..=255 => Ok(()),
        n => skip(input, n as u64),
    }
}
