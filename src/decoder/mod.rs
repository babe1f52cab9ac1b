pub mod common;
mod driver;
mod hash;
mod list;
mod module;
mod set;
mod sorted_set;
mod stream;

use std::io::Read;

use indexmap::IndexMap;

use self::driver::DecoderState;
use crate::constants::version;
use crate::errors::RdbResult;
use crate::filter::{Filter, Simple};
use crate::reader::SnapshotReader;
use crate::types::{RdbItem, Snapshot, Warning, WarningKind};

/// Streaming decoder. Yields one `RdbItem` per top-level record, in input
/// order. The header is verified on construction.
pub struct RdbDecoder<R: Read, F: Filter> {
    input: SnapshotReader<R>,
    filter: F,
    state: DecoderState,
}

impl<R: Read, F: Filter> RdbDecoder<R, F> {
    pub fn new(input: R, filter: F) -> RdbResult<Self> {
        let mut input = SnapshotReader::new(input);
        let snapshot_version = driver::read_header(&mut input)?;

        let mut state = DecoderState {
            version: snapshot_version,
            ..DecoderState::default()
        };
        if snapshot_version > version::SUPPORTED_MAXIMUM {
            state.warn(
                WarningKind::UnsupportedVersion,
                format!(
                    "snapshot version {} is newer than {}, decoding anyway",
                    snapshot_version,
                    version::SUPPORTED_MAXIMUM
                ),
                Some(input.position()),
            );
        }

        Ok(RdbDecoder {
            input,
            filter,
            state,
        })
    }

    pub fn version(&self) -> u32 {
        self.state.version
    }

    /// Bytes consumed from the input so far.
    pub fn position(&self) -> u64 {
        self.input.position()
    }

    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.state.warnings)
    }
}

impl<R: Read, F: Filter> Iterator for RdbDecoder<R, F> {
    type Item = RdbResult<RdbItem>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state.reached_eof {
            return None;
        }

        let item = driver::process_next_operation(&mut self.input, &self.filter, &mut self.state);
        if item.is_err() {
            // a failed pass does not resume
            self.state.reached_eof = true;
        }
        Some(item)
    }
}

/// Decode a whole snapshot into one tree.
///
/// Any fatal error, including the input being closed mid-pass, aborts and
/// discards partial results.
pub fn decode<R: Read>(input: R) -> RdbResult<Snapshot> {
    decode_with_filter(input, Simple::new())
}

pub fn decode_with_filter<R: Read, F: Filter>(input: R, filter: F) -> RdbResult<Snapshot> {
    let mut decoder = RdbDecoder::new(input, filter)?;

    let mut snapshot = Snapshot {
        version: decoder.version(),
        aux: IndexMap::new(),
        keys: Vec::new(),
        checksum: Vec::new(),
        checksum_ok: None,
        warnings: Vec::new(),
    };

    for item in decoder.by_ref() {
        match item? {
            RdbItem::Record(record) => snapshot.keys.push(record),
            RdbItem::AuxField { key, value } => {
                snapshot.aux.insert(key, value);
            }
            RdbItem::Checksum(bytes) => snapshot.checksum = bytes,
            RdbItem::SelectDb(_) | RdbItem::ResizeDb { .. } | RdbItem::Skipped => {}
        }
    }

    snapshot.warnings = decoder.take_warnings();
    Ok(snapshot)
}
