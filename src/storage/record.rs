// src/storage/record.rs
//
// On-disk framing of a single log record:
//   [payload length: u32 BE][crc32 of payload: u32 BE][payload]
use crate::{Error, Result};
use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

pub const RECORD_HEADER_LEN: u64 = 8;

/// A payload read back from the log together with its position.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Offset of the record's frame header.
    pub offset: u64,
    /// Offset to read next to continue after this record.
    pub next_offset: u64,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub len: u32,
    pub checksum: u32,
}

impl RecordHeader {
    pub fn decode(buf: &[u8; RECORD_HEADER_LEN as usize]) -> Self {
        let mut len = [0u8; 4];
        let mut checksum = [0u8; 4];
        len.copy_from_slice(&buf[..4]);
        checksum.copy_from_slice(&buf[4..]);
        RecordHeader {
            len: u32::from_be_bytes(len),
            checksum: u32::from_be_bytes(checksum),
        }
    }

    pub fn framed_len(&self) -> u64 {
        RECORD_HEADER_LEN + self.len as u64
    }

    pub fn matches(&self, payload: &[u8]) -> bool {
        payload.len() == self.len as usize && checksum(payload) == self.checksum
    }
}

pub fn checksum(payload: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(payload);
    hasher.finalize()
}

/// Bytes a payload occupies on disk once framed.
pub fn framed_len(payload_len: usize) -> u64 {
    RECORD_HEADER_LEN + payload_len as u64
}

pub fn encode(payload: &[u8]) -> Result<Vec<u8>> {
    let len = u32::try_from(payload.len()).map_err(|_| Error::EntryTooLarge {
        len: payload.len(),
    })?;
    let mut frame = Vec::with_capacity(framed_len(payload.len()) as usize);
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(&checksum(payload).to_be_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}
