pub mod broker;
pub mod config;
pub mod storage;

use std::path::PathBuf;
use thiserror::Error;

pub use config::{BrokerConfig, LogConfig};
pub use storage::{Record, SegmentedLog};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("Checksum mismatch for record at offset {offset}")]
    ChecksumMismatch { offset: u64 },
    #[error("Offset {offset} is outside segment range [{start}, {end})")]
    OffsetOutOfRange { offset: u64, start: u64, end: u64 },
    #[error("Offset {offset} is not a record boundary in segment [{start}, {end})")]
    MisalignedOffset { offset: u64, start: u64, end: u64 },
    #[error("Segment starting at offset {start} is sealed")]
    SegmentSealed { start: u64 },
    #[error("Entry of {len} bytes is too large for a record")]
    EntryTooLarge { len: usize },
    #[error("Corrupted segment {file}: {reason}")]
    CorruptedSegment { file: String, reason: String },
    #[error("Segment dir {} not valid: segment at {start} does not follow end offset {prev_end}", .dir.display())]
    Discontinuity {
        dir: PathBuf,
        prev_end: u64,
        start: u64,
    },
    #[error("Invalid segment layout: {0}")]
    InvalidLayout(String),
    #[error("Log refuses writes after an earlier append failure")]
    LogFailed,
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Invalid topic name: {0:?}")]
    InvalidTopic(String),
    #[error("Frame of {len} bytes exceeds the frame limit")]
    FrameTooLarge { len: usize },
    #[error("Internal error: {0}")]
    Internal(String),
}
