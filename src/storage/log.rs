// src/storage/log.rs
use crate::config::LogConfig;
use crate::storage::record::{self, Record};
use crate::storage::segment::{Segment, SegmentInfo, SegmentName, SEGMENT_HEADER_LEN};
use crate::{Error, Result};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Append-only log stored as a chain of segment files in one directory.
///
/// Offsets are positions in a single logical address space that covers every
/// segment file, headers included, so a segment created after one ending at
/// `end` starts at `end + SEGMENT_HEADER_LEN`.
///
/// `append` is serialized internally; `read` may run concurrently from any
/// number of threads.
#[derive(Debug)]
pub struct SegmentedLog {
    config: LogConfig,
    segments: RwLock<BTreeMap<u64, Arc<Segment>>>, // keyed by start offset
    // Cumulative on-disk footprint, polled by snapshot policies.
    total_size: AtomicU64,
    writer: Mutex<()>,
    failed: AtomicBool,
}

impl SegmentedLog {
    /// Opens the log in `config.dir`, creating the directory if needed, and
    /// validates that the segments found there form a contiguous chain.
    pub fn open(config: LogConfig) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.dir)?;

        let segments = read_segments(&config.dir)?;
        validate_segments(&config.dir, &segments)?;

        let total_size: u64 = segments.values().map(|s| s.file_size()).sum();
        log::info!(
            "Opened log {:?}: {} segments, last end offset {}, {} bytes",
            config.dir,
            segments.len(),
            segments.values().next_back().map_or(0, |s| s.end_offset()),
            total_size
        );

        Ok(SegmentedLog {
            config,
            segments: RwLock::new(segments),
            total_size: AtomicU64::new(total_size),
            writer: Mutex::new(()),
            failed: AtomicBool::new(false),
        })
    }

    /// End offset of the last segment, or 0 for an empty log.
    pub fn get_last_end_offset(&self) -> u64 {
        self.last_segment().map_or(0, |s| s.end_offset())
    }

    /// Appends `payload` and returns the log's new end offset.
    ///
    /// An error here means the log may no longer match the replicated
    /// history: the log refuses all later appends with `Error::LogFailed`.
    pub fn append(&self, payload: &[u8]) -> Result<u64> {
        let _writer = self.writer.lock();
        if self.failed.load(Ordering::Acquire) {
            return Err(Error::LogFailed);
        }

        match self.append_locked(payload) {
            Ok(end) => Ok(end),
            Err(e @ Error::EntryTooLarge { .. }) => Err(e),
            Err(e) => {
                log::error!(
                    "Append to log {:?} failed, refusing further writes: {}",
                    self.config.dir,
                    e
                );
                self.failed.store(true, Ordering::Release);
                Err(e)
            }
        }
    }

    fn append_locked(&self, payload: &[u8]) -> Result<u64> {
        let framed = record::framed_len(payload.len());
        let target = match self.last_segment() {
            None => self.new_segment()?,
            Some(last) if !last.can_write() => self.new_segment()?,
            Some(last)
                if !last.is_empty()
                    && last.file_size() + framed > self.config.max_segment_size =>
            {
                last.seal()?;
                self.new_segment()?
            }
            Some(last) => last,
        };

        let end = target.append(payload)?;
        if self.config.sync_on_append {
            target.sync()?;
        }
        self.total_size.fetch_add(framed, Ordering::AcqRel);
        Ok(end)
    }

    fn new_segment(&self) -> Result<Arc<Segment>> {
        let start = match self.last_segment() {
            None => 0,
            Some(last) => last.end_offset() + SEGMENT_HEADER_LEN,
        };
        let segment = Arc::new(Segment::create(&self.config.dir, start)?);
        self.segments.write().insert(start, Arc::clone(&segment));
        self.total_size.fetch_add(SEGMENT_HEADER_LEN, Ordering::AcqRel);
        Ok(segment)
    }

    /// Reads the payload of the record at `offset`. `Ok(None)` if no record
    /// starts there.
    pub fn read(&self, offset: u64) -> Result<Option<Vec<u8>>> {
        Ok(self.read_record(offset)?.map(|record| record.payload))
    }

    /// Like `read`, but also returns the offset of the following record.
    ///
    /// The end offset of a sealed segment addresses the first record of the
    /// segment after it, so consumers can always continue at `next_offset`.
    pub fn read_record(&self, offset: u64) -> Result<Option<Record>> {
        let (segment, successor) = {
            let segments = self.segments.read();
            let Some((_, segment)) = segments.range(..=offset).next_back() else {
                log::warn!("message not found, offset={}", offset);
                return Ok(None);
            };
            let successor = segments
                .range(segment.start_offset() + 1..)
                .next()
                .map(|(_, s)| Arc::clone(s));
            (Arc::clone(segment), successor)
        };

        let end = segment.end_offset();
        if offset < end {
            return segment.read_record(offset).map(Some);
        }
        match successor {
            Some(next) if offset == end && !segment.can_write() && !next.is_empty() => {
                next.read_record(next.start_offset()).map(Some)
            }
            _ => {
                log::debug!(
                    "no record at offset={} (segment {} ends at {})",
                    offset,
                    segment.start_offset(),
                    end
                );
                Ok(None)
            }
        }
    }

    /// Floor lookup: the segment with the greatest start offset <= `offset`.
    pub fn locate(&self, offset: u64) -> Option<SegmentInfo> {
        self.segments
            .read()
            .range(..=offset)
            .next_back()
            .map(|(_, s)| s.info())
    }

    pub fn segments(&self) -> Vec<SegmentInfo> {
        self.segments.read().values().map(|s| s.info()).collect()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.read().len()
    }

    /// Bytes held on disk by all segments, headers included.
    pub fn total_size(&self) -> u64 {
        self.total_size.load(Ordering::Acquire)
    }

    pub fn dir(&self) -> &Path {
        &self.config.dir
    }

    /// Flushes the open segment to disk.
    pub fn sync(&self) -> Result<()> {
        match self.last_segment() {
            Some(last) => last.sync(),
            None => Ok(()),
        }
    }

    fn last_segment(&self) -> Option<Arc<Segment>> {
        self.segments.read().values().next_back().map(Arc::clone)
    }
}

fn read_segments(dir: &Path) -> Result<BTreeMap<u64, Arc<Segment>>> {
    let mut file_names = Vec::new();
    for entry_res in fs::read_dir(dir)? {
        let entry = entry_res?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            log::warn!("Skipping non UTF-8 file {:?} in {:?}", entry.path(), dir);
            continue;
        };
        if SegmentName::parse(&name).is_none() {
            // A damaged segment name would silently drop its records.
            if SegmentName::looks_like_segment(&name) {
                return Err(Error::InvalidLayout(format!(
                    "{:?} in {:?} looks like a segment but its name does not parse",
                    name, dir
                )));
            }
            log::warn!("Skipping unrecognised file {:?} in {:?}", name, dir);
            continue;
        }
        file_names.push(name);
    }
    file_names.sort();

    let mut segments = BTreeMap::new();
    for name in file_names {
        let segment = Segment::load(dir, &name)?;
        let start = segment.start_offset();
        if let Some(existing) = segments.insert(start, Arc::new(segment)) {
            return Err(Error::InvalidLayout(format!(
                "segments {} and {} in {:?} both start at offset {}",
                existing.file_name(),
                name,
                dir,
                start
            )));
        }
    }
    Ok(segments)
}

fn validate_segments(dir: &Path, segments: &BTreeMap<u64, Arc<Segment>>) -> Result<()> {
    let mut last_end: Option<u64> = None;
    let count = segments.len();
    for (i, segment) in segments.values().enumerate() {
        if segment.can_write() && i + 1 != count {
            return Err(Error::InvalidLayout(format!(
                "open segment {} in {:?} is followed by later segments",
                segment.file_name(),
                dir
            )));
        }
        if let Some(prev_end) = last_end {
            if segment.start_offset() != prev_end + SEGMENT_HEADER_LEN {
                return Err(Error::Discontinuity {
                    dir: dir.to_path_buf(),
                    prev_end,
                    start: segment.start_offset(),
                });
            }
        }
        last_end = Some(segment.end_offset());
    }
    Ok(())
}
