// src/storage/segment.rs
use crate::storage::record::{self, Record, RecordHeader, RECORD_HEADER_LEN};
use crate::{Error, Result};
use parking_lot::RwLock;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Bytes reserved at the start of every segment file:
/// magic (4) | format version u32 BE (4) | start offset u64 BE (8).
pub const SEGMENT_HEADER_LEN: u64 = 16;

const SEGMENT_MAGIC: [u8; 4] = *b"DMQS";
const SEGMENT_VERSION: u32 = 1;
const OPEN_PREFIX: &str = "open-";

/// File name of a segment: `open-<start>` while writable,
/// `<start>-<end>` (both zero-padded to 20 digits) once sealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentName {
    Open { start: u64 },
    Sealed { start: u64, end: u64 },
}

impl SegmentName {
    pub fn parse(name: &str) -> Option<Self> {
        if let Some(start) = name.strip_prefix(OPEN_PREFIX) {
            return parse_offset(start).map(|start| SegmentName::Open { start });
        }
        let (start, end) = name.split_once('-')?;
        let (start, end) = (parse_offset(start)?, parse_offset(end)?);
        if end < start {
            return None;
        }
        Some(SegmentName::Sealed { start, end })
    }

    /// True for names shaped like a segment even if `parse` rejects them,
    /// such as `open-12x` or a sealed name whose end precedes its start.
    pub fn looks_like_segment(name: &str) -> bool {
        if name.starts_with(OPEN_PREFIX) {
            return true;
        }
        name.split_once('-').map_or(false, |(start, _)| {
            !start.is_empty() && start.bytes().all(|b| b.is_ascii_digit())
        })
    }

    pub fn file_name(&self) -> String {
        match self {
            SegmentName::Open { start } => format!("{}{}", OPEN_PREFIX, start),
            SegmentName::Sealed { start, end } => format!("{:020}-{:020}", start, end),
        }
    }
}

fn parse_offset(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Point-in-time view of a segment, for inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentInfo {
    pub file_name: String,
    pub start_offset: u64,
    pub end_offset: u64,
    pub file_size: u64,
    pub can_write: bool,
}

// One segment file. Offsets are logical log positions: the first byte after
// the header is `start_offset`, the byte after the last record is `end_offset`.
#[derive(Debug)]
pub struct Segment {
    dir: PathBuf,
    start_offset: u64,
    end_offset: AtomicU64,
    file_size: AtomicU64,
    can_write: AtomicBool,
    file_name: RwLock<String>,
    // None only while the handle is swapped during sealing.
    file: RwLock<Option<File>>,
}

impl Segment {
    /// Creates a new writable segment file `open-<start_offset>` in `dir`.
    pub fn create<P: AsRef<Path>>(dir: P, start_offset: u64) -> Result<Self> {
        let dir = dir.as_ref();
        let file_name = SegmentName::Open {
            start: start_offset,
        }
        .file_name();
        let mut file = OpenOptions::new()
            .create_new(true)
            .read(true)
            .write(true)
            .open(dir.join(&file_name))?;
        file.write_all(&encode_header(start_offset))?;
        file.sync_all()?;
        sync_dir(dir)?;

        log::info!("Created segment {} in {:?}", file_name, dir);
        Segment::from_parts(
            dir,
            file_name,
            file,
            start_offset,
            SEGMENT_HEADER_LEN,
            true,
        )
    }

    /// Opens an existing segment file. The open segment is scanned and any
    /// torn tail is truncated; sealed segments must match their recorded range.
    pub fn load<P: AsRef<Path>>(dir: P, file_name: &str) -> Result<Self> {
        let dir = dir.as_ref();
        match SegmentName::parse(file_name) {
            Some(SegmentName::Open { start }) => Self::recover_open(dir, file_name, start),
            Some(SegmentName::Sealed { start, end }) => {
                Self::load_sealed(dir, file_name, start, end)
            }
            None => Err(Error::InvalidLayout(format!(
                "{:?} is not a segment file name",
                file_name
            ))),
        }
    }

    fn recover_open(dir: &Path, file_name: &str, start: u64) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(dir.join(file_name))?;
        let file_len = file.metadata()?.len();

        if file_len < SEGMENT_HEADER_LEN {
            // Crashed between creating the file and writing its header.
            log::warn!(
                "Segment {}: header incomplete ({} bytes), rewriting it",
                file_name,
                file_len
            );
            file.set_len(0)?;
            file.seek(SeekFrom::Start(0))?;
            file.write_all(&encode_header(start))?;
            file.sync_all()?;
            return Segment::from_parts(
                dir,
                file_name.to_string(),
                file,
                start,
                SEGMENT_HEADER_LEN,
                true,
            );
        }

        check_header(&file, file_name, start)?;
        let valid_len = scan_records(&file, file_len)?;
        if valid_len < file_len {
            log::warn!(
                "Segment {}: discarding {} bytes of torn tail at file position {}",
                file_name,
                file_len - valid_len,
                valid_len
            );
            file.set_len(valid_len)?;
            file.sync_all()?;
        }

        log::info!(
            "Recovered open segment {} ({} bytes)",
            file_name,
            valid_len
        );
        Segment::from_parts(
            dir,
            file_name.to_string(),
            file,
            start,
            valid_len,
            true,
        )
    }

    fn load_sealed(dir: &Path, file_name: &str, start: u64, end: u64) -> Result<Self> {
        let file = File::open(dir.join(file_name))?;
        let file_len = file.metadata()?.len();
        let expected = (end - start).checked_add(SEGMENT_HEADER_LEN);
        if expected != Some(file_len) {
            return Err(Error::CorruptedSegment {
                file: file_name.to_string(),
                reason: format!(
                    "file is {} bytes but its offset range is [{}, {})",
                    file_len, start, end
                ),
            });
        }
        check_header(&file, file_name, start)?;
        Segment::from_parts(
            dir,
            file_name.to_string(),
            file,
            start,
            file_len,
            false,
        )
    }

    fn from_parts(
        dir: &Path,
        file_name: String,
        file: File,
        start_offset: u64,
        file_size: u64,
        can_write: bool,
    ) -> Result<Self> {
        let end_offset = file_size
            .checked_sub(SEGMENT_HEADER_LEN)
            .and_then(|len| start_offset.checked_add(len))
            .ok_or_else(|| Error::CorruptedSegment {
                file: file_name.clone(),
                reason: format!(
                    "{} bytes starting at offset {} overflow the offset space",
                    file_size, start_offset
                ),
            })?;
        Ok(Segment {
            dir: dir.to_path_buf(),
            start_offset,
            end_offset: AtomicU64::new(end_offset),
            file_size: AtomicU64::new(file_size),
            can_write: AtomicBool::new(can_write),
            file_name: RwLock::new(file_name),
            file: RwLock::new(Some(file)),
        })
    }

    /// Appends one framed record and returns the new end offset.
    ///
    /// The end offset is published only after the write returned, so
    /// concurrent readers never see a partially written record.
    pub fn append(&self, payload: &[u8]) -> Result<u64> {
        if !self.can_write() {
            return Err(Error::SegmentSealed {
                start: self.start_offset,
            });
        }
        let frame = record::encode(payload)?;
        let position = self.file_size.load(Ordering::Acquire);
        let new_size = position + frame.len() as u64;
        let new_end = self
            .start_offset
            .checked_add(new_size - SEGMENT_HEADER_LEN)
            .ok_or(Error::EntryTooLarge { len: payload.len() })?;
        {
            let guard = self.file.read();
            let file = guard.as_ref().ok_or(Error::SegmentSealed {
                start: self.start_offset,
            })?;
            // Readers share this handle, so never rely on the file cursor.
            write_all_at(file, &frame, position)?;
        }

        self.file_size.store(new_size, Ordering::Release);
        self.end_offset.store(new_end, Ordering::Release);
        Ok(new_end)
    }

    pub fn read(&self, offset: u64) -> Result<Vec<u8>> {
        self.read_record(offset).map(|record| record.payload)
    }

    /// Reads the record whose frame starts at `offset`. The offset must be a
    /// record boundary inside `[start_offset, end_offset)`.
    pub fn read_record(&self, offset: u64) -> Result<Record> {
        let end = self.end_offset.load(Ordering::Acquire);
        if offset < self.start_offset || offset >= end {
            return Err(Error::OffsetOutOfRange {
                offset,
                start: self.start_offset,
                end,
            });
        }
        if offset + RECORD_HEADER_LEN > end {
            return Err(self.misaligned(offset, end));
        }

        let position = offset - self.start_offset + SEGMENT_HEADER_LEN;
        let guard = self.file.read();
        let file = guard.as_ref().ok_or_else(|| {
            Error::Internal(format!(
                "segment {} has no file handle",
                self.start_offset
            ))
        })?;

        let mut header_buf = [0u8; RECORD_HEADER_LEN as usize];
        read_exact_at(file, &mut header_buf, position)?;
        let header = RecordHeader::decode(&header_buf);
        let next_offset = offset + header.framed_len();
        if next_offset > end {
            return Err(self.misaligned(offset, end));
        }

        let mut payload = vec![0u8; header.len as usize];
        read_exact_at(file, &mut payload, position + RECORD_HEADER_LEN)?;
        if !header.matches(&payload) {
            return Err(Error::ChecksumMismatch { offset });
        }
        Ok(Record {
            offset,
            next_offset,
            payload,
        })
    }

    /// Seals the segment: close the write handle, rename the file to its
    /// `<start>-<end>` form, then reopen it read-only.
    pub fn seal(&self) -> Result<()> {
        let mut handle = self.file.write();
        if !self.can_write() {
            return Ok(());
        }
        if let Some(file) = handle.as_ref() {
            file.sync_all()?;
        }
        *handle = None;
        self.can_write.store(false, Ordering::Release);

        let end = self.end_offset();
        let sealed_name = SegmentName::Sealed {
            start: self.start_offset,
            end,
        }
        .file_name();
        let mut file_name = self.file_name.write();
        fs::rename(self.dir.join(&*file_name), self.dir.join(&sealed_name))?;
        log::info!("Sealed segment {} as {}", file_name, sealed_name);
        *file_name = sealed_name;
        sync_dir(&self.dir)?;

        *handle = Some(File::open(self.dir.join(&*file_name))?);
        Ok(())
    }

    /// Flushes written records of the open segment to disk.
    pub fn sync(&self) -> Result<()> {
        if let Some(file) = self.file.read().as_ref() {
            file.sync_data()?;
        }
        Ok(())
    }

    pub fn start_offset(&self) -> u64 {
        self.start_offset
    }

    pub fn end_offset(&self) -> u64 {
        self.end_offset.load(Ordering::Acquire)
    }

    pub fn file_size(&self) -> u64 {
        self.file_size.load(Ordering::Acquire)
    }

    pub fn can_write(&self) -> bool {
        self.can_write.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.end_offset() == self.start_offset
    }

    pub fn file_name(&self) -> String {
        self.file_name.read().clone()
    }

    pub fn info(&self) -> SegmentInfo {
        SegmentInfo {
            file_name: self.file_name(),
            start_offset: self.start_offset,
            end_offset: self.end_offset(),
            file_size: self.file_size(),
            can_write: self.can_write(),
        }
    }

    fn misaligned(&self, offset: u64, end: u64) -> Error {
        Error::MisalignedOffset {
            offset,
            start: self.start_offset,
            end,
        }
    }
}

fn encode_header(start_offset: u64) -> [u8; SEGMENT_HEADER_LEN as usize] {
    let mut header = [0u8; SEGMENT_HEADER_LEN as usize];
    header[..4].copy_from_slice(&SEGMENT_MAGIC);
    header[4..8].copy_from_slice(&SEGMENT_VERSION.to_be_bytes());
    header[8..].copy_from_slice(&start_offset.to_be_bytes());
    header
}

fn check_header(file: &File, file_name: &str, start_offset: u64) -> Result<()> {
    let mut header = [0u8; SEGMENT_HEADER_LEN as usize];
    read_exact_at(file, &mut header, 0)?;
    let corrupted = |reason: String| Error::CorruptedSegment {
        file: file_name.to_string(),
        reason,
    };

    if header[..4] != SEGMENT_MAGIC {
        return Err(corrupted(format!("bad magic {:?}", &header[..4])));
    }
    let mut version = [0u8; 4];
    version.copy_from_slice(&header[4..8]);
    let version = u32::from_be_bytes(version);
    if version != SEGMENT_VERSION {
        return Err(corrupted(format!("unsupported format version {}", version)));
    }
    let mut recorded = [0u8; 8];
    recorded.copy_from_slice(&header[8..]);
    let recorded = u64::from_be_bytes(recorded);
    if recorded != start_offset {
        return Err(corrupted(format!(
            "header records start offset {} but the file name says {}",
            recorded, start_offset
        )));
    }
    Ok(())
}

// Walks the records after the header and returns the file length up to the
// last complete record with a valid checksum.
fn scan_records(file: &File, file_len: u64) -> io::Result<u64> {
    let mut position = SEGMENT_HEADER_LEN;
    let mut header_buf = [0u8; RECORD_HEADER_LEN as usize];
    while position + RECORD_HEADER_LEN <= file_len {
        read_exact_at(file, &mut header_buf, position)?;
        let header = RecordHeader::decode(&header_buf);
        let next = position + header.framed_len();
        if next > file_len {
            break;
        }
        let mut payload = vec![0u8; header.len as usize];
        read_exact_at(file, &mut payload, position + RECORD_HEADER_LEN)?;
        if !header.matches(&payload) {
            break;
        }
        position = next;
    }
    Ok(position)
}

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], position: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, position)
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut buf: &mut [u8], mut position: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, position) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "failed to fill whole buffer",
                ))
            }
            Ok(n) => {
                let rest = buf;
                buf = &mut rest[n..];
                position += n as u64;
            }
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(unix)]
fn write_all_at(file: &File, buf: &[u8], position: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.write_all_at(buf, position)
}

#[cfg(windows)]
fn write_all_at(file: &File, mut buf: &[u8], mut position: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_write(buf, position) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "failed to write whole buffer",
                ))
            }
            Ok(n) => {
                buf = &buf[n..];
                position += n as u64;
            }
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

// Makes a create or rename durable.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::record::framed_len;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    #[test]
    fn test_segment_name_parse_and_format() {
        assert_eq!(
            SegmentName::parse("open-42"),
            Some(SegmentName::Open { start: 42 })
        );
        assert_eq!(
            SegmentName::parse("open-0000000042"),
            Some(SegmentName::Open { start: 42 })
        );
        let sealed = SegmentName::Sealed { start: 16, end: 512 };
        assert_eq!(
            sealed.file_name(),
            "00000000000000000016-00000000000000000512"
        );
        assert_eq!(SegmentName::parse(&sealed.file_name()), Some(sealed));
        assert_eq!(SegmentName::Open { start: 7 }.file_name(), "open-7");

        assert_eq!(SegmentName::parse("open-"), None);
        assert_eq!(SegmentName::parse("open-x1"), None);
        assert_eq!(SegmentName::parse("20-10"), None);
        assert_eq!(SegmentName::parse("LOCK"), None);
        assert_eq!(SegmentName::parse("1-+2"), None);
    }

    #[test]
    fn test_append_and_read() {
        let dir = TempDir::new().unwrap();
        let segment = Segment::create(dir.path(), 0).unwrap();
        assert!(segment.can_write());
        assert!(segment.is_empty());
        assert_eq!(segment.file_size(), SEGMENT_HEADER_LEN);

        let end1 = segment.append(b"first").unwrap();
        let end2 = segment.append(b"second message").unwrap();
        assert_eq!(end1, framed_len(5));
        assert_eq!(end2, end1 + framed_len(14));
        assert_eq!(segment.end_offset(), end2);
        assert_eq!(segment.file_size(), SEGMENT_HEADER_LEN + end2);

        assert_eq!(segment.read(0).unwrap(), b"first");
        let record = segment.read_record(end1).unwrap();
        assert_eq!(record.payload, b"second message");
        assert_eq!(record.offset, end1);
        assert_eq!(record.next_offset, end2);

        assert_matches!(
            segment.read(end2),
            Err(Error::OffsetOutOfRange { offset, .. }) if offset == end2
        );
    }

    #[test]
    fn test_misaligned_read_is_rejected() {
        let dir = TempDir::new().unwrap();
        let segment = Segment::create(dir.path(), 0).unwrap();
        segment.append(&[0xAB; 64]).unwrap();
        assert!(segment.read(3).is_err());

        let end = segment.append(b"tail").unwrap();
        assert_matches!(
            segment.read(end - 4),
            Err(Error::MisalignedOffset { offset, .. }) if offset == end - 4
        );
    }

    #[test]
    fn test_positioned_writes_ignore_file_cursor() {
        let dir = TempDir::new().unwrap();
        let segment = Segment::create(dir.path(), 0).unwrap();
        let end1 = segment.append(b"first").unwrap();
        {
            let guard = segment.file.read();
            let mut file: &File = guard.as_ref().unwrap();
            file.seek(SeekFrom::Start(0)).unwrap();
        }
        let end2 = segment.append(b"second").unwrap();

        assert_eq!(segment.read(0).unwrap(), b"first");
        assert_eq!(segment.read(end1).unwrap(), b"second");
        let on_disk = fs::metadata(dir.path().join("open-0")).unwrap().len();
        assert_eq!(on_disk, SEGMENT_HEADER_LEN + end2);
    }

    #[test]
    fn test_offset_overflow_is_corruption() {
        let dir = TempDir::new().unwrap();
        let start = u64::MAX - 4;
        let mut bytes = encode_header(start).to_vec();
        bytes.extend_from_slice(&record::encode(b"overflow").unwrap());
        let name = SegmentName::Open { start }.file_name();
        fs::write(dir.path().join(&name), &bytes).unwrap();

        assert_matches!(
            Segment::load(dir.path(), &name),
            Err(Error::CorruptedSegment { .. })
        );
    }

    #[test]
    fn test_seal_renames_and_stays_readable() {
        let dir = TempDir::new().unwrap();
        let segment = Segment::create(dir.path(), 100).unwrap();
        let end = segment.append(b"payload").unwrap();

        segment.seal().unwrap();
        assert!(!segment.can_write());
        let sealed_name = SegmentName::Sealed { start: 100, end }.file_name();
        assert_eq!(segment.file_name(), sealed_name);
        assert!(dir.path().join(&sealed_name).exists());
        assert!(!dir.path().join("open-100").exists());

        assert_eq!(segment.read(100).unwrap(), b"payload");
        assert_matches!(
            segment.append(b"more"),
            Err(Error::SegmentSealed { start: 100 })
        );
        // Sealing twice is a no-op.
        segment.seal().unwrap();
    }

    #[test]
    fn test_load_sealed_segment() {
        let dir = TempDir::new().unwrap();
        let end = {
            let segment = Segment::create(dir.path(), 0).unwrap();
            segment.append(b"a").unwrap();
            let end = segment.append(b"bb").unwrap();
            segment.seal().unwrap();
            end
        };

        let name = SegmentName::Sealed { start: 0, end }.file_name();
        let segment = Segment::load(dir.path(), &name).unwrap();
        assert!(!segment.can_write());
        assert_eq!(segment.end_offset(), end);
        assert_eq!(segment.read(framed_len(1)).unwrap(), b"bb");
    }

    #[test]
    fn test_load_sealed_segment_with_wrong_size_fails() {
        let dir = TempDir::new().unwrap();
        let segment = Segment::create(dir.path(), 0).unwrap();
        let end = segment.append(b"abc").unwrap();
        segment.seal().unwrap();
        drop(segment);

        let wrong = SegmentName::Sealed {
            start: 0,
            end: end + 1,
        }
        .file_name();
        fs::rename(
            dir.path().join(SegmentName::Sealed { start: 0, end }.file_name()),
            dir.path().join(&wrong),
        )
        .unwrap();

        assert_matches!(
            Segment::load(dir.path(), &wrong),
            Err(Error::CorruptedSegment { .. })
        );
    }

    #[test]
    fn test_recover_truncates_torn_tail() {
        let dir = TempDir::new().unwrap();
        let end = {
            let segment = Segment::create(dir.path(), 0).unwrap();
            segment.append(b"one").unwrap();
            segment.append(b"two").unwrap()
        };

        // Half a frame: a header announcing 100 bytes followed by 10.
        let path = dir.path().join("open-0");
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&100u32.to_be_bytes()).unwrap();
        file.write_all(&0u32.to_be_bytes()).unwrap();
        file.write_all(&[0u8; 10]).unwrap();
        drop(file);

        let segment = Segment::load(dir.path(), "open-0").unwrap();
        assert!(segment.can_write());
        assert_eq!(segment.end_offset(), end);
        assert_eq!(
            fs::metadata(&path).unwrap().len(),
            SEGMENT_HEADER_LEN + end
        );

        // The next append overwrites the discarded tail.
        let new_end = segment.append(b"three").unwrap();
        assert_eq!(segment.read(end).unwrap(), b"three");
        assert_eq!(new_end, end + framed_len(5));
    }

    #[test]
    fn test_recover_stops_at_checksum_mismatch() {
        let dir = TempDir::new().unwrap();
        let first_end = {
            let segment = Segment::create(dir.path(), 0).unwrap();
            let first_end = segment.append(b"good").unwrap();
            segment.append(b"flipped").unwrap();
            first_end
        };

        let path = dir.path().join("open-0");
        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        fs::write(&path, &bytes).unwrap();

        let segment = Segment::load(dir.path(), "open-0").unwrap();
        assert_eq!(segment.end_offset(), first_end);
        assert_eq!(segment.read(0).unwrap(), b"good");
    }

    #[test]
    fn test_recover_rewrites_missing_header() {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("open-48")).unwrap();

        let segment = Segment::load(dir.path(), "open-48").unwrap();
        assert!(segment.is_empty());
        assert_eq!(segment.start_offset(), 48);
        assert_eq!(segment.file_size(), SEGMENT_HEADER_LEN);
        assert_eq!(segment.append(b"x").unwrap(), 48 + framed_len(1));
    }

    #[test]
    fn test_header_mismatch_is_corruption() {
        let dir = TempDir::new().unwrap();
        drop(Segment::create(dir.path(), 0).unwrap());
        fs::rename(dir.path().join("open-0"), dir.path().join("open-16")).unwrap();

        assert_matches!(
            Segment::load(dir.path(), "open-16"),
            Err(Error::CorruptedSegment { .. })
        );

        let path = dir.path().join("open-16");
        let mut bytes = fs::read(&path).unwrap();
        bytes[0] = b'X';
        fs::write(&path, &bytes).unwrap();
        assert_matches!(
            Segment::load(dir.path(), "open-16"),
            Err(Error::CorruptedSegment { .. })
        );
    }
}
