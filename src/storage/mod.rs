pub mod log;
pub mod record;
pub mod segment;

pub use log::SegmentedLog;
pub use record::Record;
pub use segment::{SegmentInfo, SegmentName, SEGMENT_HEADER_LEN};
