//! Configuration values injected into the log engine and the broker.

use crate::storage::record::RECORD_HEADER_LEN;
use crate::storage::segment::SEGMENT_HEADER_LEN;
use crate::{Error, Result};
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_SEGMENT_SIZE: u64 = 1024 * 1024 * 16; // 16MB

/// Settings for a single segmented log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Directory holding the segment files of this log.
    pub dir: PathBuf,
    /// Size in bytes (header included) past which the open segment is sealed.
    pub max_segment_size: u64,
    /// Whether to fsync the open segment after every append.
    pub sync_on_append: bool,
}

impl LogConfig {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        LogConfig {
            dir: dir.as_ref().to_path_buf(),
            max_segment_size: DEFAULT_MAX_SEGMENT_SIZE,
            sync_on_append: false,
        }
    }

    #[must_use]
    pub fn max_segment_size(mut self, size: u64) -> Self {
        self.max_segment_size = size;
        self
    }

    #[must_use]
    pub fn sync_on_append(mut self, value: bool) -> Self {
        self.sync_on_append = value;
        self
    }

    /// A segment must be able to hold its header plus one empty record.
    pub fn validate(&self) -> Result<()> {
        let min = SEGMENT_HEADER_LEN + RECORD_HEADER_LEN;
        if self.max_segment_size <= min {
            return Err(Error::InvalidConfig(format!(
                "max_segment_size must be greater than {} bytes, got {}",
                min, self.max_segment_size
            )));
        }
        Ok(())
    }
}

/// Settings shared by every queue log of a broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    pub data_dir: PathBuf,
    pub max_segment_size: u64,
    pub sync_on_append: bool,
}

impl BrokerConfig {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        BrokerConfig {
            data_dir: data_dir.as_ref().to_path_buf(),
            max_segment_size: DEFAULT_MAX_SEGMENT_SIZE,
            sync_on_append: false,
        }
    }

    #[must_use]
    pub fn max_segment_size(mut self, size: u64) -> Self {
        self.max_segment_size = size;
        self
    }

    #[must_use]
    pub fn sync_on_append(mut self, value: bool) -> Self {
        self.sync_on_append = value;
        self
    }

    /// Root under which every topic gets a directory.
    pub fn message_dir(&self) -> PathBuf {
        self.data_dir.join("message")
    }

    /// Log settings for one queue of a topic: `<data_dir>/message/<topic>/<queue>`.
    pub fn log_config(&self, topic: &str, queue: u32) -> LogConfig {
        LogConfig::new(self.message_dir().join(topic).join(queue.to_string()))
            .max_segment_size(self.max_segment_size)
            .sync_on_append(self.sync_on_append)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_log_config_defaults_and_builder() {
        let config = LogConfig::new("/tmp/q");
        assert_eq!(config.max_segment_size, DEFAULT_MAX_SEGMENT_SIZE);
        assert!(!config.sync_on_append);

        let config = config.max_segment_size(4096).sync_on_append(true);
        assert_eq!(config.max_segment_size, 4096);
        assert!(config.sync_on_append);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_log_config_rejects_tiny_segments() {
        let config = LogConfig::new("/tmp/q").max_segment_size(SEGMENT_HEADER_LEN);
        assert_matches!(config.validate(), Err(Error::InvalidConfig(_)));
    }

    #[test]
    fn test_broker_config_queue_layout() {
        let config = BrokerConfig::new("/var/lib/distmq").max_segment_size(1024);
        let log_config = config.log_config("orders", 3);
        assert_eq!(
            log_config.dir,
            PathBuf::from("/var/lib/distmq/message/orders/3")
        );
        assert_eq!(log_config.max_segment_size, 1024);
    }
}
