// src/broker/state_machine.rs
//
// Applies committed broker commands to per-queue segmented logs. The
// consensus layer is expected to call `apply` for every committed entry, in
// commit order, from a single thread.
use crate::broker::protocol::MAX_FRAME_LEN;
use crate::config::BrokerConfig;
use crate::storage::{Record, SegmentedLog};
use crate::{Error, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::sync::Arc;

// Room left in a response frame for everything around the records.
const RESPONSE_ENVELOPE_LEN: u64 = 64;

/// A replicated broker command, as committed by the consensus layer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SendMessage {
        topic: String,
        queue: u32,
        payload: Vec<u8>,
    },
}

impl Command {
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueKey {
    pub topic: String,
    pub queue: u32,
}

pub struct BrokerStateMachine {
    config: BrokerConfig,
    logs: DashMap<QueueKey, Arc<SegmentedLog>>,
}

impl BrokerStateMachine {
    /// Opens every queue log already present under `<data_dir>/message`.
    pub fn open(config: BrokerConfig) -> Result<Self> {
        let message_dir = config.message_dir();
        fs::create_dir_all(&message_dir)?;

        let logs = DashMap::new();
        for topic_entry in fs::read_dir(&message_dir)? {
            let topic_entry = topic_entry?;
            if !topic_entry.file_type()?.is_dir() {
                continue;
            }
            let Some(topic) = topic_entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            for queue_entry in fs::read_dir(topic_entry.path())? {
                let queue_entry = queue_entry?;
                if !queue_entry.file_type()?.is_dir() {
                    continue;
                }
                let Some(queue) = queue_entry
                    .file_name()
                    .to_str()
                    .and_then(|name| name.parse::<u32>().ok())
                else {
                    log::warn!("Skipping unexpected directory {:?}", queue_entry.path());
                    continue;
                };
                let log = SegmentedLog::open(config.log_config(&topic, queue))?;
                logs.insert(
                    QueueKey {
                        topic: topic.clone(),
                        queue,
                    },
                    Arc::new(log),
                );
            }
        }

        log::info!(
            "Broker state machine opened {} queue logs under {:?}",
            logs.len(),
            message_dir
        );
        Ok(BrokerStateMachine { config, logs })
    }

    /// Applies one committed entry and returns the new end offset of the
    /// queue it was written to.
    pub fn apply(&self, entry: &[u8]) -> Result<u64> {
        match Command::decode(entry)? {
            Command::SendMessage {
                topic,
                queue,
                payload,
            } => {
                let log = self.queue_log(&topic, queue)?;
                let offset = log.append(&payload)?;
                log::debug!(
                    "Applied message to {}/{}: {} bytes, end offset {}",
                    topic,
                    queue,
                    payload.len(),
                    offset
                );
                Ok(offset)
            }
        }
    }

    /// Single-node commit path: encode a send command and apply it directly.
    pub fn send(&self, topic: &str, queue: u32, payload: Vec<u8>) -> Result<u64> {
        let entry = Command::SendMessage {
            topic: topic.to_string(),
            queue,
            payload,
        }
        .encode()?;
        self.apply(&entry)
    }

    /// Reads up to `max_messages` records starting at `offset`, following
    /// each record's `next_offset`. Stops early once the records would no
    /// longer fit in one response frame.
    pub fn pull(
        &self,
        topic: &str,
        queue: u32,
        offset: u64,
        max_messages: usize,
    ) -> Result<Vec<Record>> {
        let max_bytes = MAX_FRAME_LEN as u64 - RESPONSE_ENVELOPE_LEN;
        self.pull_within(topic, queue, offset, max_messages, max_bytes)
    }

    fn pull_within(
        &self,
        topic: &str,
        queue: u32,
        offset: u64,
        max_messages: usize,
        max_bytes: u64,
    ) -> Result<Vec<Record>> {
        validate_topic(topic)?;
        let Some(log) = self.existing_log(topic, queue) else {
            return Ok(Vec::new());
        };

        let mut records = Vec::new();
        let mut bytes = 0;
        let mut next = offset;
        while records.len() < max_messages {
            let Some(record) = log.read_record(next)? else {
                break;
            };
            let size = bincode::serialized_size(&record)?;
            // Always hand out at least one record so the consumer can advance.
            if !records.is_empty() && bytes + size > max_bytes {
                break;
            }
            bytes += size;
            next = record.next_offset;
            records.push(record);
        }
        Ok(records)
    }

    pub fn last_offset(&self, topic: &str, queue: u32) -> Result<u64> {
        validate_topic(topic)?;
        Ok(self
            .existing_log(topic, queue)
            .map_or(0, |log| log.get_last_end_offset()))
    }

    /// Bytes held by every queue log, the signal a snapshot policy watches.
    pub fn total_size(&self) -> u64 {
        self.logs.iter().map(|entry| entry.value().total_size()).sum()
    }

    pub fn needs_snapshot(&self, threshold: u64) -> bool {
        self.total_size() >= threshold
    }

    pub fn queue_count(&self) -> usize {
        self.logs.len()
    }

    fn existing_log(&self, topic: &str, queue: u32) -> Option<Arc<SegmentedLog>> {
        self.logs
            .get(&QueueKey {
                topic: topic.to_string(),
                queue,
            })
            .map(|entry| Arc::clone(entry.value()))
    }

    fn queue_log(&self, topic: &str, queue: u32) -> Result<Arc<SegmentedLog>> {
        validate_topic(topic)?;
        if let Some(log) = self.existing_log(topic, queue) {
            return Ok(log);
        }
        let key = QueueKey {
            topic: topic.to_string(),
            queue,
        };
        match self.logs.entry(key) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let log = Arc::new(SegmentedLog::open(self.config.log_config(topic, queue))?);
                log::info!("Created log for {}/{} in {:?}", topic, queue, log.dir());
                entry.insert(Arc::clone(&log));
                Ok(log)
            }
        }
    }
}

// Topic names become directory names.
fn validate_topic(topic: &str) -> Result<()> {
    let invalid = topic.is_empty()
        || topic == "."
        || topic == ".."
        || topic.contains(|c: char| c == '/' || c == '\\' || c == '\0');
    if invalid {
        return Err(Error::InvalidTopic(topic.to_string()));
    }
    Ok(())
}
