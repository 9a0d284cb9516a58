//! Wire format for inter-rank payloads
//!
//! A batch is UTF-8 JSON text holding an array of record objects. Batches
//! from several workers stay composable: `[batch_1,batch_2,...]` is itself a
//! well-formed JSON array whenever every batch is.

use crate::error::{DistributedError, Result};
use crate::timing::TimingRegistry;
use crate::types::Rank;
use serde::{Deserialize, Serialize};
use shardbench_core::Record;
use std::collections::BTreeMap;

/// Encode a record batch for transmission
pub fn encode_batch(records: &[Record]) -> Result<String> {
    serde_json::to_string(records).map_err(|e| DistributedError::SerializationError(e.to_string()))
}

/// Decode a single batch
pub fn decode_batch(payload: &str) -> Result<Vec<Record>> {
    serde_json::from_str(payload).map_err(|e| DistributedError::SerializationError(e.to_string()))
}

/// Per-rank timing summary collected at the coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankTimings {
    pub rank: Rank,
    /// Records this rank fetched (workers) or merged (coordinator)
    pub records: usize,
    /// Size of the batch this rank sent, in bytes
    pub payload_bytes: usize,
    /// Completed timers in milliseconds
    pub timers_ms: BTreeMap<String, f64>,
}

impl RankTimings {
    /// Snapshot the completed timers of a registry
    pub fn from_registry(
        rank: Rank,
        records: usize,
        payload_bytes: usize,
        timings: &TimingRegistry,
    ) -> Self {
        let timers_ms = timings
            .recorded()
            .into_iter()
            .map(|(name, elapsed)| (name, elapsed.as_secs_f64() * 1000.0))
            .collect();

        Self {
            rank,
            records,
            payload_bytes,
            timers_ms,
        }
    }

    /// Milliseconds recorded for `timer`, zero if absent
    pub fn timer_ms(&self, timer: &str) -> f64 {
        self.timers_ms.get(timer).copied().unwrap_or(0.0)
    }

    pub fn to_payload(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_payload(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }
}
