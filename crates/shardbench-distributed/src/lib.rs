//! Distributed benchmark execution for shardbench
//!
//! This crate runs the sequential-vs-sharded benchmark across a group of
//! ranks that advance through the same phases in lock step.
//!
//! # Architecture
//!
//! - **Coordinator** (rank 0): measures the baseline query, partitions the
//!   source table, receives and merges worker batches, reports and cleans up
//! - **Workers** (ranks 1..n): each fetches its own shard table and sends the
//!   encoded batch to the coordinator
//! - **Channel**: point-to-point messages, barrier and gather between ranks
//! - **Aggregator**: merges batches and drops the ones that fail to decode
//!
//! # Example
//!
//! ```ignore
//! use shardbench_core::BenchConfig;
//! use shardbench_distributed::LocalLauncher;
//! use shardbench_storage::MemoryStore;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::new());
//! store.load_csv("computer_hardware", Path::new("hardware.csv"))?;
//!
//! let output = LocalLauncher::new(BenchConfig::new(4), store).run()?;
//! println!("speedup: {:.2}x", output.report.speedup());
//! ```
//!
//! # Modules
//!
//! - [`coordinator`]: Per-rank phase state machine
//! - [`launcher`]: Runs a rank group on threads
//! - [`channel`]: Message passing between ranks
//! - [`partition`]: Shard table creation and cleanup
//! - [`aggregator`]: Merge of worker batches
//! - [`wire`]: Payload encoding
//! - [`timing`]: Named stopwatches
//! - [`report`]: Benchmark report and record artifacts

pub mod aggregator;
pub mod channel;
pub mod coordinator;
pub mod error;
pub mod launcher;
pub mod partition;
pub mod report;
pub mod timing;
pub mod types;
pub mod wire;

// Re-exports
pub use aggregator::ResultAggregator;
pub use channel::{LocalChannel, MessageChannel};
pub use coordinator::{timers, RunOutput, WorkerCoordinator};
pub use error::{DistributedError, Result};
pub use launcher::LocalLauncher;
pub use partition::{DatasetPartitioner, ShardInfo};
pub use report::{
    compare_record_files, read_records, records_equivalent, write_records, BenchmarkReport,
    RecordComparison,
};
pub use timing::{TimerEntry, TimingRegistry};
pub use types::*;
pub use wire::{decode_batch, encode_batch, RankTimings};
