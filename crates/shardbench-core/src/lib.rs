//! Core types for shardbench
//!
//! Holds the record model shared by every rank, its Arrow representation,
//! the benchmark configuration and the base error type.

pub mod config;
pub mod error;
pub mod record;

pub use config::{BenchConfig, MAX_PROCESS_COUNT, MIN_PROCESS_COUNT};
pub use error::{BenchError, Result};
pub use record::{batch_to_records, record_schema, records_to_batch, Record};
