//! Benchmark configuration

use crate::error::{BenchError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Smallest usable group: one coordinator and one worker
pub const MIN_PROCESS_COUNT: usize = 2;

/// Largest accepted group size. Cleanup always sweeps shard indices up to this bound.
pub const MAX_PROCESS_COUNT: usize = 100;

/// Configuration for one benchmark run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Number of ranks in the group (coordinator included)
    pub process_count: usize,
    /// Table holding the unsharded dataset
    pub source_table: String,
    /// Shard tables are named `<shard_prefix><index>`
    pub shard_prefix: String,
    /// Where the coordinator writes the baseline record array
    pub baseline_output: Option<PathBuf>,
    /// Where the coordinator writes the merged gathered record array
    pub gathered_output: Option<PathBuf>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            process_count: 4,
            source_table: "computer_hardware".to_string(),
            shard_prefix: "computer_hardware_shard_".to_string(),
            baseline_output: None,
            gathered_output: None,
        }
    }
}

impl BenchConfig {
    /// Create a configuration for the given group size
    pub fn new(process_count: usize) -> Self {
        Self {
            process_count,
            ..Default::default()
        }
    }

    /// Load a configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: BenchConfig = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Save the configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn with_process_count(mut self, process_count: usize) -> Self {
        self.process_count = process_count;
        self
    }

    pub fn with_source_table(mut self, source_table: impl Into<String>) -> Self {
        self.source_table = source_table.into();
        self
    }

    pub fn with_shard_prefix(mut self, shard_prefix: impl Into<String>) -> Self {
        self.shard_prefix = shard_prefix.into();
        self
    }

    pub fn with_baseline_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.baseline_output = Some(path.into());
        self
    }

    pub fn with_gathered_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.gathered_output = Some(path.into());
        self
    }

    /// Number of shards (one per worker)
    pub fn shard_count(&self) -> usize {
        self.process_count.saturating_sub(1)
    }

    /// Whether `table` is one of the shard names `<prefix>0..<prefix>99`
    pub fn is_shard_name(&self, table: &str) -> bool {
        (0..MAX_PROCESS_COUNT).any(|index| format!("{}{}", self.shard_prefix, index) == table)
    }

    /// Check the configuration before any work starts
    pub fn validate(&self) -> Result<()> {
        if !(MIN_PROCESS_COUNT..=MAX_PROCESS_COUNT).contains(&self.process_count) {
            return Err(BenchError::ConfigError(format!(
                "process count must be between {} and {}, got {}",
                MIN_PROCESS_COUNT, MAX_PROCESS_COUNT, self.process_count
            )));
        }

        if self.source_table.trim().is_empty() {
            return Err(BenchError::ConfigError(
                "source table name must not be empty".to_string(),
            ));
        }

        if self.shard_prefix.trim().is_empty() {
            return Err(BenchError::ConfigError(
                "shard prefix must not be empty".to_string(),
            ));
        }

        if self.shard_prefix == self.source_table {
            return Err(BenchError::ConfigError(
                "shard prefix must differ from the source table name".to_string(),
            ));
        }

        if self.is_shard_name(&self.source_table) {
            return Err(BenchError::ConfigError(format!(
                "source table {} collides with a shard table name under prefix {}",
                self.source_table, self.shard_prefix
            )));
        }

        Ok(())
    }
}
