//! Error types for distributed execution

use thiserror::Error;

/// Errors that can occur while driving a rank group
#[derive(Error, Debug)]
pub enum DistributedError {
    /// Transport failure: unknown or departed peer, bad rank argument
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// Malformed partition request or failed shard creation
    #[error("Partition error: {0}")]
    PartitionError(String),

    /// Payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The rank group could not be started
    #[error("Launch error: {0}")]
    LaunchError(String),

    /// A rank thread terminated abnormally
    #[error("Rank {rank} failed: {reason}")]
    RankFailed { rank: usize, reason: String },

    /// A rank reached a state its own phase sequence rules out
    #[error("Internal error: {0}")]
    InternalError(String),

    /// Configuration, storage or IO error
    #[error("Benchmark error: {0}")]
    BenchError(#[from] shardbench_core::BenchError),
}

impl From<serde_json::Error> for DistributedError {
    fn from(err: serde_json::Error) -> Self {
        DistributedError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for DistributedError {
    fn from(err: std::io::Error) -> Self {
        DistributedError::BenchError(shardbench_core::BenchError::IoError(err))
    }
}

impl DistributedError {
    /// Whether this error is an invalid-configuration failure
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            DistributedError::BenchError(shardbench_core::BenchError::ConfigError(_))
        )
    }
}

/// Result type for distributed operations
pub type Result<T> = std::result::Result<T, DistributedError>;
