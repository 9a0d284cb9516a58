//! Runs a whole rank group inside one process
//!
//! Each rank gets its own named OS thread, its own [`LocalChannel`] endpoint
//! and its own [`TimingRegistry`]. All ranks share the storage collaborator.

use crate::channel::{LocalChannel, MessageChannel};
use crate::coordinator::{RunOutput, WorkerCoordinator};
use crate::error::{DistributedError, Result};
use crate::timing::TimingRegistry;
use crate::types::{Rank, COORDINATOR_RANK};
use shardbench_core::BenchConfig;
use shardbench_storage::QueryExecutor;
use std::sync::Arc;
use std::thread;

/// Starts `process_count` ranks as threads and waits for all of them
#[derive(Debug, Clone)]
pub struct LocalLauncher {
    config: BenchConfig,
    executor: Arc<dyn QueryExecutor>,
}

impl LocalLauncher {
    pub fn new(config: BenchConfig, executor: Arc<dyn QueryExecutor>) -> Self {
        Self { config, executor }
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Run the benchmark and return the coordinator's output
    ///
    /// The coordinator's error wins over worker errors, since worker
    /// failures are usually the channel noticing the coordinator left.
    pub fn run(&self) -> Result<RunOutput> {
        self.config.validate()?;

        let process_count = self.config.process_count;
        tracing::info!("Launching {} ranks", process_count);

        let channels = LocalChannel::group(process_count);
        let outcomes: Vec<(Rank, Result<Option<RunOutput>>)> = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(process_count);
            let mut outcomes = Vec::with_capacity(process_count);

            for channel in channels {
                let rank = channel.rank();
                let executor = Arc::clone(&self.executor);
                let config = self.config.clone();

                let spawned = thread::Builder::new()
                    .name(format!("rank-{}", rank))
                    .spawn_scoped(scope, move || {
                        WorkerCoordinator::new(channel, executor, config, TimingRegistry::new())
                            .run()
                    });

                match spawned {
                    Ok(handle) => handles.push((rank, handle)),
                    Err(e) => outcomes.push((
                        rank,
                        Err(DistributedError::LaunchError(format!(
                            "failed to spawn rank {}: {}",
                            rank, e
                        ))),
                    )),
                }
            }

            for (rank, handle) in handles {
                let outcome = handle.join().unwrap_or_else(|panic| {
                    Err(DistributedError::RankFailed {
                        rank,
                        reason: panic_message(panic.as_ref()),
                    })
                });
                outcomes.push((rank, outcome));
            }
            outcomes
        });

        let mut coordinator = None;
        let mut first_worker_error = None;
        for (rank, outcome) in outcomes {
            if rank == COORDINATOR_RANK {
                coordinator = Some(outcome);
            } else if let Err(e) = outcome {
                tracing::warn!("Rank {} failed: {}", rank, e);
                first_worker_error.get_or_insert(e);
            }
        }

        match (coordinator, first_worker_error) {
            (Some(Err(e)), _) => Err(e),
            (_, Some(e)) => Err(e),
            (Some(Ok(Some(output))), None) => Ok(output),
            (Some(Ok(None)) | None, None) => Err(DistributedError::LaunchError(
                "coordinator rank produced no output".to_string(),
            )),
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "rank thread panicked".to_string()
    }
}
