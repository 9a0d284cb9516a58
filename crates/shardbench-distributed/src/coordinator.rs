//! Lock-step driver of one rank through the benchmark phases
//!
//! Every rank runs the same [`WorkerCoordinator::run`]. The phase sequence
//! is shared; what a rank does inside a phase depends only on its role, and
//! every phase ends with a barrier so no rank can run ahead.

use crate::aggregator::ResultAggregator;
use crate::channel::MessageChannel;
use crate::error::{DistributedError, Result};
use crate::partition::DatasetPartitioner;
use crate::report::{write_records, BenchmarkReport};
use crate::timing::TimingRegistry;
use crate::types::{Phase, RankRole, COORDINATOR_RANK, RESULT_TAG};
use crate::wire::{encode_batch, RankTimings};
use shardbench_core::{BenchConfig, BenchError, Record, MAX_PROCESS_COUNT};
use shardbench_storage::QueryExecutor;
use std::sync::Arc;

/// Timer names recorded in each rank's registry
pub mod timers {
    pub const BASELINE_QUERY: &str = "baseline_query";
    pub const PARTITION: &str = "partition";
    pub const LOCAL_FETCH: &str = "local_fetch";
    pub const SERIALIZE: &str = "serialize";
    pub const DISPATCH: &str = "dispatch";
    pub const RECEIVE: &str = "receive";
    pub const MERGE: &str = "merge";
    pub const DISTRIBUTED_WALL: &str = "distributed_wall";
    pub const CLEANUP: &str = "cleanup";
}

/// What the coordinator rank hands back after a completed run
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub report: BenchmarkReport,
    /// Result of the unsharded query
    pub baseline: Vec<Record>,
    /// Records merged from the worker batches
    pub gathered: Vec<Record>,
}

/// Data carried between phases of one rank
#[derive(Debug, Default)]
struct RunState {
    baseline: Vec<Record>,
    local_records: usize,
    payload: Option<String>,
    payload_bytes: usize,
    received: Vec<String>,
    gathered: Vec<Record>,
    rank_timings: Vec<RankTimings>,
    report: Option<BenchmarkReport>,
}

/// Drives one rank through `Init → … → Cleaned`
pub struct WorkerCoordinator<C: MessageChannel> {
    channel: C,
    executor: Arc<dyn QueryExecutor>,
    partitioner: DatasetPartitioner,
    aggregator: ResultAggregator,
    config: BenchConfig,
    timings: TimingRegistry,
    role: RankRole,
    phase: Phase,
    state: RunState,
}

impl<C: MessageChannel> WorkerCoordinator<C> {
    /// Create the driver for the rank behind `channel`
    ///
    /// `timings` is the registry this rank records into for the run.
    pub fn new(
        channel: C,
        executor: Arc<dyn QueryExecutor>,
        config: BenchConfig,
        timings: TimingRegistry,
    ) -> Self {
        let role = RankRole::for_rank(channel.rank());
        let partitioner = DatasetPartitioner::from_config(Arc::clone(&executor), &config);

        Self {
            channel,
            executor,
            partitioner,
            aggregator: ResultAggregator::new(),
            config,
            timings,
            role,
            phase: Phase::Init,
            state: RunState::default(),
        }
    }

    pub fn rank(&self) -> usize {
        self.channel.rank()
    }

    pub fn role(&self) -> RankRole {
        self.role
    }

    /// Last phase this rank completed
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn timings(&self) -> &TimingRegistry {
        &self.timings
    }

    /// Run all phases
    ///
    /// The coordinator returns `Some(output)`, workers return `None`. If the
    /// coordinator fails after validation it still drops the shard tables
    /// before returning the error.
    pub fn run(&mut self) -> Result<Option<RunOutput>> {
        self.validate()?;

        let outcome = self.drive();
        if let Err(e) = &outcome {
            tracing::error!(
                "Rank {} failed after phase {}: {}",
                self.rank(),
                self.phase,
                e
            );
            if self.role.is_coordinator() && self.phase < Phase::Cleaned {
                self.cleanup_shards();
            }
        }
        outcome
    }

    /// Init: reject bad group sizes before any shard exists
    fn validate(&self) -> Result<()> {
        self.config.validate()?;

        if self.channel.size() != self.config.process_count {
            return Err(BenchError::ConfigError(format!(
                "channel group has {} ranks but process count is {}",
                self.channel.size(),
                self.config.process_count
            ))
            .into());
        }

        tracing::debug!("Rank {} validated as {}", self.rank(), self.role);
        Ok(())
    }

    fn drive(&mut self) -> Result<Option<RunOutput>> {
        while let Some(next) = self.phase.next() {
            self.step(next)?;
            self.channel.barrier()?;
            self.phase = next;
            tracing::debug!("Rank {} reached phase {}", self.rank(), next);
        }

        if !self.role.is_coordinator() {
            return Ok(None);
        }

        let report = self.state.report.take().ok_or_else(|| {
            DistributedError::InternalError("run finished without a report".to_string())
        })?;

        Ok(Some(RunOutput {
            report,
            baseline: std::mem::take(&mut self.state.baseline),
            gathered: std::mem::take(&mut self.state.gathered),
        }))
    }

    /// Work this rank does before the barrier that completes `phase`
    fn step(&mut self, phase: Phase) -> Result<()> {
        match (phase, self.role) {
            (Phase::BaselineMeasured, RankRole::Coordinator) => self.measure_baseline(),
            (Phase::Partitioned, RankRole::Coordinator) => self.partition_dataset(),
            (Phase::LocalFetchDone, RankRole::Worker { partition }) => {
                self.fetch_local_shard(partition)
            }
            (Phase::Dispatched, RankRole::Coordinator) => self.receive_batches(),
            (Phase::Dispatched, RankRole::Worker { .. }) => self.dispatch_batch(),
            (Phase::Gathered, _) => self.gather_results(),
            (Phase::Reported, RankRole::Coordinator) => self.report(),
            (Phase::Cleaned, RankRole::Coordinator) => {
                self.cleanup_shards();
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn measure_baseline(&mut self) -> Result<()> {
        self.timings.start(timers::BASELINE_QUERY);
        let baseline = self.executor.query_all(&self.config.source_table)?;
        let elapsed = self.timings.stop(timers::BASELINE_QUERY);

        tracing::info!(
            "Baseline query returned {} records in {:?}",
            baseline.len(),
            elapsed
        );
        self.state.baseline = baseline;
        Ok(())
    }

    fn partition_dataset(&mut self) -> Result<()> {
        self.timings.start(timers::DISTRIBUTED_WALL);
        self.timings.start(timers::PARTITION);
        self.partitioner.partition(self.config.process_count)?;
        self.timings.stop(timers::PARTITION);
        Ok(())
    }

    fn fetch_local_shard(&mut self, partition: usize) -> Result<()> {
        let table = self.partitioner.shard_name(partition);

        self.timings.start(timers::LOCAL_FETCH);
        let records = self.executor.query_all(&table)?;
        self.timings.stop(timers::LOCAL_FETCH);

        self.timings.start(timers::SERIALIZE);
        let payload = encode_batch(&records)?;
        self.timings.stop(timers::SERIALIZE);

        tracing::debug!(
            "Rank {} fetched {} records from {} ({} bytes encoded)",
            self.rank(),
            records.len(),
            table,
            payload.len()
        );
        self.state.local_records = records.len();
        self.state.payload_bytes = payload.len();
        self.state.payload = Some(payload);
        Ok(())
    }

    fn dispatch_batch(&mut self) -> Result<()> {
        let payload = self.state.payload.take().ok_or_else(|| {
            DistributedError::InternalError(format!(
                "rank {} has no encoded batch to dispatch",
                self.rank()
            ))
        })?;

        self.timings.start(timers::DISPATCH);
        self.channel.send(payload, COORDINATOR_RANK, RESULT_TAG)?;
        self.timings.stop(timers::DISPATCH);
        Ok(())
    }

    /// One blocking receive per worker, in rank order
    fn receive_batches(&mut self) -> Result<()> {
        let workers = self.channel.size();
        let mut received = Vec::with_capacity(workers.saturating_sub(1));

        self.timings.start(timers::RECEIVE);
        for source in 1..workers {
            let batch = self.channel.receive(source, RESULT_TAG)?;
            tracing::debug!("Received {} bytes from rank {}", batch.len(), source);
            received.push(batch);
        }
        self.timings.stop(timers::RECEIVE);

        self.state.received = received;
        Ok(())
    }

    fn gather_results(&mut self) -> Result<()> {
        if self.role.is_coordinator() {
            self.timings.start(timers::MERGE);
            let received = std::mem::take(&mut self.state.received);
            self.state.gathered = self.aggregator.merge_serialized_batches(&received);
            self.timings.stop(timers::MERGE);
            self.timings.stop(timers::DISTRIBUTED_WALL);

            tracing::info!(
                "Merged {} records from {} worker batches",
                self.state.gathered.len(),
                received.len()
            );
        }

        let records = if self.role.is_coordinator() {
            self.state.gathered.len()
        } else {
            self.state.local_records
        };
        let summary = RankTimings::from_registry(
            self.rank(),
            records,
            self.state.payload_bytes,
            &self.timings,
        );

        if let Some(values) = self.channel.gather(summary.to_payload()?, COORDINATOR_RANK)? {
            self.state.rank_timings = values
                .iter()
                .enumerate()
                .filter_map(|(rank, payload)| match RankTimings::from_payload(payload) {
                    Ok(timings) => Some(timings),
                    Err(e) => {
                        tracing::warn!("Ignoring timing summary from rank {}: {}", rank, e);
                        None
                    }
                })
                .collect();
        }
        Ok(())
    }

    fn report(&mut self) -> Result<()> {
        if let Some(path) = &self.config.baseline_output {
            write_records(path, &self.state.baseline)?;
        }
        if let Some(path) = &self.config.gathered_output {
            write_records(path, &self.state.gathered)?;
        }

        let report = BenchmarkReport {
            process_count: self.config.process_count,
            baseline_records: self.state.baseline.len(),
            gathered_records: self.state.gathered.len(),
            sequential_ms: self.timings.elapsed_ms(timers::BASELINE_QUERY),
            partition_ms: self.timings.elapsed_ms(timers::PARTITION),
            receive_ms: self.timings.elapsed_ms(timers::RECEIVE),
            merge_ms: self.timings.elapsed_ms(timers::MERGE),
            distributed_wall_ms: self.timings.elapsed_ms(timers::DISTRIBUTED_WALL),
            ranks: std::mem::take(&mut self.state.rank_timings),
            baseline_output: self.config.baseline_output.clone(),
            gathered_output: self.config.gathered_output.clone(),
        };

        tracing::info!(
            "Sequential: {:.2}ms, distributed: {:.2}ms, records {} vs {}",
            report.sequential_ms,
            report.distributed_ms(),
            report.baseline_records,
            report.gathered_records
        );
        if !report.counts_match() {
            tracing::warn!(
                "Gathered {} records but the baseline has {}",
                report.gathered_records,
                report.baseline_records
            );
        }

        self.state.report = Some(report);
        Ok(())
    }

    /// Drop every shard index up to the configured maximum, not just this
    /// run's, so shards left by differently sized runs go too
    fn cleanup_shards(&mut self) {
        self.timings.start(timers::CLEANUP);
        self.partitioner.drop_shards(MAX_PROCESS_COUNT);
        self.timings.stop(timers::CLEANUP);
    }
}
