use shardbench_core::{BenchConfig, Record, Result as BenchResult};
use shardbench_distributed::{
    compare_record_files, read_records, records_equivalent, DatasetPartitioner,
    DistributedError, LocalChannel, LocalLauncher, MessageChannel, Rank, Tag, TimingRegistry,
    WorkerCoordinator, RESULT_TAG,
};
use shardbench_storage::{generate_hardware, MemoryStore, QueryExecutor, Statement};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const SOURCE: &str = "computer_hardware";

fn store_with_rows(rows: usize) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.create_table(SOURCE, &generate_hardware(rows)).unwrap();
    store
}

/// Counts the statements that reach the wrapped store
#[derive(Debug)]
struct CountingExecutor {
    inner: Arc<MemoryStore>,
    creates: AtomicUsize,
    drops: AtomicUsize,
}

impl CountingExecutor {
    fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            creates: AtomicUsize::new(0),
            drops: AtomicUsize::new(0),
        }
    }
}

impl QueryExecutor for CountingExecutor {
    fn query_all(&self, table: &str) -> BenchResult<Vec<Record>> {
        self.inner.query_all(table)
    }

    fn execute(&self, statement: &Statement) -> BenchResult<u64> {
        match statement {
            Statement::CreateShard { .. } => self.creates.fetch_add(1, Ordering::SeqCst),
            Statement::DropTableIfExists { .. } => self.drops.fetch_add(1, Ordering::SeqCst),
        };
        self.inner.execute(statement)
    }

    fn exists(&self, table: &str) -> BenchResult<bool> {
        self.inner.exists(table)
    }
}

/// Adds a fixed delay to full-table reads, separately for the source and shards
#[derive(Debug)]
struct SlowExecutor {
    inner: Arc<MemoryStore>,
    source_delay: Duration,
    shard_delay: Duration,
}

impl QueryExecutor for SlowExecutor {
    fn query_all(&self, table: &str) -> BenchResult<Vec<Record>> {
        if table == SOURCE {
            thread::sleep(self.source_delay);
        } else {
            thread::sleep(self.shard_delay);
        }
        self.inner.query_all(table)
    }

    fn execute(&self, statement: &Statement) -> BenchResult<u64> {
        self.inner.execute(statement)
    }

    fn exists(&self, table: &str) -> BenchResult<bool> {
        self.inner.exists(table)
    }
}

/// Replaces the batch one rank sends on the result tag
struct CorruptingChannel {
    inner: LocalChannel,
    replacement: Option<String>,
}

impl MessageChannel for CorruptingChannel {
    fn rank(&self) -> Rank {
        self.inner.rank()
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn send(&self, payload: String, destination: Rank, tag: Tag) -> shardbench_distributed::Result<()> {
        let payload = match (&self.replacement, tag) {
            (Some(replacement), RESULT_TAG) => replacement.clone(),
            _ => payload,
        };
        self.inner.send(payload, destination, tag)
    }

    fn receive(&self, source: Rank, tag: Tag) -> shardbench_distributed::Result<String> {
        self.inner.receive(source, tag)
    }

    fn barrier(&self) -> shardbench_distributed::Result<()> {
        self.inner.barrier()
    }
}

#[test]
fn test_three_ranks_ten_records() {
    let store = store_with_rows(10);
    let output = LocalLauncher::new(BenchConfig::new(3), store.clone())
        .run()
        .unwrap();

    assert_eq!(output.baseline.len(), 10);
    assert_eq!(output.gathered.len(), 10);
    assert!(records_equivalent(&output.baseline, &output.gathered));

    let shard_records: Vec<usize> = output
        .report
        .worker_timings()
        .map(|r| r.records)
        .collect();
    assert_eq!(shard_records, vec![5, 5]);
    assert_eq!(store.table_names(), vec![SOURCE.to_string()]);
}

#[test]
fn test_results_match_for_many_group_sizes() {
    let store = store_with_rows(97);
    for process_count in [2, 3, 7, 16] {
        let output = LocalLauncher::new(BenchConfig::new(process_count), store.clone())
            .run()
            .unwrap();
        assert!(output.report.counts_match(), "pc={}", process_count);
        assert!(records_equivalent(&output.baseline, &output.gathered));
        assert_eq!(output.report.ranks.len(), process_count);
    }
}

#[test]
fn test_empty_source_table() {
    let store = Arc::new(MemoryStore::new());
    store.create_table(SOURCE, &[]).unwrap();

    let output = LocalLauncher::new(BenchConfig::new(4), store).run().unwrap();
    assert!(output.baseline.is_empty());
    assert!(output.gathered.is_empty());
    assert!(output.report.counts_match());
}

#[test]
fn test_existing_shards_are_reused() {
    let store = store_with_rows(12);
    DatasetPartitioner::new(store.clone(), SOURCE, "computer_hardware_shard_")
        .partition(4)
        .unwrap();

    let counting = Arc::new(CountingExecutor::new(store.clone()));
    let output = LocalLauncher::new(BenchConfig::new(4), counting.clone())
        .run()
        .unwrap();

    assert_eq!(counting.creates.load(Ordering::SeqCst), 0);
    assert_eq!(counting.drops.load(Ordering::SeqCst), 100);
    assert_eq!(output.gathered.len(), 12);
    assert_eq!(store.table_names(), vec![SOURCE.to_string()]);
}

#[test]
fn test_stale_shards_from_larger_run_are_dropped() {
    let store = store_with_rows(20);
    DatasetPartitioner::new(store.clone(), SOURCE, "computer_hardware_shard_")
        .partition(9)
        .unwrap();
    assert_eq!(store.table_names().len(), 9);

    LocalLauncher::new(BenchConfig::new(3), store.clone())
        .run()
        .unwrap();
    assert_eq!(store.table_names(), vec![SOURCE.to_string()]);
}

#[test]
fn test_malformed_batch_is_dropped_and_counts_differ() {
    let store = store_with_rows(10);
    let config = BenchConfig::new(3);
    let channels = LocalChannel::group(3);

    let results = thread::scope(|s| {
        let handles: Vec<_> = channels
            .into_iter()
            .map(|inner| {
                // Rank 2 sends a truncated batch
                let replacement = (inner.rank() == 2).then(|| r#"[{"id": 1, "cpu_na"#.to_string());
                let channel = CorruptingChannel { inner, replacement };
                let executor: Arc<dyn QueryExecutor> = store.clone();
                let config = config.clone();
                s.spawn(move || {
                    WorkerCoordinator::new(channel, executor, config, TimingRegistry::new()).run()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Vec<_>>()
    });

    let mut results = results.into_iter();
    let output = results.next().unwrap().unwrap().unwrap();
    for worker in results {
        assert!(worker.unwrap().is_none());
    }

    let ids: Vec<i64> = output.gathered.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![2, 4, 6, 8, 10]);
    assert_eq!(output.report.baseline_records, 10);
    assert_eq!(output.report.gathered_records, 5);
    assert!(!output.report.counts_match());
}

#[test]
fn test_artifacts_compare_identical() {
    let dir = tempfile::tempdir().unwrap();
    let baseline = dir.path().join("baseline.json");
    let gathered = dir.path().join("gathered.json");
    let config = BenchConfig::new(5)
        .with_baseline_output(&baseline)
        .with_gathered_output(&gathered);

    LocalLauncher::new(config, store_with_rows(64)).run().unwrap();

    assert_eq!(read_records(&baseline).unwrap().len(), 64);
    let comparison = compare_record_files(&baseline, &gathered).unwrap();
    assert!(comparison.identical);
    assert_eq!(comparison.right_count, 64);
}

#[test]
fn test_unwritable_artifact_still_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let config =
        BenchConfig::new(3).with_gathered_output(dir.path().join("missing").join("out.json"));
    let store = store_with_rows(8);

    let err = LocalLauncher::new(config, store.clone()).run().unwrap_err();
    assert!(matches!(err, DistributedError::BenchError(_)));
    assert_eq!(store.table_names(), vec![SOURCE.to_string()]);
}

#[test]
fn test_distributed_time_includes_worker_fetch() {
    let executor = Arc::new(SlowExecutor {
        inner: store_with_rows(20),
        source_delay: Duration::from_millis(50),
        shard_delay: Duration::from_millis(200),
    });

    let report = LocalLauncher::new(BenchConfig::new(3), executor)
        .run()
        .unwrap()
        .report;

    assert!(report.sequential_ms >= 50.0);
    assert!(report.slowest_worker_ms() >= 200.0);
    assert!(report.distributed_ms() >= 200.0);
    assert!(report.distributed_wall_ms >= 200.0);
    assert!(report.speedup() < 1.0, "speedup {}", report.speedup());
}

#[test]
fn test_source_named_like_a_shard_is_rejected_and_kept() {
    let store = Arc::new(MemoryStore::new());
    store.create_table("parts0", &generate_hardware(10)).unwrap();
    let config = BenchConfig::new(3)
        .with_source_table("parts0")
        .with_shard_prefix("parts");

    let err = LocalLauncher::new(config, store.clone()).run().unwrap_err();
    assert!(err.is_config_error());
    assert_eq!(store.table_names(), vec!["parts0".to_string()]);
    assert_eq!(store.row_count("parts0").unwrap(), 10);
}
