//! Benchmark report and persisted record artifacts

use crate::coordinator::timers;
use crate::error::Result;
use crate::wire::RankTimings;
use serde::{Deserialize, Serialize};
use shardbench_core::Record;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Sequential vs. distributed comparison produced by the coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub process_count: usize,
    /// Records returned by the unsharded baseline query
    pub baseline_records: usize,
    /// Records merged from all worker batches
    pub gathered_records: usize,
    /// Unsharded full-table query
    pub sequential_ms: f64,
    /// Shard table creation
    pub partition_ms: f64,
    /// Sequential drain of all worker batches
    pub receive_ms: f64,
    /// Decoding and merging of the received batches
    pub merge_ms: f64,
    /// Wall clock from the start of partitioning to the end of the gather phase
    pub distributed_wall_ms: f64,
    /// Timing summaries gathered from every rank, ordered by rank
    pub ranks: Vec<RankTimings>,
    pub baseline_output: Option<PathBuf>,
    pub gathered_output: Option<PathBuf>,
}

impl BenchmarkReport {
    /// Cost of the distributed path: partition, the slowest worker's fetch
    /// and encode, then receive and merge
    pub fn distributed_ms(&self) -> f64 {
        self.partition_ms + self.slowest_worker_ms() + self.receive_ms + self.merge_ms
    }

    /// Largest `local_fetch + serialize` over all workers
    pub fn slowest_worker_ms(&self) -> f64 {
        self.worker_timings()
            .map(|r| r.timer_ms(timers::LOCAL_FETCH) + r.timer_ms(timers::SERIALIZE))
            .fold(0.0, f64::max)
    }

    /// Sequential time divided by distributed time
    pub fn speedup(&self) -> f64 {
        let distributed = self.distributed_ms();
        if distributed == 0.0 {
            0.0
        } else {
            self.sequential_ms / distributed
        }
    }

    /// Whether the gathered result has as many records as the baseline
    pub fn counts_match(&self) -> bool {
        self.baseline_records == self.gathered_records
    }

    /// Summaries of the worker ranks only
    pub fn worker_timings(&self) -> impl Iterator<Item = &RankTimings> {
        self.ranks.iter().filter(|r| r.rank != 0)
    }

    /// Sum of `timer` over all workers
    pub fn worker_total_ms(&self, timer: &str) -> f64 {
        self.worker_timings().map(|r| r.timer_ms(timer)).sum()
    }

    /// Slowest worker's `timer`
    pub fn worker_max_ms(&self, timer: &str) -> f64 {
        self.worker_timings()
            .map(|r| r.timer_ms(timer))
            .fold(0.0, f64::max)
    }
}

/// Write records as one JSON array
pub fn write_records(path: &Path, records: &[Record]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, records)?;
    writer.flush()?;
    tracing::debug!("Wrote {} records to {:?}", records.len(), path);
    Ok(())
}

/// Read a JSON array of records
pub fn read_records(path: &Path) -> Result<Vec<Record>> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Result of comparing two record artifacts
#[derive(Debug, Clone, PartialEq)]
pub struct RecordComparison {
    pub left_count: usize,
    pub right_count: usize,
    pub identical: bool,
    pub elapsed: Duration,
}

/// Whether two record sequences hold the same records, ignoring order
///
/// Counts must match and the record sets must be equal.
pub fn records_equivalent(left: &[Record], right: &[Record]) -> bool {
    if left.len() != right.len() {
        return false;
    }

    let left: HashSet<&Record> = left.iter().collect();
    let right: HashSet<&Record> = right.iter().collect();
    left == right
}

/// Compare two record artifacts as order-independent sets
pub fn compare_record_files(left: &Path, right: &Path) -> Result<RecordComparison> {
    let start = Instant::now();

    let left_records = read_records(left)?;
    let right_records = read_records(right)?;
    let identical = records_equivalent(&left_records, &right_records);

    let elapsed = start.elapsed();
    tracing::info!("Compared {:?} and {:?} in {:?}", left, right, elapsed);

    Ok(RecordComparison {
        left_count: left_records.len(),
        right_count: right_records.len(),
        identical,
        elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn record(id: i64) -> Record {
        Record::new(id, "cpu", "gpu", "ram", "board", "psu")
    }

    fn rank_timings(rank: usize, fetch_ms: f64) -> RankTimings {
        let mut timers_ms = BTreeMap::new();
        timers_ms.insert("local_fetch".to_string(), fetch_ms);
        timers_ms.insert("serialize".to_string(), fetch_ms / 2.0);
        RankTimings {
            rank,
            records: 0,
            payload_bytes: 0,
            timers_ms,
        }
    }

    fn report() -> BenchmarkReport {
        BenchmarkReport {
            process_count: 3,
            baseline_records: 10,
            gathered_records: 10,
            sequential_ms: 30.0,
            partition_ms: 5.0,
            receive_ms: 7.0,
            merge_ms: 3.0,
            distributed_wall_ms: 30.0,
            ranks: vec![rank_timings(0, 0.0), rank_timings(1, 4.0), rank_timings(2, 6.0)],
            baseline_output: None,
            gathered_output: None,
        }
    }

    #[test]
    fn test_derived_sums() {
        let report = report();
        assert_eq!(report.slowest_worker_ms(), 9.0);
        assert_eq!(report.distributed_ms(), 24.0);
        assert_eq!(report.speedup(), 1.25);
        assert!(report.counts_match());
        assert_eq!(report.worker_timings().count(), 2);
        assert_eq!(report.worker_total_ms("local_fetch"), 10.0);
        assert_eq!(report.worker_max_ms("local_fetch"), 6.0);
    }

    #[test]
    fn test_speedup_with_zero_distributed_time() {
        let mut report = report();
        report.partition_ms = 0.0;
        report.receive_ms = 0.0;
        report.merge_ms = 0.0;
        report.ranks.clear();
        assert_eq!(report.speedup(), 0.0);
    }

    #[test]
    fn test_records_equivalent_ignores_order() {
        let a = vec![record(1), record(2), record(3)];
        let b = vec![record(3), record(1), record(2)];
        assert!(records_equivalent(&a, &b));
        assert!(!records_equivalent(&a, &b[..2]));

        let mut c = b.clone();
        c[0].psu_name = "other".to_string();
        assert!(!records_equivalent(&a, &c));
    }

    #[test]
    fn test_compare_record_files() {
        let dir = tempfile::tempdir().unwrap();
        let left = dir.path().join("baseline.json");
        let right = dir.path().join("gathered.json");

        write_records(&left, &[record(1), record(2)]).unwrap();
        write_records(&right, &[record(2), record(1)]).unwrap();

        let comparison = compare_record_files(&left, &right).unwrap();
        assert!(comparison.identical);
        assert_eq!(comparison.left_count, 2);
        assert_eq!(comparison.right_count, 2);

        write_records(&right, &[record(2)]).unwrap();
        assert!(!compare_record_files(&left, &right).unwrap().identical);
    }

    #[test]
    fn test_read_records_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_records(&dir.path().join("absent.json")).is_err());
    }
}
