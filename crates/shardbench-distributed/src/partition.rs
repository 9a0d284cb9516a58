//! Modulo partitioning of the source table into per-worker shard tables

use crate::error::{DistributedError, Result};
use shardbench_core::{BenchConfig, MIN_PROCESS_COUNT};
use shardbench_storage::{QueryExecutor, Statement};
use std::sync::Arc;

/// Outcome for one shard of a `partition` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardInfo {
    /// Shard index, owned by worker rank `index + 1`
    pub index: usize,
    /// Table holding the shard
    pub table: String,
    /// False when the table already existed and was left untouched
    pub created: bool,
}

/// Materializes shard tables through the storage collaborator
#[derive(Debug, Clone)]
pub struct DatasetPartitioner {
    executor: Arc<dyn QueryExecutor>,
    source_table: String,
    shard_prefix: String,
}

impl DatasetPartitioner {
    /// Create a partitioner over `source_table`
    pub fn new(
        executor: Arc<dyn QueryExecutor>,
        source_table: impl Into<String>,
        shard_prefix: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            source_table: source_table.into(),
            shard_prefix: shard_prefix.into(),
        }
    }

    /// Create a partitioner using the table names of a run configuration
    pub fn from_config(executor: Arc<dyn QueryExecutor>, config: &BenchConfig) -> Self {
        Self::new(executor, &config.source_table, &config.shard_prefix)
    }

    /// Shard index of `id` for a group of `process_count` ranks
    ///
    /// Euclidean remainder keeps negative ids inside `0..process_count - 1`.
    pub fn assign(id: i64, process_count: usize) -> Result<usize> {
        let shards = Self::shard_count(process_count)?;
        Ok(id.rem_euclid(shards as i64) as usize)
    }

    /// Table name of shard `index`
    pub fn shard_name(&self, index: usize) -> String {
        format!("{}{}", self.shard_prefix, index)
    }

    pub fn source_table(&self) -> &str {
        &self.source_table
    }

    /// Make sure every shard for `process_count` ranks exists
    ///
    /// Shards that already exist are not recreated, so calling this again
    /// with the same group size issues no create statements.
    pub fn partition(&self, process_count: usize) -> Result<Vec<ShardInfo>> {
        let shards = Self::shard_count(process_count)?;
        let mut infos = Vec::with_capacity(shards);

        for index in 0..shards {
            let table = self.shard_name(index);
            if table == self.source_table {
                return Err(DistributedError::PartitionError(format!(
                    "shard {} would be the source table itself",
                    table
                )));
            }

            let exists = self.executor.exists(&table).map_err(|e| {
                DistributedError::PartitionError(format!(
                    "existence check for {} failed: {}",
                    table, e
                ))
            })?;

            if exists {
                tracing::debug!("Shard {} already exists, skipping", table);
                infos.push(ShardInfo {
                    index,
                    table,
                    created: false,
                });
                continue;
            }

            let statement = Statement::create_shard(
                &self.source_table,
                &table,
                shards as i64,
                index as i64,
            );
            let rows = self.executor.execute(&statement).map_err(|e| {
                DistributedError::PartitionError(format!("failed to create {}: {}", table, e))
            })?;

            tracing::debug!("Created shard {} with {} rows", table, rows);
            infos.push(ShardInfo {
                index,
                table,
                created: true,
            });
        }

        tracing::info!(
            "Partitioned {} into {} shards ({} created)",
            self.source_table,
            shards,
            infos.iter().filter(|s| s.created).count()
        );
        Ok(infos)
    }

    /// Drop shard tables `0..max_shards`, best effort
    ///
    /// Failures are logged and skipped. Returns how many tables were dropped.
    pub fn drop_shards(&self, max_shards: usize) -> usize {
        let mut dropped = 0;
        for index in 0..max_shards {
            let table = self.shard_name(index);
            if table == self.source_table {
                tracing::warn!("Not dropping {}: it is the source table", table);
                continue;
            }
            match self
                .executor
                .execute(&Statement::drop_table_if_exists(&table))
            {
                Ok(0) => {}
                Ok(_) => dropped += 1,
                Err(e) => tracing::warn!("Failed to drop shard {}: {}", table, e),
            }
        }

        tracing::info!("Cleanup dropped {} shard tables", dropped);
        dropped
    }

    fn shard_count(process_count: usize) -> Result<usize> {
        if process_count < MIN_PROCESS_COUNT {
            return Err(DistributedError::PartitionError(format!(
                "need at least {} processes to partition, got {}",
                MIN_PROCESS_COUNT, process_count
            )));
        }
        Ok(process_count - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shardbench_core::Record;
    use shardbench_storage::{generate_hardware, MemoryStore};
    use std::collections::HashSet;

    fn partitioner_with_rows(rows: usize) -> (Arc<MemoryStore>, DatasetPartitioner) {
        let store = Arc::new(MemoryStore::new());
        store
            .create_table("computer_hardware", &generate_hardware(rows))
            .unwrap();
        let partitioner = DatasetPartitioner::new(
            store.clone(),
            "computer_hardware",
            "computer_hardware_shard_",
        );
        (store, partitioner)
    }

    #[test]
    fn test_assign() {
        assert_eq!(DatasetPartitioner::assign(10, 3).unwrap(), 0);
        assert_eq!(DatasetPartitioner::assign(7, 3).unwrap(), 1);
        assert_eq!(DatasetPartitioner::assign(7, 2).unwrap(), 0);
        assert_eq!(DatasetPartitioner::assign(-1, 4).unwrap(), 2);
        assert!(DatasetPartitioner::assign(1, 1).is_err());
    }

    #[test]
    fn test_shard_name() {
        let (_, partitioner) = partitioner_with_rows(0);
        assert_eq!(partitioner.shard_name(3), "computer_hardware_shard_3");
    }

    #[test]
    fn test_partition_three_processes() {
        let (store, partitioner) = partitioner_with_rows(10);
        let shards = partitioner.partition(3).unwrap();
        assert_eq!(shards.len(), 2);
        assert!(shards.iter().all(|s| s.created));

        let ids = |table: &str| -> Vec<i64> {
            store.query_all(table).unwrap().iter().map(|r| r.id).collect()
        };
        assert_eq!(ids("computer_hardware_shard_0"), vec![2, 4, 6, 8, 10]);
        assert_eq!(ids("computer_hardware_shard_1"), vec![1, 3, 5, 7, 9]);
    }

    #[test]
    fn test_partition_covers_source_for_every_group_size() {
        let (store, partitioner) = partitioner_with_rows(157);

        for process_count in 2..=100 {
            let shards = partitioner.partition(process_count).unwrap();
            assert_eq!(shards.len(), process_count - 1);

            let mut seen = HashSet::new();
            let mut total = 0;
            for shard in &shards {
                let records: Vec<Record> = store.query_all(&shard.table).unwrap();
                for record in &records {
                    assert_eq!(
                        DatasetPartitioner::assign(record.id, process_count).unwrap(),
                        shard.index
                    );
                    assert!(seen.insert(record.id), "id {} in two shards", record.id);
                }
                total += records.len();
            }
            assert_eq!(total, 157);

            partitioner.drop_shards(100);
        }
    }

    #[test]
    fn test_partition_rejects_single_process() {
        let (store, partitioner) = partitioner_with_rows(5);
        for bad in [0, 1] {
            let err = partitioner.partition(bad).unwrap_err();
            assert!(matches!(err, DistributedError::PartitionError(_)));
        }
        assert_eq!(store.table_names(), vec!["computer_hardware".to_string()]);
    }

    #[test]
    fn test_partition_is_idempotent() {
        let (_, partitioner) = partitioner_with_rows(20);
        partitioner.partition(5).unwrap();

        let again = partitioner.partition(5).unwrap();
        assert_eq!(again.len(), 4);
        assert!(again.iter().all(|s| !s.created));
    }

    #[test]
    fn test_partition_missing_source() {
        let store = Arc::new(MemoryStore::new());
        let partitioner = DatasetPartitioner::new(store, "absent", "absent_shard_");
        let err = partitioner.partition(3).unwrap_err();
        assert!(matches!(err, DistributedError::PartitionError(_)));
    }

    #[test]
    fn test_source_named_like_a_shard_is_never_touched() {
        let store = Arc::new(MemoryStore::new());
        store.create_table("parts1", &generate_hardware(10)).unwrap();
        let partitioner = DatasetPartitioner::new(store.clone(), "parts1", "parts");

        let err = partitioner.partition(3).unwrap_err();
        assert!(matches!(err, DistributedError::PartitionError(_)));

        partitioner.drop_shards(100);
        assert_eq!(store.row_count("parts1").unwrap(), 10);
        assert_eq!(store.table_names(), vec!["parts1".to_string()]);
    }

    #[test]
    fn test_drop_shards_sweeps_stale_tables() {
        let (store, partitioner) = partitioner_with_rows(30);
        partitioner.partition(8).unwrap();
        partitioner.partition(3).unwrap();
        assert_eq!(store.table_names().len(), 8);

        // Shards 2..7 are left over from the larger group and go too
        assert_eq!(partitioner.drop_shards(100), 7);
        assert_eq!(store.table_names(), vec!["computer_hardware".to_string()]);
        assert_eq!(partitioner.drop_shards(100), 0);
    }
}
