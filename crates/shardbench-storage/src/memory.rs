//! In-memory table store
//!
//! Tables are kept as Arrow record batches behind a single lock. Shard
//! creation filters the source batches with an Arrow boolean mask, the same
//! way partition batches are cut with `take` in columnar engines.

use crate::csv::read_csv;
use crate::executor::{QueryExecutor, Statement};
use arrow::array::{Array, BooleanArray, Int64Array};
use arrow::compute::filter_record_batch;
use arrow::record_batch::RecordBatch;
use parking_lot::RwLock;
use shardbench_core::{
    batch_to_records, record_schema, records_to_batch, BenchError, Record, Result,
};
use std::collections::HashMap;
use std::path::Path;

/// Arrow-backed table store shared by all ranks of a local run
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<RecordBatch>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table from records
    pub fn create_table(&self, name: &str, records: &[Record]) -> Result<()> {
        let batch = records_to_batch(records)?;
        self.register_batches(name, vec![batch])
    }

    /// Register pre-built batches as a table
    ///
    /// Every batch must carry the record schema.
    pub fn register_batches(&self, name: &str, batches: Vec<RecordBatch>) -> Result<()> {
        let schema = record_schema();
        if let Some(bad) = batches.iter().find(|b| b.schema() != schema) {
            return Err(BenchError::StorageError(format!(
                "Batch schema does not match record schema: {:?}",
                bad.schema()
            )));
        }

        let mut tables = self.tables.write();
        if tables.contains_key(name) {
            return Err(BenchError::TableAlreadyExists(name.to_string()));
        }

        tables.insert(name.to_string(), batches);
        tracing::debug!("Created table {}", name);
        Ok(())
    }

    /// Load a CSV file with the record columns into a new table
    pub fn load_csv(&self, name: &str, path: &Path) -> Result<usize> {
        let batches = read_csv(path)?;
        let rows = batches.iter().map(|b| b.num_rows()).sum();
        self.register_batches(name, batches)?;
        tracing::info!("Loaded {} rows from {:?} into {}", rows, path, name);
        Ok(rows)
    }

    /// Names of all tables, sorted
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Row count of a table
    pub fn row_count(&self, name: &str) -> Result<usize> {
        self.tables
            .read()
            .get(name)
            .map(|batches| batches.iter().map(|b| b.num_rows()).sum())
            .ok_or_else(|| BenchError::TableNotFound(name.to_string()))
    }

    fn create_shard(&self, source: &str, target: &str, modulus: i64, remainder: i64) -> Result<u64> {
        if modulus <= 0 {
            return Err(BenchError::StorageError(format!(
                "Shard modulus must be positive, got {}",
                modulus
            )));
        }

        let mut tables = self.tables.write();
        if tables.contains_key(target) {
            return Err(BenchError::TableAlreadyExists(target.to_string()));
        }

        let source_batches = tables
            .get(source)
            .ok_or_else(|| BenchError::TableNotFound(source.to_string()))?;

        let mut shard = Vec::with_capacity(source_batches.len());
        let mut copied = 0u64;
        for batch in source_batches {
            let ids = batch
                .column_by_name("id")
                .ok_or_else(|| BenchError::ColumnNotFound("id".to_string()))?
                .as_any()
                .downcast_ref::<Int64Array>()
                .ok_or_else(|| BenchError::StorageError("Column 'id' is not Int64".to_string()))?;

            let mask: BooleanArray = ids
                .iter()
                .map(|id| Some(matches!(id, Some(v) if v.rem_euclid(modulus) == remainder)))
                .collect();

            let filtered = filter_record_batch(batch, &mask)?;
            copied += filtered.num_rows() as u64;
            shard.push(filtered);
        }

        tables.insert(target.to_string(), shard);
        Ok(copied)
    }

    fn drop_table_if_exists(&self, table: &str) -> u64 {
        match self.tables.write().remove(table) {
            Some(_) => {
                tracing::debug!("Dropped table {}", table);
                1
            }
            None => 0,
        }
    }
}

impl QueryExecutor for MemoryStore {
    fn query_all(&self, table: &str) -> Result<Vec<Record>> {
        let tables = self.tables.read();
        let batches = tables
            .get(table)
            .ok_or_else(|| BenchError::TableNotFound(table.to_string()))?;

        let mut records = Vec::with_capacity(batches.iter().map(|b| b.num_rows()).sum());
        for batch in batches {
            records.extend(batch_to_records(batch)?);
        }
        Ok(records)
    }

    fn execute(&self, statement: &Statement) -> Result<u64> {
        tracing::debug!("Executing: {}", statement);
        match statement {
            Statement::CreateShard {
                source,
                target,
                modulus,
                remainder,
            } => self.create_shard(source, target, *modulus, *remainder),
            Statement::DropTableIfExists { table } => Ok(self.drop_table_if_exists(table)),
        }
    }

    fn exists(&self, table: &str) -> Result<bool> {
        Ok(self.tables.read().contains_key(table))
    }
}
