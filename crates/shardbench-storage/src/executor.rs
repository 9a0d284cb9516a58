//! The narrow query interface the benchmark core depends on

use shardbench_core::{Record, Result};
use std::fmt::{self, Debug};

/// Statements the benchmark issues against storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// Copy the rows of `source` whose `id` has the given Euclidean
    /// remainder modulo `modulus` into a new table `target`
    CreateShard {
        source: String,
        target: String,
        modulus: i64,
        remainder: i64,
    },
    /// Drop `table`, doing nothing if it does not exist
    DropTableIfExists { table: String },
}

impl Statement {
    pub fn create_shard(
        source: impl Into<String>,
        target: impl Into<String>,
        modulus: i64,
        remainder: i64,
    ) -> Self {
        Statement::CreateShard {
            source: source.into(),
            target: target.into(),
            modulus,
            remainder,
        }
    }

    pub fn drop_table_if_exists(table: impl Into<String>) -> Self {
        Statement::DropTableIfExists {
            table: table.into(),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::CreateShard {
                source,
                target,
                modulus,
                remainder,
            } => write!(
                f,
                "SELECT * INTO {} FROM {} WHERE id % {} = {}",
                target, source, modulus, remainder
            ),
            Statement::DropTableIfExists { table } => write!(f, "DROP TABLE IF EXISTS {}", table),
        }
    }
}

/// Executes reads and statements against the shared dataset
pub trait QueryExecutor: Debug + Send + Sync {
    /// Return every row of `table` in stored order
    fn query_all(&self, table: &str) -> Result<Vec<Record>>;

    /// Run a statement and return the number of affected rows
    fn execute(&self, statement: &Statement) -> Result<u64>;

    /// Whether `table` currently exists
    fn exists(&self, table: &str) -> Result<bool>;
}
