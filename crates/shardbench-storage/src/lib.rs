//! Storage collaborator for shardbench
//!
//! The benchmark core only talks to storage through [`QueryExecutor`]:
//! full-table reads, a small set of statements and existence checks.
//! [`MemoryStore`] implements it over Arrow record batches so every rank
//! of a local run can share one dataset.

pub mod csv;
pub mod dataset;
pub mod executor;
pub mod memory;

pub use csv::{read_csv, write_csv};
pub use dataset::generate_hardware;
pub use executor::{QueryExecutor, Statement};
pub use memory::MemoryStore;
