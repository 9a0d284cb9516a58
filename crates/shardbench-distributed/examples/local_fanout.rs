//! Local fan-out example
//!
//! Runs the benchmark over a generated dataset for a few group sizes and
//! prints how the sharded path compares with the single full-table query.

use shardbench_core::BenchConfig;
use shardbench_distributed::{timers, DatasetPartitioner, LocalLauncher};
use shardbench_storage::{generate_hardware, MemoryStore};
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Sharded Fan-out Demo ===\n");

    println!("1. Creating source table...");
    let store = Arc::new(MemoryStore::new());
    store.create_table("computer_hardware", &generate_hardware(10_000))?;
    println!("   computer_hardware: {} rows\n", store.row_count("computer_hardware")?);

    println!("2. Shard assignment (3 processes, 2 workers):");
    for id in 1..=4 {
        println!(
            "   id {} -> shard {}",
            id,
            DatasetPartitioner::assign(id, 3)?
        );
    }
    println!();

    println!("3. Running benchmark:");
    for process_count in [2, 4, 8] {
        let output = LocalLauncher::new(BenchConfig::new(process_count), store.clone()).run()?;
        let report = &output.report;
        println!(
            "   {} processes: sequential {:.2}ms, distributed {:.2}ms, slowest fetch {:.2}ms, {} / {} records",
            process_count,
            report.sequential_ms,
            report.distributed_ms(),
            report.worker_max_ms(timers::LOCAL_FETCH),
            report.gathered_records,
            report.baseline_records
        );
    }

    println!("\n4. Tables left after cleanup: {:?}", store.table_names());
    println!("\n=== Demo Complete ===");
    Ok(())
}
