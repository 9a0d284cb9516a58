use crate::config::{Config, OutputFormat};
use anyhow::Result;
use colored::Colorize;
use comfy_table::{Cell, Color, Table as ComfyTable};
use shardbench_core::{records_to_batch, Record};
use shardbench_distributed::{
    compare_record_files, timers, BenchmarkReport, LocalLauncher, RecordComparison,
};
use shardbench_storage::{generate_hardware, write_csv, MemoryStore};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Load the source table and run the benchmark across a local rank group
pub fn run_benchmark(config: &Config, csv: Option<&Path>) -> Result<()> {
    let bench = &config.bench;
    let store = Arc::new(MemoryStore::new());

    let table_output = config.output_format == OutputFormat::Table;

    match csv {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("File not found: {:?}", path);
            }
            if table_output {
                println!(
                    "{} Loading {} from {:?}",
                    "→".bright_blue(),
                    bench.source_table.bright_cyan(),
                    path
                );
            }
            store.load_csv(&bench.source_table, path)?;
        }
        None => {
            if table_output {
                println!(
                    "{} Generating {} records into {}",
                    "→".bright_blue(),
                    config.rows,
                    bench.source_table.bright_cyan()
                );
            }
            store.create_table(&bench.source_table, &generate_hardware(config.rows))?;
        }
    }

    if table_output {
        println!(
            "{} Running with {} processes ({} workers)...",
            "→".bright_blue(),
            bench.process_count,
            bench.shard_count()
        );
    }

    let start = Instant::now();
    let output = LocalLauncher::new(bench.clone(), store).run()?;
    let elapsed = start.elapsed();
    tracing::info!("Benchmark finished in {:?}", elapsed);

    match config.output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&output.report)?);
        }
        OutputFormat::Table => {
            println!("{} Benchmark complete!", "✓".bright_green());
            print_phase_table(&output.report);
            if config.show_ranks {
                print_rank_table(&output.report);
            }
            print_summary(&output.report);
            for line in sample_rows(&output.gathered, config.show_rows) {
                println!("  {}", line);
            }
            println!(
                "{} {:.2}ms",
                "Total run time:".bright_yellow(),
                elapsed.as_secs_f64() * 1000.0
            );
        }
    }

    if let (Some(baseline), Some(gathered)) = (&bench.baseline_output, &bench.gathered_output) {
        let comparison = compare_record_files(baseline, gathered)?;
        if table_output {
            print_comparison(&comparison);
        }
    }

    Ok(())
}

pub fn compare_artifacts(left: &Path, right: &Path) -> Result<()> {
    for path in [left, right] {
        if !path.exists() {
            anyhow::bail!("File not found: {:?}", path);
        }
    }

    println!(
        "{} Comparing {:?} with {:?}",
        "→".bright_blue(),
        left,
        right
    );
    let comparison = compare_record_files(left, right)?;
    print_comparison(&comparison);
    Ok(())
}

pub fn generate_dataset(rows: usize, output: &Path) -> Result<()> {
    println!(
        "{} Generating {} records into {:?}",
        "→".bright_blue(),
        rows,
        output
    );

    let batch = records_to_batch(&generate_hardware(rows))?;
    write_csv(output, &[batch])?;

    println!("{} Dataset written!", "✓".bright_green());
    Ok(())
}

pub fn write_default_config(config: &Config, output: &Path) -> Result<()> {
    config.save(output)?;
    println!(
        "{} Configuration written to {:?}",
        "✓".bright_green(),
        output
    );
    Ok(())
}

fn print_phase_table(report: &BenchmarkReport) {
    let mut table = ComfyTable::new();
    table.set_header(vec![
        Cell::new("Phase").fg(Color::Cyan),
        Cell::new("Rank").fg(Color::Yellow),
        Cell::new("Time (ms)").fg(Color::Green),
    ]);

    let rows = [
        ("Baseline query", "coordinator", report.sequential_ms),
        ("Partition", "coordinator", report.partition_ms),
        (
            "Local fetch (max)",
            "workers",
            report.worker_max_ms(timers::LOCAL_FETCH),
        ),
        (
            "Serialize (max)",
            "workers",
            report.worker_max_ms(timers::SERIALIZE),
        ),
        ("Receive", "coordinator", report.receive_ms),
        ("Merge", "coordinator", report.merge_ms),
        ("Distributed wall", "coordinator", report.distributed_wall_ms),
    ];

    for (phase, rank, ms) in rows {
        table.add_row(vec![phase.to_string(), rank.to_string(), format!("{:.3}", ms)]);
    }

    println!("{}", table);
}

fn print_rank_table(report: &BenchmarkReport) {
    let mut table = ComfyTable::new();
    table.set_header(vec![
        Cell::new("Rank").fg(Color::Cyan),
        Cell::new("Records").fg(Color::Yellow),
        Cell::new("Payload (bytes)").fg(Color::Green),
        Cell::new("Fetch (ms)").fg(Color::Magenta),
        Cell::new("Serialize (ms)").fg(Color::Magenta),
        Cell::new("Send (ms)").fg(Color::Blue),
    ]);

    for rank in report.worker_timings() {
        table.add_row(vec![
            rank.rank.to_string(),
            rank.records.to_string(),
            rank.payload_bytes.to_string(),
            format!("{:.3}", rank.timer_ms(timers::LOCAL_FETCH)),
            format!("{:.3}", rank.timer_ms(timers::SERIALIZE)),
            format!("{:.3}", rank.timer_ms(timers::DISPATCH)),
        ]);
    }

    println!("{}", table);
}

fn print_summary(report: &BenchmarkReport) {
    println!("{}", "Benchmark Results:".bright_green().bold());
    println!("{}", "─".repeat(50));
    println!("  Processes:       {}", report.process_count);
    println!("  Sequential:      {:.2}ms", report.sequential_ms);
    println!(
        "  Distributed:     {:.2}ms (partition + slowest worker + receive + merge)",
        report.distributed_ms()
    );
    println!("  Wall clock:      {:.2}ms", report.distributed_wall_ms);
    println!("  Speedup:         {:.2}x", report.speedup());
    println!("  Baseline rows:   {}", report.baseline_records);
    println!("  Gathered rows:   {}", report.gathered_records);

    if report.counts_match() {
        println!("  {} Record counts match", "✓".bright_green());
    } else {
        println!(
            "  {} Record counts differ by {}",
            "✗".bright_red(),
            report.baseline_records.abs_diff(report.gathered_records)
        );
    }
    println!("{}", "─".repeat(50));
}

/// First `limit` records in their row printout form
fn sample_rows(records: &[Record], limit: usize) -> Vec<String> {
    records.iter().take(limit).map(|r| r.to_string()).collect()
}

fn print_comparison(comparison: &RecordComparison) {
    let verdict = if comparison.identical {
        "identical".bright_green()
    } else {
        "different".bright_red()
    };

    println!(
        "{} Artifacts are {} ({} vs {} records, compared in {:.2}ms)",
        "→".bright_blue(),
        verdict,
        comparison.left_count,
        comparison.right_count,
        comparison.elapsed.as_secs_f64() * 1000.0
    );
}
