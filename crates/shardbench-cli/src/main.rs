use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use commands::*;
use config::{Config, OutputFormat, RunOverrides};

#[derive(Parser)]
#[command(name = "shardbench")]
#[command(author, version, about = "Sequential vs. sharded fan-out query benchmark", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the benchmark (default)
    Run(RunArgs),

    /// Compare two record artifacts as order-independent sets
    Compare {
        /// First artifact (JSON record array)
        left: PathBuf,

        /// Second artifact (JSON record array)
        right: PathBuf,
    },

    /// Write a generated hardware dataset to CSV
    Generate {
        /// Number of records
        #[arg(short, long, default_value = "1000")]
        rows: usize,

        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Write the effective configuration to a file
    InitConfig {
        /// Output file
        #[arg(short, long, default_value = "shardbench.json")]
        output: PathBuf,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Total ranks, coordinator included
    #[arg(short = 'n', long)]
    processes: Option<usize>,

    /// Generate this many records for the source table
    #[arg(short, long, conflicts_with = "csv")]
    rows: Option<usize>,

    /// Load the source table from a CSV file
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Source table name
    #[arg(short = 't', long)]
    table: Option<String>,

    /// Write the baseline records to this file
    #[arg(long)]
    baseline_out: Option<PathBuf>,

    /// Write the gathered records to this file
    #[arg(long)]
    gathered_out: Option<PathBuf>,

    /// Print this many gathered records after the report
    #[arg(long)]
    show_rows: Option<usize>,

    /// Report format
    #[arg(short, long, value_enum)]
    output: Option<ReportFormat>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportFormat {
    Table,
    Json,
}

impl From<ReportFormat> for OutputFormat {
    fn from(format: ReportFormat) -> Self {
        match format {
            ReportFormat::Table => OutputFormat::Table,
            ReportFormat::Json => OutputFormat::Json,
        }
    }
}

impl RunArgs {
    fn overrides(&self) -> RunOverrides {
        RunOverrides {
            processes: self.processes,
            rows: self.rows,
            source_table: self.table.clone(),
            baseline_out: self.baseline_out.clone(),
            gathered_out: self.gathered_out.clone(),
            show_rows: self.show_rows,
            output_format: self.output.map(OutputFormat::from),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose)?;

    // Load configuration
    let mut config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)?
    } else {
        Config::default()
    };
    tracing::debug!("Loaded configuration: {:?}", config);

    match cli.command {
        Some(Commands::Run(args)) => {
            config.apply(&args.overrides());
            if config.output_format == OutputFormat::Table {
                print_banner();
            }
            run_benchmark(&config, args.csv.as_deref())?;
        }
        Some(Commands::Compare { left, right }) => {
            compare_artifacts(&left, &right)?;
        }
        Some(Commands::Generate { rows, output }) => {
            generate_dataset(rows, &output)?;
        }
        Some(Commands::InitConfig { output }) => {
            write_default_config(&config, &output)?;
        }
        None => {
            // Default: run with file or default settings
            if config.output_format == OutputFormat::Table {
                print_banner();
            }
            run_benchmark(&config, None)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        "shardbench_cli=debug,shardbench_core=debug,shardbench_storage=debug,shardbench_distributed=debug"
    } else {
        "shardbench_cli=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

fn print_banner() {
    println!(
        "{}",
        r#"
     _                   _ _                     _
 ___| |__   __ _ _ __ __| | |__   ___ _ __   ___| |__
/ __| '_ \ / _` | '__/ _` | '_ \ / _ \ '_ \ / __| '_ \
\__ \ | | | (_| | | | (_| | |_) |  __/ | | | (__| | | |
|___/_| |_|\__,_|_|  \__,_|_.__/ \___|_| |_|\___|_| |_|
    "#
        .bright_cyan()
    );
    println!(
        "{}",
        "Sequential vs. Sharded Query Benchmark v0.1.0\n".bright_yellow()
    );
}
