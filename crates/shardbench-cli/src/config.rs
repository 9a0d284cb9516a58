use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use shardbench_core::BenchConfig;
use std::path::{Path, PathBuf};

/// Rows generated when neither a CSV source nor `--rows` is given
pub const DEFAULT_ROWS: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bench: BenchConfig,
    pub rows: usize,
    pub show_ranks: bool,
    /// Gathered records printed after the report
    pub show_rows: usize,
    pub output_format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Table,
    Json,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bench: BenchConfig::default(),
            rows: DEFAULT_ROWS,
            show_ranks: true,
            show_rows: 0,
            output_format: OutputFormat::Table,
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {:?}", path))?;
        let config: Config = serde_json::from_str(&contents)
            .with_context(|| format!("invalid config {:?}", path))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply command-line values on top of the file values
    pub fn apply(&mut self, overrides: &RunOverrides) {
        if let Some(processes) = overrides.processes {
            self.bench.process_count = processes;
        }
        if let Some(rows) = overrides.rows {
            self.rows = rows;
        }
        if let Some(table) = &overrides.source_table {
            self.bench.source_table = table.clone();
        }
        if let Some(path) = &overrides.baseline_out {
            self.bench.baseline_output = Some(path.clone());
        }
        if let Some(path) = &overrides.gathered_out {
            self.bench.gathered_output = Some(path.clone());
        }
        if let Some(rows) = overrides.show_rows {
            self.show_rows = rows;
        }
        if let Some(format) = overrides.output_format {
            self.output_format = format;
        }
    }
}

/// Values given on the command line for a run
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub processes: Option<usize>,
    pub rows: Option<usize>,
    pub source_table: Option<String>,
    pub baseline_out: Option<PathBuf>,
    pub gathered_out: Option<PathBuf>,
    pub show_rows: Option<usize>,
    pub output_format: Option<OutputFormat>,
}
