//! CSV import and export of record tables

use arrow::csv::{ReaderBuilder, Writer as CsvWriter};
use arrow::record_batch::RecordBatch;
use shardbench_core::{record_schema, Result};
use std::fs::File;
use std::path::Path;

const CSV_BATCH_SIZE: usize = 8192;

/// Read a headered CSV file with the six record columns
pub fn read_csv(path: &Path) -> Result<Vec<RecordBatch>> {
    let file = File::open(path)?;
    let reader = ReaderBuilder::new(record_schema())
        .with_header(true)
        .with_batch_size(CSV_BATCH_SIZE)
        .build(file)?;

    let mut batches = Vec::new();
    for batch in reader {
        batches.push(batch?);
    }
    Ok(batches)
}

/// Write batches to a headered CSV file
pub fn write_csv(path: &Path, batches: &[RecordBatch]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = CsvWriter::new(file);

    for batch in batches {
        writer.write(batch)?;
    }

    Ok(())
}
