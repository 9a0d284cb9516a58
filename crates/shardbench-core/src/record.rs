//! The hardware record exchanged between ranks and its Arrow layout

use crate::error::{BenchError, Result};
use arrow::array::{Array, ArrayRef, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Column names in storage order. `id` is the partition key.
pub const RECORD_COLUMNS: [&str; 6] = [
    "id",
    "cpu_name",
    "gpu_name",
    "ram_name",
    "motherboard_name",
    "psu_name",
];

/// One row of the benchmark dataset
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    pub cpu_name: String,
    pub gpu_name: String,
    pub ram_name: String,
    pub motherboard_name: String,
    pub psu_name: String,
}

impl Record {
    pub fn new(
        id: i64,
        cpu_name: impl Into<String>,
        gpu_name: impl Into<String>,
        ram_name: impl Into<String>,
        motherboard_name: impl Into<String>,
        psu_name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            cpu_name: cpu_name.into(),
            gpu_name: gpu_name.into(),
            ram_name: ram_name.into(),
            motherboard_name: motherboard_name.into(),
            psu_name: psu_name.into(),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ID: {}, CPU: {}, GPU: {}, RAM: {}, Motherboard: {}, PSU: {}",
            self.id, self.cpu_name, self.gpu_name, self.ram_name, self.motherboard_name, self.psu_name
        )
    }
}

/// Arrow schema of a record table
pub fn record_schema() -> SchemaRef {
    let mut fields = vec![Field::new(RECORD_COLUMNS[0], DataType::Int64, false)];
    fields.extend(
        RECORD_COLUMNS[1..]
            .iter()
            .map(|name| Field::new(*name, DataType::Utf8, true)),
    );
    Arc::new(Schema::new(fields))
}

/// Build a single record batch from a slice of records
pub fn records_to_batch(records: &[Record]) -> Result<RecordBatch> {
    let ids: ArrayRef = Arc::new(Int64Array::from_iter_values(records.iter().map(|r| r.id)));

    let columns = vec![
        ids,
        string_column(records, |r| r.cpu_name.as_str()),
        string_column(records, |r| r.gpu_name.as_str()),
        string_column(records, |r| r.ram_name.as_str()),
        string_column(records, |r| r.motherboard_name.as_str()),
        string_column(records, |r| r.psu_name.as_str()),
    ];

    Ok(RecordBatch::try_new(record_schema(), columns)?)
}

/// Convert a record batch back into records
///
/// Columns are looked up by name so batches read from CSV with a different
/// column order still convert. Null strings become empty strings; a null id
/// is an error.
pub fn batch_to_records(batch: &RecordBatch) -> Result<Vec<Record>> {
    let ids = batch
        .column_by_name("id")
        .ok_or_else(|| BenchError::ColumnNotFound("id".to_string()))?
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| BenchError::StorageError("Column 'id' is not Int64".to_string()))?;

    let cpu = utf8_column(batch, "cpu_name")?;
    let gpu = utf8_column(batch, "gpu_name")?;
    let ram = utf8_column(batch, "ram_name")?;
    let motherboard = utf8_column(batch, "motherboard_name")?;
    let psu = utf8_column(batch, "psu_name")?;

    let mut records = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        if ids.is_null(row) {
            return Err(BenchError::StorageError(format!(
                "Null id at row {}",
                row
            )));
        }

        records.push(Record {
            id: ids.value(row),
            cpu_name: string_value(cpu, row),
            gpu_name: string_value(gpu, row),
            ram_name: string_value(ram, row),
            motherboard_name: string_value(motherboard, row),
            psu_name: string_value(psu, row),
        });
    }

    Ok(records)
}

fn string_column(records: &[Record], get: impl Fn(&Record) -> &str) -> ArrayRef {
    Arc::new(StringArray::from_iter_values(records.iter().map(get)))
}

fn utf8_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| BenchError::ColumnNotFound(name.to_string()))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| BenchError::StorageError(format!("Column '{}' is not Utf8", name)))
}

fn string_value(array: &StringArray, row: usize) -> String {
    if array.is_null(row) {
        String::new()
    } else {
        array.value(row).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_records() -> Vec<Record> {
        vec![
            Record::new(1, "Ryzen 5 5600X", "RTX 3060", "16GB DDR4", "B550", "650W"),
            Record::new(2, "", "", "", "", ""),
            Record::new(-7, "Core i9-13900K", "RX 7900 XTX", "64GB DDR5", "Z790", "1000W"),
        ]
    }

    #[test]
    fn test_schema_columns() {
        let schema = record_schema();
        assert_eq!(schema.fields().len(), 6);
        assert_eq!(schema.field(0).name(), "id");
        assert_eq!(schema.field(0).data_type(), &DataType::Int64);
        assert_eq!(schema.field(5).name(), "psu_name");
    }

    #[test]
    fn test_batch_conversion_preserves_fields() {
        let records = sample_records();
        let batch = records_to_batch(&records).unwrap();
        assert_eq!(batch.num_rows(), 3);

        let back = batch_to_records(&batch).unwrap();
        assert_eq!(back, records);
    }

    #[test]
    fn test_empty_batch() {
        let batch = records_to_batch(&[]).unwrap();
        assert_eq!(batch.num_rows(), 0);
        assert!(batch_to_records(&batch).unwrap().is_empty());
    }

    #[test]
    fn test_null_strings_become_empty() {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from(vec![9])),
            Arc::new(StringArray::from(vec![None::<&str>])),
            Arc::new(StringArray::from(vec![Some("gpu")])),
            Arc::new(StringArray::from(vec![Some("ram")])),
            Arc::new(StringArray::from(vec![None::<&str>])),
            Arc::new(StringArray::from(vec![Some("psu")])),
        ];
        let batch = RecordBatch::try_new(record_schema(), columns).unwrap();

        let records = batch_to_records(&batch).unwrap();
        assert_eq!(records[0].cpu_name, "");
        assert_eq!(records[0].motherboard_name, "");
        assert_eq!(records[0].gpu_name, "gpu");
    }

    #[test]
    fn test_display_format() {
        let record = Record::new(3, "cpu", "gpu", "ram", "board", "psu");
        assert_eq!(
            record.to_string(),
            "ID: 3, CPU: cpu, GPU: gpu, RAM: ram, Motherboard: board, PSU: psu"
        );
    }
}
