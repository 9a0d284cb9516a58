//! Merging of worker batches at the coordinator
//!
//! A batch that fails to decode is logged and contributes nothing; the
//! remaining batches are still returned. The loss only shows up downstream
//! as a record-count mismatch.

use crate::error::Result;
use crate::wire::decode_batch;
use shardbench_core::Record;

/// Merges serialized record batches with partial-failure tolerance
#[derive(Debug, Default, Clone, Copy)]
pub struct ResultAggregator;

impl ResultAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Decode and concatenate `batches` in order
    ///
    /// Every batch must be a complete array on its own; the ones that fail
    /// to decode are dropped.
    pub fn merge_serialized_batches<S: AsRef<str>>(&self, batches: &[S]) -> Vec<Record> {
        self.decode_batches(batches)
            .into_iter()
            .filter_map(|outcome| outcome.ok())
            .fold(Vec::new(), |acc, records| self.combine(acc, records))
    }

    /// Decode each batch independently, keeping per-batch outcomes
    pub fn decode_batches<S: AsRef<str>>(&self, batches: &[S]) -> Vec<Result<Vec<Record>>> {
        batches
            .iter()
            .enumerate()
            .map(|(index, batch)| {
                let batch = batch.as_ref();
                decode_batch(batch).inspect_err(|e| {
                    tracing::warn!(
                        "Dropping malformed batch #{} ({} bytes): {}. Payload: {}",
                        index,
                        batch.len(),
                        e,
                        preview(batch)
                    );
                })
            })
            .collect()
    }

    /// Concatenate two record sequences, `a` first; duplicates are kept
    pub fn combine(&self, mut a: Vec<Record>, b: Vec<Record>) -> Vec<Record> {
        a.extend(b);
        a
    }
}

fn preview(payload: &str) -> &str {
    const MAX_PREVIEW: usize = 120;
    match payload.char_indices().nth(MAX_PREVIEW) {
        Some((end, _)) => &payload[..end],
        None => payload,
    }
}
