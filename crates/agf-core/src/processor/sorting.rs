//! Sorted-file output.
//!
//! Each batch writes two line-aligned files under the output directory:
//!
//! - `<prefix>_<n>_<batchId>.tcf.sorted`: rendered records in sort order
//! - `<prefix>_<n>_<batchId>.tcif.sorted`: the sort field of each record
//!
//! Line `i` of the index file is the sort field of line `i` of the record
//! file. A downstream k-way merge reads the index files only.

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use agf_common::BatchId;
use tracing::debug;

use crate::coordinator::ProcessedBatchInfo;
use crate::error::{FetchError, Result};

use super::{AggregateBatchProcessor, BatchStats, FinishedBatch, OutputStrategy};

pub const RECORD_FILE_SUFFIX: &str = "tcf.sorted";
pub const INDEX_FILE_SUFFIX: &str = "tcif.sorted";

/// Sorts a batch by its order keys and writes the record and index files.
#[derive(Debug, Clone)]
pub struct SortedFileOutput {
    output_dir: PathBuf,
    prefix: String,
}

impl SortedFileOutput {
    pub fn new(output_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            prefix: prefix.into(),
        }
    }

    /// `(record_file, index_file)` for one processor and batch.
    pub fn file_paths(&self, processor_number: usize, batch_id: &BatchId) -> (PathBuf, PathBuf) {
        let stem = format!("{}_{}_{}", self.prefix, processor_number, batch_id);
        (
            self.output_dir.join(format!("{}.{}", stem, RECORD_FILE_SUFFIX)),
            self.output_dir.join(format!("{}.{}", stem, INDEX_FILE_SUFFIX)),
        )
    }
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| FetchError::file_write(path, e))
}

/// Collapse `text` to one line: trailing line breaks are dropped and
/// embedded ones are written as `\\n` / `\\r`.
pub(crate) fn single_line(text: &str) -> Cow<'_, str> {
    let text = text.trim_end_matches(['\r', '\n']);
    if !text.contains(['\r', '\n']) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.replace('\r', "\\r").replace('\n', "\\n"))
}

/// Flush a writer, keeping the first error seen.
fn flush_into(writer: &mut BufWriter<File>, path: &Path, first_error: &mut Option<FetchError>) {
    if let Err(e) = writer.flush() {
        if first_error.is_none() {
            *first_error = Some(FetchError::file_write(path, e));
        }
    }
}

impl OutputStrategy for SortedFileOutput {
    fn name(&self) -> &'static str {
        "file-based-sorting"
    }

    fn collects_order_keys(&self) -> bool {
        true
    }

    fn finalize(&mut self, mut batch: FinishedBatch, stats: &mut BatchStats) -> Result<ProcessedBatchInfo> {
        let started = Instant::now();
        // Vec::sort is stable: equal fields keep processing order.
        batch.order_keys.sort();
        stats.sort += started.elapsed();

        let started = Instant::now();
        let (record_file, index_file) = self.file_paths(batch.processor_number, &batch.batch_id);
        let mut index = create(&index_file)?;
        let mut records = create(&record_file)?;

        let mut first_error = None;
        for key in &batch.order_keys {
            if let Err(e) = writeln!(index, "{}", single_line(&key.sort_field)) {
                first_error = Some(FetchError::file_write(&index_file, e));
                break;
            }
            let line = batch
                .records
                .get(key.record_index)
                .map(String::as_str)
                .unwrap_or_default();
            if let Err(e) = writeln!(records, "{}", single_line(line)) {
                first_error = Some(FetchError::file_write(&record_file, e));
                break;
            }
        }
        flush_into(&mut index, &index_file, &mut first_error);
        flush_into(&mut records, &record_file, &mut first_error);
        batch.order_keys.clear();
        stats.file_write += started.elapsed();

        if let Some(e) = first_error {
            return Err(e);
        }
        debug!(
            batch_id = %batch.batch_id,
            record_file = %record_file.display(),
            lines = batch.records.len(),
            "sorted batch written"
        );
        Ok(ProcessedBatchInfo::Sorted {
            record_file,
            index_file,
        })
    }
}

pub type FileBasedSortingProcessor = AggregateBatchProcessor<SortedFileOutput>;
