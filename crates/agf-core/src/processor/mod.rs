//! Per-batch processing lifecycle and output strategies.

pub mod aggregate;
pub mod non_sorting;
pub mod order_key;
pub mod sorting;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use agf_common::BatchId;
use agf_config::FetchConfig;
use serde::Serialize;
use tracing::{debug, info};

use crate::coordinator::{BatchCoordinator, ProcessedBatchInfo};
use crate::error::{FetchError, Result};
use crate::format::{PlaceholderTemplate, RecordTemplate};
use crate::solar::SolarTimeProvider;

pub use aggregate::AggregateBatchProcessor;
pub use non_sorting::{NonSortingBatchProcessor, NonSortingOutput};
pub use order_key::OrderKey;
pub use sorting::{FileBasedSortingProcessor, SortedFileOutput};

/// Shared, read-only state every processor of one fetch binds to.
#[derive(Clone)]
pub struct BatchContext {
    pub config: Arc<FetchConfig>,
    pub coordinator: Arc<dyn BatchCoordinator>,
    pub template: Option<Arc<dyn RecordTemplate>>,
    pub solar: Option<Arc<dyn SolarTimeProvider>>,
}

impl BatchContext {
    /// Bind a config and coordinator, compiling the config's template if any.
    pub fn new(config: Arc<FetchConfig>, coordinator: Arc<dyn BatchCoordinator>) -> Result<Self> {
        let template = match config.template.as_deref() {
            Some(source) => {
                let compiled = PlaceholderTemplate::compile(source)?;
                Some(Arc::new(compiled) as Arc<dyn RecordTemplate>)
            }
            None => None,
        };
        Ok(Self {
            config,
            coordinator,
            template,
            solar: None,
        })
    }

    pub fn with_template(mut self, template: Arc<dyn RecordTemplate>) -> Self {
        self.template = Some(template);
        self
    }

    pub fn with_solar(mut self, solar: Arc<dyn SolarTimeProvider>) -> Self {
        self.solar = Some(solar);
        self
    }
}

impl std::fmt::Debug for BatchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchContext")
            .field("config", &self.config)
            .field("template", &self.template.is_some())
            .field("solar", &self.solar.is_some())
            .finish_non_exhaustive()
    }
}

/// Timings and counters for one batch.
#[derive(Debug, Default, Clone, Serialize)]
pub struct BatchStats {
    pub decompress: Duration,
    pub deserialize: Duration,
    pub prefilter: Duration,
    pub time_format_and_range: Duration,
    pub record_construction: Duration,
    pub csv_render: Duration,
    pub template_render: Duration,
    pub sort: Duration,
    pub file_write: Duration,

    pub groups_read: usize,
    pub groups_skipped: usize,
    pub members_emitted: usize,
    pub members_rejected: usize,
    pub dn_failures: usize,
    pub render_failures: usize,
    pub per_channel: BTreeMap<String, usize>,
}

fn ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

impl BatchStats {
    /// JSON summary for diagnostics output.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn log(&self, processor: usize, batch_id: &BatchId) {
        let per_record_template_ms = if self.members_emitted == 0 {
            0.0
        } else {
            ms(self.template_render) / self.members_emitted as f64
        };
        debug!(
            processor,
            batch_id = %batch_id,
            prefilter_ms = ms(self.prefilter),
            decompress_ms = ms(self.decompress),
            deserialize_ms = ms(self.deserialize),
            time_format_and_range_ms = ms(self.time_format_and_range),
            record_construction_ms = ms(self.record_construction),
            csv_render_ms = ms(self.csv_render),
            template_render_ms = ms(self.template_render),
            per_record_template_ms,
            sort_ms = ms(self.sort),
            file_write_ms = ms(self.file_write),
            groups_read = self.groups_read,
            groups_skipped = self.groups_skipped,
            members_emitted = self.members_emitted,
            members_rejected = self.members_rejected,
            dn_failures = self.dn_failures,
            render_failures = self.render_failures,
            channels = self.per_channel.len(),
            "batch statistics"
        );
    }
}

/// How a batch ended.
#[derive(Debug)]
pub enum BatchOutcome {
    /// Output registered with the coordinator.
    Registered { records: usize },
    /// Nothing survived filtering; the batch was deregistered.
    Empty,
    /// The batch was abandoned; the error has been logged.
    Failed(FetchError),
}

/// Rendered output of one batch handed to an [`OutputStrategy`].
#[derive(Debug)]
pub struct FinishedBatch {
    pub batch_id: BatchId,
    pub processor_number: usize,
    pub records: Vec<String>,
    pub order_keys: Vec<OrderKey>,
}

/// What happens to a batch's rendered records once processing ends.
pub trait OutputStrategy: Send {
    fn name(&self) -> &'static str;

    /// Whether the processor must build an [`OrderKey`] per record.
    fn collects_order_keys(&self) -> bool;

    fn finalize(&mut self, batch: FinishedBatch, stats: &mut BatchStats) -> Result<ProcessedBatchInfo>;
}

/// One unit of work submitted to the executor.
pub trait BatchProcessor: Send {
    fn batch_id(&self) -> &BatchId;

    fn processor_number(&self) -> usize;

    fn strategy_name(&self) -> &'static str;

    /// Process the bound batch. Never panics on bad input; every failure is
    /// logged and reported as [`BatchOutcome::Failed`].
    fn process_batch(&mut self) -> BatchOutcome;

    /// Time and log one full run. This is what worker threads call.
    fn run(mut self: Box<Self>) {
        let started = Instant::now();
        let outcome = self.process_batch();
        let elapsed_ms = ms(started.elapsed());
        match outcome {
            BatchOutcome::Registered { records } => info!(
                processor = self.processor_number(),
                batch_id = %self.batch_id(),
                strategy = self.strategy_name(),
                records,
                elapsed_ms,
                "batch finished"
            ),
            BatchOutcome::Empty => debug!(
                processor = self.processor_number(),
                batch_id = %self.batch_id(),
                elapsed_ms,
                "batch produced no records"
            ),
            BatchOutcome::Failed(_) => debug!(
                processor = self.processor_number(),
                batch_id = %self.batch_id(),
                elapsed_ms,
                "batch failed"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_summary_json() {
        let mut stats = BatchStats {
            members_emitted: 3,
            ..BatchStats::default()
        };
        stats.per_channel.insert("A-0001".to_string(), 3);
        let json = stats.to_json();
        assert_eq!(json["members_emitted"], 3);
        assert_eq!(json["per_channel"]["A-0001"], 3);
    }
}
