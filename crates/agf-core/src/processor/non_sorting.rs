use crate::coordinator::ProcessedBatchInfo;
use crate::error::Result;

use super::{AggregateBatchProcessor, BatchStats, FinishedBatch, OutputStrategy};

/// Hands rendered records to the coordinator in processing order.
#[derive(Debug, Default, Clone, Copy)]
pub struct NonSortingOutput;

impl OutputStrategy for NonSortingOutput {
    fn name(&self) -> &'static str {
        "non-sorting"
    }

    fn collects_order_keys(&self) -> bool {
        false
    }

    fn finalize(&mut self, batch: FinishedBatch, _stats: &mut BatchStats) -> Result<ProcessedBatchInfo> {
        Ok(ProcessedBatchInfo::InMemory(batch.records))
    }
}

pub type NonSortingBatchProcessor = AggregateBatchProcessor<NonSortingOutput>;
