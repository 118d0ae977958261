//! Producer-side entry point: one processor per batch, submitted through the
//! bounded executor.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use agf_common::RecordBatch;
use agf_config::OrderByType;
use tracing::debug;

use crate::error::Result;
use crate::executor::BoundedExecutor;
use crate::processor::{
    AggregateBatchProcessor, BatchContext, BatchProcessor, NonSortingOutput, SortedFileOutput,
};

/// Creates processors for one fetch, numbering them from 1.
#[derive(Debug)]
pub struct AggregateBatchProcessorFactory {
    ctx: BatchContext,
    next_number: AtomicUsize,
}

impl AggregateBatchProcessorFactory {
    pub fn new(ctx: BatchContext) -> Self {
        Self {
            ctx,
            next_number: AtomicUsize::new(1),
        }
    }

    pub fn context(&self) -> &BatchContext {
        &self.ctx
    }

    /// Non-sorting output when no order-by is configured, sorted files
    /// otherwise.
    pub fn create(&self, batch: RecordBatch) -> Box<dyn BatchProcessor> {
        let number = self.next_number.fetch_add(1, Ordering::Relaxed);
        let config = &self.ctx.config;
        match config.order_by {
            OrderByType::None => Box::new(AggregateBatchProcessor::new(
                self.ctx.clone(),
                batch,
                number,
                NonSortingOutput,
            )),
            _ => Box::new(AggregateBatchProcessor::new(
                self.ctx.clone(),
                batch,
                number,
                SortedFileOutput::new(config.output_dir.clone(), config.output_prefix.clone()),
            )),
        }
    }
}

/// Submits each incoming batch to the executor.
pub struct RecordBatchHandler {
    factory: AggregateBatchProcessorFactory,
    executor: Arc<BoundedExecutor>,
}

impl RecordBatchHandler {
    pub fn new(factory: AggregateBatchProcessorFactory, executor: Arc<BoundedExecutor>) -> Self {
        Self { factory, executor }
    }

    /// Build a handler with an executor sized from the context's config.
    pub fn from_context(ctx: BatchContext) -> Result<Self> {
        let threads = ctx.config.threads();
        let bound = ctx.config.bound();
        let executor = Arc::new(BoundedExecutor::new(threads, bound)?);
        Ok(Self::new(AggregateBatchProcessorFactory::new(ctx), executor))
    }

    /// Hand a batch to a worker. Blocks while the executor is at its bound;
    /// admission errors are returned to the caller.
    pub fn handle_batch(&self, batch: RecordBatch) -> Result<()> {
        let records = batch.len();
        let processor = self.factory.create(batch);
        debug!(
            processor = processor.processor_number(),
            batch_id = %processor.batch_id(),
            strategy = processor.strategy_name(),
            records,
            "submitting batch"
        );
        self.executor.submit_task(move || processor.run())
    }

    pub fn executor(&self) -> &Arc<BoundedExecutor> {
        &self.executor
    }

    /// Wait for every submitted batch to finish.
    pub fn shutdown(&self) {
        self.executor.shutdown();
    }
}
