//! Aggregate fetch batch engine.
//!
//! This crate turns batches of compressed channel sample aggregates into
//! rendered output:
//! - Bounded admission of batch work onto a fixed worker pool
//! - Per-batch processors with filtering, record construction and rendering
//! - In-memory and sorted-file output strategies
//! - A coordinator that releases finished batches in order
//! - The "changes only" post-filter over the merged stream

pub mod changes_only;
pub mod codec;
pub mod coordinator;
pub mod error;
pub mod executor;
pub mod format;
pub mod handler;
pub mod logging;
pub mod processor;
pub mod record;
pub mod solar;

pub use changes_only::{ChangesOnlyFilter, StreamFilter};
pub use coordinator::{BatchCoordinator, InMemoryCoordinator, ProcessedBatchInfo};
pub use error::{FetchError, Result};
pub use executor::BoundedExecutor;
pub use handler::{AggregateBatchProcessorFactory, RecordBatchHandler};
pub use logging::init_logging;
pub use processor::{
    AggregateBatchProcessor, BatchContext, BatchOutcome, BatchProcessor, BatchStats,
    FileBasedSortingProcessor, NonSortingBatchProcessor, OrderKey, OutputStrategy,
};
pub use record::{ChannelSampleRecord, FieldValue};
pub use solar::{NoSolarTime, SolarTimeProvider};
