//! Hand-off point between batch processors and the downstream merge.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use agf_common::BatchId;
use serde::Serialize;
use tracing::{debug, warn};

/// What a finished batch produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessedBatchInfo {
    /// Rendered records in processing order.
    InMemory(Vec<String>),
    /// Line-aligned sorted record and index files.
    Sorted {
        record_file: PathBuf,
        index_file: PathBuf,
    },
}

/// Receives batch results. Shared by every worker, so implementations must
/// be thread-safe.
pub trait BatchCoordinator: Send + Sync {
    fn register_batch(&self, batch_id: &BatchId, info: ProcessedBatchInfo);

    /// The batch produced nothing; stop waiting for it.
    fn deregister_batch(&self, batch_id: &BatchId);
}

#[derive(Debug, Default)]
struct CoordinatorState {
    sequence: u64,
    pending: VecDeque<BatchId>,
    ready: HashMap<BatchId, ProcessedBatchInfo>,
}

impl CoordinatorState {
    fn front_ready(&self) -> bool {
        self.pending
            .front()
            .is_some_and(|id| self.ready.contains_key(id))
    }

    fn pop_front(&mut self) -> Option<(BatchId, ProcessedBatchInfo)> {
        if !self.front_ready() {
            return None;
        }
        let id = self.pending.pop_front()?;
        let info = self.ready.remove(&id)?;
        Some((id, info))
    }
}

/// Coordinator that keeps results in memory and releases them in batch-id
/// generation order.
#[derive(Debug, Default)]
pub struct InMemoryCoordinator {
    state: Mutex<CoordinatorState>,
    changed: Condvar,
}

impl InMemoryCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate the id for the next batch and start tracking it.
    pub fn generate_batch_id(&self) -> BatchId {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let mut state = self.state();
        state.sequence += 1;
        let id = BatchId::from_sequence(state.sequence, nanos);
        state.pending.push_back(id.clone());
        id
    }

    /// True when the oldest outstanding batch has registered its result.
    pub fn next_batch_ready(&self) -> bool {
        self.state().front_ready()
    }

    pub fn take_next_batch(&self) -> Option<(BatchId, ProcessedBatchInfo)> {
        self.state().pop_front()
    }

    /// Block until the oldest outstanding batch is ready, nothing is
    /// outstanding, or `timeout` elapses.
    pub fn wait_next_batch(&self, timeout: Duration) -> Option<(BatchId, ProcessedBatchInfo)> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state();
        loop {
            if let Some(next) = state.pop_front() {
                return Some(next);
            }
            if state.pending.is_empty() {
                return None;
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (guard, _) = self
                .changed
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
    }

    pub fn pending_batch_ids(&self) -> Vec<BatchId> {
        self.state().pending.iter().cloned().collect()
    }

    pub fn cached_batch_count(&self) -> usize {
        self.state().ready.len()
    }
}

impl BatchCoordinator for InMemoryCoordinator {
    fn register_batch(&self, batch_id: &BatchId, info: ProcessedBatchInfo) {
        let mut state = self.state();
        if !state.pending.contains(batch_id) {
            warn!(batch_id = %batch_id, "registering batch id that was not generated here");
            state.pending.push_back(batch_id.clone());
        }
        state.ready.insert(batch_id.clone(), info);
        drop(state);
        debug!(batch_id = %batch_id, "batch registered");
        self.changed.notify_all();
    }

    fn deregister_batch(&self, batch_id: &BatchId) {
        let mut state = self.state();
        state.pending.retain(|id| id != batch_id);
        state.ready.remove(batch_id);
        drop(state);
        debug!(batch_id = %batch_id, "batch deregistered");
        self.changed.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_ids_are_sequenced() {
        let coordinator = InMemoryCoordinator::new();
        let a = coordinator.generate_batch_id();
        let b = coordinator.generate_batch_id();
        assert!(a.as_str().starts_with("batch_1_"));
        assert!(b.as_str().starts_with("batch_2_"));
        assert_eq!(coordinator.pending_batch_ids(), vec![a, b]);
    }

    #[test]
    fn test_batches_released_in_generation_order() {
        let coordinator = InMemoryCoordinator::new();
        let a = coordinator.generate_batch_id();
        let b = coordinator.generate_batch_id();

        coordinator.register_batch(&b, ProcessedBatchInfo::InMemory(vec!["b".into()]));
        assert!(!coordinator.next_batch_ready());
        assert!(coordinator.take_next_batch().is_none());
        assert_eq!(coordinator.cached_batch_count(), 1);

        coordinator.register_batch(&a, ProcessedBatchInfo::InMemory(vec!["a".into()]));
        assert_eq!(coordinator.take_next_batch().unwrap().0, a);
        assert_eq!(coordinator.take_next_batch().unwrap().0, b);
        assert!(coordinator.pending_batch_ids().is_empty());
    }

    #[test]
    fn test_deregister_unblocks_successors() {
        let coordinator = InMemoryCoordinator::new();
        let a = coordinator.generate_batch_id();
        let b = coordinator.generate_batch_id();
        coordinator.register_batch(&b, ProcessedBatchInfo::InMemory(Vec::new()));
        coordinator.deregister_batch(&a);
        assert!(coordinator.next_batch_ready());
        assert_eq!(coordinator.take_next_batch().unwrap().0, b);
    }

    #[test]
    fn test_wait_wakes_on_register() {
        let coordinator = Arc::new(InMemoryCoordinator::new());
        let id = coordinator.generate_batch_id();
        let producer = {
            let coordinator = Arc::clone(&coordinator);
            let id = id.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                coordinator.register_batch(&id, ProcessedBatchInfo::InMemory(vec!["x".into()]));
            })
        };
        let got = coordinator.wait_next_batch(Duration::from_secs(5));
        producer.join().unwrap();
        assert_eq!(got.map(|(id, _)| id), Some(id));
    }

    #[test]
    fn test_wait_returns_none_when_nothing_pending() {
        let coordinator = InMemoryCoordinator::new();
        assert!(coordinator.wait_next_batch(Duration::from_millis(10)).is_none());
    }
}
