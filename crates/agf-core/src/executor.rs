//! Bounded task admission in front of a fixed pool of blocking workers.
//!
//! The query stream produces batches faster than workers can decode, format
//! and write them. [`BoundedExecutor::submit_task`] blocks the producer once
//! `bound` tasks are admitted but not yet finished, so at most `bound`
//! batches are resident at any time.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{FetchError, Result};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An owned-permit semaphore of `bound` permits gating a tokio runtime whose
/// blocking pool holds `threads` workers.
///
/// `submit_task` and `shutdown` block the calling thread and must not be
/// called from inside an async context.
#[derive(Debug)]
pub struct BoundedExecutor {
    runtime: Mutex<Option<Runtime>>,
    handle: Handle,
    semaphore: Arc<Semaphore>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    threads: usize,
    bound: usize,
}

impl BoundedExecutor {
    pub fn new(threads: usize, bound: usize) -> Result<Self> {
        let threads = threads.max(1);
        let bound = bound.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(threads)
            .thread_name("agf-worker")
            .build()
            .map_err(FetchError::Runtime)?;
        debug!(threads, bound, "bounded executor created");
        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Mutex::new(Some(runtime)),
            semaphore: Arc::new(Semaphore::new(bound)),
            tasks: Mutex::new(Vec::new()),
            threads,
            bound,
        })
    }

    /// Admit `work`, blocking while `bound` tasks are in flight.
    ///
    /// The permit moves into the task and is released when the task ends,
    /// whether it returns or panics. A closed executor returns
    /// [`FetchError::AdmissionInterrupted`] to waiting and later producers.
    pub fn submit_task<F>(&self, work: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let permit = self
            .handle
            .block_on(Arc::clone(&self.semaphore).acquire_owned())
            .map_err(|_| FetchError::AdmissionInterrupted)?;

        let runtime = lock(&self.runtime);
        let Some(runtime) = runtime.as_ref() else {
            return Err(FetchError::SubmissionRejected);
        };
        let task = runtime.spawn_blocking(move || {
            let _permit = permit;
            work();
        });

        let mut tasks = lock(&self.tasks);
        tasks.retain(|task| !task.is_finished());
        tasks.push(task);
        Ok(())
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn bound(&self) -> usize {
        self.bound
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn is_shutdown(&self) -> bool {
        self.semaphore.is_closed()
    }

    /// Close admission, wait for every admitted task, then stop the runtime.
    pub fn shutdown(&self) {
        self.semaphore.close();
        let Some(runtime) = lock(&self.runtime).take() else {
            return;
        };
        let tasks: Vec<_> = lock(&self.tasks).drain(..).collect();
        runtime.block_on(async {
            for task in tasks {
                if let Err(err) = task.await {
                    if err.is_panic() {
                        warn!("task panicked; worker continues");
                    }
                }
            }
        });
        drop(runtime);
        debug!(threads = self.threads, "bounded executor stopped");
    }
}

impl Drop for BoundedExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_shutdown_interrupts_waiting_producer() {
        let executor = Arc::new(BoundedExecutor::new(1, 1).unwrap());
        let (release_tx, release_rx) = mpsc::channel::<()>();
        executor
            .submit_task(move || {
                let _ = release_rx.recv();
            })
            .unwrap();

        let waiter = {
            let executor = Arc::clone(&executor);
            thread::spawn(move || executor.submit_task(|| {}))
        };
        thread::sleep(Duration::from_millis(50));
        executor.semaphore.close();
        let result = waiter.join().unwrap();
        assert!(matches!(result, Err(FetchError::AdmissionInterrupted)));

        release_tx.send(()).unwrap();
        executor.shutdown();
        assert_eq!(executor.available_permits(), 1);
    }

    #[test]
    fn test_panicking_task_releases_permit_and_worker_survives() {
        let executor = BoundedExecutor::new(1, 1).unwrap();
        executor.submit_task(|| panic!("boom")).unwrap();

        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);
        executor
            .submit_task(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        executor.shutdown();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(executor.available_permits(), 1);
    }

    #[test]
    fn test_submit_after_shutdown_is_rejected() {
        let executor = BoundedExecutor::new(1, 1).unwrap();
        executor.shutdown();
        assert!(executor.is_shutdown());
        let err = executor.submit_task(|| {}).unwrap_err();
        assert!(err.is_admission());
        assert_eq!(executor.available_permits(), 1);
    }

    #[test]
    fn test_zero_sizes_are_clamped() {
        let executor = BoundedExecutor::new(0, 0).unwrap();
        assert_eq!(executor.threads(), 1);
        assert_eq!(executor.bound(), 1);
    }
}
