//! Admission control: the producer blocks at the bound and permits never leak.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use agf_core::{BoundedExecutor, FetchError};

#[test]
fn producer_blocks_when_bound_reached() {
    const BOUND: usize = 3;
    let executor = Arc::new(BoundedExecutor::new(BOUND, BOUND).unwrap());
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let release_rx = Arc::new(std::sync::Mutex::new(release_rx));
    let started = Arc::new(AtomicUsize::new(0));

    for _ in 0..BOUND {
        let rx = Arc::clone(&release_rx);
        let started = Arc::clone(&started);
        executor
            .submit_task(move || {
                started.fetch_add(1, Ordering::SeqCst);
                let _ = rx.lock().unwrap().recv();
            })
            .unwrap();
    }
    assert_eq!(executor.available_permits(), 0);

    let submitted = Arc::new(AtomicUsize::new(0));
    let producer = {
        let executor = Arc::clone(&executor);
        let submitted = Arc::clone(&submitted);
        thread::spawn(move || {
            executor.submit_task(|| {}).unwrap();
            submitted.fetch_add(1, Ordering::SeqCst);
        })
    };

    thread::sleep(Duration::from_millis(100));
    assert_eq!(submitted.load(Ordering::SeqCst), 0, "N+1th submission must block");

    release_tx.send(()).unwrap();
    producer.join().unwrap();
    assert_eq!(submitted.load(Ordering::SeqCst), 1);

    for _ in 1..BOUND {
        release_tx.send(()).unwrap();
    }
    executor.shutdown();
    assert_eq!(started.load(Ordering::SeqCst), BOUND);
    assert_eq!(executor.available_permits(), BOUND);
}

#[test]
fn no_permit_leak_across_many_cycles() {
    let executor = BoundedExecutor::new(4, 2).unwrap();
    let completed = Arc::new(AtomicUsize::new(0));
    for i in 0..1000 {
        let completed = Arc::clone(&completed);
        executor
            .submit_task(move || {
                completed.fetch_add(1, Ordering::SeqCst);
                if i % 97 == 0 {
                    panic!("task {} fails", i);
                }
            })
            .unwrap();
    }
    executor.shutdown();
    assert_eq!(completed.load(Ordering::SeqCst), 1000);
    assert_eq!(executor.available_permits(), executor.bound());
}

#[test]
fn submission_after_shutdown_releases_permit() {
    let executor = BoundedExecutor::new(1, 2).unwrap();
    executor.shutdown();

    let err = executor.submit_task(|| {}).unwrap_err();
    assert!(matches!(err, FetchError::AdmissionInterrupted));
    assert_eq!(executor.available_permits(), 2);
}
