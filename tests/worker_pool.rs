use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use weave::{Overflow, PoolConfig, PoolError, QueueOrder, WorkerPool};

fn pool(threads: usize, order: QueueOrder) -> WorkerPool {
    WorkerPool::new(PoolConfig {
        threads,
        order,
        ..PoolConfig::default()
    })
    .unwrap()
}

/// Occupies the single worker until the returned sender fires.
fn block_worker(pool: &WorkerPool) -> mpsc::Sender<()> {
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let (started_tx, started_rx) = mpsc::channel::<()>();

    pool.submit(move || {
        started_tx.send(()).unwrap();
        let _ = release_rx.recv();
    })
    .unwrap();

    started_rx.recv().unwrap();
    release_tx
}

#[test]
fn test_items_submitted_before_stop_all_run() {
    let pool = pool(4, QueueOrder::Fifo);
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..500 {
        let counter = counter.clone();
        pool.submit(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    }

    pool.shutdown();

    assert_eq!(
        counter.load(Ordering::SeqCst),
        500,
        "queued items should drain before workers exit"
    );
}

#[test]
fn test_fifo_order_with_single_worker() {
    let pool = pool(1, QueueOrder::Fifo);
    let order = Arc::new(Mutex::new(Vec::new()));

    let release = block_worker(&pool);
    for n in 1..=3 {
        let order = order.clone();
        pool.submit(move || order.lock().unwrap().push(n)).unwrap();
    }
    release.send(()).unwrap();
    pool.shutdown();

    assert_eq!(*order.lock().unwrap(), vec![1, 2, 3]);
}

#[test]
fn test_lifo_order_with_single_worker() {
    let pool = pool(1, QueueOrder::Lifo);
    let order = Arc::new(Mutex::new(Vec::new()));

    let release = block_worker(&pool);
    for n in 1..=3 {
        let order = order.clone();
        pool.submit(move || order.lock().unwrap().push(n)).unwrap();
    }
    release.send(()).unwrap();
    pool.shutdown();

    assert_eq!(
        *order.lock().unwrap(),
        vec![3, 2, 1],
        "LIFO should run the newest item first"
    );
}

#[test]
fn test_bounded_queue_rejects_when_full() {
    let pool = WorkerPool::new(PoolConfig {
        threads: 1,
        capacity: Some(1),
        overflow: Overflow::Reject,
        ..PoolConfig::default()
    })
    .unwrap();

    let release = block_worker(&pool);

    assert_eq!(pool.submit(|| {}), Ok(()));
    assert_eq!(pool.pending(), 1);
    assert_eq!(pool.submit(|| {}), Err(PoolError::Full));

    release.send(()).unwrap();
}

#[test]
fn test_bounded_queue_blocks_until_space() {
    let pool = Arc::new(
        WorkerPool::new(PoolConfig {
            threads: 1,
            capacity: Some(1),
            overflow: Overflow::Block,
            ..PoolConfig::default()
        })
        .unwrap(),
    );

    let release = block_worker(&pool);
    pool.submit(|| {}).unwrap();

    let submitter = {
        let pool = pool.clone();
        thread::spawn(move || pool.submit(|| {}))
    };

    thread::sleep(Duration::from_millis(50));
    assert!(!submitter.is_finished(), "submit should wait for space");

    release.send(()).unwrap();
    assert_eq!(submitter.join().unwrap(), Ok(()));
}

#[test]
fn test_submit_after_shutdown_is_refused() {
    let pool = pool(2, QueueOrder::Fifo);
    pool.shutdown();

    assert_eq!(pool.submit(|| {}), Err(PoolError::ShutDown));
    pool.shutdown();
}

#[test]
fn test_panicking_job_keeps_worker_alive() {
    let pool = pool(1, QueueOrder::Fifo);
    let counter = Arc::new(AtomicUsize::new(0));

    pool.submit(|| panic!("job failure")).unwrap();
    {
        let counter = counter.clone();
        pool.submit(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    }
    pool.shutdown();

    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_workers_are_named() {
    let pool = WorkerPool::new(PoolConfig {
        threads: 2,
        thread_name: "crew".to_string(),
        ..PoolConfig::default()
    })
    .unwrap();
    let (tx, rx) = mpsc::channel();

    pool.submit(move || {
        tx.send(thread::current().name().map(str::to_owned)).unwrap();
    })
    .unwrap();

    let name = rx.recv().unwrap().unwrap();
    assert!(name.starts_with("crew-"), "unexpected worker name {}", name);
    assert_eq!(pool.threads(), 2);
}
