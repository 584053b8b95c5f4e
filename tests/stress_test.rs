use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use threadwell::{Priority, ThreadPool};

#[test]
fn test_many_concurrent_submitters() {
    let pool = Arc::new(ThreadPool::with_threads(4).unwrap());
    let counter = Arc::new(AtomicUsize::new(0));

    let submitters: Vec<_> = (0..8)
        .map(|_| {
            let pool = pool.clone();
            let counter = counter.clone();
            thread::spawn(move || {
                for _ in 0..1000 {
                    let counter = counter.clone();
                    pool.detach_task(move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                    });
                }
            })
        })
        .collect();

    for submitter in submitters {
        submitter.join().unwrap();
    }

    pool.wait().unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 8000);
}

#[test]
fn test_pause_unpause_churn() {
    let pool = ThreadPool::with_threads(3).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    for round in 0..20 {
        if round % 2 == 0 {
            pool.pause();
        }
        for _ in 0..50 {
            let counter = counter.clone();
            pool.detach_task(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.unpause();
    }

    pool.wait().unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 20 * 50);
}

#[test]
fn test_repeated_resets_lose_no_work() {
    let mut pool = ThreadPool::with_threads(4).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    for round in 0..5 {
        for _ in 0..100 {
            let counter = counter.clone();
            pool.detach_task(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.reset(round % 4 + 1).unwrap();
        assert_eq!(pool.thread_count(), round % 4 + 1);
    }

    pool.wait().unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 500);
}

#[test]
fn test_large_future_batch() {
    let pool = ThreadPool::with_threads(8).unwrap();

    let group = pool.submit_sequence(0, 2000, |i| i);
    let total: usize = group.get_all().unwrap().into_iter().sum();
    assert_eq!(total, (0..2000).sum());
}

#[test]
fn test_mixed_priorities_under_load() {
    let pool = ThreadPool::with_threads(4).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    for i in 0..3000 {
        let counter = counter.clone();
        let priority = Priority::new((i % 200 - 100) as i16);
        pool.detach_task_with_priority(
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            },
            priority,
        );
    }

    pool.wait().unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 3000);
}

#[test]
fn test_nested_submission_from_workers() {
    // Task bodies may call back into the pool; the lock is not held while
    // tasks execute.
    let pool = Arc::new(ThreadPool::with_threads(4).unwrap());
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..100 {
        let pool_inner = pool.clone();
        let counter = counter.clone();
        pool.detach_task(move || {
            let counter = counter.clone();
            pool_inner.detach_task(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        });
    }

    pool.wait().unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 100);
}

#[test]
fn test_heavy_block_decomposition() {
    let pool = ThreadPool::with_threads(8).unwrap();

    let group = pool.submit_blocks(
        0,
        1_000_000,
        |start, end| (start..end).map(|i| i as u64).sum::<u64>(),
        0,
    );
    let total: u64 = group.get_all().unwrap().into_iter().sum();
    assert_eq!(total, 1_000_000u64 * (1_000_000 - 1) / 2);
}
