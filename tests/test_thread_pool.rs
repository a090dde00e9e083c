use taskpool::{construct_thread_name, ThreadPool, THREAD_POOL_DEFAULT_NAME};

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering::SeqCst;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn type_bounds() {
    fn is_send<T: Send>() {}
    fn is_sync<T: Sync>() {}

    is_send::<ThreadPool>();
    is_sync::<ThreadPool>();
}

#[test]
fn thread_names() {
    assert_eq!(construct_thread_name("name", 9, 9), "name9");
    assert_eq!(construct_thread_name("name", 9, 10), "name09");
    assert_eq!(construct_thread_name("name", 10, 11), "name10");
}

#[test]
fn construct() {
    let max_concurrency = num_cpus::get();
    let pool = ThreadPool::new(max_concurrency);
    assert_eq!(pool.num_threads(), max_concurrency);
    assert_eq!(pool.queue_size(), 0);
}

#[test]
fn construct_empty() {
    let pool = ThreadPool::new(0);
    assert_eq!(pool.num_threads(), 0);
    let _ = pool
        .enqueue(|| thread::sleep(Duration::from_millis(100)))
        .unwrap();
    assert_eq!(pool.queue_size(), 1);
}

#[test]
fn construct_with_name() {
    let pool = ThreadPool::new(1);
    assert_eq!(pool.name(), THREAD_POOL_DEFAULT_NAME);
    let named = ThreadPool::named(1, "name");
    assert_eq!(named.name(), "name");
}

#[test]
fn debug() {
    format!("{:?}", ThreadPool::new(1));
}

#[test]
fn execute_single() {
    let pool = ThreadPool::new(1);
    assert_eq!(pool.num_threads(), 1);
    let _ = pool
        .enqueue(|| thread::sleep(Duration::from_millis(100)))
        .unwrap();
    thread::sleep(Duration::from_millis(200));
    assert_eq!(pool.queue_size(), 0);
}

#[test]
fn task_panic_reaches_the_handle() {
    let pool = ThreadPool::new(1);
    let handle = pool.enqueue(|| panic!("pooled task failed")).unwrap();
    let error = handle.join().unwrap_err();
    assert!(error.to_string().contains("pooled task failed"));
}

#[test]
fn task_panic_does_not_kill_the_worker() {
    let pool = ThreadPool::new(1);
    let _ = pool.enqueue(|| panic!("first task failed")).unwrap();
    let handle = pool.enqueue(|| 2).unwrap();
    assert_eq!(handle.join().unwrap(), 2);
    assert_eq!(pool.num_threads(), 1);
}

#[test]
fn destroy_before_completion() {
    let handle;
    {
        let pool = ThreadPool::new(1);
        handle = pool
            .enqueue(|| thread::sleep(Duration::from_millis(100)))
            .unwrap();
    }
    // Dropping the pool drains the queue, so the task did run.
    assert!(handle.join().is_ok());
}

#[test]
fn drop_drains_queued_tasks() {
    let counter = Arc::new(AtomicUsize::new(0));
    {
        let pool = ThreadPool::new(2);
        for _ in 0..20 {
            let counter = Arc::clone(&counter);
            let _ = pool
                .enqueue(move || {
                    counter.fetch_add(1, SeqCst);
                })
                .unwrap();
        }
    }
    assert_eq!(counter.load(SeqCst), 20);
}

#[test]
fn execute_multiple_sequentially() {
    let pool = ThreadPool::new(1);
    assert_eq!(pool.queue_size(), 0);
    for _ in 0..2 {
        let _ = pool
            .enqueue(|| thread::sleep(Duration::from_millis(100)))
            .unwrap();
    }
    assert!(pool.queue_size() > 0);
    thread::sleep(Duration::from_millis(400));
    assert_eq!(pool.queue_size(), 0);
}

#[test]
fn execute_multiple_concurrently() {
    let pool = ThreadPool::new(2);
    let counter = Arc::new(AtomicUsize::new(0));
    for _ in 0..4 {
        let counter = Arc::clone(&counter);
        let _ = pool
            .enqueue(move || {
                thread::sleep(Duration::from_millis(100));
                counter.fetch_add(1, SeqCst);
            })
            .unwrap();
    }
    thread::sleep(Duration::from_millis(400));
    assert_eq!(counter.load(SeqCst), 4);
    assert_eq!(pool.queue_size(), 0);
}

// Spec scenario: the handles of 2H squaring tasks over a shared counter
// sum to the sum of the first 2H squares.
#[test]
fn results_on_atomic_counter() {
    let max_concurrency = num_cpus::get();
    let pool = ThreadPool::new(max_concurrency);
    let counter = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..2 * max_concurrency)
        .map(|_| {
            let counter = Arc::clone(&counter);
            pool.enqueue(move || {
                let r = counter.fetch_add(1, SeqCst) + 1;
                r * r
            })
            .unwrap()
        })
        .collect();

    let actual: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    let expected: usize = (1..=2 * max_concurrency).map(|i| i * i).sum();
    assert_eq!(counter.load(SeqCst), 2 * max_concurrency);
    assert_eq!(actual, expected);
}

#[test]
fn set_num_threads_up_statically() {
    let pool = ThreadPool::new(0);
    pool.set_num_threads(1);
    assert_eq!(pool.num_threads(), 1);
    pool.set_num_threads(3);
    assert_eq!(pool.num_threads(), 3);
}

#[test]
fn set_num_threads_same_statically() {
    let pool = ThreadPool::new(3);
    pool.set_num_threads(3);
    assert_eq!(pool.num_threads(), 3);
}

#[test]
fn set_num_threads_down_statically() {
    let pool = ThreadPool::new(3);
    pool.set_num_threads(1);
    assert_eq!(pool.num_threads(), 1);
}

#[test]
fn set_num_threads_up_dynamically() {
    let pool = ThreadPool::new(0);
    let _ = pool
        .enqueue(|| thread::sleep(Duration::from_millis(100)))
        .unwrap();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(pool.queue_size(), 1);

    pool.set_num_threads(1);
    assert_eq!(pool.num_threads(), 1);
    thread::sleep(Duration::from_millis(200));
    assert_eq!(pool.queue_size(), 0);

    let _ = pool
        .enqueue(|| thread::sleep(Duration::from_millis(100)))
        .unwrap();
    let _ = pool
        .enqueue(|| thread::sleep(Duration::from_millis(100)))
        .unwrap();
    pool.set_num_threads(3);
    assert_eq!(pool.num_threads(), 3);
}

// Spec scenario: shrinking from three to two workers with five tasks in
// flight blocks until the excess worker stops, then the remaining two
// drain the queue.
#[test]
fn set_num_threads_down_dynamically() {
    let pool = ThreadPool::new(3);
    for _ in 0..5 {
        let _ = pool
            .enqueue(|| thread::sleep(Duration::from_millis(100)))
            .unwrap();
    }
    pool.set_num_threads(2);
    assert_eq!(pool.num_threads(), 2);
    thread::sleep(Duration::from_millis(200));
    assert_eq!(pool.queue_size(), 0);
}

#[test]
fn set_num_threads_to_zero_dynamically() {
    let pool = ThreadPool::new(3);
    for _ in 0..5 {
        let _ = pool
            .enqueue(|| thread::sleep(Duration::from_millis(100)))
            .unwrap();
    }
    pool.set_num_threads(0);
    assert_eq!(pool.num_threads(), 0);
    thread::sleep(Duration::from_millis(100));
    // Nobody is left to serve the remaining tasks.
    assert!(pool.queue_size() > 0);
}
