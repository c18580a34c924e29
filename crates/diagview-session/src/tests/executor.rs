use crate::*;
use std::sync::{Arc, Mutex};

fn recorder() -> (Arc<Mutex<Vec<u32>>>, impl Fn(u32) -> RenderJob) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let make = move |n: u32| -> RenderJob {
        let sink = Arc::clone(&sink);
        Box::new(move || sink.lock().unwrap().push(n))
    };
    (log, make)
}

#[test]
fn manual_executor_runs_jobs_in_any_order() {
    let executor = ManualExecutor::new();
    let (log, job) = recorder();
    for n in 0..4 {
        executor.execute(job(n));
    }
    assert_eq!(executor.len(), 4);

    assert!(executor.run_last());
    assert!(executor.run_at(1));
    assert!(executor.run_next());
    assert_eq!(executor.run_all(), 1);
    assert!(!executor.run_next());
    assert!(executor.is_empty());
    assert_eq!(*log.lock().unwrap(), vec![3, 1, 0, 2]);
}

#[test]
fn manual_executor_clones_share_the_queue() {
    let executor = ManualExecutor::new();
    let handle = executor.clone();
    let (log, job) = recorder();
    executor.execute(job(7));
    assert_eq!(handle.run_all(), 1);
    assert_eq!(*log.lock().unwrap(), vec![7]);
}

#[test]
fn inline_executor_runs_immediately() {
    let (log, job) = recorder();
    InlineExecutor.execute(job(1));
    assert_eq!(*log.lock().unwrap(), vec![1]);
}

#[test]
fn pool_executor_runs_jobs_on_workers() {
    let executor = PoolExecutor::new(2).unwrap();
    let (tx, rx) = std::sync::mpsc::channel();
    for n in 0..3u32 {
        let tx = tx.clone();
        executor.execute(Box::new(move || {
            let name = std::thread::current().name().map(str::to_string);
            tx.send((n, name)).unwrap();
        }));
    }
    let mut seen: Vec<u32> = Vec::new();
    for _ in 0..3 {
        let (n, name) = rx
            .recv_timeout(std::time::Duration::from_secs(10))
            .unwrap();
        assert!(name.unwrap().starts_with("diagview-render-"));
        seen.push(n);
    }
    seen.sort();
    assert_eq!(seen, vec![0, 1, 2]);
}
