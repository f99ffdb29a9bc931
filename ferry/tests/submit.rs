use ferry::task::{Deferred, TaskState};
use ferry::{Error, TaskError, WorkerBuilder};

use std::collections::HashSet;
use std::convert::Infallible;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

#[test]
fn test_submit_returns_value() {
    let scheduler = ferry::start_worker().unwrap();

    let handle = scheduler
        .submit(async { Ok::<_, Infallible>(21 * 2) })
        .unwrap();

    assert_eq!(handle.wait(), Ok(42));
    scheduler.stop();
}

#[test]
fn test_submit_right_after_start() {
    let handle = WorkerBuilder::new()
        .name("eager")
        .start()
        .unwrap()
        .submit(async { Ok::<_, Infallible>(thread::current().name().map(str::to_owned)) })
        .unwrap();

    assert_eq!(handle.wait(), Ok(Some("eager".to_owned())));
}

#[test]
fn test_outcome_is_delivered_once() {
    let scheduler = ferry::start_worker().unwrap();

    let mut handle = scheduler
        .submit(async { Ok::<_, Infallible>("done") })
        .unwrap();

    assert_eq!(handle.wait_timeout(Duration::from_secs(5)), Ok("done"));
    assert_eq!(handle.state(), TaskState::Completed);
    assert_eq!(handle.try_take(), Some(Err(TaskError::Consumed)));
    assert_eq!(handle.wait(), Err(TaskError::Consumed));

    scheduler.stop();
}

#[test]
fn test_concurrent_submitters() {
    let scheduler = ferry::start_worker().unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    let submitters: Vec<_> = (0..10)
        .map(|_| {
            let scheduler = scheduler.clone();
            let counter = counter.clone();

            thread::spawn(move || {
                (0..100)
                    .map(|_| {
                        let counter = counter.clone();
                        scheduler
                            .submit(async move {
                                let previous = counter.fetch_add(1, Ordering::SeqCst);
                                Ok::<_, Infallible>((previous, thread::current().id()))
                            })
                            .unwrap()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let handles: Vec<_> = submitters
        .into_iter()
        .flat_map(|submitter| submitter.join().unwrap())
        .collect();

    let ids: HashSet<_> = handles.iter().map(|handle| handle.id()).collect();
    assert_eq!(ids.len(), 1000);

    let mut seen = HashSet::new();
    let mut threads = HashSet::new();

    for handle in handles {
        let (previous, thread) = handle.wait().unwrap();
        seen.insert(previous);
        threads.insert(thread);
    }

    assert_eq!(counter.load(Ordering::SeqCst), 1000);
    assert_eq!(seen, (0..1000).collect::<HashSet<_>>());
    assert_eq!(threads.len(), 1);

    scheduler.stop();
}

#[test]
fn test_failure_is_captured_on_handle() {
    let scheduler = ferry::start_worker().unwrap();

    let handle = scheduler
        .submit(async { Err::<(), _>(io::Error::other("disk full")) })
        .unwrap();

    let err = handle.wait().unwrap_err().into_failure().unwrap();
    assert_eq!(err.kind(), io::ErrorKind::Other);
    assert_eq!(err.to_string(), "disk full");

    // The worker is unaffected.
    let next = scheduler.submit(async { Ok::<_, Infallible>(1) }).unwrap();
    assert_eq!(next.wait(), Ok(1));

    scheduler.stop();
}

#[test]
fn test_panic_is_captured_on_handle() {
    let scheduler = ferry::start_worker().unwrap();

    let handle = scheduler
        .submit(async {
            if true {
                panic!("exploded");
            }
            Ok::<u32, Infallible>(0)
        })
        .unwrap();

    assert_eq!(handle.wait(), Err(TaskError::Panicked("exploded".to_owned())));

    let next = scheduler.submit(async { Ok::<_, Infallible>(2) }).unwrap();
    assert_eq!(next.wait(), Ok(2));

    scheduler.stop();
}

#[test]
fn test_deferred_submits_once() {
    let scheduler = ferry::start_worker().unwrap();
    let job = Deferred::new(async { Ok::<_, Infallible>(7) });

    assert!(!job.is_submitted());
    let handle = scheduler.submit(job.clone()).unwrap();
    assert!(job.is_submitted());

    assert!(matches!(scheduler.submit(job), Err(Error::InvalidState)));
    assert_eq!(handle.wait(), Ok(7));

    scheduler.stop();
}

#[test]
fn test_on_complete_runs_on_worker() {
    let scheduler = WorkerBuilder::new().name("callbacks").start().unwrap();
    let (tx, rx) = mpsc::channel();

    let timer = scheduler.clone();
    let handle = scheduler
        .submit(async move {
            timer.sleep(Duration::from_millis(20)).await;
            Ok::<_, Infallible>(3)
        })
        .unwrap();

    handle.on_complete(move |outcome| {
        let thread = thread::current().name().map(str::to_owned);
        tx.send((outcome, thread)).unwrap();
    });

    let (outcome, thread) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(outcome, Ok(3));
    assert_eq!(thread.as_deref(), Some("callbacks"));

    scheduler.stop();
}

#[test]
fn test_on_complete_after_finish_runs_inline() {
    let scheduler = ferry::start_worker().unwrap();

    let handle = scheduler.submit(async { Ok::<_, Infallible>(4) }).unwrap();
    while !handle.is_finished() {
        thread::sleep(Duration::from_millis(1));
    }

    let caller = thread::current().id();
    let (tx, rx) = mpsc::channel();
    handle.on_complete(move |outcome| {
        tx.send((outcome, thread::current().id())).unwrap();
    });

    assert_eq!(rx.try_recv().unwrap(), (Ok(4), caller));

    scheduler.stop();
}

#[test]
fn test_await_handle_from_another_task() {
    let scheduler = ferry::start_worker().unwrap();

    let timer = scheduler.clone();
    let inner = scheduler
        .submit(async move {
            timer.sleep(Duration::from_millis(10)).await;
            Ok::<_, Infallible>(5)
        })
        .unwrap();

    let outer = scheduler
        .submit(async move {
            let value = inner.await?;
            Ok::<_, TaskError<Infallible>>(value + 1)
        })
        .unwrap();

    assert_eq!(outer.wait(), Ok(6));
    scheduler.stop();
}

#[test]
fn test_await_handle_across_workers() {
    let producer = ferry::start_worker().unwrap();
    let consumer = ferry::start_worker().unwrap();

    let inner = producer.submit(async { Ok::<_, Infallible>("hello") }).unwrap();
    let outer = consumer.submit(async move { inner.await }).unwrap();

    assert_eq!(outer.wait(), Ok("hello"));

    producer.stop();
    consumer.stop();
}

#[test]
fn test_deferred_survives_rejected_submission() {
    let stopped = ferry::start_worker().unwrap();
    stopped.stop();

    let job = Deferred::new(async { Ok::<_, Infallible>(8) });

    assert!(matches!(stopped.submit(job.clone()), Err(Error::WorkerUnavailable)));
    assert!(!job.is_submitted());

    let running = ferry::start_worker().unwrap();
    let handle = running.submit(job.clone()).unwrap();

    assert!(job.is_submitted());
    assert_eq!(handle.wait(), Ok(8));

    running.stop();
}

#[test]
fn test_handle_debug() {
    let scheduler = ferry::start_worker().unwrap();

    let handle = scheduler.submit(async { Ok::<_, Infallible>(()) }).unwrap();
    let id = handle.id();
    let rendered = format!("{handle:?}");

    assert!(rendered.starts_with("ResultHandle"));
    assert!(rendered.contains(&format!("id: {id}")));

    handle.wait().unwrap();
    scheduler.stop();
}
