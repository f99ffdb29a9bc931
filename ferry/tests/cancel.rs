use ferry::task::{ResultHandle, TaskState};
use ferry::{Scheduler, TaskError};

use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::time::Duration;

/// Occupies the worker until the returned sender is used or dropped.
fn block_worker(scheduler: &Scheduler) -> (mpsc::Sender<()>, ResultHandle<(), Infallible>) {
    let (release, gate) = mpsc::channel::<()>();

    let blocker = scheduler
        .submit(async move {
            let _ = gate.recv();
            Ok(())
        })
        .unwrap();

    (release, blocker)
}

#[test]
fn test_zero_timeout_then_wait() {
    let scheduler = ferry::start_worker().unwrap();
    let (release, blocker) = block_worker(&scheduler);

    let mut handle = scheduler.submit(async { Ok::<_, Infallible>(9) }).unwrap();

    let timed_out = handle.wait_timeout(Duration::ZERO).unwrap_err();
    assert!(timed_out.is_timeout());
    assert!(!timed_out.is_cancelled());
    assert_eq!(handle.state(), TaskState::Pending);

    release.send(()).unwrap();

    assert_eq!(handle.wait(), Ok(9));
    assert_eq!(blocker.wait(), Ok(()));

    scheduler.stop();
}

#[test]
fn test_bounded_wait_times_out_while_running() {
    let scheduler = ferry::start_worker().unwrap();

    let timer = scheduler.clone();
    let mut handle = scheduler
        .submit(async move {
            timer.sleep(Duration::from_millis(100)).await;
            Ok::<_, Infallible>("late")
        })
        .unwrap();

    assert_eq!(
        handle.wait_timeout(Duration::from_millis(10)),
        Err(TaskError::Timeout)
    );
    assert_eq!(handle.wait_timeout(Duration::from_secs(5)), Ok("late"));

    scheduler.stop();
}

#[test]
fn test_cancel_before_start() {
    let scheduler = ferry::start_worker().unwrap();
    let (release, blocker) = block_worker(&scheduler);

    let ran = Arc::new(AtomicBool::new(false));
    let flag = ran.clone();

    let handle = scheduler
        .submit(async move {
            flag.store(true, Ordering::SeqCst);
            Ok::<_, Infallible>(())
        })
        .unwrap();

    assert!(handle.cancel());
    assert_eq!(handle.state(), TaskState::Cancelled);

    release.send(()).unwrap();
    assert_eq!(blocker.wait(), Ok(()));

    // Runs after the cancelled computation has been dequeued.
    let probe = scheduler.submit(async { Ok::<_, Infallible>(()) }).unwrap();
    assert_eq!(probe.wait(), Ok(()));

    let cancelled = handle.wait().unwrap_err();
    assert!(cancelled.is_cancelled());
    assert!(!cancelled.is_timeout());
    assert!(!ran.load(Ordering::SeqCst));

    scheduler.stop();
}

#[test]
fn test_cancel_between_suspension_points() {
    let scheduler = ferry::start_worker().unwrap();

    let first = Arc::new(AtomicBool::new(false));
    let second = Arc::new(AtomicBool::new(false));
    let (started_tx, started_rx) = mpsc::channel();

    let timer = scheduler.clone();
    let (after_first, after_second) = (first.clone(), second.clone());

    let handle = scheduler
        .submit(async move {
            let _ = started_tx.send(());

            timer.sleep(Duration::from_millis(200)).await;
            after_first.store(true, Ordering::SeqCst);

            timer.sleep(Duration::from_millis(200)).await;
            after_second.store(true, Ordering::SeqCst);

            Ok::<_, Infallible>(())
        })
        .unwrap();

    started_rx.recv().unwrap();

    assert!(handle.cancel());
    assert_eq!(handle.wait(), Err(TaskError::Cancelled));

    assert!(!first.load(Ordering::SeqCst));
    assert!(!second.load(Ordering::SeqCst));

    scheduler.stop();
}

#[test]
fn test_cancel_after_completion() {
    let scheduler = ferry::start_worker().unwrap();

    let mut handle = scheduler.submit(async { Ok::<_, Infallible>(1) }).unwrap();
    while !handle.is_finished() {
        std::thread::sleep(Duration::from_millis(1));
    }

    assert!(!handle.cancel());
    assert_eq!(handle.try_take(), Some(Ok(1)));

    scheduler.stop();
}

#[test]
fn test_awaiting_cancelled_handle() {
    let scheduler = ferry::start_worker().unwrap();

    let timer = scheduler.clone();
    let inner = scheduler
        .submit(async move {
            timer.sleep(Duration::from_secs(30)).await;
            Ok::<_, Infallible>(())
        })
        .unwrap();

    assert!(inner.cancel());

    let outer = scheduler.submit(async move { Ok::<_, Infallible>(inner.await) }).unwrap();
    assert_eq!(outer.wait(), Ok(Err(TaskError::Cancelled)));

    scheduler.stop();
}

#[test]
fn test_cancel_without_later_suspension_keeps_outcome() {
    let scheduler = ferry::start_worker().unwrap();

    let (started_tx, started_rx) = mpsc::channel();
    let (release, gate) = mpsc::channel::<()>();

    let mut handle = scheduler
        .submit(async move {
            let _ = started_tx.send(());
            let _ = gate.recv();
            Ok::<_, Infallible>("finished")
        })
        .unwrap();

    started_rx.recv().unwrap();
    assert_eq!(handle.state(), TaskState::Running);

    // Accepted, but the computation never suspends again.
    assert!(handle.cancel());
    release.send(()).unwrap();

    assert_eq!(handle.wait_timeout(Duration::from_secs(5)), Ok("finished"));
    assert_eq!(handle.state(), TaskState::Completed);
    assert!(!handle.cancel());

    scheduler.stop();
}

#[test]
fn test_awaiting_consumed_handle() {
    let scheduler = ferry::start_worker().unwrap();

    let mut inner = scheduler.submit(async { Ok::<_, Infallible>(2) }).unwrap();
    assert_eq!(inner.wait_timeout(Duration::from_secs(5)), Ok(2));

    let outer = scheduler
        .submit(async move { Ok::<_, Infallible>(inner.await) })
        .unwrap();

    assert_eq!(outer.wait(), Ok(Err(TaskError::Consumed)));
    scheduler.stop();
}
