use std::convert::Infallible;
use std::thread;

#[test]
fn test_default_worker_is_shared_and_restarted() {
    let first = ferry::default_scheduler().unwrap();
    let second = ferry::default_scheduler().unwrap();

    assert_eq!(first.name(), "ferry-default");
    assert!(first.is_running() && second.is_running());

    let thread_of = || {
        ferry::submit(async { Ok::<_, Infallible>(thread::current().id()) })
            .unwrap()
            .wait()
            .unwrap()
    };

    let before = thread_of();
    assert_eq!(thread_of(), before);

    second.stop();
    assert!(!first.is_running());

    let after = thread_of();
    assert_ne!(after, before);
    assert!(ferry::default_scheduler().unwrap().is_running());
}
