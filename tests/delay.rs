mod common;

use common::with_running;
use std::time::{Duration, Instant};
use weave::{Scheduler, Task, timer};

#[test]
fn test_delay_does_not_finish_early() {
    let scheduler = Scheduler::new().unwrap();
    let duration = Duration::from_millis(50);
    let pause = timer::delay(duration);

    let elapsed = with_running(&scheduler, || {
        let start = Instant::now();
        scheduler.schedule(&pause);
        while !pause.is_finished() {
            std::thread::yield_now();
        }
        start.elapsed()
    });

    assert!(
        elapsed >= duration,
        "delay finished after {:?}, expected at least {:?}",
        elapsed,
        duration
    );
}

#[test]
fn test_zero_delay_is_fast() {
    let scheduler = Scheduler::new().unwrap();
    let pause = Task::delay(Duration::ZERO);

    let elapsed = with_running(&scheduler, || {
        let start = Instant::now();
        scheduler.schedule(&pause);
        pause.wait().unwrap();
        start.elapsed()
    });

    assert!(elapsed < Duration::from_secs(1), "zero delay should be quick");
}

#[test]
fn test_awaiting_delay_inside_task() {
    let scheduler = Scheduler::new().unwrap();
    let task = Task::new(async {
        let start = Instant::now();
        Task::delay(Duration::from_millis(30)).await.unwrap();
        start.elapsed()
    });

    let elapsed = with_running(&scheduler, || {
        scheduler.schedule(&task);
        task.wait().unwrap()
    });

    assert!(elapsed >= Duration::from_millis(30));
}
