mod common;

use common::with_running;
use weave::{Generator, GeneratorState, Scheduler, Task};

fn fibonacci() -> Generator<u64> {
    Generator::new(|co| async move {
        let (mut a, mut b) = (0u64, 1u64);
        loop {
            co.yield_(a).await;
            (a, b) = (b, a + b);
        }
    })
}

#[test]
fn test_generator_produces_k_values() {
    let k = 7;
    let mut generator = Generator::new(move |co| async move {
        for i in 0..k {
            co.yield_(i).await;
        }
    });

    let mut produced = Vec::new();
    while let GeneratorState::Yielded(value) = generator.resume() {
        produced.push(value);
    }

    assert_eq!(produced, (0..k).collect::<Vec<_>>());
    assert!(generator.is_done(), "generator should report end after K values");
}

#[test]
fn test_infinite_generator_is_lazy() {
    let first: Vec<u64> = fibonacci().take(10).collect();

    assert_eq!(first, vec![0, 1, 1, 2, 3, 5, 8, 13, 21, 34]);
}

#[test]
fn test_generator_inside_task() {
    let scheduler = Scheduler::builder().worker_threads(2).build().unwrap();
    let task = Task::new(async { fibonacci().skip(1).take(5).sum::<u64>() });

    let result = with_running(&scheduler, || {
        scheduler.schedule(&task);
        task.wait()
    });

    assert_eq!(result, Ok(1 + 1 + 2 + 3 + 5));
}
