//! Pausing workers while the queue keeps filling.

use std::time::Duration;
use threadwell::{Priority, ThreadPool};

fn main() -> threadwell::Result<()> {
    let pool = ThreadPool::with_threads(2)?;
    pool.wait()?;
    pool.pause();

    for i in 0..6 {
        pool.detach_task(move || println!("background task {i}"));
    }
    pool.detach_task_with_priority(|| println!("urgent task runs first"), Priority::HIGHEST);

    println!(
        "paused: {} tasks queued, {} running",
        pool.tasks_queued(),
        pool.tasks_running()
    );

    std::thread::sleep(Duration::from_millis(200));
    println!("unpausing");
    pool.unpause();
    pool.wait()?;
    println!("queue drained");

    Ok(())
}
