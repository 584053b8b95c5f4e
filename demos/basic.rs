//! Submitting tasks and collecting results.

use threadwell::ThreadPool;

fn main() -> threadwell::Result<()> {
    let pool = ThreadPool::new()?;
    println!("pool started with {} workers", pool.thread_count());

    let future = pool.submit_task(|| (1..=100).sum::<u64>());
    println!("sum 1..=100 = {}", future.get()?);

    // Parallel sum of squares over [0, 1_000_000) in thread_count blocks.
    let group = pool.submit_blocks(
        0,
        1_000_000,
        |start, end| (start..end).map(|i| (i as u64).pow(2)).sum::<u64>(),
        0,
    );
    let total: u64 = group.get_all()?.into_iter().sum();
    println!("sum of squares = {total}");

    Ok(())
}
