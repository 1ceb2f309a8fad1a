use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::Result;

/// Fixed-size pool shared by every stage of a run. One thread runs entries in order.
pub fn worker_pool(threads: usize) -> Result<ThreadPool> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .thread_name(|i| format!("photostash-worker-{}", i))
        .build()?;
    Ok(pool)
}
