//! Thread-local record of which pool, if any, owns the current thread.
//!
//! Each worker registers its owning pool and its index for the duration of
//! its run loop and clears the entry on exit. Threads not owned by a pool
//! (the main thread, independently spawned threads) have no entry. The
//! wait-deadlock guard is built on this, and the probes are public for
//! caller introspection.

use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier of a pool instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolId(u64);

impl PoolId {
    pub(crate) fn next() -> Self {
        static POOL_ID_COUNTER: AtomicU64 = AtomicU64::new(1);
        PoolId(POOL_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

thread_local! {
    static CURRENT: Cell<Option<(PoolId, usize)>> = const { Cell::new(None) };
}

/// Mark the current thread as worker `index` of pool `pool`.
pub(crate) fn enter(pool: PoolId, index: usize) {
    CURRENT.with(|current| current.set(Some((pool, index))));
}

/// Clear the current thread's registry entry.
pub(crate) fn exit() {
    CURRENT.with(|current| current.set(None));
}

/// The id of the pool that owns the current thread, if any.
pub fn current_pool_id() -> Option<PoolId> {
    CURRENT.with(|current| current.get().map(|(pool, _)| pool))
}

/// The worker index of the current thread within its owning pool, if any.
pub fn current_thread_index() -> Option<usize> {
    CURRENT.with(|current| current.get().map(|(_, index)| index))
}
