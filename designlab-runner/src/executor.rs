//! Executor seam for the bootstrap replicate loop.
//!
//! Bootstrap replicates are pure functions of (original table, resample
//! indices) with no shared mutable state, so they can run on worker threads
//! without synchronization. The engine takes whichever executor the caller
//! injects; the default is synchronous in-process.

use rayon::prelude::*;

/// Map a task over `n` independent units of work, returning results in
/// task-index order regardless of completion order.
pub trait Executor {
    fn map<T, F>(&self, n: usize, task: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send;
}

/// Synchronous in-process executor (default).
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialExecutor;

impl Executor for SequentialExecutor {
    fn map<T, F>(&self, n: usize, task: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        (0..n).map(task).collect()
    }
}

/// Rayon-backed parallel executor.
#[derive(Debug, Clone, Copy, Default)]
pub struct RayonExecutor;

impl Executor for RayonExecutor {
    fn map<T, F>(&self, n: usize, task: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        (0..n).into_par_iter().map(task).collect()
    }
}
