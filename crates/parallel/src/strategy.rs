//! Parallel processing strategies

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use std::ops::Range;

use crate::cancel::CancelToken;

/// Processing mode for grid runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    /// Single-threaded processing
    Sequential,
    /// Parallel processing using all available cores
    #[default]
    Parallel,
    /// Parallel with specified number of threads
    ParallelWith(usize),
}

impl ProcessingMode {
    /// Worker threads a run in this mode will use
    pub fn threads(&self) -> usize {
        if !cfg!(feature = "parallel") {
            return 1;
        }
        match self {
            ProcessingMode::Sequential => 1,
            // rayon treats zero as "use the default"
            ProcessingMode::Parallel | ProcessingMode::ParallelWith(0) => num_threads(),
            ProcessingMode::ParallelWith(n) => *n,
        }
    }
}

/// Strategy for executing independent work items (grid rows)
pub trait ParallelStrategy {
    /// Map a function over indices and collect results in index order
    fn par_map<T, F>(&self, range: Range<usize>, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send;

    /// Like [`par_map`](Self::par_map), but polls `token` before each item.
    ///
    /// Items started after cancellation yield `None`; items already running
    /// complete normally.
    fn par_map_cancellable<T, F>(&self, range: Range<usize>, token: &CancelToken, f: F) -> Vec<Option<T>>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        self.par_map(range, |i| {
            if token.is_cancelled() {
                None
            } else {
                Some(f(i))
            }
        })
    }
}

impl ParallelStrategy for ProcessingMode {
    #[cfg(feature = "parallel")]
    fn par_map<T, F>(&self, range: Range<usize>, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        match self {
            ProcessingMode::Sequential => range.map(f).collect(),
            ProcessingMode::Parallel => range.into_par_iter().map(f).collect(),
            ProcessingMode::ParallelWith(threads) => {
                match rayon::ThreadPoolBuilder::new().num_threads(*threads).build() {
                    Ok(pool) => pool.install(|| range.into_par_iter().map(f).collect()),
                    Err(e) => {
                        tracing::warn!("thread pool with {} threads unavailable ({}), running sequentially", threads, e);
                        range.map(f).collect()
                    }
                }
            }
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn par_map<T, F>(&self, range: Range<usize>, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        range.map(f).collect()
    }
}

/// Number of worker threads a `Parallel` run will use
pub fn num_threads() -> usize {
    #[cfg(feature = "parallel")]
    {
        rayon::current_num_threads()
    }
    #[cfg(not(feature = "parallel"))]
    {
        1
    }
}
