//! Parallel processing strategies

use rayon::prelude::*;

/// Processing mode for raster stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    /// Single-threaded processing
    Sequential,
    /// Parallel processing on the global rayon pool
    #[default]
    Parallel,
    /// Parallel with a dedicated pool of the given size
    ParallelWith(usize),
}

impl ProcessingMode {
    /// Mode from an optional thread count and a sequential switch
    pub fn from_threads(threads: Option<usize>, sequential: bool) -> Self {
        match (sequential, threads) {
            (true, _) | (false, Some(1)) => ProcessingMode::Sequential,
            (false, Some(n)) if n > 1 => ProcessingMode::ParallelWith(n),
            _ => ProcessingMode::Parallel,
        }
    }

    /// Run `op` inside this mode's thread pool.
    ///
    /// If a dedicated pool cannot be built the global pool is used instead.
    pub fn install<R, OP>(&self, op: OP) -> R
    where
        R: Send,
        OP: FnOnce() -> R + Send,
    {
        match self {
            ProcessingMode::ParallelWith(threads) => {
                match rayon::ThreadPoolBuilder::new().num_threads(*threads).build() {
                    Ok(pool) => pool.install(op),
                    Err(_) => op(),
                }
            }
            _ => op(),
        }
    }
}

/// Strategy for parallel execution
pub trait ParallelStrategy {
    /// Map a function over indices and collect results in index order
    fn par_map<T, F>(&self, range: std::ops::Range<usize>, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send;
}

impl ParallelStrategy for ProcessingMode {
    fn par_map<T, F>(&self, range: std::ops::Range<usize>, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        match self {
            ProcessingMode::Sequential => range.map(f).collect(),
            _ => self.install(|| range.into_par_iter().map(f).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_threads() {
        assert_eq!(ProcessingMode::from_threads(None, false), ProcessingMode::Parallel);
        assert_eq!(ProcessingMode::from_threads(Some(4), true), ProcessingMode::Sequential);
        assert_eq!(ProcessingMode::from_threads(Some(1), false), ProcessingMode::Sequential);
        assert_eq!(
            ProcessingMode::from_threads(Some(3), false),
            ProcessingMode::ParallelWith(3)
        );
    }

    #[test]
    fn test_par_map_keeps_order() {
        for mode in [
            ProcessingMode::Sequential,
            ProcessingMode::Parallel,
            ProcessingMode::ParallelWith(2),
        ] {
            let out = mode.par_map(0..100, |i| i * 2);
            assert_eq!(out, (0..100).map(|i| i * 2).collect::<Vec<_>>());
        }
    }
}
