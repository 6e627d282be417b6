use log::debug;
use rayon::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParallelError {
    #[error("Thread error: {0}")]
    ThreadError(String),
}

/// Configuration for parallel processing
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    /// Number of threads to use
    pub threads: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        ParallelConfig {
            threads: rayon::current_num_threads(),
        }
    }
}

/// Process items in parallel using rayon.
///
/// Results keep the order of `items`; the first error is returned.
pub fn parallel_process<T, U, F, E>(
    items: &[T],
    processor: F,
    config: Option<ParallelConfig>,
) -> Result<Vec<U>, E>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> Result<U, E> + Send + Sync,
    E: From<ParallelError> + Send,
{
    let config = config.unwrap_or_default();
    debug!(
        "Processing {} items on {} threads",
        items.len(),
        config.threads
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()
        .map_err(|e| ParallelError::ThreadError(format!("Failed to build thread pool: {}", e)))?;

    let results: Vec<Result<U, E>> = pool.install(|| items.par_iter().map(&processor).collect());

    results.into_iter().collect()
}
