//! Execution strategies for independent jobs.
use rayon::prelude::*;
use serde_derive::{Deserialize, Serialize};

use crate::error::EvalError;

/// Runs a batch of independent jobs.
///
/// Results are tagged with their job index and may come back in any order,
/// callers restore the input order from the tags.
pub trait Executor {
    fn run<R, F>(&self, jobs: usize, job: F) -> Vec<(usize, R)>
    where
        R: Send,
        F: Fn(usize) -> R + Send + Sync;
}

/// Runs the jobs one after the other on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequential;

impl Executor for Sequential {
    fn run<R, F>(&self, jobs: usize, job: F) -> Vec<(usize, R)>
    where
        R: Send,
        F: Fn(usize) -> R + Send + Sync,
    {
        (0..jobs).map(|index| (index, job(index))).collect()
    }
}

/// Runs the jobs on a dedicated rayon pool.
pub struct ThreadPool {
    pool: rayon::ThreadPool,
}

impl ThreadPool {
    /// # Arguments
    ///
    /// * `num_threads` - Number of workers, `None` lets rayon pick one per core.
    pub fn new(num_threads: Option<usize>) -> Result<Self, EvalError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads.unwrap_or(0))
            .thread_name(|index| format!("trackeval-worker-{index}"))
            .build()
            .map_err(EvalError::invalid_parameter)?;
        Ok(Self { pool })
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl Executor for ThreadPool {
    fn run<R, F>(&self, jobs: usize, job: F) -> Vec<(usize, R)>
    where
        R: Send,
        F: Fn(usize) -> R + Send + Sync,
    {
        self.pool.install(|| {
            (0..jobs)
                .into_par_iter()
                .map(|index| (index, job(index)))
                .collect()
        })
    }
}

/// Serializable choice of executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutorKind {
    Sequential,
    ThreadPool { num_threads: Option<usize> },
}

impl Default for ExecutorKind {
    fn default() -> Self {
        ExecutorKind::ThreadPool { num_threads: None }
    }
}

/// Puts tagged results back in job order.
///
/// Fails if a job index is missing or repeated.
pub fn into_job_order<R>(mut tagged: Vec<(usize, R)>, jobs: usize) -> Result<Vec<R>, EvalError> {
    tagged.sort_by_key(|(index, _)| *index);
    let complete = tagged.len() == jobs && tagged.iter().enumerate().all(|(i, (index, _))| i == *index);
    if !complete {
        return Err(EvalError::invalid_parameter(format!(
            "Executor returned {} results for {} jobs",
            tagged.len(),
            jobs
        )));
    }
    Ok(tagged.into_iter().map(|(_, result)| result).collect())
}
