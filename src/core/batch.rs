//! Per-item fan-out and result collation shared by both engines

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::core::config::ExecutionConfig;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::{ConcurrencyStrategy, Engine, Translations};
use crate::core::worker::{WorkerJob, WorkerPool};

/// Run every job under `strategy` and return one outcome per job, in job order.
///
/// `task` executes a job in this process; it is unused for the distributed
/// strategy, where workers execute the jobs themselves. The outer error is a
/// setup failure (no worker could be started); per-item failures stay in the
/// inner results.
pub async fn execute<F, Fut>(
    strategy: ConcurrencyStrategy,
    execution: &ExecutionConfig,
    jobs: Vec<WorkerJob>,
    task: F,
) -> Result<Vec<Result<String>>>
where
    F: Fn(WorkerJob) -> Fut,
    Fut: Future<Output = Result<String>> + Send + 'static,
{
    info!("Translating {} items ({})", jobs.len(), strategy);

    match strategy {
        ConcurrencyStrategy::Sequential => Ok(run_sequential(jobs, task).await),
        ConcurrencyStrategy::LocalParallel => {
            Ok(run_parallel(jobs, execution.max_workers, task).await)
        }
        ConcurrencyStrategy::Distributed => {
            let pool = WorkerPool::spawn(execution, jobs.len())?;
            Ok(pool.run(jobs).await)
        }
    }
}

/// One item at a time on the calling task
pub async fn run_sequential<T, F, Fut>(items: Vec<T>, task: F) -> Vec<Result<String>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<String>>,
{
    let mut results = Vec::with_capacity(items.len());

    for item in items {
        results.push(task(item).await);
    }

    results
}

/// Every item as its own tokio task, at most `max_workers` running at once
pub async fn run_parallel<T, F, Fut>(items: Vec<T>, max_workers: usize, task: F) -> Vec<Result<String>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<String>> + Send + 'static,
{
    let total = items.len();
    let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));
    let mut set = JoinSet::new();

    for (index, item) in items.into_iter().enumerate() {
        let semaphore = semaphore.clone();
        let fut = task(item);
        set.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            (index, fut.await)
        });
    }

    // Tasks finish in any order; slot by index
    let mut slots: Vec<Option<Result<String>>> = (0..total).map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, outcome)) => {
                debug!("Item {} finished", index);
                slots[index] = Some(outcome);
            }
            Err(e) => warn!("Translation task did not complete: {}", e),
        }
    }

    slots
        .into_iter()
        .map(|slot| {
            slot.unwrap_or_else(|| {
                Err(TranslationError::InternalError(
                    "translation task aborted".to_string(),
                ))
            })
        })
        .collect()
}

/// Downgrade each failed outcome to the missing sentinel, keeping positions
pub fn collate(engine: Engine, outcomes: Vec<Result<String>>) -> Translations {
    let results: Translations = outcomes
        .into_iter()
        .enumerate()
        .map(|(index, outcome)| match outcome {
            Ok(translation) => Some(translation),
            Err(e) => {
                warn!("{} translation of item {} failed: {}", engine, index, e);
                None
            }
        })
        .collect();

    let missing = crate::core::models::missing_count(&results);
    info!(
        "{} batch finished: {} translated, {} missing",
        engine,
        results.len() - missing,
        missing
    );

    results
}
