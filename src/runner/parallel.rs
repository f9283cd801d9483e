use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::core::errors::{FlowError, TaskLabel};
use crate::events::{EventEmitter, FlowEvent, RunMode};
use crate::task::Task;

/// Starts every task in index order, then waits for all of them
///
/// Every start closure has run by the time this returns. The future yields
/// results aligned with the input, or the first failure observed. Units
/// still running at that point are left alone; their outcomes are dropped.
pub(crate) fn run<T, E>(
    tasks: Vec<Task<T, E>>,
    events: EventEmitter,
) -> impl Future<Output = Result<Vec<T>, FlowError<E>>> + Send + 'static
where
    T: Send + 'static,
    E: Send + 'static,
{
    let total = tasks.len();
    events.emit(FlowEvent::RunStarted {
        mode: RunMode::Parallel,
        tasks: total,
    });

    let mut running = FuturesUnordered::new();
    for (index, task) in tasks.into_iter().enumerate() {
        debug!(task = index, "Starting task");
        events.task_started(&index);
        let started = Instant::now();
        let pending = task.start();
        running.push(async move { (index, started, pending.await) });
    }

    async move {
        let mut slots: Vec<Option<T>> = (0..total).map(|_| None).collect();

        while let Some((index, started, outcome)) = running.next().await {
            events.task_settled(&index, outcome.is_ok(), started.elapsed());
            match outcome {
                Ok(value) => {
                    debug!(task = index, remaining = running.len(), "Task settled");
                    slots[index] = Some(value);
                }
                Err(failure) => {
                    info!(
                        "Task {} failed; abandoning {} outstanding task(s)",
                        index,
                        running.len()
                    );
                    events.emit(FlowEvent::RunFinished { success: false });
                    return Err(FlowError::from_failure(TaskLabel::Index(index), failure));
                }
            }
        }

        events.emit(FlowEvent::RunFinished { success: true });
        Ok(slots.into_iter().flatten().collect())
    }
}
