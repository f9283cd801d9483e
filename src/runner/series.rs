use std::future::Future;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::core::errors::{FlowError, TaskLabel};
use crate::events::{EventEmitter, FlowEvent, RunMode};
use crate::task::{Pending, Task};

/// Starts tasks one at a time, each after the previous one succeeded
///
/// The first task is started before this returns. A failure stops the
/// run; later tasks are never started.
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
        mode: RunMode::Series,
        tasks: total,
    });

    let mut queue = tasks.into_iter().enumerate();
    let first = queue.next().map(|(index, task)| launch(index, task, &events));

    async move {
        let mut results = Vec::with_capacity(total);
        let mut current = first;

        while let Some((index, started, pending)) = current {
            let outcome = pending.await;
            events.task_settled(&index, outcome.is_ok(), started.elapsed());
            match outcome {
                Ok(value) => {
                    debug!(task = index, "Task settled");
                    results.push(value);
                }
                Err(failure) => {
                    info!(
                        "Task {} failed; skipping {} remaining task(s)",
                        index,
                        total - index - 1
                    );
                    events.emit(FlowEvent::RunFinished { success: false });
                    return Err(FlowError::from_failure(TaskLabel::Index(index), failure));
                }
            }
            current = queue.next().map(|(index, task)| launch(index, task, &events));
        }

        events.emit(FlowEvent::RunFinished { success: true });
        Ok(results)
    }
}

fn launch<T, E>(
    index: usize,
    task: Task<T, E>,
    events: &EventEmitter,
) -> (usize, Instant, Pending<T, E>)
where
    T: Send + 'static,
    E: Send + 'static,
{
    debug!(task = index, "Starting task");
    events.task_started(&index);
    (index, Instant::now(), task.start())
}
