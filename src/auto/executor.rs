use futures::future::{self, BoxFuture};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashSet;
use std::future::Future;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::graph::{Builder, Results, TaskDescriptor, TaskGraph};
use super::validate::{validate_graph_structure, validate_task_dependencies};
use crate::core::config::FlowConfig;
use crate::core::errors::{FlowError, TaskLabel};
use crate::events::{EventEmitter, FlowEvent, RunMode};
use crate::task::{Failure, Task};

type Settled<T, E> = (String, Instant, Result<T, Failure<E>>);

/// A dependent task whose dependencies have not all succeeded yet
struct Waiting<T, E> {
    name: String,
    remaining: HashSet<String>,
    builder: Builder<T, E>,
}

/// Bookkeeping for one `auto` run
struct Schedule<T, E> {
    running: FuturesUnordered<BoxFuture<'static, Settled<T, E>>>,
    waiting: Vec<Waiting<T, E>>,
    results: Results<T>,
    events: EventEmitter,
    /// Set once a failure decided the run; later starts are not reported
    decided: bool,
}

/// Resolves a task graph into a name -> result mapping
///
/// Validation and the start of every dependency-free task happen before
/// this returns, in declared order. Dependents start once their last
/// dependency succeeds. The first failure fixes the outcome; tasks already
/// running are not interrupted, and dependents they unblock later are still
/// started on the runtime with their outcomes discarded.
pub(crate) fn run<T, E>(
    graph: TaskGraph<T, E>,
    config: &FlowConfig,
    events: EventEmitter,
) -> impl Future<Output = Result<Results<T>, FlowError<E>>> + Send + 'static
where
    T: Send + 'static,
    E: Send + 'static,
{
    let prepared = prepare(graph, config, events);

    async move {
        match prepared {
            Ok(schedule) => schedule.drive().await,
            Err((error, events)) => {
                info!("Rejecting task graph: {}", error.category());
                events.emit(FlowEvent::RunFinished { success: false });
                Err(error)
            }
        }
    }
}

fn prepare<T, E>(
    graph: TaskGraph<T, E>,
    config: &FlowConfig,
    events: EventEmitter,
) -> Result<Schedule<T, E>, (FlowError<E>, EventEmitter)>
where
    T: Send + 'static,
    E: Send + 'static,
{
    events.emit(FlowEvent::RunStarted {
        mode: RunMode::Auto,
        tasks: graph.len(),
    });

    let validated = validate_task_dependencies(&graph, config.on_missing_dependency).and_then(|_| {
        if config.detect_cycles {
            validate_graph_structure(&graph)
        } else {
            Ok(())
        }
    });
    if let Err(error) = validated {
        return Err((error, events));
    }

    let declared: HashSet<String> = graph.names().map(str::to_string).collect();
    let mut schedule = Schedule {
        running: FuturesUnordered::new(),
        waiting: Vec::new(),
        results: Results::new(),
        events,
        decided: false,
    };

    for (name, descriptor) in graph.into_entries() {
        match descriptor {
            TaskDescriptor::Bare(task) => schedule.launch(name, task),
            TaskDescriptor::Dependent {
                dependencies,
                builder,
            } => {
                // Undeclared names only survive validation under the Ignore policy
                let remaining: HashSet<String> = dependencies
                    .into_iter()
                    .filter(|dependency| declared.contains(dependency))
                    .collect();

                if remaining.is_empty() {
                    let task = builder(&schedule.results);
                    schedule.launch(name, task);
                } else {
                    schedule.waiting.push(Waiting {
                        name,
                        remaining,
                        builder,
                    });
                }
            }
        }
    }

    Ok(schedule)
}

impl<T, E> Schedule<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn launch(&mut self, name: String, task: Task<T, E>) {
        debug!(task = %name, "Starting task");
        if !self.decided {
            self.events.task_started(&name);
        }
        let started = Instant::now();
        let pending = task.start();
        self.running
            .push(Box::pin(async move { (name, started, pending.await) }));
    }

    /// Start every waiting task whose last dependency was `settled`
    fn unblock(&mut self, settled: &str) {
        let mut ready = Vec::new();
        let mut still_waiting = Vec::with_capacity(self.waiting.len());

        for mut waiting in self.waiting.drain(..) {
            waiting.remaining.remove(settled);
            if waiting.remaining.is_empty() {
                ready.push(waiting);
            } else {
                still_waiting.push(waiting);
            }
        }
        self.waiting = still_waiting;

        for waiting in ready {
            let task = (waiting.builder)(&self.results);
            self.launch(waiting.name, task);
        }
    }

    async fn drive(mut self) -> Result<Results<T>, FlowError<E>> {
        while let Some((name, started, outcome)) = self.running.next().await {
            self.events
                .task_settled(&name, outcome.is_ok(), started.elapsed());

            match outcome {
                Ok(value) => {
                    debug!(task = %name, running = self.running.len(), "Task settled");
                    self.results.record(name.clone(), value);
                    self.unblock(&name);
                }
                Err(failure) => {
                    info!(
                        "Task '{}' failed; {} running and {} waiting task(s) continue detached",
                        name,
                        self.running.len(),
                        self.waiting.len()
                    );
                    self.events.emit(FlowEvent::RunFinished { success: false });
                    let error = FlowError::from_failure(TaskLabel::Name(name), failure);
                    self.detach();
                    return Err(error);
                }
            }
        }

        if !self.waiting.is_empty() {
            let blocked: Vec<String> = self.waiting.iter().map(|w| w.name.clone()).collect();
            warn!(
                "No task can make progress; {:?} wait on each other and will never start",
                blocked
            );
            future::pending::<()>().await;
        }

        self.events.emit(FlowEvent::RunFinished { success: true });
        Ok(self.results)
    }

    /// Hand the unsettled remainder of a decided run to the runtime
    fn detach(mut self) {
        self.decided = true;
        if self.running.is_empty() {
            return;
        }

        match Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(self.settle_remaining());
            }
            Err(_) => debug!(
                "No tokio runtime; dropping {} unsettled task(s)",
                self.running.len()
            ),
        }
    }

    /// Keep unblocking dependents until nothing is left running
    async fn settle_remaining(mut self) {
        while let Some((name, _, outcome)) = self.running.next().await {
            match outcome {
                Ok(value) => {
                    self.results.record(name.clone(), value);
                    self.unblock(&name);
                }
                Err(_) => debug!(task = %name, "Task failed after the run was decided"),
            }
        }

        if !self.waiting.is_empty() {
            debug!(
                "{} task(s) never became ready after the run was decided",
                self.waiting.len()
            );
        }
    }
}
