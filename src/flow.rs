use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{info_span, Instrument};

use crate::auto::{executor, Results, TaskGraph};
use crate::core::config::FlowConfig;
use crate::core::errors::FlowError;
use crate::events::{EventEmitter, EventSink};
use crate::runner;
use crate::task::Task;

/// Entry point carrying configuration and an optional event sink
///
/// Each method starts whatever can start immediately before it returns and
/// hands back the governing future. Runs share nothing but the config and sink.
#[derive(Clone, Default)]
pub struct Flow {
    config: FlowConfig,
    event_sink: Option<Arc<dyn EventSink>>,
}

impl Flow {
    pub fn new(config: Option<FlowConfig>) -> Self {
        Self {
            config: config.unwrap_or_default(),
            event_sink: None,
        }
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    fn emitter(&self) -> EventEmitter {
        EventEmitter::new(self.config.name.clone(), self.event_sink.clone())
    }

    /// Start every task at once; resolve with all results in input order
    pub fn parallel<T, E>(
        &self,
        tasks: Vec<Task<T, E>>,
    ) -> impl Future<Output = Result<Vec<T>, FlowError<E>>> + Send + 'static
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        let span = info_span!("parallel", flow = %self.config.name, tasks = tasks.len());
        let running = {
            let _enter = span.enter();
            runner::parallel::run(tasks, self.emitter())
        };
        running.instrument(span)
    }

    /// Start tasks one after another; stop at the first failure
    pub fn series<T, E>(
        &self,
        tasks: Vec<Task<T, E>>,
    ) -> impl Future<Output = Result<Vec<T>, FlowError<E>>> + Send + 'static
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        let span = info_span!("series", flow = %self.config.name, tasks = tasks.len());
        let running = {
            let _enter = span.enter();
            runner::series::run(tasks, self.emitter())
        };
        running.instrument(span)
    }

    /// Run a named dependency graph; resolve with every task's result
    pub fn auto<T, E>(
        &self,
        graph: TaskGraph<T, E>,
    ) -> impl Future<Output = Result<Results<T>, FlowError<E>>> + Send + 'static
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        let span = info_span!("auto", flow = %self.config.name, tasks = graph.len());
        let running = {
            let _enter = span.enter();
            executor::run(graph, &self.config, self.emitter())
        };
        running.instrument(span)
    }
}

impl fmt::Debug for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flow")
            .field("config", &self.config)
            .field("event_sink", &self.event_sink.is_some())
            .finish()
    }
}

/// [`Flow::parallel`] with the default configuration
pub fn parallel<T, E>(
    tasks: Vec<Task<T, E>>,
) -> impl Future<Output = Result<Vec<T>, FlowError<E>>> + Send + 'static
where
    T: Send + 'static,
    E: Send + 'static,
{
    Flow::default().parallel(tasks)
}

/// [`Flow::series`] with the default configuration
pub fn series<T, E>(
    tasks: Vec<Task<T, E>>,
) -> impl Future<Output = Result<Vec<T>, FlowError<E>>> + Send + 'static
where
    T: Send + 'static,
    E: Send + 'static,
{
    Flow::default().series(tasks)
}

/// [`Flow::auto`] with the default configuration
pub fn auto<T, E>(
    graph: TaskGraph<T, E>,
) -> impl Future<Output = Result<Results<T>, FlowError<E>>> + Send + 'static
where
    T: Send + 'static,
    E: Send + 'static,
{
    Flow::default().auto(graph)
}
