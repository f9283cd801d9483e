//! Shared helpers for the runner test suites

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tandem::Task;

pub const ERROR: &str = "~Cya world~";

/// Records the order in which units ran their side effects
#[derive(Clone, Default)]
pub struct CallOrder(Arc<Mutex<Vec<u32>>>);

impl CallOrder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `value` and return the new length
    pub fn push(&self, value: u32) -> usize {
        let mut order = self.0.lock().unwrap();
        order.push(value);
        order.len()
    }

    pub fn snapshot(&self) -> Vec<u32> {
        self.0.lock().unwrap().clone()
    }
}

pub type Unit = Task<usize, &'static str>;

/// Pushes synchronously when started
pub fn sync_push(order: &CallOrder, value: u32) -> Unit {
    let order = order.clone();
    Task::new(move |settler| {
        settler.resolve(order.push(value));
    })
}

/// Pushes after `millis` on a timer
pub fn delayed_push(order: &CallOrder, value: u32, millis: u64) -> Unit {
    let order = order.clone();
    Task::new(move |settler| {
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(millis)).await;
            settler.resolve(order.push(value));
        });
    })
}

pub fn sync_fail() -> Unit {
    Task::new(|settler| {
        settler.reject(ERROR);
    })
}

pub fn delayed_fail(millis: u64) -> Unit {
    Task::new(move |settler| {
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(millis)).await;
            settler.reject(ERROR);
        });
    })
}

/// Print runner logs when a test is run with `--nocapture`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
