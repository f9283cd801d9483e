use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::ops::Index;

use crate::task::Task;

/// Builds a dependent task's unit of work from the results resolved so far
pub type Builder<T, E> = Box<dyn FnOnce(&Results<T>) -> Task<T, E> + Send + 'static>;

/// A named entry of a [`TaskGraph`]
pub enum TaskDescriptor<T, E> {
    /// Started as soon as the graph is handed to `auto`
    Bare(Task<T, E>),
    /// Built and started once every listed dependency has succeeded
    Dependent {
        dependencies: Vec<String>,
        builder: Builder<T, E>,
    },
}

impl<T, E> TaskDescriptor<T, E> {
    pub fn dependent<I, S, F>(dependencies: I, builder: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnOnce(&Results<T>) -> Task<T, E> + Send + 'static,
    {
        Self::Dependent {
            dependencies: dependencies.into_iter().map(Into::into).collect(),
            builder: Box::new(builder),
        }
    }

    pub fn dependencies(&self) -> &[String] {
        match self {
            Self::Bare(_) => &[],
            Self::Dependent { dependencies, .. } => dependencies,
        }
    }
}

impl<T, E> From<Task<T, E>> for TaskDescriptor<T, E> {
    fn from(task: Task<T, E>) -> Self {
        Self::Bare(task)
    }
}

impl<T, E> fmt::Debug for TaskDescriptor<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bare(_) => f.write_str("Bare"),
            Self::Dependent { dependencies, .. } => f
                .debug_struct("Dependent")
                .field("dependencies", dependencies)
                .finish_non_exhaustive(),
        }
    }
}

/// Named tasks in declared order
///
/// Declared order decides the start order of dependency-free tasks and the
/// order in which simultaneously unblocked dependents are started.
pub struct TaskGraph<T, E> {
    entries: Vec<(String, TaskDescriptor<T, E>)>,
    positions: HashMap<String, usize>,
}

impl<T, E> Default for TaskGraph<T, E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            positions: HashMap::new(),
        }
    }
}

impl<T, E> TaskGraph<T, E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task without dependencies
    pub fn task(mut self, name: impl Into<String>, task: Task<T, E>) -> Self {
        self.insert(name, TaskDescriptor::Bare(task));
        self
    }

    /// Add a task that runs after `dependencies`, built from their results
    pub fn dependent<I, S, F>(mut self, name: impl Into<String>, dependencies: I, builder: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnOnce(&Results<T>) -> Task<T, E> + Send + 'static,
    {
        self.insert(name, TaskDescriptor::dependent(dependencies, builder));
        self
    }

    /// Insert or replace a task. A replaced task keeps its declared position.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        descriptor: TaskDescriptor<T, E>,
    ) -> Option<TaskDescriptor<T, E>> {
        let name = name.into();
        match self.positions.get(&name) {
            Some(&position) => Some(std::mem::replace(&mut self.entries[position].1, descriptor)),
            None => {
                self.positions.insert(name.clone(), self.entries.len());
                self.entries.push((name, descriptor));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&TaskDescriptor<T, E>> {
        self.positions.get(name).map(|&position| &self.entries[position].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    /// Task names in declared order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &TaskDescriptor<T, E>)> {
        self.entries.iter().map(|(name, descriptor)| (name.as_str(), descriptor))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_entries(self) -> Vec<(String, TaskDescriptor<T, E>)> {
        self.entries
    }
}

impl<T, E, S: Into<String>> FromIterator<(S, TaskDescriptor<T, E>)> for TaskGraph<T, E> {
    fn from_iter<I: IntoIterator<Item = (S, TaskDescriptor<T, E>)>>(iter: I) -> Self {
        let mut graph = Self::new();
        for (name, descriptor) in iter {
            graph.insert(name, descriptor);
        }
        graph
    }
}

impl<T, E> fmt::Debug for TaskGraph<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(name, descriptor)| (name, descriptor)))
            .finish()
    }
}

/// Task results keyed by name, in the order tasks settled
#[derive(Clone, PartialEq, Eq)]
pub struct Results<T> {
    entries: Vec<(String, T)>,
    positions: HashMap<String, usize>,
}

impl<T> Default for Results<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            positions: HashMap::new(),
        }
    }
}

impl<T> Results<T> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record a result. Returns `false` and keeps the old value if `name`
    /// already has one.
    pub(crate) fn record(&mut self, name: String, value: T) -> bool {
        if self.positions.contains_key(&name) {
            return false;
        }
        self.positions.insert(name.clone(), self.entries.len());
        self.entries.push((name, value));
        true
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.positions.get(name).map(|&position| &self.entries[position].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Task names in settlement order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn into_map(self) -> HashMap<String, T> {
        self.entries.into_iter().collect()
    }
}

impl<T> Index<&str> for Results<T> {
    type Output = T;

    /// # Panics
    ///
    /// Panics if no task named `name` has a result.
    fn index(&self, name: &str) -> &T {
        match self.get(name) {
            Some(value) => value,
            None => panic!("no result recorded for task '{}'", name),
        }
    }
}

impl<T> IntoIterator for Results<T> {
    type Item = (String, T);
    type IntoIter = std::vec::IntoIter<(String, T)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<T: fmt::Debug> fmt::Debug for Results<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(name, value)| (name, value)))
            .finish()
    }
}

impl<T: Serialize> Serialize for Results<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
