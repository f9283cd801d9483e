//! Group runners over an ordered list of tasks

pub(crate) mod parallel;
pub(crate) mod series;
