//! Task domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// One unit of input work: the arguments passed to the pipeline script.
///
/// Tasks are immutable once built. Duplicate tasks are independent units of
/// work and are never merged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Task {
    args: Vec<String>,
}

impl Task {
    /// Creates a task from an ordered argument list
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// The script arguments, in order
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.args.join(", "))
    }
}
