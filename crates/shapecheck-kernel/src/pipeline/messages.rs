//! Messages exchanged with the worker.
//!
//! Requests carry only the instance id. Responses for one instance come
//! back in request order, so callers correlate them by position.

use std::fmt;

use serde_json::Value;

use crate::adapter::TypeSelector;
use crate::config::ValidatorOptions;

/// A logical validator instance hosted by the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub(crate) u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub instance: InstanceId,
    pub body: T,
}

#[derive(Debug, Clone)]
pub enum Request {
    /// Create the instance's session.
    Initialize { options: ValidatorOptions },
    Diagnose { selector: TypeSelector, value: Value },
    /// Drop the instance's session. Never answered.
    Release,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Initialized,
    /// Diagnostic texts, or `None` for a valid value.
    Diagnosed { reasons: Option<Vec<String>> },
    Error { message: String },
}

#[derive(Debug)]
pub enum WorkerCommand {
    Request(Envelope<Request>),
    /// Stop the worker and drop every session and project.
    Shutdown,
}
