//! The worker thread.
//!
//! Processes one request at a time, in arrival order, so responses for an
//! instance leave in the order its requests came in. Projects are shared
//! between instances with the same configuration and live until shutdown.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use shapecheck_schema::Project;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::messages::{Envelope, InstanceId, Request, Response, WorkerCommand};
use crate::config::{ConfigKey, ValidatorOptions};
use crate::session::ValidatorSession;

/// Parsed projects by configuration identity.
#[derive(Debug, Default)]
pub struct ProjectRegistry {
    projects: HashMap<ConfigKey, Arc<Project>>,
}

impl ProjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The project for `key`, created on first use.
    pub fn get_or_create(&mut self, key: ConfigKey) -> Arc<Project> {
        let project = self.projects.entry(key).or_insert_with_key(|key| {
            debug!(root = %key.root.display(), "creating project");
            Arc::new(Project::new(key.compiler_options()))
        });
        Arc::clone(project)
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

/// Stack for the worker thread. Checking and extension walks recurse once
/// per nesting level of the value, up to `MAX_VALUE_DEPTH` levels.
const WORKER_STACK_SIZE: usize = 16 * 1024 * 1024;

pub(crate) fn spawn(
    responses: mpsc::UnboundedSender<Envelope<Response>>,
) -> std::io::Result<(mpsc::UnboundedSender<WorkerCommand>, thread::JoinHandle<()>)> {
    let (commands, inbox) = mpsc::unbounded_channel();
    let handle = thread::Builder::new()
        .name("shapecheck-worker".to_string())
        .stack_size(WORKER_STACK_SIZE)
        .spawn(move || Worker::new(responses).run(inbox))?;
    Ok((commands, handle))
}

struct Worker {
    projects: ProjectRegistry,
    sessions: HashMap<InstanceId, ValidatorSession>,
    responses: mpsc::UnboundedSender<Envelope<Response>>,
}

impl Worker {
    fn new(responses: mpsc::UnboundedSender<Envelope<Response>>) -> Self {
        Self {
            projects: ProjectRegistry::new(),
            sessions: HashMap::new(),
            responses,
        }
    }

    fn run(mut self, mut inbox: mpsc::UnboundedReceiver<WorkerCommand>) {
        info!("worker started");
        while let Some(command) = inbox.blocking_recv() {
            match command {
                WorkerCommand::Request(envelope) => self.handle(envelope),
                WorkerCommand::Shutdown => break,
            }
        }
        info!(
            sessions = self.sessions.len(),
            projects = self.projects.len(),
            "worker stopped"
        );
    }

    fn handle(&mut self, envelope: Envelope<Request>) {
        let instance = envelope.instance;
        let response = match envelope.body {
            Request::Initialize { options } => Some(self.initialize(instance, &options)),
            Request::Diagnose { selector, value } => {
                let Some(session) = self.sessions.get_mut(&instance) else {
                    self.reply(
                        instance,
                        Response::Error {
                            message: format!("validator {instance} is not initialized"),
                        },
                    );
                    return;
                };
                let outcome = catch_unwind(AssertUnwindSafe(|| session.diagnose(&selector, &value)));
                Some(match outcome {
                    Ok(Ok(diagnostics)) => Response::Diagnosed {
                        reasons: diagnostics
                            .map(|list| list.iter().map(ToString::to_string).collect()),
                    },
                    Ok(Err(err)) => Response::Error {
                        message: err.to_string(),
                    },
                    Err(panic) => Response::Error {
                        message: panic_message(panic.as_ref()),
                    },
                })
            }
            Request::Release => {
                if self.sessions.remove(&instance).is_some() {
                    debug!(%instance, "session released");
                }
                None
            }
        };
        if let Some(response) = response {
            self.reply(instance, response);
        }
    }

    fn initialize(&mut self, instance: InstanceId, options: &ValidatorOptions) -> Response {
        let key = match options.key() {
            Ok(key) => key,
            Err(err) => {
                return Response::Error {
                    message: err.to_string(),
                };
            }
        };
        let project = self.projects.get_or_create(key);
        let session = ValidatorSession::with_project(project, &options.extensions);
        self.sessions.insert(instance, session);
        debug!(%instance, "session initialized");
        Response::Initialized
    }

    fn reply(&self, instance: InstanceId, body: Response) {
        if self.responses.send(Envelope { instance, body }).is_err() {
            warn!(%instance, "response dropped; dispatcher has stopped");
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "validator panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_shares_projects_by_key() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let key = ValidatorOptions::new(dir.path())
            .key()
            .unwrap_or_else(|e| panic!("key: {e}"));
        let mut registry = ProjectRegistry::new();
        let a = registry.get_or_create(key.clone());
        let b = registry.get_or_create(key);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn worker_answers_in_order() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        std::fs::write(dir.path().join("index.d.ts"), "export type N = number;")
            .unwrap_or_else(|e| panic!("write: {e}"));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let (commands, handle) = spawn(tx).unwrap_or_else(|e| panic!("spawn: {e}"));
        let id = InstanceId(1);
        let send = |body| {
            let sent = commands.send(WorkerCommand::Request(Envelope { instance: id, body }));
            assert!(sent.is_ok());
        };
        send(Request::Initialize {
            options: ValidatorOptions::new(dir.path()),
        });
        send(Request::Diagnose {
            selector: crate::adapter::TypeSelector::module(".", "N"),
            value: serde_json::json!("x"),
        });
        send(Request::Diagnose {
            selector: crate::adapter::TypeSelector::module(".", "N"),
            value: serde_json::json!(1),
        });
        send(Request::Release);
        assert!(commands.send(WorkerCommand::Shutdown).is_ok());
        assert!(handle.join().is_ok());

        let mut bodies = Vec::new();
        while let Ok(envelope) = rx.try_recv() {
            bodies.push(envelope.body);
        }
        assert_eq!(
            bodies,
            vec![
                Response::Initialized,
                Response::Diagnosed {
                    reasons: Some(vec![
                        "Diagnostic value path: (root)\n  Type 'string' is not assignable to type 'number'."
                            .to_string()
                    ])
                },
                Response::Diagnosed { reasons: None },
            ]
        );
    }

    #[test]
    fn diagnose_before_initialize_is_an_error() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (commands, handle) = spawn(tx).unwrap_or_else(|e| panic!("spawn: {e}"));
        let sent = commands.send(WorkerCommand::Request(Envelope {
            instance: InstanceId(9),
            body: Request::Diagnose {
                selector: "string".into(),
                value: serde_json::json!("x"),
            },
        }));
        assert!(sent.is_ok());
        drop(commands);
        assert!(handle.join().is_ok());
        let reply = rx.try_recv().map(|e| e.body);
        assert!(matches!(reply, Ok(Response::Error { message }) if message.contains("not initialized")));
    }
}
