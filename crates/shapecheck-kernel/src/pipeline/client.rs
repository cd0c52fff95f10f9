//! Caller side of the pipeline.
//!
//! Each [`PipelineValidator`] is a logical instance on the shared worker.
//! Calls made before the instance finishes initializing are buffered and
//! replayed in order once it does. Responses are matched to calls by
//! position in a per-instance FIFO.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::thread;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::messages::{Envelope, InstanceId, Request, Response, WorkerCommand};
use super::worker;
use crate::adapter::TypeSelector;
use crate::config::ValidatorOptions;
use crate::error::PipelineError;

type Reply = Result<Option<Vec<String>>, PipelineError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

enum Waiter {
    Init,
    Call(oneshot::Sender<Reply>),
}

struct InstanceState {
    phase: Phase,
    buffered: Vec<(Request, oneshot::Sender<Reply>)>,
    waiting: VecDeque<Waiter>,
    ready: watch::Sender<Option<bool>>,
    released: bool,
}

struct Shared {
    commands: mpsc::UnboundedSender<WorkerCommand>,
    next_instance: AtomicU64,
    instances: Mutex<HashMap<InstanceId, Arc<Mutex<InstanceState>>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Shared {
    fn send(&self, instance: InstanceId, body: Request) -> bool {
        let sent = self
            .commands
            .send(WorkerCommand::Request(Envelope { instance, body }))
            .is_ok();
        if !sent {
            warn!(%instance, "worker is gone; request dropped");
        }
        sent
    }

    fn instance(&self, id: InstanceId) -> Option<Arc<Mutex<InstanceState>>> {
        lock(&self.instances).get(&id).cloned()
    }

    fn forget(&self, id: InstanceId) {
        lock(&self.instances).remove(&id);
    }
}

/// Handle to the worker thread. Must be created inside a tokio runtime.
pub struct Pipeline {
    shared: Arc<Shared>,
    worker: Option<thread::JoinHandle<()>>,
    dispatcher: Option<JoinHandle<()>>,
}

impl Pipeline {
    pub fn new() -> Result<Self, PipelineError> {
        let (responses_tx, responses_rx) = mpsc::unbounded_channel();
        let (commands, worker) =
            worker::spawn(responses_tx).map_err(|e| PipelineError::Spawn(e.to_string()))?;
        let shared = Arc::new(Shared {
            commands,
            next_instance: AtomicU64::new(1),
            instances: Mutex::new(HashMap::new()),
        });
        let dispatcher = tokio::spawn(Self::dispatch(Arc::downgrade(&shared), responses_rx));
        Ok(Self {
            shared,
            worker: Some(worker),
            dispatcher: Some(dispatcher),
        })
    }

    /// Create a validator instance. Initialization starts immediately.
    pub fn validator(&self, options: ValidatorOptions) -> PipelineValidator {
        let id = InstanceId(self.shared.next_instance.fetch_add(1, Ordering::Relaxed));
        let (ready, ready_rx) = watch::channel(None);
        let state = Arc::new(Mutex::new(InstanceState {
            phase: Phase::Uninitialized,
            buffered: Vec::new(),
            waiting: VecDeque::new(),
            ready,
            released: false,
        }));
        lock(&self.shared.instances).insert(id, Arc::clone(&state));

        {
            let mut guard = lock(&state);
            guard.phase = Phase::Initializing;
            guard.waiting.push_back(Waiter::Init);
            self.shared.send(id, Request::Initialize { options });
        }
        debug!(instance = %id, "validator created");

        PipelineValidator {
            id,
            shared: Arc::clone(&self.shared),
            state,
            ready: ready_rx,
        }
    }

    /// Stop the worker and wait for it to exit.
    pub async fn shutdown(mut self) {
        let _ = self.shared.commands.send(WorkerCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            if tokio::task::spawn_blocking(move || worker.join()).await.is_err() {
                warn!("worker thread did not exit cleanly");
            }
        }
        if let Some(dispatcher) = self.dispatcher.take() {
            let _ = dispatcher.await;
        }
    }

    async fn dispatch(shared: Weak<Shared>, mut responses: mpsc::UnboundedReceiver<Envelope<Response>>) {
        while let Some(Envelope { instance, body }) = responses.recv().await {
            let Some(shared) = shared.upgrade() else {
                break;
            };
            let Some(state) = shared.instance(instance) else {
                warn!(%instance, ?body, "unsolicited response");
                continue;
            };
            let mut guard = lock(&state);
            Self::route(&shared, instance, &mut guard, body);
            if guard.released && guard.waiting.is_empty() {
                drop(guard);
                shared.forget(instance);
            }
        }
        debug!("dispatcher stopped");
    }

    fn route(shared: &Shared, instance: InstanceId, state: &mut InstanceState, body: Response) {
        match (state.waiting.pop_front(), body) {
            (Some(Waiter::Init), Response::Initialized) => {
                state.phase = Phase::Ready;
                for (request, reply) in std::mem::take(&mut state.buffered) {
                    state.waiting.push_back(Waiter::Call(reply));
                    shared.send(instance, request);
                }
                state.ready.send_replace(Some(true));
            }
            (Some(Waiter::Init), Response::Error { message }) => {
                error!(%instance, %message, "validator initialization failed");
                state.phase = Phase::Failed;
                state.buffered.clear();
                state.waiting.clear();
                state.ready.send_replace(Some(false));
            }
            (Some(Waiter::Call(reply)), Response::Diagnosed { reasons }) => {
                let _ = reply.send(Ok(reasons));
            }
            (Some(Waiter::Call(reply)), Response::Error { message }) => {
                let _ = reply.send(Err(PipelineError::Remote(message)));
            }
            (Some(Waiter::Call(reply)), other) => {
                warn!(%instance, ?other, "response does not match pending call");
                let _ = reply.send(Err(PipelineError::Protocol(format!("unexpected response {other:?}"))));
            }
            (Some(Waiter::Init), other) => {
                warn!(%instance, ?other, "response does not match initialization");
                state.waiting.push_front(Waiter::Init);
            }
            (None, other) => {
                warn!(%instance, ?other, "unsolicited response");
            }
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if self.worker.is_some() {
            let _ = self.shared.commands.send(WorkerCommand::Shutdown);
        }
    }
}

/// A validator instance living on the pipeline's worker.
pub struct PipelineValidator {
    id: InstanceId,
    shared: Arc<Shared>,
    state: Arc<Mutex<InstanceState>>,
    ready: watch::Receiver<Option<bool>>,
}

impl PipelineValidator {
    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn phase(&self) -> Phase {
        lock(&self.state).phase
    }

    /// Resolves once initialization settles: `true` on success. A failed
    /// instance never answers further calls.
    pub async fn initialized(&self) -> bool {
        let mut ready = self.ready.clone();
        match ready.wait_for(Option::is_some).await {
            Ok(settled) => settled.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Diagnose `value` against `selector`. `None` means valid.
    ///
    /// On a failed instance the returned future never resolves.
    pub async fn diagnose(
        &self,
        selector: impl Into<TypeSelector>,
        value: Value,
    ) -> Result<Option<Vec<String>>, PipelineError> {
        let request = Request::Diagnose {
            selector: selector.into(),
            value,
        };
        let (reply, answer) = oneshot::channel();
        let accepted = {
            let mut state = lock(&self.state);
            match state.phase {
                Phase::Uninitialized | Phase::Initializing => {
                    state.buffered.push((request, reply));
                    true
                }
                Phase::Ready => {
                    state.waiting.push_back(Waiter::Call(reply));
                    if !self.shared.send(self.id, request) {
                        state.waiting.pop_back();
                        return Err(PipelineError::Closed);
                    }
                    true
                }
                Phase::Failed => false,
            }
        };
        if !accepted {
            return std::future::pending().await;
        }

        match answer.await {
            Ok(result) => result,
            Err(_) if self.phase() == Phase::Failed => std::future::pending().await,
            Err(_) => Err(PipelineError::Closed),
        }
    }

    /// Fail with [`PipelineError::Invalid`] carrying the reasons when the
    /// value has diagnostics.
    pub async fn validate(&self, selector: impl Into<TypeSelector>, value: Value) -> Result<(), PipelineError> {
        match self.diagnose(selector, value).await? {
            None => Ok(()),
            Some(reasons) => Err(PipelineError::Invalid { reasons }),
        }
    }

    /// `true` when the value has no diagnostics.
    pub async fn test(&self, selector: impl Into<TypeSelector>, value: Value) -> Result<bool, PipelineError> {
        Ok(self.diagnose(selector, value).await?.is_none())
    }
}

impl Drop for PipelineValidator {
    fn drop(&mut self) {
        let idle = {
            let mut state = lock(&self.state);
            state.released = true;
            state.waiting.is_empty()
        };
        self.shared.send(self.id, Request::Release);
        if idle {
            self.shared.forget(self.id);
        }
        debug!(instance = %self.id, "validator released");
    }
}

impl std::fmt::Debug for PipelineValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineValidator")
            .field("id", &self.id)
            .field("phase", &self.phase())
            .finish()
    }
}
