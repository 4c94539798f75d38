//! rhai sandbox runtime
//!
//! One [`SandboxRuntime`] lives on one worklet thread and is never shared.
//! Script callbacks (event listeners and pending-future continuations) are
//! queued as jobs and drained after every message, so a script never
//! re-enters itself while a callback is running.

mod api;
mod pending;
mod proxy;

use crate::config::WorkletConfig;
use crate::error::WorkletError;
use crate::events::WorkletId;
use pending::PendingSlot;
use proxy::ModelChangeEvent;
use rhai::{Dynamic, Engine, EvalAltResult, FnPtr, AST};
use sgw_capability::CapabilitySet;
use sgw_rpc::{FromWorklet, PendingTable, RpcFailure, RpcResponse, ToWorklet};
use sgw_scene::{ModelGraph, ModelSummary};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Event fired on every model load or swap
pub const MODEL_CHANGE: &str = "model-change";

/// Whether the worklet loop should keep receiving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep processing messages
    Continue,
    /// Termination was requested
    Stop,
}

struct Job {
    callback: FnPtr,
    arg: Dynamic,
}

/// State reachable from registered functions and proxies
pub(crate) struct Shared {
    worklet: WorkletId,
    capabilities: CapabilitySet,
    outbox: mpsc::UnboundedSender<FromWorklet>,
    pending: RefCell<PendingTable<Rc<PendingSlot>>>,
    jobs: RefCell<VecDeque<Job>>,
    listeners: RefCell<Vec<(String, FnPtr)>>,
    console: RefCell<VecDeque<String>>,
    console_capacity: usize,
    terminated: Cell<bool>,
}

impl Shared {
    fn new(
        worklet: WorkletId,
        capabilities: CapabilitySet,
        outbox: mpsc::UnboundedSender<FromWorklet>,
        console_capacity: usize,
    ) -> Self {
        Self {
            worklet,
            capabilities,
            outbox,
            pending: RefCell::new(PendingTable::new()),
            jobs: RefCell::new(VecDeque::new()),
            listeners: RefCell::new(Vec::new()),
            console: RefCell::new(VecDeque::new()),
            console_capacity,
            terminated: Cell::new(false),
        }
    }

    pub(crate) fn enqueue(&self, callback: FnPtr, arg: Dynamic) {
        self.jobs.borrow_mut().push_back(Job { callback, arg });
    }

    pub(crate) fn send(&self, message: FromWorklet) -> bool {
        self.outbox.send(message).is_ok()
    }

    pub(crate) fn console_line(&self, line: String) {
        if self.console_capacity == 0 {
            return;
        }
        let mut console = self.console.borrow_mut();
        while console.len() >= self.console_capacity {
            console.pop_front();
        }
        console.push_back(line);
    }

    fn listeners_for(&self, event: &str) -> Vec<FnPtr> {
        self.listeners
            .borrow()
            .iter()
            .filter(|(name, _)| name == event)
            .map(|(_, callback)| callback.clone())
            .collect()
    }
}

/// A compiled worklet script plus its proxy bridge
pub struct SandboxRuntime {
    engine: Engine,
    ast: AST,
    shared: Rc<Shared>,
}

impl SandboxRuntime {
    /// Compile `source` and run its top level
    ///
    /// `abort` is polled while script code runs; raising it interrupts the
    /// script at the next operation.
    ///
    /// # Errors
    /// - `WorkletError::Script` if the script fails to compile or its top level raises
    pub fn new(
        worklet: WorkletId,
        source: &str,
        capabilities: CapabilitySet,
        outbox: mpsc::UnboundedSender<FromWorklet>,
        config: &WorkletConfig,
        abort: Arc<AtomicBool>,
    ) -> Result<Self, WorkletError> {
        let shared = Rc::new(Shared::new(
            worklet,
            capabilities,
            outbox,
            config.console_capacity,
        ));

        let mut engine = Engine::new();
        engine.set_max_operations(config.max_operations);
        engine.set_max_call_levels(config.max_call_levels);
        engine.set_max_expr_depths(config.max_expr_depth, config.max_expr_depth);
        engine.set_max_string_size(config.max_string_size);
        engine.set_max_array_size(config.max_array_size);
        engine.set_max_map_size(config.max_map_size);
        engine.on_progress(move |_| {
            abort
                .load(Ordering::Relaxed)
                .then(|| Dynamic::from("worklet terminated"))
        });

        let console = Rc::clone(&shared);
        engine.on_print(move |text| {
            tracing::info!(target: "sgw::sandbox", worklet = %console.worklet, "{text}");
            console.console_line(text.to_string());
        });
        let console = Rc::clone(&shared);
        engine.on_debug(move |text, _source, pos| {
            tracing::debug!(target: "sgw::sandbox", worklet = %console.worklet, %pos, "{text}");
            console.console_line(format!("[debug] {text}"));
        });

        api::register(&mut engine, &shared);

        let ast = engine
            .compile(source)
            .map_err(|e| WorkletError::Script(format!("compile error: {e}")))?;
        engine
            .run_ast(&ast)
            .map_err(|e| WorkletError::Script(e.to_string()))?;

        let runtime = Self {
            engine,
            ast,
            shared,
        };
        runtime.run_jobs();
        tracing::debug!(
            worklet = %worklet,
            capabilities = %capabilities,
            listeners = runtime.shared.listeners.borrow().len(),
            "sandbox ready"
        );
        Ok(runtime)
    }

    /// Process one message from the host
    pub fn handle(&mut self, message: ToWorklet) -> Flow {
        if self.shared.terminated.get() {
            return Flow::Stop;
        }
        match message {
            ToWorklet::ModelChange(summary) => self.model_changed(summary),
            ToWorklet::Response(response) => self.complete(response),
            ToWorklet::Terminate => return Flow::Stop,
        }
        self.run_jobs();
        Flow::Continue
    }

    /// Stop running script code and fail every outstanding request
    ///
    /// Returns the number of pending futures rejected. Callbacks are not run
    /// after termination. Idempotent.
    pub fn terminate(&mut self) -> usize {
        if self.shared.terminated.replace(true) {
            return 0;
        }
        let drained = self.shared.pending.borrow_mut().drain();
        let rejected = drained.len();
        for (_, slot) in drained {
            slot.abandon(&RpcFailure::WorkletTerminated);
        }
        self.shared.jobs.borrow_mut().clear();
        self.shared.listeners.borrow_mut().clear();
        tracing::debug!(worklet = %self.shared.worklet, rejected, "sandbox terminated");
        rejected
    }

    /// Recent `print`/`debug`/error lines
    #[must_use]
    pub fn console(&self) -> Vec<String> {
        self.shared.console.borrow().iter().cloned().collect()
    }

    /// Requests awaiting a response
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.shared.pending.borrow().len()
    }

    /// Registered listeners for `event`
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.shared
            .listeners
            .borrow()
            .iter()
            .filter(|(name, _)| name == event)
            .count()
    }

    /// Whether [`terminate`](Self::terminate) has run
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.shared.terminated.get()
    }

    fn model_changed(&self, summary: ModelSummary) {
        let generation = summary.generation;
        let event = ModelChangeEvent::new(&self.shared, ModelGraph::from_summary(summary));
        let listeners = self.shared.listeners_for(MODEL_CHANGE);
        tracing::debug!(
            worklet = %self.shared.worklet,
            %generation,
            listeners = listeners.len(),
            "dispatching model-change"
        );
        for listener in listeners {
            self.invoke(&listener, Dynamic::from(event.clone()));
        }
    }

    fn complete(&self, response: RpcResponse) {
        let slot = self.shared.pending.borrow_mut().settle(response.id);
        match slot {
            Some(slot) => slot.settle(&self.shared, response.result),
            None => tracing::debug!(
                worklet = %self.shared.worklet,
                request = %response.id,
                "response for unknown or settled request"
            ),
        }
    }

    fn run_jobs(&self) {
        loop {
            if self.shared.terminated.get() {
                break;
            }
            let job = self.shared.jobs.borrow_mut().pop_front();
            let Some(job) = job else { break };
            self.invoke(&job.callback, job.arg);
        }
    }

    /// Call a script callback with one argument, falling back to none for
    /// zero-parameter closures.
    fn invoke(&self, callback: &FnPtr, arg: Dynamic) {
        let outcome = match callback.call::<Dynamic>(&self.engine, &self.ast, (arg,)) {
            Err(err) if arity_mismatch(callback, &err) => {
                match callback.call::<Dynamic>(&self.engine, &self.ast, ()) {
                    // neither arity exists; the one-argument error is the useful one
                    Err(retry) if arity_mismatch(callback, &retry) => Err(err),
                    other => other,
                }
            }
            other => other,
        };
        if let Err(err) = outcome {
            self.report(&err);
        }
    }

    fn report(&self, err: &EvalAltResult) {
        if matches!(err, EvalAltResult::ErrorTerminated(..)) {
            tracing::debug!(worklet = %self.shared.worklet, "script interrupted");
            return;
        }
        let message = err.to_string();
        tracing::warn!(target: "sgw::sandbox", worklet = %self.shared.worklet, %message, "uncaught script error");
        self.shared.console_line(format!("[error] {message}"));
        if !self.shared.terminated.get() {
            self.shared.send(FromWorklet::ScriptError(message));
        }
    }
}

/// The callback itself has no overload for the supplied argument count
fn arity_mismatch(callback: &FnPtr, err: &EvalAltResult) -> bool {
    matches!(
        err,
        EvalAltResult::ErrorFunctionNotFound(signature, _)
            if signature.split_whitespace().next() == Some(callback.fn_name())
    )
}
