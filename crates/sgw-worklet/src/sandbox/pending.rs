//! Script-visible futures for outstanding RPC requests

use super::proxy::Mirror;
use super::Shared;
use rhai::{Dynamic, FnPtr, INT};
use sgw_rpc::{FromWorklet, RequestId, RpcFailure, RpcRequest};
use sgw_scene::{Mutation, NodeRef};
use std::cell::RefCell;
use std::rc::Rc;

enum SlotState {
    Waiting {
        on_ok: Vec<FnPtr>,
        on_err: Vec<FnPtr>,
    },
    Fulfilled,
    Rejected(String),
}

/// Write to replay on the local mirror once the host accepts it
struct Effect {
    mirror: Rc<Mirror>,
    target: NodeRef,
    mutation: Mutation,
}

/// Settlement state of one request, shared by the table and the script
pub(crate) struct PendingSlot {
    state: RefCell<SlotState>,
    effect: Option<Effect>,
}

impl PendingSlot {
    fn new(effect: Option<Effect>) -> Self {
        Self {
            state: RefCell::new(SlotState::Waiting {
                on_ok: Vec::new(),
                on_err: Vec::new(),
            }),
            effect,
        }
    }

    fn is_settled(&self) -> bool {
        !matches!(*self.state.borrow(), SlotState::Waiting { .. })
    }

    /// Resolve or reject, queueing the registered continuations
    ///
    /// Settling twice is a no-op.
    pub(crate) fn settle(&self, shared: &Shared, result: Result<(), RpcFailure>) {
        if self.is_settled() {
            return;
        }
        let next = match &result {
            Ok(()) => SlotState::Fulfilled,
            Err(failure) => SlotState::Rejected(failure.to_string()),
        };
        let SlotState::Waiting { on_ok, on_err } = self.state.replace(next) else {
            return;
        };
        match result {
            Ok(()) => {
                if let Some(effect) = &self.effect {
                    effect.replay();
                }
                for callback in on_ok {
                    shared.enqueue(callback, Dynamic::UNIT);
                }
            }
            Err(failure) => {
                let reason = failure.to_string();
                if on_err.is_empty() {
                    tracing::debug!(worklet = %shared.worklet, %reason, "unhandled rejection");
                }
                for callback in on_err {
                    shared.enqueue(callback, Dynamic::from(reason.clone()));
                }
            }
        }
    }

    /// Reject without running any continuation
    pub(crate) fn abandon(&self, failure: &RpcFailure) {
        if !self.is_settled() {
            self.state.replace(SlotState::Rejected(failure.to_string()));
        }
    }

    fn subscribe(&self, shared: &Shared, ok: Option<FnPtr>, err: Option<FnPtr>) {
        let mut state = self.state.borrow_mut();
        match &mut *state {
            SlotState::Waiting { on_ok, on_err } => {
                on_ok.extend(ok);
                on_err.extend(err);
            }
            SlotState::Fulfilled => {
                if let Some(callback) = ok {
                    shared.enqueue(callback, Dynamic::UNIT);
                }
            }
            SlotState::Rejected(reason) => {
                if let Some(callback) = err {
                    shared.enqueue(callback, Dynamic::from(reason.clone()));
                }
            }
        }
    }
}

impl Effect {
    fn replay(&self) {
        if let Err(e) = self.mirror.graph.borrow_mut().apply(self.target, &self.mutation) {
            tracing::trace!(node = %self.target, error = %e, "mirror out of step with host");
        }
    }
}

/// Handle returned to scripts by every mutating call
#[derive(Clone)]
pub(crate) struct Pending {
    shared: Rc<Shared>,
    slot: Rc<PendingSlot>,
    id: Option<RequestId>,
}

impl Pending {
    /// Register a request and send it to the host
    pub(crate) fn issue(
        shared: &Rc<Shared>,
        mirror: &Rc<Mirror>,
        target: NodeRef,
        mutation: Mutation,
    ) -> Self {
        if shared.terminated.get() {
            return Self::rejected(shared, &RpcFailure::WorkletTerminated);
        }
        let slot = Rc::new(PendingSlot::new(Some(Effect {
            mirror: Rc::clone(mirror),
            target,
            mutation: mutation.clone(),
        })));
        let id = shared.pending.borrow_mut().issue(Rc::clone(&slot));
        tracing::trace!(worklet = %shared.worklet, request = %id, node = %target, %mutation, "request issued");
        let request = RpcRequest {
            id,
            target,
            mutation,
        };
        if !shared.send(FromWorklet::Request(request)) {
            // host endpoint is gone; nobody will ever answer
            let _ = shared.pending.borrow_mut().settle(id);
            slot.abandon(&RpcFailure::WorkletTerminated);
        }
        Self {
            shared: Rc::clone(shared),
            slot,
            id: Some(id),
        }
    }

    /// A future that failed before anything was sent
    pub(crate) fn rejected(shared: &Rc<Shared>, failure: &RpcFailure) -> Self {
        let slot = Rc::new(PendingSlot::new(None));
        slot.abandon(failure);
        Self {
            shared: Rc::clone(shared),
            slot,
            id: None,
        }
    }

    /// `pending.then(|result| ...)`
    ///
    /// rhai closures need a named parameter; `|_|` does not parse. A
    /// zero-parameter closure (`|| ...`) is also accepted.
    pub(crate) fn then(&mut self, on_ok: FnPtr) -> Self {
        self.slot.subscribe(&self.shared, Some(on_ok), None);
        self.clone()
    }

    /// `pending.then(|result| ..., |reason| ...)`; `reason` is the failure text
    pub(crate) fn then_or(&mut self, on_ok: FnPtr, on_err: FnPtr) -> Self {
        self.slot.subscribe(&self.shared, Some(on_ok), Some(on_err));
        self.clone()
    }

    pub(crate) fn on_reject(&mut self, on_err: FnPtr) -> Self {
        self.slot.subscribe(&self.shared, None, Some(on_err));
        self.clone()
    }

    pub(crate) fn is_settled(&mut self) -> bool {
        self.slot.is_settled()
    }

    /// Request id, or `()` if no request was sent
    pub(crate) fn id(&mut self) -> Dynamic {
        self.id
            .and_then(|id| INT::try_from(id.0).ok())
            .map_or(Dynamic::UNIT, Dynamic::from_int)
    }
}
