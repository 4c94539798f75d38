//! Bidirectional transport between host and sandbox
//!
//! Two unbounded queues. The host side is async; the worklet side runs on
//! its own OS thread and blocks on [`WorkletEndpoint::recv`].

use crate::message::{FromWorklet, ToWorklet};
use tokio::sync::mpsc;

/// Host half of a worklet channel
#[derive(Debug)]
pub struct HostEndpoint {
    to_worklet: mpsc::UnboundedSender<ToWorklet>,
    from_worklet: mpsc::UnboundedReceiver<FromWorklet>,
}

/// Sandbox half of a worklet channel
#[derive(Debug)]
pub struct WorkletEndpoint {
    inbox: mpsc::UnboundedReceiver<ToWorklet>,
    outbox: mpsc::UnboundedSender<FromWorklet>,
}

/// Create a connected pair of endpoints
#[must_use]
pub fn channel() -> (HostEndpoint, WorkletEndpoint) {
    let (to_worklet, inbox) = mpsc::unbounded_channel();
    let (outbox, from_worklet) = mpsc::unbounded_channel();
    (
        HostEndpoint {
            to_worklet,
            from_worklet,
        },
        WorkletEndpoint { inbox, outbox },
    )
}

impl HostEndpoint {
    /// Cloneable sender for host -> worklet traffic
    #[must_use]
    pub fn sender(&self) -> mpsc::UnboundedSender<ToWorklet> {
        self.to_worklet.clone()
    }

    /// Send to the sandbox; false if it has gone away
    pub fn send(&self, message: ToWorklet) -> bool {
        self.to_worklet.send(message).is_ok()
    }

    /// Next message from the sandbox; `None` once it has exited
    pub async fn recv(&mut self) -> Option<FromWorklet> {
        self.from_worklet.recv().await
    }

    /// Split into raw halves (for dispatch loops that own the receiver)
    #[must_use]
    pub fn into_parts(
        self,
    ) -> (
        mpsc::UnboundedSender<ToWorklet>,
        mpsc::UnboundedReceiver<FromWorklet>,
    ) {
        (self.to_worklet, self.from_worklet)
    }
}

impl WorkletEndpoint {
    /// Block the current (non-async) thread until the host sends something
    ///
    /// Returns `None` when every host sender has been dropped.
    pub fn recv(&mut self) -> Option<ToWorklet> {
        self.inbox.blocking_recv()
    }

    /// Cloneable sender for worklet -> host traffic
    #[must_use]
    pub fn outbox(&self) -> mpsc::UnboundedSender<FromWorklet> {
        self.outbox.clone()
    }
}
