//! Handle to a running worklet

use crate::events::{BridgeEvent, WorkletId};
use sgw_capability::CapabilitySet;
use sgw_rpc::ToWorklet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, Mutex};

/// Final report of a worklet thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkletExit {
    /// Pending futures failed with `WorkletTerminated`; `None` if the thread
    /// never reported (it timed out or died)
    pub rejected: Option<usize>,
}

/// Host-side handle to one sandbox
///
/// Dropping the handle stops the sandbox without waiting for it.
#[derive(Debug)]
pub struct Worklet {
    id: WorkletId,
    capabilities: CapabilitySet,
    to_worklet: mpsc::UnboundedSender<ToWorklet>,
    abort: Arc<AtomicBool>,
    live: Arc<AtomicBool>,
    exit: Mutex<Option<oneshot::Receiver<WorkletExit>>>,
    events: broadcast::Sender<BridgeEvent>,
    terminate_timeout: Duration,
}

impl Worklet {
    pub(crate) fn new(
        id: WorkletId,
        capabilities: CapabilitySet,
        to_worklet: mpsc::UnboundedSender<ToWorklet>,
        abort: Arc<AtomicBool>,
        exit: oneshot::Receiver<WorkletExit>,
        events: broadcast::Sender<BridgeEvent>,
        terminate_timeout: Duration,
    ) -> Self {
        Self {
            id,
            capabilities,
            to_worklet,
            abort,
            live: Arc::new(AtomicBool::new(true)),
            exit: Mutex::new(Some(exit)),
            events,
            terminate_timeout,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> WorkletId {
        self.id
    }

    /// Capabilities fixed at creation
    #[inline]
    #[must_use]
    pub fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    /// False once termination has begun
    #[inline]
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Liveness flag for dispatch loops that outlive a borrow of the handle
    #[must_use]
    pub fn live_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.live)
    }

    /// Deliver a message; false if the worklet is terminating or gone
    pub fn notify(&self, message: ToWorklet) -> bool {
        self.is_live() && self.to_worklet.send(message).is_ok()
    }

    /// Stop the sandbox and wait (bounded) for its thread to report
    ///
    /// Any script currently running is interrupted, outstanding requests are
    /// rejected, and no callback runs afterwards. Returns `None` if the
    /// worklet was already terminated.
    pub async fn terminate(&self) -> Option<WorkletExit> {
        let mut exit = self.exit.lock().await;
        let receiver = exit.take()?;
        self.live.store(false, Ordering::SeqCst);
        self.abort.store(true, Ordering::SeqCst);
        let _ = self.to_worklet.send(ToWorklet::Terminate);

        let report = match tokio::time::timeout(self.terminate_timeout, receiver).await {
            Ok(Ok(report)) => report,
            Ok(Err(_)) => {
                tracing::warn!(worklet = %self.id, "worklet thread exited without a report");
                WorkletExit { rejected: None }
            }
            Err(_) => {
                tracing::warn!(
                    worklet = %self.id,
                    timeout = ?self.terminate_timeout,
                    "worklet did not stop in time; detaching"
                );
                WorkletExit { rejected: None }
            }
        };
        tracing::info!(worklet = %self.id, rejected = ?report.rejected, "worklet terminated");
        let _ = self.events.send(BridgeEvent::WorkletTerminated {
            worklet: self.id,
            rejected: report.rejected,
        });
        Some(report)
    }
}

impl Drop for Worklet {
    fn drop(&mut self) {
        if self.live.swap(false, Ordering::SeqCst) {
            self.abort.store(true, Ordering::SeqCst);
            let _ = self.to_worklet.send(ToWorklet::Terminate);
            tracing::debug!(worklet = %self.id, "worklet handle dropped while live");
        }
    }
}
