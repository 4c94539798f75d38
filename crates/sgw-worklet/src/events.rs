//! Host-observable bridge events

use serde::{Deserialize, Serialize};
use sgw_scene::{Generation, Mutation, NodeRef};
use std::fmt;
use uuid::Uuid;

/// Worklet identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkletId(pub Uuid);

impl WorkletId {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, for thread names and log lines
    #[must_use]
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for WorkletId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WorkletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Events broadcast to observers of a host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum BridgeEvent {
    /// Worklet finished bootstrapping (fires once per worklet)
    WorkletCreated { worklet: WorkletId },
    /// Worklet was torn down; `rejected` pending futures were failed, or
    /// `None` if the sandbox thread did not report in time
    WorkletTerminated {
        worklet: WorkletId,
        rejected: Option<usize>,
    },
    /// Sandbox posted an application-visible message
    Message {
        worklet: WorkletId,
        data: serde_json::Value,
    },
    /// A script callback raised an uncaught error
    ScriptError { worklet: WorkletId, message: String },
    /// A model finished loading and is fully queryable
    Load {
        generation: Generation,
        url: Option<String>,
    },
    /// A worklet mutation was applied to the live model
    SceneMutated {
        worklet: WorkletId,
        target: NodeRef,
        mutation: Mutation,
    },
}

impl BridgeEvent {
    /// Event name as a DOM-style string
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::WorkletCreated { .. } => "worklet-created",
            Self::WorkletTerminated { .. } => "worklet-terminated",
            Self::Message { .. } => "message",
            Self::ScriptError { .. } => "script-error",
            Self::Load { .. } => "load",
            Self::SceneMutated { .. } => "scene-mutated",
        }
    }
}
