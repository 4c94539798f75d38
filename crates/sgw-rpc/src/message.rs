//! Wire schema

use crate::error::RpcFailure;
use serde::{Deserialize, Serialize};
use sgw_capability::Capability;
use sgw_scene::{ModelSummary, Mutation, NodeRef};
use std::fmt;

/// Correlation id of one mutation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Mutation request: sandbox -> host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub id: RequestId,
    pub target: NodeRef,
    pub mutation: Mutation,
}

impl RpcRequest {
    /// Capability the host must find before applying this request
    #[inline]
    #[must_use]
    pub fn required_capability(&self) -> Capability {
        required_capability(&self.mutation)
    }
}

/// Completion of a request: host -> sandbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub id: RequestId,
    pub result: Result<(), RpcFailure>,
}

impl RpcResponse {
    #[inline]
    #[must_use]
    pub fn applied(id: RequestId) -> Self {
        Self { id, result: Ok(()) }
    }

    #[inline]
    #[must_use]
    pub fn failed(id: RequestId, failure: RpcFailure) -> Self {
        Self {
            id,
            result: Err(failure),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_applied(&self) -> bool {
        self.result.is_ok()
    }
}

/// Messages delivered into the sandbox
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum ToWorklet {
    /// A model finished loading (or was swapped)
    ModelChange(ModelSummary),
    /// A previously issued request completed
    Response(RpcResponse),
    /// Tear down the sandbox
    Terminate,
}

/// Messages emitted by the sandbox
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum FromWorklet {
    /// Proxy write to apply on the live model
    Request(RpcRequest),
    /// Application-visible message (gated by `messaging`)
    PostMessage(serde_json::Value),
    /// Uncaught error inside a script callback
    ScriptError(String),
}

/// Capability guarding each mutation
#[must_use]
pub fn required_capability(mutation: &Mutation) -> Capability {
    match mutation {
        Mutation::SetBaseColorFactor(_)
        | Mutation::SetMetallicFactor(_)
        | Mutation::SetRoughnessFactor(_) => Capability::MaterialProperties,
        Mutation::SetImageUri(_) => Capability::Textures,
    }
}
