//! Rejection reasons carried in responses

use serde::{Deserialize, Serialize};
use sgw_capability::Capability;

/// Why a mutation request did not apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RpcFailure {
    /// Worklet lacks the capability the operation requires
    #[error("capability denied: {capability} is required")]
    CapabilityDenied { capability: Capability },

    /// Target node is stale or missing, or the arguments are malformed
    #[error("invalid target: {reason}")]
    InvalidTarget { reason: String },

    /// Worklet was terminated before the request completed
    #[error("worklet terminated")]
    WorkletTerminated,
}

/// Coarse classification of [`RpcFailure`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    CapabilityDenied,
    InvalidTarget,
    WorkletTerminated,
}

impl RpcFailure {
    #[inline]
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::CapabilityDenied { .. } => FailureKind::CapabilityDenied,
            Self::InvalidTarget { .. } => FailureKind::InvalidTarget,
            Self::WorkletTerminated => FailureKind::WorkletTerminated,
        }
    }

    /// Build an `InvalidTarget` from any displayable reason
    #[inline]
    pub fn invalid_target(reason: impl ToString) -> Self {
        Self::InvalidTarget {
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_capability() {
        let err = RpcFailure::CapabilityDenied {
            capability: Capability::Textures,
        };
        assert_eq!(err.to_string(), "capability denied: textures is required");
        assert_eq!(err.kind(), FailureKind::CapabilityDenied);
    }

    #[test]
    fn wire_shape_is_tagged() {
        let json = serde_json::to_value(RpcFailure::invalid_target("stale")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "kind": "invalid_target", "reason": "stale" })
        );
    }
}
