//! Scene errors

use crate::graph::{Generation, NodeKind};

/// Errors raised while loading, addressing or mutating a model
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    /// Model document could not be parsed
    #[error("invalid model document: {0}")]
    Parse(#[from] serde_json::Error),

    /// A texture or image index points outside the model
    #[error("{from} references missing {kind} {index}")]
    DanglingReference {
        from: String,
        kind: NodeKind,
        index: usize,
    },

    /// Proxy node belongs to a model that has since been replaced
    #[error("stale proxy: node belongs to generation {found}, current model is generation {current}")]
    StaleGeneration {
        current: Generation,
        found: Generation,
    },

    /// No node of this kind at this index
    #[error("{kind} {index} not found")]
    NodeNotFound { kind: NodeKind, index: u32 },

    /// Mutation applied to the wrong kind of node
    #[error("{mutation} cannot target a {found} (expects {expected})")]
    KindMismatch {
        mutation: &'static str,
        expected: NodeKind,
        found: NodeKind,
    },

    /// Mutation argument out of range or malformed
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Export collaborator failed
    #[error("export failed: {0}")]
    Export(String),
}

impl SceneError {
    /// True if the error came from addressing a node rather than its arguments
    #[inline]
    #[must_use]
    pub fn is_addressing(&self) -> bool {
        matches!(
            self,
            Self::StaleGeneration { .. } | Self::NodeNotFound { .. } | Self::KindMismatch { .. }
        )
    }
}
