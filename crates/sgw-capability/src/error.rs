//! Capability parsing errors

/// Errors raised by strict capability parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CapabilityError {
    /// Token is not part of the known capability set
    #[error("unknown capability token: {0:?}")]
    UnknownToken(String),
}
