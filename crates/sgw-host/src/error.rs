//! Host errors

use sgw_capability::CapabilityError;
use sgw_scene::SceneError;
use sgw_worklet::{WorkletError, WorkletId};

/// Errors surfaced by [`crate::SceneHost`] operations
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Creating or driving a worklet failed
    #[error(transparent)]
    Worklet(#[from] WorkletError),

    /// `allow` attribute rejected under strict parsing
    #[error("invalid allow attribute: {0}")]
    Capability(#[from] CapabilityError),

    /// Model could not be loaded or exported
    #[error("scene error: {0}")]
    Scene(#[from] SceneError),

    /// Second worklet attached under the `reject` policy
    #[error("worklet {0} is already active")]
    WorkletAlreadyActive(WorkletId),

    /// Operation needs a loaded model
    #[error("no model loaded")]
    NoModel,

    /// Configuration could not be read or parsed
    #[error("configuration error: {0}")]
    Config(String),
}

impl HostError {
    /// True if the host is still usable after this error
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::Worklet(WorkletError::Spawn(_) | WorkletError::Bootstrap) | Self::Config(_)
        )
    }

    /// True for `ScriptLoadError`
    #[inline]
    #[must_use]
    pub fn is_script_load(&self) -> bool {
        matches!(self, Self::Worklet(e) if e.is_script_load())
    }
}
