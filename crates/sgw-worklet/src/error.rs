//! Worklet lifecycle errors

use std::path::PathBuf;

/// Failure fetching an external worklet script
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// URL scheme is not served by this fetcher
    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    /// Nothing published at this URL
    #[error("not found: {0}")]
    NotFound(String),

    /// Reading the resolved file failed
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors creating or driving a worklet
#[derive(Debug, thiserror::Error)]
pub enum WorkletError {
    /// External script could not be fetched
    #[error("failed to load worklet script {url}: {source}")]
    ScriptLoad {
        url: String,
        #[source]
        source: FetchError,
    },

    /// Script failed to compile or its top level raised an error
    #[error("worklet script error: {0}")]
    Script(String),

    /// Sandbox thread could not be started
    #[error("failed to spawn worklet thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// Sandbox thread went away before reporting readiness
    #[error("worklet exited during bootstrap")]
    Bootstrap,
}

impl WorkletError {
    /// True for `ScriptLoadError`
    #[inline]
    #[must_use]
    pub fn is_script_load(&self) -> bool {
        matches!(self, Self::ScriptLoad { .. })
    }
}
