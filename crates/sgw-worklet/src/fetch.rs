//! Script fetching
//!
//! Network access belongs to the embedding application; the host only needs
//! something that turns a `src` URL into script text.

use crate::error::FetchError;
use async_trait::async_trait;
use std::fmt::Debug;
use std::path::PathBuf;

/// Resolves a worklet `src` URL to script text
#[async_trait]
pub trait ScriptFetcher: Send + Sync + Debug {
    /// Fetch the script at `url`
    ///
    /// # Errors
    /// Any `FetchError`; the caller surfaces it as a script load failure.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Serves `file://` URLs and relative paths from a base directory
#[derive(Debug, Clone)]
pub struct FileFetcher {
    base: PathBuf,
}

impl FileFetcher {
    #[must_use]
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn resolve(&self, url: &str) -> Result<PathBuf, FetchError> {
        let url = url.trim();
        if let Some(path) = url.strip_prefix("file://") {
            return Ok(PathBuf::from(path));
        }
        if let Some((scheme, _)) = url.split_once("://") {
            return Err(FetchError::UnsupportedScheme(scheme.to_string()));
        }
        Ok(self.base.join(url))
    }
}

#[async_trait]
impl ScriptFetcher for FileFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let path = self.resolve(url)?;
        tracing::debug!(url, path = %path.display(), "fetching worklet script");
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| FetchError::Io { path, source })
    }
}
