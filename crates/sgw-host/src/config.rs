//! Host configuration
//!
//! Read from TOML. Every field has a default, so an empty document is valid:
//!
//! ```toml
//! capability_parsing = "strict"
//! replacement = "reject"
//! event_capacity = 512
//!
//! [worklet]
//! max_operations = 200000
//! terminate_timeout_ms = 500
//! ```

use crate::error::HostError;
use serde::{Deserialize, Serialize};
use sgw_capability::{CapabilityError, CapabilitySet};
use sgw_worklet::WorkletConfig;
use std::path::Path;

/// How the `allow` attribute treats unknown tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CapabilityParsing {
    /// Ignore unknown tokens
    #[default]
    Lenient,
    /// Reject the attribute on the first unknown token
    Strict,
}

impl CapabilityParsing {
    /// Parse an `allow` attribute under this policy
    ///
    /// # Errors
    /// `CapabilityError::UnknownToken` under `Strict` only.
    pub fn parse(self, allow: &str) -> Result<CapabilitySet, CapabilityError> {
        match self {
            Self::Lenient => Ok(CapabilitySet::parse(allow)),
            Self::Strict => CapabilitySet::parse_strict(allow),
        }
    }
}

/// What happens when a worklet script is attached while one is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReplacementPolicy {
    /// Terminate the active worklet, then create the new one
    #[default]
    Replace,
    /// Refuse the new script
    Reject,
}

/// Scene host configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Sandbox limits and lifecycle timing
    pub worklet: WorkletConfig,
    pub capability_parsing: CapabilityParsing,
    pub replacement: ReplacementPolicy,
    /// Buffered host events per subscriber
    pub event_capacity: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            worklet: WorkletConfig::default(),
            capability_parsing: CapabilityParsing::Lenient,
            replacement: ReplacementPolicy::Replace,
            event_capacity: 256,
        }
    }
}

impl HostConfig {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_worklet(mut self, worklet: WorkletConfig) -> Self {
        self.worklet = worklet;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_capability_parsing(mut self, parsing: CapabilityParsing) -> Self {
        self.capability_parsing = parsing;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_replacement(mut self, policy: ReplacementPolicy) -> Self {
        self.replacement = policy;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Parse a TOML document
    ///
    /// # Errors
    /// `HostError::Config` on malformed TOML or a zero event capacity.
    pub fn from_toml_str(document: &str) -> Result<Self, HostError> {
        let config: Self =
            toml::from_str(document).map_err(|e| HostError::Config(e.to_string()))?;
        if config.event_capacity == 0 {
            return Err(HostError::Config("event_capacity must be at least 1".into()));
        }
        Ok(config)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// `HostError::Config` if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, HostError> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path)
            .map_err(|e| HostError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&document)
    }
}
