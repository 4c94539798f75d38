//! Sandbox limits and lifecycle timing

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-worklet configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkletConfig {
    /// Maximum rhai operations per script entry (top level or one callback)
    pub max_operations: u64,
    /// Maximum function call depth
    pub max_call_levels: usize,
    /// Maximum expression nesting depth
    pub max_expr_depth: usize,
    /// Maximum string length in bytes
    pub max_string_size: usize,
    /// Maximum array length
    pub max_array_size: usize,
    /// Maximum object map size
    pub max_map_size: usize,
    /// Lines of `print`/`debug` output kept per worklet
    pub console_capacity: usize,
    /// How long `terminate` waits for the sandbox thread to exit
    pub terminate_timeout_ms: u64,
    /// Stack size of the sandbox thread (platform default if unset)
    pub thread_stack_size: Option<usize>,
}

impl WorkletConfig {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With operation budget
    #[inline]
    #[must_use]
    pub fn with_max_operations(mut self, max: u64) -> Self {
        self.max_operations = max;
        self
    }

    /// With termination timeout
    #[inline]
    #[must_use]
    pub fn with_terminate_timeout(mut self, timeout: Duration) -> Self {
        self.terminate_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With console capacity
    #[inline]
    #[must_use]
    pub fn with_console_capacity(mut self, lines: usize) -> Self {
        self.console_capacity = lines;
        self
    }

    #[inline]
    #[must_use]
    pub fn terminate_timeout(&self) -> Duration {
        Duration::from_millis(self.terminate_timeout_ms)
    }
}

impl Default for WorkletConfig {
    fn default() -> Self {
        Self {
            max_operations: 1_000_000,
            max_call_levels: 64,
            max_expr_depth: 64,
            max_string_size: 1 << 20,
            max_array_size: 10_000,
            max_map_size: 10_000,
            console_capacity: 256,
            terminate_timeout_ms: 1_000,
            thread_stack_size: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders() {
        let config = WorkletConfig::new()
            .with_max_operations(10)
            .with_terminate_timeout(Duration::from_millis(250))
            .with_console_capacity(4);
        assert_eq!(config.max_operations, 10);
        assert_eq!(config.terminate_timeout(), Duration::from_millis(250));
        assert_eq!(config.console_capacity, 4);
    }

    #[test]
    fn partial_documents_keep_defaults() {
        let config: WorkletConfig = serde_json::from_str(r#"{ "max_operations": 5 }"#).unwrap();
        assert_eq!(config.max_operations, 5);
        assert_eq!(config.max_call_levels, WorkletConfig::default().max_call_levels);
    }
}
