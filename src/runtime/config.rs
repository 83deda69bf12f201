use serde::{Deserialize, Serialize};

use crate::runtime::error::ConfigError;

pub const DEFAULT_GC_THRESHOLD: usize = 10_000;

/// Collection settings for a [`HeapRuntime`](crate::runtime::heap_runtime::HeapRuntime).
///
/// Missing fields fall back to [`HeapConfig::default`], so `{}` is a valid
/// config document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeapConfig {
    /// Allocations between two automatic collections.
    pub gc_threshold: usize,
    /// Disables automatic collections entirely when `false`.
    pub gc_enabled: bool,
    /// Collect before every single allocation.
    pub torture: bool,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            gc_threshold: DEFAULT_GC_THRESHOLD,
            gc_enabled: true,
            torture: false,
        }
    }
}

impl HeapConfig {
    /// Parses a JSON config document.
    pub fn from_json(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(source)?)
    }

    /// Config that collects before every allocation.
    pub fn torture() -> Self {
        Self {
            torture: true,
            ..Self::default()
        }
    }
}
