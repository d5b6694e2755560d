//! Configuration for signature normalization and the execution correlator.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Controls which argument literal values survive into a signature.
///
/// Argument values are elided by default to keep signature cardinality
/// bounded. Enum and boolean literals are low-cardinality and may be
/// retained when the consuming application wants them distinguished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignaturePolicy {
    /// Keep enum literal argument values (e.g. `role: ADMIN`).
    pub retain_enum_literals: bool,
    /// Keep boolean literal argument values (e.g. `active: true`).
    pub retain_boolean_literals: bool,
}

/// Tunables for execution-record bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelatorConfig {
    /// Seconds after which an execution that never signalled completion is
    /// force-sealed as incomplete and evicted.
    pub abandoned_timeout_secs: u64,
}

impl Default for CorrelatorConfig {
    fn default() -> Self {
        Self {
            abandoned_timeout_secs: 30,
        }
    }
}

impl CorrelatorConfig {
    /// The abandoned-execution timeout as a [`Duration`].
    pub fn abandoned_timeout(&self) -> Duration {
        Duration::from_secs(self.abandoned_timeout_secs)
    }
}

/// Top-level configuration for the instrumentation library.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentationConfig {
    /// Signature normalization policy.
    pub signature: SignaturePolicy,
    /// Execution correlator tunables.
    pub correlator: CorrelatorConfig,
    /// Capacity of the per-shape signature cache.
    pub signature_cache_size: SignatureCacheSize,
}

/// Newtype so the cache size can carry its own serde default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureCacheSize(pub usize);

impl Default for SignatureCacheSize {
    fn default() -> Self {
        Self(1024)
    }
}

impl InstrumentationConfig {
    /// Load configuration from a YAML document.
    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }
}
