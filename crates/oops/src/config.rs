//! Trace capture configuration.
//!
//! Compile-time defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Programmatic overrides (`RuntimeCapturer::with_depth`, builder methods)
//! 2. Environment variables, read once on first capture
//! 3. Library defaults ([`defaults`])
//!
//! # Example
//!
//! ```rust
//! use oops::config::TraceConfig;
//!
//! let config = TraceConfig::from_env().max_frames(32);
//! assert_eq!(config.max_frames, 32);
//! ```

use std::str::FromStr;
use std::sync::OnceLock;

/// Library defaults.
pub mod defaults {
    /// Frames kept per trace by the default capturer.
    pub const TRACE_DEPTH: usize = 10;
    /// Raw frames walked while looking for the capture anchor.
    pub const TRACE_SCAN: usize = 128;
}

/// Stack capture limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceConfig {
    /// Maximum frames kept in a captured [`crate::Frames`].
    pub max_frames: usize,
    /// Maximum raw frames walked per capture. Frames past this limit are
    /// never seen, so it bounds `skip + max_frames` as well.
    pub scan_limit: usize,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl TraceConfig {
    /// Defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `OOPS_TRACE_DEPTH` - Frames kept per trace
    /// - `OOPS_TRACE_SCAN` - Raw frames walked per capture
    pub fn from_env() -> Self {
        Self {
            max_frames: env_get("OOPS_TRACE_DEPTH", defaults::TRACE_DEPTH),
            scan_limit: env_get("OOPS_TRACE_SCAN", defaults::TRACE_SCAN),
        }
    }

    pub fn max_frames(mut self, n: usize) -> Self {
        self.max_frames = n;
        self
    }

    pub fn scan_limit(mut self, n: usize) -> Self {
        self.scan_limit = n;
        self
    }
}

/// Process-wide config, read from the environment on first use.
pub(crate) fn global() -> &'static TraceConfig {
    static CONFIG: OnceLock<TraceConfig> = OnceLock::new();
    CONFIG.get_or_init(TraceConfig::from_env)
}

/// Get environment variable parsed as type T, or return default.
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
