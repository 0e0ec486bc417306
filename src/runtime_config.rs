//! # Runtime Configuration
//!
//! Coroutine settings read from the environment at startup.
//!
//! ## `SPECGATE_STACK_SIZE`
//!
//! Stack size of every handler coroutine, decimal (`32768`) or hex
//! (`0x8000`). Default: `0x8000` (32 KB). Invalid values fall back to the
//! default.
//!
//! Memory used by handlers is roughly `stack_size * registered methods`,
//! plus one stack per in-flight connection coroutine.

use std::env;

pub const STACK_SIZE_VAR: &str = "SPECGATE_STACK_SIZE";
pub const DEFAULT_STACK_SIZE: usize = 0x8000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Stack size for handler coroutines in bytes
    pub stack_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

/// Parse a decimal or `0x`-prefixed hex size.
pub fn parse_size(raw: &str) -> Option<usize> {
    let raw = raw.trim();
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        let stack_size = env::var(STACK_SIZE_VAR)
            .ok()
            .and_then(|v| parse_size(&v))
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_STACK_SIZE);
        RuntimeConfig { stack_size }
    }

    /// Apply to the global `may` scheduler configuration.
    pub fn apply(&self) {
        may::config().set_stack_size(self.stack_size);
    }
}
