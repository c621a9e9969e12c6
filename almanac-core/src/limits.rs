//! Engine limits
//!
//! Expanding a fractional cycle multiplies its length by the LCM of the
//! fraction denominators, so a cycle like "1.0000001 1.3333333" would ask
//! for tens of millions of entries. Every expansion is checked against
//! these bounds and fails with `CycleExpansionOverflow` instead.

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_EXPANDED_CYCLE_LEN: u64 = 1_000_000;
pub const DEFAULT_MAX_DENOMINATOR: u64 = 1_000_000;

pub const ENV_MAX_CYCLE_EXPANSION: &str = "ALMANAC_MAX_CYCLE_EXPANSION";
pub const ENV_MAX_DENOMINATOR: &str = "ALMANAC_MAX_DENOMINATOR";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    /// Most integer entries an expanded cycle may hold
    pub max_expanded_cycle_len: u64,
    /// Largest LCM of fraction denominators accepted
    pub max_denominator: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_expanded_cycle_len: DEFAULT_MAX_EXPANDED_CYCLE_LEN,
            max_denominator: DEFAULT_MAX_DENOMINATOR,
        }
    }
}

impl Limits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read overrides from the environment; missing or unparseable values keep the defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_expanded_cycle_len: read_env(ENV_MAX_CYCLE_EXPANSION)
                .unwrap_or(defaults.max_expanded_cycle_len),
            max_denominator: read_env(ENV_MAX_DENOMINATOR).unwrap_or(defaults.max_denominator),
        }
    }

    pub fn with_max_expanded_cycle_len(mut self, max: u64) -> Self {
        self.max_expanded_cycle_len = max;
        self
    }

    pub fn with_max_denominator(mut self, max: u64) -> Self {
        self.max_denominator = max;
        self
    }
}

fn read_env(key: &str) -> Option<u64> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(v) if v > 0 => Some(v),
        _ => {
            tracing::warn!(key, value = %raw, "ignoring invalid limit override");
            None
        }
    }
}
