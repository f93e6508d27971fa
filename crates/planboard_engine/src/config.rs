//! Engine configuration (the `[engine]` table of `planboard.toml`).

use crate::error::Result;
use crate::horizon::{Horizon, DEFAULT_PERIODS, DEFAULT_ROLLUP_PERIODS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Ordered period keys
    pub periods: Vec<String>,

    /// Leading periods summed by the rollup metrics
    pub rollup_periods: usize,

    /// Coalescing window for queued session commands. 0 coalesces within
    /// one scheduling tick only.
    pub debounce_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            periods: DEFAULT_PERIODS.iter().map(|p| p.to_string()).collect(),
            rollup_periods: DEFAULT_ROLLUP_PERIODS,
            debounce_ms: 0,
        }
    }
}

impl EngineConfig {
    pub fn horizon(&self) -> Result<Horizon> {
        Horizon::new(&self.periods, self.rollup_periods)
    }

    pub fn debounce(&self) -> Option<Duration> {
        (self.debounce_ms > 0).then(|| Duration::from_millis(self.debounce_ms))
    }
}
