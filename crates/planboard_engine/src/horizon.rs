//! Forecast horizon
//!
//! The ordered list of period keys the engine aggregates over, plus the
//! size of the leading rollup window used for summary metrics.

use crate::error::{EngineError, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

pub const DEFAULT_PERIODS: [&str; 4] = ["2026", "2027", "2028", "2029"];
pub const DEFAULT_ROLLUP_PERIODS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Horizon {
    periods: Vec<String>,
    rollup_periods: usize,
}

impl Horizon {
    /// Validate and build a horizon.
    ///
    /// Keys must be non-blank and unique. The rollup window needs at least
    /// two periods so a growth span exists, and cannot exceed the horizon.
    pub fn new<S: AsRef<str>>(periods: &[S], rollup_periods: usize) -> Result<Self> {
        if periods.is_empty() {
            return Err(EngineError::InvalidHorizon("at least one period is required".to_string()));
        }

        let mut seen = HashSet::new();
        let mut keys = Vec::with_capacity(periods.len());
        for period in periods {
            let key = period.as_ref().trim();
            if key.is_empty() {
                return Err(EngineError::InvalidHorizon("period keys must not be blank".to_string()));
            }
            if !seen.insert(key.to_string()) {
                return Err(EngineError::InvalidHorizon(format!("duplicate period '{}'", key)));
            }
            keys.push(key.to_string());
        }

        if rollup_periods < 2 || rollup_periods > keys.len() {
            return Err(EngineError::InvalidHorizon(format!(
                "rollup_periods must be between 2 and {} (got {})",
                keys.len(),
                rollup_periods
            )));
        }

        Ok(Self {
            periods: keys,
            rollup_periods,
        })
    }

    pub fn periods(&self) -> &[String] {
        &self.periods
    }

    /// Leading periods covered by the rollup metrics.
    pub fn rollup(&self) -> &[String] {
        &self.periods[..self.rollup_periods]
    }

    pub fn rollup_periods(&self) -> usize {
        self.rollup_periods
    }

    pub fn contains(&self, period: &str) -> bool {
        self.periods.iter().any(|p| p == period)
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// A zero for every period.
    pub fn zeroed(&self) -> BTreeMap<String, f64> {
        self.periods.iter().map(|p| (p.clone(), 0.0)).collect()
    }
}

impl Default for Horizon {
    fn default() -> Self {
        Self {
            periods: DEFAULT_PERIODS.iter().map(|p| p.to_string()).collect(),
            rollup_periods: DEFAULT_ROLLUP_PERIODS,
        }
    }
}
