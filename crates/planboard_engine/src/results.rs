//! Compiled results
//!
//! [`FinancialTotals`] is the per-period aggregation; [`CompiledResults`]
//! is the immutable snapshot a session publishes.

use crate::horizon::Horizon;
use crate::metrics::SummaryMetrics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Contributions per period, keyed by source id (`"schema"` or a module's
/// registry id).
pub type Breakdown = BTreeMap<String, BTreeMap<String, f64>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialTotals {
    pub costs_by_year: BTreeMap<String, f64>,
    pub revenues_by_year: BTreeMap<String, f64>,
    pub net_profit_by_year: BTreeMap<String, f64>,
    pub cost_breakdown: Breakdown,
    pub revenue_breakdown: Breakdown,
}

impl FinancialTotals {
    /// Zero totals and empty breakdowns for every period.
    pub fn zeroed(horizon: &Horizon) -> Self {
        let empty: Breakdown = horizon
            .periods()
            .iter()
            .map(|p| (p.clone(), BTreeMap::new()))
            .collect();
        Self {
            costs_by_year: horizon.zeroed(),
            revenues_by_year: horizon.zeroed(),
            net_profit_by_year: horizon.zeroed(),
            cost_breakdown: empty.clone(),
            revenue_breakdown: empty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledResults {
    #[serde(flatten)]
    pub totals: FinancialTotals,
    pub summary_metrics: SummaryMetrics,
    pub last_updated: DateTime<Utc>,
    pub using_schema_data: bool,
}

impl CompiledResults {
    /// The snapshot published before the first compile.
    pub fn initial(horizon: &Horizon) -> Self {
        Self {
            totals: FinancialTotals::zeroed(horizon),
            summary_metrics: SummaryMetrics::not_calculated(),
            last_updated: Utc::now(),
            using_schema_data: false,
        }
    }

    /// Equal in everything but the timestamp.
    pub fn is_materially_equal(&self, other: &CompiledResults) -> bool {
        self.totals == other.totals
            && self.summary_metrics == other.summary_metrics
            && self.using_schema_data == other.using_schema_data
    }

    pub fn costs(&self, period: &str) -> f64 {
        self.totals.costs_by_year.get(period).copied().unwrap_or(0.0)
    }

    pub fn revenue(&self, period: &str) -> f64 {
        self.totals.revenues_by_year.get(period).copied().unwrap_or(0.0)
    }

    pub fn net_profit(&self, period: &str) -> f64 {
        self.totals.net_profit_by_year.get(period).copied().unwrap_or(0.0)
    }
}
