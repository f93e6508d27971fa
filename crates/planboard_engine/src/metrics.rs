//! Summary metrics
//!
//! Rollups, averages and growth rates cover the leading rollup window of
//! the horizon (three periods by default), not the whole horizon.
//! Break-even scans the whole horizon in order.

use crate::horizon::Horizon;
use crate::results::FinancialTotals;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const NOT_WITHIN_FORECAST: &str = "Not within forecast period";
pub const NOT_CALCULATED: &str = "Not calculated";

/// First period with strictly positive net profit. Serialized as the
/// period key or one of the sentinel strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BreakEven {
    Period(String),
    NotWithinForecast,
    /// Nothing has been compiled yet.
    NotCalculated,
}

impl BreakEven {
    pub fn as_str(&self) -> &str {
        match self {
            BreakEven::Period(period) => period,
            BreakEven::NotWithinForecast => NOT_WITHIN_FORECAST,
            BreakEven::NotCalculated => NOT_CALCULATED,
        }
    }

    pub fn period(&self) -> Option<&str> {
        match self {
            BreakEven::Period(period) => Some(period),
            _ => None,
        }
    }
}

impl From<String> for BreakEven {
    fn from(value: String) -> Self {
        match value.as_str() {
            NOT_WITHIN_FORECAST => BreakEven::NotWithinForecast,
            NOT_CALCULATED => BreakEven::NotCalculated,
            _ => BreakEven::Period(value),
        }
    }
}

impl From<BreakEven> for String {
    fn from(value: BreakEven) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for BreakEven {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryMetrics {
    pub total_three_year_revenue: f64,
    pub total_three_year_costs: f64,
    pub total_three_year_profit: f64,
    pub average_yearly_revenue: f64,
    pub average_yearly_costs: f64,
    pub revenue_growth_rate: f64,
    pub cost_growth_rate: f64,
    pub break_even_year: BreakEven,
}

impl SummaryMetrics {
    /// All-zero metrics for a session that has not compiled yet.
    pub fn not_calculated() -> Self {
        Self {
            total_three_year_revenue: 0.0,
            total_three_year_costs: 0.0,
            total_three_year_profit: 0.0,
            average_yearly_revenue: 0.0,
            average_yearly_costs: 0.0,
            revenue_growth_rate: 0.0,
            cost_growth_rate: 0.0,
            break_even_year: BreakEven::NotCalculated,
        }
    }

    pub fn derive(totals: &FinancialTotals, horizon: &Horizon) -> Self {
        let rollup = horizon.rollup();
        let window = rollup.len() as f64;

        let total_revenue = sum_over(&totals.revenues_by_year, rollup);
        let total_costs = sum_over(&totals.costs_by_year, rollup);

        let break_even_year = horizon
            .periods()
            .iter()
            .find(|period| value_at(&totals.net_profit_by_year, period) > 0.0)
            .map(|period| BreakEven::Period(period.clone()))
            .unwrap_or(BreakEven::NotWithinForecast);

        Self {
            total_three_year_revenue: total_revenue,
            total_three_year_costs: total_costs,
            total_three_year_profit: total_revenue - total_costs,
            average_yearly_revenue: total_revenue / window,
            average_yearly_costs: total_costs / window,
            revenue_growth_rate: growth_rate(&totals.revenues_by_year, rollup),
            cost_growth_rate: growth_rate(&totals.costs_by_year, rollup),
            break_even_year,
        }
    }
}

fn value_at(series: &BTreeMap<String, f64>, period: &str) -> f64 {
    series.get(period).copied().unwrap_or(0.0)
}

fn sum_over(series: &BTreeMap<String, f64>, periods: &[String]) -> f64 {
    periods.iter().map(|p| value_at(series, p)).sum()
}

/// Compound growth per period between the first and last rollup periods.
/// Zero unless the first value is positive.
fn growth_rate(series: &BTreeMap<String, f64>, rollup: &[String]) -> f64 {
    let (Some(first), Some(last)) = (rollup.first(), rollup.last()) else {
        return 0.0;
    };
    let start = value_at(series, first);
    if start <= 0.0 || rollup.len() < 2 {
        return 0.0;
    }
    let end = value_at(series, last);
    let spans = (rollup.len() - 1) as f64;
    (end / start).powf(1.0 / spans) - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: [f64; 4]) -> BTreeMap<String, f64> {
        ["2026", "2027", "2028", "2029"]
            .iter()
            .zip(values)
            .map(|(p, v)| (p.to_string(), v))
            .collect()
    }

    fn totals(costs: [f64; 4], revenues: [f64; 4]) -> FinancialTotals {
        let costs = series(costs);
        let revenues = series(revenues);
        let net = revenues
            .iter()
            .map(|(p, r)| (p.clone(), r - costs[p]))
            .collect();
        FinancialTotals {
            costs_by_year: costs,
            revenues_by_year: revenues,
            net_profit_by_year: net,
            cost_breakdown: BTreeMap::new(),
            revenue_breakdown: BTreeMap::new(),
        }
    }

    #[test]
    fn test_break_even_first_positive_period() {
        let mut t = totals([0.0; 4], [0.0; 4]);
        t.net_profit_by_year = series([-100.0, -10.0, 5.0, 50.0]);
        let metrics = SummaryMetrics::derive(&t, &Horizon::default());
        assert_eq!(metrics.break_even_year, BreakEven::Period("2028".to_string()));
    }

    #[test]
    fn test_break_even_absent() {
        let mut t = totals([0.0; 4], [0.0; 4]);
        t.net_profit_by_year = series([-100.0, -10.0, -5.0, 0.0]);
        let metrics = SummaryMetrics::derive(&t, &Horizon::default());
        assert_eq!(metrics.break_even_year, BreakEven::NotWithinForecast);
        assert_eq!(metrics.break_even_year.to_string(), "Not within forecast period");
    }

    #[test]
    fn test_growth_rate_spans_rollup_window() {
        let t = totals([0.0; 4], [1_000_000.0, 7.0, 1_440_000.0, 9_999_999.0]);
        let metrics = SummaryMetrics::derive(&t, &Horizon::default());
        assert!((metrics.revenue_growth_rate - 0.2).abs() < 1e-9);
        // costs start at zero
        assert_eq!(metrics.cost_growth_rate, 0.0);
    }

    #[test]
    fn test_rollups_sum_first_three_periods_only() {
        let t = totals([10.0, 20.0, 30.0, 1000.0], [40.0, 50.0, 60.0, 1000.0]);
        let metrics = SummaryMetrics::derive(&t, &Horizon::default());

        assert_eq!(metrics.total_three_year_costs, 60.0);
        assert_eq!(metrics.total_three_year_revenue, 150.0);
        assert_eq!(metrics.total_three_year_profit, 90.0);
        assert_eq!(metrics.average_yearly_costs, 20.0);
        assert_eq!(metrics.average_yearly_revenue, 50.0);
        assert_eq!(metrics.break_even_year.period(), Some("2026"));
    }

    #[test]
    fn test_break_even_serializes_as_string() {
        let json = serde_json::to_value(SummaryMetrics::not_calculated()).unwrap();
        assert_eq!(json["breakEvenYear"], "Not calculated");

        let back: BreakEven = serde_json::from_value(serde_json::json!("2027")).unwrap();
        assert_eq!(back, BreakEven::Period("2027".to_string()));
        let sentinel: BreakEven = serde_json::from_value(serde_json::json!(NOT_WITHIN_FORECAST)).unwrap();
        assert_eq!(sentinel, BreakEven::NotWithinForecast);
    }
}
