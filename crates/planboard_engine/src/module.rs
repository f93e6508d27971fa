//! Module result contract
//!
//! Every registered module exposes a [`ResultProvider`]. The engine calls
//! it once per compile cycle and classifies what came back as a
//! [`ProviderOutcome`].

use crate::error::ProviderError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Registry partition a module belongs to.
///
/// `Costs` modules contribute only costs, `Revenue` modules only revenue,
/// and `Calculator` modules may contribute both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    Costs,
    Revenue,
    Calculator,
}

impl ModuleKind {
    /// Partitions in the order `unregister` searches them.
    pub const ALL: [ModuleKind; 3] = [ModuleKind::Costs, ModuleKind::Revenue, ModuleKind::Calculator];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleKind::Costs => "costs",
            ModuleKind::Revenue => "revenue",
            ModuleKind::Calculator => "calculator",
        }
    }

    /// Guess a kind from a module id when the caller supplied none.
    pub fn infer_from_id(id: &str) -> Self {
        let id = id.to_ascii_lowercase();
        if id.contains("cost") {
            ModuleKind::Costs
        } else if id.contains("revenue") || id.contains("fees") {
            ModuleKind::Revenue
        } else {
            ModuleKind::Calculator
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "costs" | "cost" => Ok(ModuleKind::Costs),
            "revenue" | "revenues" => Ok(ModuleKind::Revenue),
            "calculator" => Ok(ModuleKind::Calculator),
            other => Err(format!("unknown module kind '{}'", other)),
        }
    }
}

/// What a provider returns for one compile cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleResult {
    pub module_id: String,

    /// Not-ready results are left out of aggregation.
    pub is_ready: bool,

    /// The figures are already part of the schema contribution and must
    /// not be added again.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub using_schema_base: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_costs_by_year: Option<BTreeMap<String, f64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_revenue_by_year: Option<BTreeMap<String, f64>>,

    /// Module-specific fields, opaque to the engine
    #[serde(flatten)]
    pub details: BTreeMap<String, serde_json::Value>,
}

impl ModuleResult {
    pub fn ready(module_id: impl Into<String>) -> Self {
        Self {
            module_id: module_id.into(),
            is_ready: true,
            using_schema_base: false,
            total_costs_by_year: None,
            total_revenue_by_year: None,
            details: BTreeMap::new(),
        }
    }

    pub fn not_ready(module_id: impl Into<String>) -> Self {
        Self {
            is_ready: false,
            ..Self::ready(module_id)
        }
    }

    pub fn with_costs(mut self, costs: BTreeMap<String, f64>) -> Self {
        self.total_costs_by_year = Some(costs);
        self
    }

    pub fn with_cost(mut self, period: impl Into<String>, value: f64) -> Self {
        self.total_costs_by_year
            .get_or_insert_with(BTreeMap::new)
            .insert(period.into(), value);
        self
    }

    pub fn with_revenue(mut self, revenue: BTreeMap<String, f64>) -> Self {
        self.total_revenue_by_year = Some(revenue);
        self
    }

    pub fn with_revenue_for(mut self, period: impl Into<String>, value: f64) -> Self {
        self.total_revenue_by_year
            .get_or_insert_with(BTreeMap::new)
            .insert(period.into(), value);
        self
    }

    pub fn using_schema_base(mut self, using: bool) -> Self {
        self.using_schema_base = using;
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }

    /// Reject results the aggregation cannot use (non-finite figures).
    pub fn validate(&self) -> Result<(), ProviderError> {
        let series = [
            ("totalCostsByYear", &self.total_costs_by_year),
            ("totalRevenueByYear", &self.total_revenue_by_year),
        ];
        for (name, values) in series {
            let Some(values) = values else { continue };
            if let Some((period, value)) = values.iter().find(|(_, v)| !v.is_finite()) {
                return Err(ProviderError::Malformed(format!(
                    "{}[{}] is not a finite number ({})",
                    name, period, value
                )));
            }
        }
        Ok(())
    }
}

/// Source of a module's current result.
///
/// Implementations must be cheap and side-effect free: the engine calls
/// `get_result` on every compile cycle, with no ordering guarantee between
/// providers.
pub trait ResultProvider: Send + Sync {
    fn get_result(&self) -> Result<ModuleResult, ProviderError>;
}

impl<F> ResultProvider for F
where
    F: Fn() -> Result<ModuleResult, ProviderError> + Send + Sync,
{
    fn get_result(&self) -> Result<ModuleResult, ProviderError> {
        self()
    }
}

/// Shared provider handle as stored by the registry.
pub type SharedProvider = Arc<dyn ResultProvider>;

/// Wrap a closure as a [`SharedProvider`].
pub fn provider_fn<F>(f: F) -> SharedProvider
where
    F: Fn() -> Result<ModuleResult, ProviderError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// How one provider fared in one compile cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderOutcome {
    Ready,
    NotReady,
    Failed(ProviderError),
}

impl ProviderOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, ProviderOutcome::Failed(_))
    }
}

impl fmt::Display for ProviderOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderOutcome::Ready => f.write_str("ready"),
            ProviderOutcome::NotReady => f.write_str("not ready"),
            ProviderOutcome::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderReport {
    pub module_id: String,
    pub kind: ModuleKind,
    pub outcome: ProviderOutcome,
}
