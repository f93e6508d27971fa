//! Compilation
//!
//! # Cycle
//!
//! 1. Invoke every registered provider, isolating failures and panics
//! 2. Zero every horizon period
//! 3. Add schema item midpoints under the `"schema"` source
//! 4. Add ready module figures under their registry id, skipping
//!    results flagged `using_schema_base`
//! 5. Net profit = revenue - costs per period
//! 6. Derive summary metrics
//! 7. Compare with the previous snapshot and keep it when nothing
//!    material changed
//!
//! Steps 2-6 are skipped when the ready results and the schema snapshot
//! equal those of the previous call.

use crate::error::ProviderError;
use crate::horizon::Horizon;
use crate::metrics::SummaryMetrics;
use crate::module::{ModuleKind, ModuleResult, ProviderOutcome, ProviderReport, ResultProvider};
use crate::registry::{ModuleRegistry, SCHEMA_SOURCE_ID};
use crate::results::{Breakdown, CompiledResults, FinancialTotals};
use chrono::Utc;
use planboard_schema::{Category, SchemaCollection};
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// A ready result together with where it was registered.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadyResult {
    pub registry_id: String,
    pub kind: ModuleKind,
    pub result: ModuleResult,
}

/// Output of one compile cycle.
#[derive(Debug, Clone)]
pub struct Compilation {
    /// The snapshot to publish: the previous one when `changed` is false.
    pub results: Arc<CompiledResults>,
    pub changed: bool,
    pub cache_hit: bool,
    pub reports: Vec<ProviderReport>,
}

struct CacheEntry {
    ready: Vec<ReadyResult>,
    schema: Option<Arc<SchemaCollection>>,
    compiled: Arc<CompiledResults>,
}

/// Stateful only through its single-slot cache.
pub struct CompilationEngine {
    horizon: Horizon,
    cache: Option<CacheEntry>,
}

impl CompilationEngine {
    pub fn new(horizon: Horizon) -> Self {
        Self { horizon, cache: None }
    }

    pub fn horizon(&self) -> &Horizon {
        &self.horizon
    }

    pub fn clear_cache(&mut self) {
        self.cache = None;
    }

    pub fn compile(
        &mut self,
        registry: &ModuleRegistry,
        schema: Option<&Arc<SchemaCollection>>,
        previous: Option<&Arc<CompiledResults>>,
    ) -> Compilation {
        let (ready, reports) = collect_results(registry);

        let cached = self
            .cache
            .as_ref()
            .filter(|entry| entry.ready == ready && same_schema(entry.schema.as_ref(), schema))
            .map(|entry| entry.compiled.clone());
        let cache_hit = cached.is_some();

        let compiled = match cached {
            Some(compiled) => compiled,
            None => {
                let totals = calculate_financial_totals(&ready, schema.map(|s| &**s), &self.horizon);
                let summary_metrics = SummaryMetrics::derive(&totals, &self.horizon);
                let compiled = Arc::new(CompiledResults {
                    totals,
                    summary_metrics,
                    last_updated: Utc::now(),
                    using_schema_data: schema.is_some(),
                });
                self.cache = Some(CacheEntry {
                    ready,
                    schema: schema.cloned(),
                    compiled: compiled.clone(),
                });
                compiled
            }
        };

        let (results, changed) = match previous {
            Some(previous) if Arc::ptr_eq(previous, &compiled) || previous.is_materially_equal(&compiled) => {
                (previous.clone(), false)
            }
            _ => (compiled, true),
        };

        let failed = reports.iter().filter(|r| r.outcome.is_failed()).count();
        let schema_hash = schema.map(|s| s.content_hash()).unwrap_or_default();
        info!(
            providers = reports.len(),
            failed,
            cache_hit,
            changed,
            schema_hash = %schema_hash,
            break_even = %results.summary_metrics.break_even_year,
            "Compilation finished"
        );

        Compilation {
            results,
            changed,
            cache_hit,
            reports,
        }
    }
}

fn same_schema(cached: Option<&Arc<SchemaCollection>>, current: Option<&Arc<SchemaCollection>>) -> bool {
    match (cached, current) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::ptr_eq(a, b) || **a == **b,
        _ => false,
    }
}

/// Invoke every provider once and classify the outcome.
pub fn collect_results(registry: &ModuleRegistry) -> (Vec<ReadyResult>, Vec<ProviderReport>) {
    let mut ready = Vec::new();
    let mut reports = Vec::with_capacity(registry.len());

    for (kind, id, provider) in registry.iter() {
        let outcome = match invoke(provider.as_ref()) {
            Ok(result) if !result.is_ready => ProviderOutcome::NotReady,
            Ok(result) => match result.validate() {
                Ok(()) => {
                    if result.module_id != id {
                        debug!(
                            module_id = %id,
                            reported_id = %result.module_id,
                            "Result module id differs from registry id; using registry id"
                        );
                    }
                    ready.push(ReadyResult {
                        registry_id: id.to_string(),
                        kind,
                        result,
                    });
                    ProviderOutcome::Ready
                }
                Err(err) => ProviderOutcome::Failed(err),
            },
            Err(err) => ProviderOutcome::Failed(err),
        };

        if let ProviderOutcome::Failed(err) = &outcome {
            warn!(module_id = %id, kind = %kind, error = %err, "Provider skipped this cycle");
        }
        reports.push(ProviderReport {
            module_id: id.to_string(),
            kind,
            outcome,
        });
    }

    (ready, reports)
}

fn invoke(provider: &dyn ResultProvider) -> Result<ModuleResult, ProviderError> {
    match panic::catch_unwind(AssertUnwindSafe(|| provider.get_result())) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".to_string());
            error!(error = %message, "Provider panicked");
            Err(ProviderError::Panicked(message))
        }
    }
}

/// Merge the schema contribution and ready module figures into per-period
/// totals.
///
/// Only periods in the horizon are aggregated. Zero module figures are not
/// recorded in the breakdowns. Costs-kind results contribute only costs,
/// revenue-kind results only revenue; calculators contribute both.
pub fn calculate_financial_totals(
    ready: &[ReadyResult],
    schema: Option<&SchemaCollection>,
    horizon: &Horizon,
) -> FinancialTotals {
    let mut totals = FinancialTotals::zeroed(horizon);

    if let Some(schema) = schema {
        for period in horizon.periods() {
            for breakdown in [&mut totals.cost_breakdown, &mut totals.revenue_breakdown] {
                breakdown
                    .entry(period.clone())
                    .or_default()
                    .insert(SCHEMA_SOURCE_ID.to_string(), 0.0);
            }
        }
        for item in schema.items.values() {
            for period in horizon.periods() {
                let Some(value) = item.point_estimate(period) else {
                    continue;
                };
                let (series, breakdown) = match item.category {
                    Category::Cost => (&mut totals.costs_by_year, &mut totals.cost_breakdown),
                    Category::Revenue => (&mut totals.revenues_by_year, &mut totals.revenue_breakdown),
                };
                add(series, breakdown, period, SCHEMA_SOURCE_ID, value);
            }
        }
    }

    // calculators first, then costs, then revenue
    let order = [ModuleKind::Calculator, ModuleKind::Costs, ModuleKind::Revenue];
    for kind in order {
        for entry in ready.iter().filter(|r| r.kind == kind) {
            if entry.result.using_schema_base {
                debug!(module_id = %entry.registry_id, "Skipping figures already in the schema");
                continue;
            }
            let takes_costs = matches!(kind, ModuleKind::Costs | ModuleKind::Calculator);
            let takes_revenue = matches!(kind, ModuleKind::Revenue | ModuleKind::Calculator);

            for period in horizon.periods() {
                if takes_costs {
                    if let Some(value) = figure(&entry.result.total_costs_by_year, period) {
                        add(&mut totals.costs_by_year, &mut totals.cost_breakdown, period, &entry.registry_id, value);
                    }
                }
                if takes_revenue {
                    if let Some(value) = figure(&entry.result.total_revenue_by_year, period) {
                        add(
                            &mut totals.revenues_by_year,
                            &mut totals.revenue_breakdown,
                            period,
                            &entry.registry_id,
                            value,
                        );
                    }
                }
            }
        }
    }

    for period in horizon.periods() {
        let revenue = totals.revenues_by_year.get(period).copied().unwrap_or(0.0);
        let costs = totals.costs_by_year.get(period).copied().unwrap_or(0.0);
        totals.net_profit_by_year.insert(period.clone(), revenue - costs);
    }

    totals
}

/// Non-zero figure for `period`, if any.
fn figure(series: &Option<BTreeMap<String, f64>>, period: &str) -> Option<f64> {
    series
        .as_ref()
        .and_then(|values| values.get(period).copied())
        .filter(|value| *value != 0.0)
}

fn add(series: &mut BTreeMap<String, f64>, breakdown: &mut Breakdown, period: &str, source: &str, value: f64) {
    *series.entry(period.to_string()).or_insert(0.0) += value;
    *breakdown
        .entry(period.to_string())
        .or_default()
        .entry(source.to_string())
        .or_insert(0.0) += value;
}
