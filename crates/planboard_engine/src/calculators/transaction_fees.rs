//! Transaction fee revenue: volume x order value x fee%.
//!
//! With the schema as base, volume per period is back-derived from the
//! schema's transaction-fee revenue lines, and the result is flagged
//! `using_schema_base` so the engine does not count it twice.

use crate::error::ProviderError;
use crate::horizon::{Horizon, DEFAULT_PERIODS};
use crate::module::{ModuleResult, ResultProvider};
use planboard_schema::SchemaCollection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::watch;

pub const TRANSACTION_FEES_ID: &str = "transaction-fees";

/// Schema lines whose midpoints make up transaction-fee revenue.
pub const SCHEMA_FEE_ITEMS: [&str; 2] = [
    "revenue.transaction_fees.traditional_market",
    "revenue.transaction_fees.b2b",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFeeParams {
    pub transaction_volume: BTreeMap<String, f64>,
    pub average_order_value: BTreeMap<String, f64>,
    pub fee_percentage: BTreeMap<String, f64>,
}

impl Default for TransactionFeeParams {
    fn default() -> Self {
        let series = |values: [f64; 4]| -> BTreeMap<String, f64> {
            DEFAULT_PERIODS
                .iter()
                .zip(values)
                .map(|(p, v)| (p.to_string(), v))
                .collect()
        };
        Self {
            transaction_volume: series([100_000.0, 250_000.0, 500_000.0, 1_000_000.0]),
            average_order_value: series([500.0, 525.0, 550.0, 575.0]),
            fee_percentage: series([2.5; 4]),
        }
    }
}

fn at(series: &BTreeMap<String, f64>, period: &str) -> f64 {
    series.get(period).copied().unwrap_or(0.0)
}

pub struct TransactionFeesModule {
    id: String,
    horizon: Horizon,
    params: RwLock<TransactionFeeParams>,
    schema: Option<watch::Receiver<Arc<SchemaCollection>>>,
    use_schema_base: AtomicBool,
}

impl TransactionFeesModule {
    /// A module on its own parameters, with no schema feed.
    pub fn new(horizon: Horizon) -> Self {
        Self {
            id: TRANSACTION_FEES_ID.to_string(),
            horizon,
            params: RwLock::new(TransactionFeeParams::default()),
            schema: None,
            use_schema_base: AtomicBool::new(false),
        }
    }

    /// Follow the schema store and use it as base by default.
    pub fn with_schema(mut self, schema: watch::Receiver<Arc<SchemaCollection>>) -> Self {
        self.schema = Some(schema);
        self.use_schema_base = AtomicBool::new(true);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_use_schema_base(&self, enabled: bool) {
        self.use_schema_base.store(enabled, Ordering::SeqCst);
    }

    pub fn params(&self) -> Result<TransactionFeeParams, ProviderError> {
        self.params
            .read()
            .map(|p| p.clone())
            .map_err(|_| ProviderError::Execution("transaction fee parameters lock poisoned".to_string()))
    }

    pub fn set_params(&self, params: TransactionFeeParams) -> Result<(), ProviderError> {
        let mut guard = self
            .params
            .write()
            .map_err(|_| ProviderError::Execution("transaction fee parameters lock poisoned".to_string()))?;
        *guard = params;
        Ok(())
    }

    /// Parameters with volume derived from the schema, when the schema
    /// base is enabled and both fee lines exist. `None` otherwise.
    fn schema_derived(&self, params: &TransactionFeeParams) -> Option<TransactionFeeParams> {
        if !self.use_schema_base.load(Ordering::SeqCst) {
            return None;
        }
        let schema = self.schema.as_ref()?.borrow().clone();
        let lines = SCHEMA_FEE_ITEMS
            .iter()
            .map(|id| schema.items.get(*id))
            .collect::<Option<Vec<_>>>()?;

        let mut derived = params.clone();
        for period in self.horizon.periods() {
            let schema_revenue: f64 = lines
                .iter()
                .map(|item| item.point_estimate(period).unwrap_or(0.0))
                .sum();
            let order_value = at(&params.average_order_value, period);
            let fee = at(&params.fee_percentage, period);
            let per_transaction = order_value * fee / 100.0;
            if per_transaction > 0.0 {
                derived
                    .transaction_volume
                    .insert(period.clone(), (schema_revenue / per_transaction).round());
            }
        }
        Some(derived)
    }

    pub fn calculate(&self) -> Result<ModuleResult, ProviderError> {
        let own = self.params()?;
        let derived = self.schema_derived(&own);
        let using_schema_base = derived.is_some();
        let params = derived.unwrap_or(own);

        let mut revenue = BTreeMap::new();
        let mut volumes = BTreeMap::new();
        let mut per_transaction = BTreeMap::new();
        let mut details = BTreeMap::new();
        for period in self.horizon.periods() {
            let volume = at(&params.transaction_volume, period);
            let order_value = at(&params.average_order_value, period);
            let fee = at(&params.fee_percentage, period);
            let unit = order_value * (fee / 100.0);
            let total = volume * unit;

            revenue.insert(period.clone(), total);
            volumes.insert(period.clone(), volume);
            per_transaction.insert(period.clone(), unit);
            details.insert(
                period.clone(),
                json!({
                    "transactionVolume": volume,
                    "averageOrderValue": order_value,
                    "feePercentage": fee,
                    "revenuePerTransaction": unit,
                    "totalRevenue": total,
                    "totalTransactionValue": volume * order_value,
                }),
            );
        }

        Ok(ModuleResult::ready(self.id.clone())
            .with_revenue(revenue)
            .using_schema_base(using_schema_base)
            .with_detail("transactionVolumeByYear", json!(volumes))
            .with_detail("revenuePerTransactionByYear", json!(per_transaction))
            .with_detail("detailsByYear", json!(details)))
    }
}

impl ResultProvider for TransactionFeesModule {
    fn get_result(&self) -> Result<ModuleResult, ProviderError> {
        self.calculate()
    }
}
