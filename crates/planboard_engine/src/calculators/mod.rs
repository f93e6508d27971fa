//! Built-in calculator modules
//!
//! Two representative modules implementing [`ResultProvider`]:
//! employee costs and transaction fee revenue.

pub mod employee_costs;
pub mod transaction_fees;

pub use employee_costs::{EmployeeCostParams, EmployeeCostsModule, StaffRole, EMPLOYEE_COSTS_ID};
pub use transaction_fees::{TransactionFeeParams, TransactionFeesModule, TRANSACTION_FEES_ID};

use crate::horizon::Horizon;
use crate::module::{ModuleKind, ResultProvider, SharedProvider};
use planboard_schema::SchemaCollection;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinModule {
    EmployeeCosts,
    TransactionFees,
}

impl BuiltinModule {
    pub const ALL: [BuiltinModule; 2] = [BuiltinModule::EmployeeCosts, BuiltinModule::TransactionFees];

    pub fn id(&self) -> &'static str {
        match self {
            BuiltinModule::EmployeeCosts => EMPLOYEE_COSTS_ID,
            BuiltinModule::TransactionFees => TRANSACTION_FEES_ID,
        }
    }

    pub fn kind(&self) -> ModuleKind {
        match self {
            BuiltinModule::EmployeeCosts => ModuleKind::Costs,
            BuiltinModule::TransactionFees => ModuleKind::Revenue,
        }
    }

    /// Build the module with default parameters. Transaction fees follow
    /// `schema` when one is given.
    pub fn provider(
        &self,
        horizon: &Horizon,
        schema: Option<watch::Receiver<Arc<SchemaCollection>>>,
    ) -> SharedProvider {
        match self {
            BuiltinModule::EmployeeCosts => {
                Arc::new(EmployeeCostsModule::new(horizon.clone())) as Arc<dyn ResultProvider>
            }
            BuiltinModule::TransactionFees => {
                let module = TransactionFeesModule::new(horizon.clone());
                let module = match schema {
                    Some(rx) => module.with_schema(rx),
                    None => module,
                };
                Arc::new(module) as Arc<dyn ResultProvider>
            }
        }
    }
}

impl fmt::Display for BuiltinModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for BuiltinModule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        BuiltinModule::ALL
            .into_iter()
            .find(|m| m.id() == wanted)
            .ok_or_else(|| {
                format!(
                    "unknown module '{}' (expected one of: {})",
                    s,
                    BuiltinModule::ALL.map(|m| m.id()).join(", ")
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        assert_eq!("Employee_Costs".parse::<BuiltinModule>().unwrap(), BuiltinModule::EmployeeCosts);
        let err = "payroll".parse::<BuiltinModule>().unwrap_err();
        assert!(err.contains("transaction-fees"));
    }

    #[test]
    fn test_builtin_kinds_match_inference() {
        for module in BuiltinModule::ALL {
            assert_eq!(ModuleKind::infer_from_id(module.id()), module.kind());
        }
    }

    #[test]
    fn test_providers_produce_ready_results() {
        let horizon = Horizon::default();
        for module in BuiltinModule::ALL {
            let result = module.provider(&horizon, None).get_result().unwrap();
            assert!(result.is_ready);
            assert_eq!(result.module_id, module.id());
        }
    }
}
