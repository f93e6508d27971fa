//! Dashboard Compilation Engine
//!
//! Aggregates per-period costs and revenue from two sources:
//!
//! - the **schema**: midpoints of every forecast line item
//! - **modules**: registered result providers, partitioned into
//!   `costs`, `revenue` and `calculator` kinds
//!
//! Modules flagged `using_schema_base` are skipped so their figures are
//! not counted on top of the schema they were derived from.
//!
//! # Compile Cycle
//!
//! 1. Pull a result from every provider (failures are isolated per module)
//! 2. Merge the schema and ready results into per-period totals
//! 3. Derive summary metrics over the rollup window
//! 4. Publish only if the result differs materially from the last snapshot
//!
//! # Modules
//!
//! - [`registry`]: module directory with replace-on-register semantics
//! - [`compile`]: the compile cycle and its single-slot cache
//! - [`metrics`]: rollups, growth rates and break-even
//! - [`session`]: the stateful orchestrator
//! - [`driver`]: async driver coalescing bursts of commands
//! - [`scenario`]: saved snapshots and their repositories
//! - [`calculators`]: built-in employee cost and transaction fee modules

pub mod calculators;
pub mod compile;
pub mod config;
pub mod driver;
pub mod error;
pub mod horizon;
pub mod metrics;
pub mod module;
pub mod registry;
pub mod results;
pub mod scenario;
pub mod session;

pub use compile::{calculate_financial_totals, Compilation, CompilationEngine, ReadyResult};
pub use config::EngineConfig;
pub use driver::{spawn_session, ModuleHandle, SessionHandle};
pub use error::{EngineError, ProviderError, Result, ScenarioError};
pub use horizon::Horizon;
pub use metrics::{BreakEven, SummaryMetrics};
pub use module::{
    provider_fn, ModuleKind, ModuleResult, ProviderOutcome, ProviderReport, ResultProvider, SharedProvider,
};
pub use registry::{ModuleRegistry, Registration, SCHEMA_SOURCE_ID};
pub use results::{CompiledResults, FinancialTotals};
pub use scenario::{DirectoryScenarioRepository, InMemoryScenarioRepository, Scenario, ScenarioRepository};
pub use session::{DashboardSession, SessionState};
