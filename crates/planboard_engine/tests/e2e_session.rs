//! End-to-End tests for the dashboard session
//!
//! Drives a real schema store and the async session driver together:
//! bootstrap -> register modules -> edit schema -> save scenario.

use planboard_engine::calculators::{EmployeeCostsModule, TransactionFeesModule};
use planboard_engine::{
    provider_fn, spawn_session, BreakEven, CompiledResults, DashboardSession, Horizon,
    InMemoryScenarioRepository, ModuleKind, ModuleResult, ProviderError, ScenarioRepository,
};
use planboard_schema::{SchemaItemPatch, SchemaStore, YearRange};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

async fn next(rx: &mut watch::Receiver<Arc<CompiledResults>>) -> Arc<CompiledResults> {
    tokio::time::timeout(Duration::from_secs(5), rx.changed())
        .await
        .expect("no snapshot published in time")
        .expect("session dropped");
    rx.borrow_and_update().clone()
}

// =============================================================================
// SCHEMA + MODULES
// =============================================================================

#[tokio::test]
async fn test_schema_bootstrap_compiles_on_start() {
    let store = SchemaStore::bootstrap(None).unwrap();
    let session = DashboardSession::new(Horizon::default());
    let handle = spawn_session(session, Some(store.subscribe()), None);
    let mut results = handle.subscribe();

    let snapshot = next(&mut results).await;
    assert!(snapshot.using_schema_data);
    let expected = store.snapshot().calculate_totals(&["2026"]);
    let midpoint_costs = (expected.costs["2026"].min + expected.costs["2026"].max) / 2.0;
    assert!((snapshot.costs("2026") - midpoint_costs).abs() < 1e-6);
    assert_ne!(snapshot.summary_metrics.break_even_year, BreakEven::NotCalculated);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_schema_edit_triggers_recompile() {
    let mut store = SchemaStore::bootstrap(None).unwrap();
    let handle = spawn_session(
        DashboardSession::new(Horizon::default()),
        Some(store.subscribe()),
        None,
    );
    let mut results = handle.subscribe();
    let before = next(&mut results).await;

    let mut year_data = BTreeMap::new();
    year_data.insert("2026".to_string(), YearRange::new(1_000_000.0, 1_000_000.0));
    store
        .update_item(
            "cost.employee.executives",
            SchemaItemPatch::new().year_data(year_data),
        )
        .unwrap();

    let after = next(&mut results).await;
    // executives moved from a 675k midpoint to 1M
    assert!((after.costs("2026") - before.costs("2026") - 325_000.0).abs() < 1e-6);
    // 2027 has no data for the item any more
    assert!((before.costs("2027") - after.costs("2027") - 742_500.0).abs() < 1e-6);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_schema_based_fees_are_not_double_counted() {
    let store = SchemaStore::bootstrap(None).unwrap();
    let handle = spawn_session(
        DashboardSession::new(Horizon::default()),
        Some(store.subscribe()),
        None,
    );
    let mut results = handle.subscribe();
    let schema_only = next(&mut results).await;

    let fees = TransactionFeesModule::new(Horizon::default()).with_schema(store.subscribe());
    handle.register_module("transaction-fees", Arc::new(fees), ModuleKind::Revenue);
    let staff = handle.register_module(
        "employee-costs",
        Arc::new(EmployeeCostsModule::new(Horizon::default())),
        ModuleKind::Costs,
    );

    let with_modules = next(&mut results).await;
    assert_eq!(with_modules.revenue("2026"), schema_only.revenue("2026"));
    assert!(with_modules.costs("2026") > schema_only.costs("2026"));
    assert!(with_modules.totals.cost_breakdown["2026"].contains_key("employee-costs"));
    assert!(!with_modules.totals.revenue_breakdown["2026"].contains_key("transaction-fees"));

    staff.unregister();
    let without_staff = next(&mut results).await;
    assert!((without_staff.costs("2026") - schema_only.costs("2026")).abs() < 1e-6);

    let session = handle.shutdown().await.unwrap();
    assert_eq!(session.registry().len(), 1);
}

// =============================================================================
// FAILURE ISOLATION
// =============================================================================

#[tokio::test]
async fn test_one_broken_module_does_not_block_others() {
    let handle = spawn_session(DashboardSession::new(Horizon::default()), None, None);
    let mut results = handle.subscribe();

    handle.register_module(
        "staff",
        provider_fn(|| Ok(ModuleResult::ready("staff").with_cost("2026", 100.0))),
        ModuleKind::Costs,
    );
    handle.register_module(
        "sales",
        provider_fn(|| Ok(ModuleResult::ready("sales").with_revenue_for("2026", 250.0))),
        ModuleKind::Revenue,
    );
    handle.register_module(
        "forecast",
        provider_fn(|| Err(ProviderError::Execution("missing inputs".to_string()))),
        ModuleKind::Calculator,
    );

    let snapshot = next(&mut results).await;
    assert_eq!(snapshot.costs("2026"), 100.0);
    assert_eq!(snapshot.revenue("2026"), 250.0);
    assert_eq!(snapshot.summary_metrics.break_even_year.period(), Some("2026"));

    let session = handle.shutdown().await.unwrap();
    assert_eq!(session.last_reports().len(), 3);
    assert_eq!(
        session.last_reports().iter().filter(|r| r.outcome.is_failed()).count(),
        1
    );
}

// =============================================================================
// COALESCING AND SCENARIOS
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_debounce_coalesces_spaced_commands() {
    let handle = spawn_session(
        DashboardSession::new(Horizon::default()),
        None,
        Some(Duration::from_millis(300)),
    );
    let mut results = handle.subscribe();

    handle.register_module(
        "a",
        provider_fn(|| Ok(ModuleResult::ready("a").with_cost("2026", 1.0))),
        ModuleKind::Costs,
    );
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.register_module(
        "b",
        provider_fn(|| Ok(ModuleResult::ready("b").with_cost("2026", 2.0))),
        ModuleKind::Costs,
    );

    let snapshot = next(&mut results).await;
    assert_eq!(snapshot.costs("2026"), 3.0);

    let session = handle.shutdown().await.unwrap();
    assert_eq!(session.publish_count(), 1);
}

#[tokio::test]
async fn test_saved_scenario_reflects_queued_registrations() {
    let handle = spawn_session(DashboardSession::new(Horizon::default()), None, None);
    handle.register_module(
        "staff",
        provider_fn(|| Ok(ModuleResult::ready("staff").with_cost("2026", 42.0))),
        ModuleKind::Costs,
    );

    let scenario = handle.save_scenario(Some("Queued")).await.unwrap();
    assert_eq!(scenario.name, "Queued");
    assert_eq!(scenario.data.costs("2026"), 42.0);

    let repo = InMemoryScenarioRepository::new();
    repo.store(&scenario).unwrap();
    let session = handle.shutdown().await.unwrap();
    assert!(session.load_scenario(&repo, &scenario.id));
}
