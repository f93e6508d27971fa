//! Shared setup for commands: loading the schema store and compiling a
//! session over it.

use crate::cli::config::{PlanboardConfig, SchemaConfig};
use anyhow::{Context, Result};
use planboard_engine::calculators::BuiltinModule;
use planboard_engine::{spawn_session, CompiledResults, DashboardSession, Horizon, ProviderReport, Scenario};
use planboard_schema::{default_schema, preset_by_name, SchemaCollection, SchemaFileStorage, SchemaStore};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Open the schema store described by `config`.
///
/// `override_path` replaces the configured document. A missing document
/// means the bundled defaults; a corrupt one is logged and also falls
/// back to the defaults.
pub fn open_schema(config: &SchemaConfig, override_path: Option<&Path>) -> Result<SchemaStore> {
    let path = override_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.resolved_path());
    let saved = SchemaFileStorage::new(path.clone())
        .load_raw()
        .with_context(|| format!("Failed to read schema: {}", path.display()))?;

    let mut store = if config.include_supplemental {
        SchemaStore::bootstrap(saved.as_deref())?
    } else {
        SchemaStore::new(restore_without_supplemental(saved.as_deref(), &path)?)
    };

    for name in &config.presets {
        let preset = preset_by_name(name)?;
        let merged = store.merge_preset(&preset);
        info!(preset = %name, items = merged.items.len(), "Merged preset");
    }

    Ok(store)
}

fn restore_without_supplemental(saved: Option<&str>, path: &Path) -> Result<SchemaCollection> {
    let Some(saved) = saved else {
        return Ok(default_schema()?);
    };
    match SchemaCollection::from_json_str(saved) {
        Ok(collection) => Ok(collection),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Saved schema is invalid; using defaults");
            Ok(default_schema()?)
        }
    }
}

/// Everything one compile produced.
pub struct CompileOutcome {
    pub results: Arc<CompiledResults>,
    pub reports: Vec<ProviderReport>,
    pub scenario: Option<Scenario>,
}

/// Compile `store` together with the given built-in modules on a fresh
/// session. With `save_as` set, the snapshot is also saved as a scenario.
pub fn compile(
    config: &PlanboardConfig,
    store: &SchemaStore,
    modules: &[BuiltinModule],
    save_as: Option<Option<&str>>,
) -> Result<CompileOutcome> {
    let horizon = config.engine.horizon()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(compile_async(config, store, modules, horizon, save_as))
}

async fn compile_async(
    config: &PlanboardConfig,
    store: &SchemaStore,
    modules: &[BuiltinModule],
    horizon: Horizon,
    save_as: Option<Option<&str>>,
) -> Result<CompileOutcome> {
    let handle = spawn_session(
        DashboardSession::new(horizon.clone()),
        Some(store.subscribe()),
        config.engine.debounce(),
    );

    for module in modules {
        let provider = module.provider(&horizon, Some(store.subscribe()));
        handle.register_module(module.id(), provider, module.kind());
    }

    let results = handle
        .compiled()
        .await
        .context("Session stopped before compiling")?;
    let scenario = match save_as {
        Some(name) => Some(
            handle
                .save_scenario(name)
                .await
                .context("Session stopped before saving")?,
        ),
        None => None,
    };

    let session = handle.shutdown().await.context("Session task failed")?;
    Ok(CompileOutcome {
        results,
        reports: session.last_reports().to_vec(),
        scenario,
    })
}
