//! Dashboard session
//!
//! Owns the module registry, the compilation engine and the last
//! published snapshot.
//!
//! # States
//!
//! ```text
//! Idle --register/unregister--> CompilePending --compile--> Compiled --settle--> Idle
//!   \______________________schema change (compiles at once)______/
//! ```
//!
//! Registration never compiles inline; it only marks a compile as
//! pending. The caller (normally the driver in [`crate::driver`]) runs
//! the pending compile on its next tick.

use crate::compile::{Compilation, CompilationEngine};
use crate::horizon::Horizon;
use crate::module::{ModuleKind, ProviderReport, SharedProvider};
use crate::registry::{ModuleRegistry, Registration};
use crate::results::CompiledResults;
use crate::scenario::{Scenario, ScenarioRepository};
use planboard_ids::{ScenarioId, SessionId};
use planboard_schema::SchemaCollection;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    CompilePending,
    Compiled,
}

pub struct DashboardSession {
    id: SessionId,
    registry: ModuleRegistry,
    engine: CompilationEngine,
    schema: Option<Arc<SchemaCollection>>,
    current: Arc<CompiledResults>,
    state: SessionState,
    publish_tx: watch::Sender<Arc<CompiledResults>>,
    publish_count: u64,
    last_reports: Vec<ProviderReport>,
}

impl DashboardSession {
    /// A session publishing the all-zero "Not calculated" snapshot.
    pub fn new(horizon: Horizon) -> Self {
        let current = Arc::new(CompiledResults::initial(&horizon));
        let (publish_tx, _rx) = watch::channel(current.clone());
        let id = SessionId::generate();
        debug!(session_id = %id, periods = ?horizon.periods(), "Dashboard session created");
        Self {
            id,
            registry: ModuleRegistry::new(),
            engine: CompilationEngine::new(horizon),
            schema: None,
            current,
            state: SessionState::Idle,
            publish_tx,
            publish_count: 0,
            last_reports: Vec::new(),
        }
    }

    /// Start with a schema snapshot without compiling.
    pub fn with_schema(mut self, schema: Arc<SchemaCollection>) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn horizon(&self) -> &Horizon {
        self.engine.horizon()
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn schema(&self) -> Option<&Arc<SchemaCollection>> {
        self.schema.as_ref()
    }

    /// Last published snapshot.
    pub fn current(&self) -> Arc<CompiledResults> {
        self.current.clone()
    }

    /// Receives every newly published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<CompiledResults>> {
        self.publish_tx.subscribe()
    }

    /// Number of snapshots published since creation, not counting the
    /// initial one.
    pub fn publish_count(&self) -> u64 {
        self.publish_count
    }

    /// Provider outcomes from the most recent compile.
    pub fn last_reports(&self) -> &[ProviderReport] {
        &self.last_reports
    }

    pub fn register_module(&mut self, id: &str, provider: SharedProvider, kind: ModuleKind) -> Registration {
        let registration = self.registry.register(id, provider, kind);
        if registration.is_active() {
            self.mark_pending();
        }
        registration
    }

    pub fn unregister_module(&mut self, id: &str, kind: Option<ModuleKind>) -> bool {
        let removed = self.registry.unregister(id, kind);
        if removed {
            self.mark_pending();
        }
        removed
    }

    pub fn release(&mut self, registration: &Registration) -> bool {
        let removed = self.registry.release(registration);
        if removed {
            self.mark_pending();
        }
        removed
    }

    /// Request a compile on the next tick.
    pub fn mark_pending(&mut self) {
        if self.state != SessionState::CompilePending {
            debug!(session_id = %self.id, "Compile scheduled");
        }
        self.state = SessionState::CompilePending;
    }

    pub fn is_pending(&self) -> bool {
        self.state == SessionState::CompilePending
    }

    /// Compile now and publish only if something changed.
    pub fn compile(&mut self) -> Compilation {
        let compilation = self
            .engine
            .compile(&self.registry, self.schema.as_ref(), Some(&self.current));

        if compilation.changed {
            self.current = compilation.results.clone();
            self.publish_tx.send_replace(self.current.clone());
            self.publish_count += 1;
            info!(
                session_id = %self.id,
                publish_count = self.publish_count,
                "Published compiled results"
            );
        } else {
            debug!(session_id = %self.id, "Compiled results unchanged; nothing published");
        }

        self.last_reports = compilation.reports.clone();
        self.state = SessionState::Compiled;
        compilation
    }

    /// Run the scheduled compile, if any.
    pub fn run_pending(&mut self) -> Option<Compilation> {
        self.is_pending().then(|| self.compile())
    }

    /// Return to `Idle` once a compile has been handled.
    pub fn settle(&mut self) {
        if self.state == SessionState::Compiled {
            self.state = SessionState::Idle;
        }
    }

    /// A new schema snapshot always triggers a compile.
    pub fn schema_changed(&mut self, schema: Arc<SchemaCollection>) -> Compilation {
        debug!(session_id = %self.id, items = schema.items.len(), "Schema snapshot changed");
        self.schema = Some(schema);
        self.compile()
    }

    /// Immutable named copy of the current snapshot.
    pub fn save_scenario(&self, name: Option<&str>) -> Scenario {
        let schema_hash = self.schema.as_ref().map(|s| s.content_hash());
        let scenario = Scenario::new(name, (*self.current).clone(), schema_hash);
        info!(session_id = %self.id, scenario_id = %scenario.id, name = %scenario.name, "Scenario saved");
        scenario
    }

    /// Ask the repository for a scenario. Only success is reported back.
    pub fn load_scenario(&self, repository: &dyn ScenarioRepository, id: &ScenarioId) -> bool {
        match repository.load(id) {
            Ok(scenario) => {
                info!(session_id = %self.id, scenario_id = %id, name = %scenario.name, "Scenario loaded");
                true
            }
            Err(err) => {
                warn!(session_id = %self.id, scenario_id = %id, error = %err, "Scenario load failed");
                false
            }
        }
    }
}
