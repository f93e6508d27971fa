//! Async session driver
//!
//! Runs a [`DashboardSession`] on a tokio task. Callers talk to it through
//! a [`SessionHandle`]; registration commands are applied in order and all
//! commands queued within one tick (or one debounce window) are coalesced
//! into a single compile. Schema changes compile immediately.

use crate::module::{ModuleKind, SharedProvider};
use crate::registry::ModuleRegistry;
use crate::results::CompiledResults;
use crate::scenario::Scenario;
use crate::session::DashboardSession;
use planboard_schema::SchemaCollection;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

enum Command {
    Register {
        id: String,
        provider: SharedProvider,
        kind: ModuleKind,
    },
    Unregister {
        id: String,
        kind: Option<ModuleKind>,
    },
    Compile,
    Snapshot {
        reply: oneshot::Sender<Arc<CompiledResults>>,
    },
    SaveScenario {
        name: Option<String>,
        reply: oneshot::Sender<Scenario>,
    },
    Shutdown,
}

/// Client side of a running session.
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<Command>,
    results: watch::Receiver<Arc<CompiledResults>>,
    task: JoinHandle<DashboardSession>,
}

/// Returned by registration. `unregister` removes the module again; for a
/// rejected registration it does nothing.
#[derive(Debug)]
pub struct ModuleHandle {
    id: String,
    kind: ModuleKind,
    tx: Option<mpsc::UnboundedSender<Command>>,
}

impl ModuleHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    pub fn is_active(&self) -> bool {
        self.tx.is_some()
    }

    pub fn unregister(self) {
        if let Some(tx) = self.tx {
            let _ = tx.send(Command::Unregister {
                id: self.id,
                kind: Some(self.kind),
            });
        }
    }
}

/// Spawn `session` onto the current tokio runtime.
///
/// `schema_rx` is the store's change feed; pass `None` for a session that
/// only aggregates modules. With `debounce` set, the driver waits that long
/// after the first queued command before compiling.
pub fn spawn_session(
    session: DashboardSession,
    schema_rx: Option<watch::Receiver<Arc<SchemaCollection>>>,
    debounce: Option<Duration>,
) -> SessionHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let results = session.subscribe();
    let task = tokio::spawn(run(session, rx, schema_rx, debounce));
    SessionHandle { tx, results, task }
}

impl SessionHandle {
    pub fn register_module(&self, id: &str, provider: SharedProvider, kind: ModuleKind) -> ModuleHandle {
        let id = match ModuleRegistry::validate_id(id) {
            Ok(id) => id,
            Err(err) => {
                warn!(error = %err, kind = %kind, "Registration ignored");
                return ModuleHandle {
                    id: id.to_string(),
                    kind,
                    tx: None,
                };
            }
        };

        let sent = self
            .tx
            .send(Command::Register {
                id: id.clone(),
                provider,
                kind,
            })
            .is_ok();
        if !sent {
            warn!(module_id = %id, "Session has stopped; registration dropped");
        }
        ModuleHandle {
            id,
            kind,
            tx: sent.then(|| self.tx.clone()),
        }
    }

    /// Register under the kind inferred from the id.
    pub fn register_inferred(&self, id: &str, provider: SharedProvider) -> ModuleHandle {
        self.register_module(id, provider, ModuleKind::infer_from_id(id))
    }

    pub fn unregister_module(&self, id: &str, kind: Option<ModuleKind>) {
        let _ = self.tx.send(Command::Unregister {
            id: id.to_string(),
            kind,
        });
    }

    /// Schedule a compile, e.g. after a module's parameters changed.
    pub fn request_compile(&self) {
        let _ = self.tx.send(Command::Compile);
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<CompiledResults>> {
        self.results.clone()
    }

    pub fn current(&self) -> Arc<CompiledResults> {
        self.results.borrow().clone()
    }

    /// The snapshot after every queued command has been applied and
    /// compiled. `None` if the session has stopped.
    pub async fn compiled(&self) -> Option<Arc<CompiledResults>> {
        let (reply, response) = oneshot::channel();
        self.tx.send(Command::Snapshot { reply }).ok()?;
        response.await.ok()
    }

    /// Save the current snapshot once every queued command has been applied.
    /// `None` if the session has stopped.
    pub async fn save_scenario(&self, name: Option<&str>) -> Option<Scenario> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Command::SaveScenario {
                name: name.map(str::to_string),
                reply,
            })
            .ok()?;
        response.await.ok()
    }

    /// Stop the driver and hand back the session.
    pub async fn shutdown(self) -> Result<DashboardSession, JoinError> {
        let _ = self.tx.send(Command::Shutdown);
        self.task.await
    }
}

async fn run(
    mut session: DashboardSession,
    mut rx: mpsc::UnboundedReceiver<Command>,
    mut schema_rx: Option<watch::Receiver<Arc<SchemaCollection>>>,
    debounce: Option<Duration>,
) -> DashboardSession {
    info!(session_id = %session.id(), "Session driver started");

    // pick up a schema published before the driver started
    if let Some(schema) = schema_rx.as_mut().map(|rx| rx.borrow_and_update().clone()) {
        session.schema_changed(schema);
    }

    loop {
        session.settle();

        tokio::select! {
            command = rx.recv() => {
                let Some(command) = command else { break };
                if !apply(&mut session, command) {
                    session.run_pending();
                    break;
                }

                match debounce {
                    Some(window) => tokio::time::sleep(window).await,
                    None => tokio::task::yield_now().await,
                }

                let mut stop = false;
                while let Ok(command) = rx.try_recv() {
                    if !apply(&mut session, command) {
                        stop = true;
                        break;
                    }
                }
                session.run_pending();
                if stop {
                    break;
                }
            }
            changed = next_schema(&mut schema_rx) => {
                match changed {
                    Some(schema) => {
                        session.schema_changed(schema);
                    }
                    None => {
                        debug!(session_id = %session.id(), "Schema feed closed");
                        schema_rx = None;
                    }
                }
            }
        }
    }

    info!(
        session_id = %session.id(),
        publish_count = session.publish_count(),
        "Session driver stopped"
    );
    session
}

/// Apply one command. Returns false on shutdown.
fn apply(session: &mut DashboardSession, command: Command) -> bool {
    match command {
        Command::Register { id, provider, kind } => {
            session.register_module(&id, provider, kind);
        }
        Command::Unregister { id, kind } => {
            session.unregister_module(&id, kind);
        }
        Command::Compile => session.mark_pending(),
        Command::Snapshot { reply } => {
            session.run_pending();
            let _ = reply.send(session.current());
        }
        Command::SaveScenario { name, reply } => {
            session.run_pending();
            let _ = reply.send(session.save_scenario(name.as_deref()));
        }
        Command::Shutdown => return false,
    }
    true
}

/// Next schema snapshot, or `None` once the store is gone. Never resolves
/// when there is no feed.
async fn next_schema(
    schema_rx: &mut Option<watch::Receiver<Arc<SchemaCollection>>>,
) -> Option<Arc<SchemaCollection>> {
    match schema_rx {
        Some(rx) => match rx.changed().await {
            Ok(()) => Some(rx.borrow_and_update().clone()),
            Err(_) => None,
        },
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculators::{EmployeeCostsModule, EMPLOYEE_COSTS_ID};
    use crate::horizon::Horizon;
    use crate::module::{provider_fn, ModuleResult};

    #[tokio::test]
    async fn test_burst_of_registrations_compiles_once() {
        let handle = spawn_session(DashboardSession::new(Horizon::default()), None, None);
        let mut results = handle.subscribe();

        for (id, value) in [("a", 1.0), ("b", 2.0), ("c", 3.0)] {
            handle.register_module(
                id,
                provider_fn(move || Ok(ModuleResult::ready(id).with_cost("2026", value))),
                ModuleKind::Costs,
            );
        }

        results.changed().await.unwrap();
        assert_eq!(results.borrow_and_update().costs("2026"), 6.0);

        let session = handle.shutdown().await.unwrap();
        assert_eq!(session.publish_count(), 1);
        assert_eq!(session.registry().len(), 3);
    }

    #[tokio::test]
    async fn test_compiled_waits_for_queued_commands() {
        let handle = spawn_session(DashboardSession::new(Horizon::default()), None, None);
        handle.register_module(
            "staff",
            provider_fn(|| Ok(ModuleResult::ready("staff").with_cost("2026", 7.0))),
            ModuleKind::Costs,
        );
        let snapshot = handle.compiled().await.unwrap();
        assert_eq!(snapshot.costs("2026"), 7.0);
        assert!(Arc::ptr_eq(&snapshot, &handle.current()));

        let session = handle.shutdown().await.unwrap();
        assert_eq!(session.publish_count(), 1);
    }

    #[tokio::test]
    async fn test_parameter_change_recompiles_on_request() {
        let module = Arc::new(EmployeeCostsModule::new(Horizon::default()));
        let handle = spawn_session(DashboardSession::new(Horizon::default()), None, None);
        let registered = handle.register_inferred(EMPLOYEE_COSTS_ID, module.clone());
        assert_eq!(registered.kind(), ModuleKind::Costs);

        let before = handle.compiled().await.unwrap();
        let payroll_2026 = 600_000.0 + 600_000.0 + 1_500_000.0 + 420_000.0;
        assert!((before.costs("2026") - payroll_2026 * 1.3).abs() < 1e-6);

        let mut results = handle.subscribe();
        results.borrow_and_update();

        let mut params = module.params().unwrap();
        params.benefits_percentage.insert("2026".to_string(), 0.0);
        module.set_params(params).unwrap();
        handle.request_compile();

        results.changed().await.unwrap();
        let after = results.borrow_and_update().clone();
        assert!(!Arc::ptr_eq(&before, &after));
        assert!((after.costs("2026") - payroll_2026).abs() < 1e-6);
        assert_eq!(after.costs("2027"), before.costs("2027"));

        // nothing changed since, so a second request publishes nothing
        handle.request_compile();
        let again = handle.compiled().await.unwrap();
        assert!(Arc::ptr_eq(&after, &again));

        let session = handle.shutdown().await.unwrap();
        assert_eq!(session.publish_count(), 2);
    }

    #[tokio::test]
    async fn test_invalid_registration_gives_inert_handle() {
        let handle = spawn_session(DashboardSession::new(Horizon::default()), None, None);
        let module = handle.register_module("", provider_fn(|| Ok(ModuleResult::ready("x"))), ModuleKind::Costs);
        assert!(!module.is_active());
        module.unregister();

        let session = handle.shutdown().await.unwrap();
        assert!(session.registry().is_empty());
        assert_eq!(session.publish_count(), 0);
    }
}
