//! Module registry
//!
//! A directory of result providers partitioned by [`ModuleKind`].
//! Registering an id that already exists in the same partition replaces
//! its provider. Invalid registrations are logged and ignored.

use crate::error::EngineError;
use crate::module::{ModuleKind, SharedProvider};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Breakdown key reserved for the schema contribution.
pub const SCHEMA_SOURCE_ID: &str = "schema";

/// Receipt for one `register` call. Pass it back to
/// [`ModuleRegistry::release`] to undo the registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    Active { id: String, kind: ModuleKind },
    /// The registration was rejected; releasing it does nothing.
    Ignored,
}

impl Registration {
    pub fn is_active(&self) -> bool {
        matches!(self, Registration::Active { .. })
    }
}

#[derive(Default)]
pub struct ModuleRegistry {
    partitions: BTreeMap<ModuleKind, BTreeMap<String, SharedProvider>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalized module id, or why it cannot be registered.
    pub fn validate_id(id: &str) -> Result<String, EngineError> {
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(EngineError::InvalidRegistration("module id must not be empty".to_string()));
        }
        if trimmed == SCHEMA_SOURCE_ID {
            return Err(EngineError::InvalidRegistration(format!(
                "module id '{}' is reserved for the schema contribution",
                SCHEMA_SOURCE_ID
            )));
        }
        Ok(trimmed.to_string())
    }

    pub fn register(&mut self, id: &str, provider: SharedProvider, kind: ModuleKind) -> Registration {
        let id = match Self::validate_id(id) {
            Ok(id) => id,
            Err(err) => {
                warn!(error = %err, kind = %kind, "Registration ignored");
                return Registration::Ignored;
            }
        };

        let replaced = self
            .partitions
            .entry(kind)
            .or_default()
            .insert(id.clone(), provider)
            .is_some();
        debug!(module_id = %id, kind = %kind, replaced, "Module registered");
        Registration::Active { id, kind }
    }

    /// Register under the kind inferred from the id.
    pub fn register_inferred(&mut self, id: &str, provider: SharedProvider) -> Registration {
        self.register(id, provider, ModuleKind::infer_from_id(id))
    }

    /// Remove `id` from `kind`, or from the first partition holding it
    /// when `kind` is `None`. Returns whether anything was removed.
    pub fn unregister(&mut self, id: &str, kind: Option<ModuleKind>) -> bool {
        let id = id.trim();
        let kinds: &[ModuleKind] = match &kind {
            Some(kind) => std::slice::from_ref(kind),
            None => &ModuleKind::ALL,
        };

        for kind in kinds {
            let removed = self
                .partitions
                .get_mut(kind)
                .and_then(|partition| partition.remove(id))
                .is_some();
            if removed {
                debug!(module_id = %id, kind = %kind, "Module unregistered");
                return true;
            }
        }
        debug!(module_id = %id, "Unregister found no module");
        false
    }

    pub fn release(&mut self, registration: &Registration) -> bool {
        match registration {
            Registration::Active { id, kind } => self.unregister(id, Some(*kind)),
            Registration::Ignored => false,
        }
    }

    pub fn contains(&self, id: &str, kind: ModuleKind) -> bool {
        self.partitions
            .get(&kind)
            .map_or(false, |partition| partition.contains_key(id))
    }

    pub fn len(&self) -> usize {
        self.partitions.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self, kind: ModuleKind) -> Vec<String> {
        self.partitions
            .get(&kind)
            .map(|partition| partition.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Every provider with its id and kind. Iteration order is not part of
    /// the contract.
    pub fn iter(&self) -> impl Iterator<Item = (ModuleKind, &str, &SharedProvider)> + '_ {
        self.partitions.iter().flat_map(|(kind, partition)| {
            partition
                .iter()
                .map(move |(id, provider)| (*kind, id.as_str(), provider))
        })
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for kind in ModuleKind::ALL {
            map.entry(&kind, &self.ids(kind));
        }
        map.finish()
    }
}
