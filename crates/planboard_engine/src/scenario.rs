//! Scenarios
//!
//! A scenario is a named, timestamped copy of a compiled snapshot.
//! Persisting and loading scenarios is delegated to a
//! [`ScenarioRepository`].

use crate::error::ScenarioError;
use crate::results::CompiledResults;
use chrono::{DateTime, Utc};
use planboard_ids::ScenarioId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub id: ScenarioId,
    pub name: String,
    pub timestamp: DateTime<Utc>,
    /// Content hash of the schema the snapshot was compiled from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_hash: Option<String>,
    pub data: CompiledResults,
}

impl Scenario {
    pub fn new(name: Option<&str>, data: CompiledResults, schema_hash: Option<String>) -> Self {
        let timestamp = Utc::now();
        let name = match name.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("Scenario {}", timestamp.format("%Y-%m-%d")),
        };
        Self {
            id: ScenarioId::generate(),
            name,
            timestamp,
            schema_hash,
            data,
        }
    }
}

/// Storage for saved scenarios.
pub trait ScenarioRepository: Send + Sync {
    fn store(&self, scenario: &Scenario) -> Result<(), ScenarioError>;

    fn load(&self, id: &ScenarioId) -> Result<Scenario, ScenarioError>;

    fn list(&self) -> Result<Vec<Scenario>, ScenarioError>;
}

#[derive(Debug, Default)]
pub struct InMemoryScenarioRepository {
    scenarios: RwLock<HashMap<ScenarioId, Scenario>>,
}

impl InMemoryScenarioRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScenarioRepository for InMemoryScenarioRepository {
    fn store(&self, scenario: &Scenario) -> Result<(), ScenarioError> {
        let mut scenarios = self
            .scenarios
            .write()
            .map_err(|_| ScenarioError::Storage("scenario lock poisoned".to_string()))?;
        scenarios.insert(scenario.id.clone(), scenario.clone());
        Ok(())
    }

    fn load(&self, id: &ScenarioId) -> Result<Scenario, ScenarioError> {
        let scenarios = self
            .scenarios
            .read()
            .map_err(|_| ScenarioError::Storage("scenario lock poisoned".to_string()))?;
        scenarios
            .get(id)
            .cloned()
            .ok_or_else(|| ScenarioError::NotFound(id.clone()))
    }

    fn list(&self) -> Result<Vec<Scenario>, ScenarioError> {
        let scenarios = self
            .scenarios
            .read()
            .map_err(|_| ScenarioError::Storage("scenario lock poisoned".to_string()))?;
        let mut all: Vec<Scenario> = scenarios.values().cloned().collect();
        all.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(all)
    }
}

/// One pretty-printed JSON file per scenario, named `<id>.json`.
#[derive(Debug, Clone)]
pub struct DirectoryScenarioRepository {
    dir: PathBuf,
}

impl DirectoryScenarioRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, id: &ScenarioId) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }
}

impl ScenarioRepository for DirectoryScenarioRepository {
    fn store(&self, scenario: &Scenario) -> Result<(), ScenarioError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&scenario.id);
        fs::write(&path, serde_json::to_string_pretty(scenario)?)?;
        info!(scenario_id = %scenario.id, path = %path.display(), "Scenario stored");
        Ok(())
    }

    fn load(&self, id: &ScenarioId) -> Result<Scenario, ScenarioError> {
        let contents = match fs::read_to_string(self.path_for(id)) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(ScenarioError::NotFound(id.clone()));
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&contents)?)
    }

    fn list(&self) -> Result<Vec<Scenario>, ScenarioError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut all = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match serde_json::from_str::<Scenario>(&fs::read_to_string(&path)?) {
                Ok(scenario) => all.push(scenario),
                Err(err) => debug!(path = %path.display(), error = %err, "Skipping unreadable scenario file"),
            }
        }
        all.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::horizon::Horizon;
    use tempfile::TempDir;

    fn scenario(name: Option<&str>) -> Scenario {
        Scenario::new(name, CompiledResults::initial(&Horizon::default()), None)
    }

    #[test]
    fn test_default_name_uses_date() {
        let unnamed = scenario(None);
        assert!(unnamed.name.starts_with("Scenario "));
        assert_eq!(scenario(Some("  ")).name.len(), unnamed.name.len());
        assert_eq!(scenario(Some("Base case")).name, "Base case");
    }

    #[test]
    fn test_in_memory_round_trip() {
        let repo = InMemoryScenarioRepository::new();
        let saved = scenario(Some("Base"));
        repo.store(&saved).unwrap();

        assert_eq!(repo.load(&saved.id).unwrap(), saved);
        assert!(matches!(
            repo.load(&ScenarioId::generate()),
            Err(ScenarioError::NotFound(_))
        ));
        assert_eq!(repo.list().unwrap().len(), 1);
    }

    #[test]
    fn test_directory_repository() {
        let dir = TempDir::new().unwrap();
        let repo = DirectoryScenarioRepository::new(dir.path().join("scenarios"));
        assert!(repo.list().unwrap().is_empty());

        let saved = scenario(Some("Optimistic"));
        repo.store(&saved).unwrap();
        std::fs::write(dir.path().join("scenarios").join("notes.txt"), "ignore me").unwrap();

        let loaded = repo.load(&saved.id).unwrap();
        assert_eq!(loaded.name, "Optimistic");
        assert_eq!(loaded.data, saved.data);
        assert_eq!(repo.list().unwrap().len(), 1);
        assert!(matches!(
            repo.load(&ScenarioId::generate()),
            Err(ScenarioError::NotFound(_))
        ));
    }
}
