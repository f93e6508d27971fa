//! Configuration for Planboard
//!
//! `planboard.toml` lives under the Planboard home (`~/.planboard/` or
//! `$PLANBOARD_HOME`) unless `--config` points elsewhere. A missing file
//! means defaults.

use anyhow::{Context, Result};
use planboard_engine::EngineConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use planboard_logging::{logs_dir, planboard_home};

pub const CONFIG_FILE_NAME: &str = "planboard.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanboardConfig {
    pub engine: EngineConfig,
    pub schema: SchemaConfig,
}

/// The `[schema]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Saved schema document. Defaults to `<home>/schema.json`.
    pub path: Option<PathBuf>,

    /// Bundled presets merged after bootstrap, in order
    pub presets: Vec<String>,

    /// Ensure the supplemental line items on load
    pub include_supplemental: bool,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            path: None,
            presets: Vec::new(),
            include_supplemental: true,
        }
    }
}

impl SchemaConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(default_schema_path)
    }
}

impl PlanboardConfig {
    /// Load from `path`, or from the default location. Only an explicit
    /// path that does not exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (default_config_path(), false),
        };

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound && !explicit => {
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to read config: {}", path.display()));
            }
        };

        Self::from_toml(&contents).with_context(|| format!("Invalid config: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: PlanboardConfig = toml::from_str(contents)?;
        // fail on a bad horizon here rather than at first compile
        config.engine.horizon()?;
        Ok(config)
    }
}

/// Get config path: ~/.planboard/planboard.toml
pub fn default_config_path() -> PathBuf {
    planboard_home().join(CONFIG_FILE_NAME)
}

/// Get default schema path: ~/.planboard/schema.json
pub fn default_schema_path() -> PathBuf {
    planboard_home().join("schema.json")
}

/// Get scenarios directory: ~/.planboard/scenarios
pub fn scenarios_dir() -> PathBuf {
    planboard_home().join("scenarios")
}

/// Arguments for the config command
#[derive(Debug, clap::Args)]
pub struct ConfigArgs {
    /// Show resolved paths and settings in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Run the config command - shows resolved paths and effective settings
pub fn run(args: ConfigArgs, config: &PlanboardConfig, config_path: Option<&Path>) -> Result<()> {
    let home = planboard_home();
    let config_file = config_path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    let schema = config.schema.resolved_path();
    let scenarios = scenarios_dir();
    let logs = logs_dir();

    if args.json {
        let resolved = serde_json::json!({
            "home": home.to_string_lossy(),
            "config": {
                "path": config_file.to_string_lossy(),
                "exists": config_file.exists(),
            },
            "schema": {
                "path": schema.to_string_lossy(),
                "exists": schema.exists(),
                "presets": config.schema.presets,
                "include_supplemental": config.schema.include_supplemental,
            },
            "scenarios": {
                "path": scenarios.to_string_lossy(),
                "exists": scenarios.exists(),
            },
            "logs": logs.to_string_lossy(),
            "engine": config.engine,
        });
        println!("{}", serde_json::to_string_pretty(&resolved)?);
        return Ok(());
    }

    let exists = |path: &Path| if path.exists() { "exists" } else { "not found" };

    println!("PLANBOARD CONFIGURATION");
    println!("=======================");
    println!();
    println!("Home:       {}", home.display());
    println!("Config:     {} ({})", config_file.display(), exists(&config_file));
    println!("Schema:     {} ({})", schema.display(), exists(&schema));
    println!("Scenarios:  {} ({})", scenarios.display(), exists(&scenarios));
    println!("Logs:       {}", logs.display());
    println!();
    println!("Periods:    {}", config.engine.periods.join(", "));
    println!("Rollup:     {} periods", config.engine.rollup_periods);
    println!("Debounce:   {} ms", config.engine.debounce_ms);
    if config.schema.presets.is_empty() {
        println!("Presets:    (none)");
    } else {
        println!("Presets:    {}", config.schema.presets.join(", "));
    }
    println!(
        "Supplemental items: {}",
        if config.schema.include_supplemental { "yes" } else { "no" }
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_is_default() {
        let config = PlanboardConfig::from_toml("").unwrap();
        assert_eq!(config, PlanboardConfig::default());
        assert!(config.schema.include_supplemental);
        assert_eq!(config.engine.rollup_periods, 3);
    }

    #[test]
    fn test_partial_tables() {
        let config = PlanboardConfig::from_toml(
            r#"
            [engine]
            periods = ["2026", "2027", "2028"]
            debounce_ms = 250

            [schema]
            presets = ["buyers-portal"]
            "#,
        )
        .unwrap();

        assert_eq!(config.engine.periods.len(), 3);
        assert_eq!(config.engine.rollup_periods, 3);
        assert_eq!(config.schema.presets, vec!["buyers-portal".to_string()]);
        assert!(config.schema.include_supplemental);
    }

    #[test]
    fn test_invalid_horizon_rejected() {
        let err = PlanboardConfig::from_toml("[engine]\nperiods = [\"2026\"]\n");
        assert!(err.is_err());
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope.toml");
        assert!(PlanboardConfig::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[schema]\ninclude_supplemental = false\n").unwrap();

        let config = PlanboardConfig::load(Some(&path)).unwrap();
        assert!(!config.schema.include_supplemental);
        assert_eq!(config.engine, EngineConfig::default());
    }
}
