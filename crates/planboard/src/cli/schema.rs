//! `planboard schema`: export, validate and merge schema documents.

use crate::cli::config::PlanboardConfig;
use crate::cli::context;
use crate::cli::output::print_table;
use anyhow::{Context, Result};
use clap::Subcommand;
use planboard_schema::{preset_by_name, SchemaCollection, SchemaFileStorage, PRESET_NAMES};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Subcommand)]
pub enum SchemaAction {
    /// Write the loaded schema as JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check a schema document without loading it
    Validate {
        /// Document to check
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Merge a bundled preset into the schema and save it
    Merge {
        /// Preset name (e.g., buyers-portal)
        preset: String,

        /// Save to this file instead of the configured schema path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Show what would change without saving
        #[arg(long)]
        dry_run: bool,
    },
}

pub fn run(action: SchemaAction, config: &PlanboardConfig) -> Result<()> {
    match action {
        SchemaAction::Export { output } => export(config, output),
        SchemaAction::Validate { file, json } => validate(file, json),
        SchemaAction::Merge {
            preset,
            output,
            dry_run,
        } => merge(config, &preset, output, dry_run),
    }
}

fn export(config: &PlanboardConfig, output: Option<PathBuf>) -> Result<()> {
    let store = context::open_schema(&config.schema, None)?;
    match output {
        Some(path) => {
            SchemaFileStorage::new(path.clone())
                .save(&store.snapshot())
                .with_context(|| format!("Failed to write schema: {}", path.display()))?;
            eprintln!("Exported {} items to {}", store.snapshot().items.len(), path.display());
        }
        None => println!("{}", store.export_json()?),
    }
    Ok(())
}

/// Outcome of validating one document.
#[derive(Debug, serde::Serialize)]
struct ValidationReport {
    valid: bool,
    error: Option<String>,
    items: usize,
    warnings: Vec<String>,
    content_hash: Option<String>,
}

fn check(contents: &str) -> ValidationReport {
    match SchemaCollection::from_json_str(contents) {
        Ok(collection) => ValidationReport {
            valid: true,
            error: None,
            items: collection.items.len(),
            warnings: collection
                .undeclared_subcategories()
                .iter()
                .map(ToString::to_string)
                .collect(),
            content_hash: Some(collection.content_hash()),
        },
        Err(err) => ValidationReport {
            valid: false,
            error: Some(err.to_string()),
            items: 0,
            warnings: Vec::new(),
            content_hash: None,
        },
    }
}

fn validate(file: PathBuf, json: bool) -> Result<()> {
    let contents =
        fs::read_to_string(&file).with_context(|| format!("Failed to read schema: {}", file.display()))?;
    let report = check(&contents);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.valid {
        println!("VALID: {} ({} items)", file.display(), report.items);
        for warning in &report.warnings {
            println!("  warning: {}", warning);
        }
        if let Some(hash) = &report.content_hash {
            println!("  content hash: {}", hash);
        }
    } else {
        println!("INVALID: {}", file.display());
        if let Some(error) = &report.error {
            println!("  {}", error);
        }
    }

    if !report.valid {
        anyhow::bail!("schema validation failed: {}", file.display());
    }
    Ok(())
}

fn merge(config: &PlanboardConfig, preset: &str, output: Option<PathBuf>, dry_run: bool) -> Result<()> {
    let preset_collection = preset_by_name(preset)
        .with_context(|| format!("Known presets: {}", PRESET_NAMES.join(", ")))?;

    let mut store = context::open_schema(&config.schema, None)?;
    let before = store.snapshot();
    let merged = store.merge_preset(&preset_collection);

    let added: Vec<Vec<String>> = merged
        .items
        .values()
        .filter(|item| !before.items.contains_key(&item.id))
        .map(|item| {
            vec![
                item.id.clone(),
                item.category.to_string(),
                item.subcategory.clone(),
                item.name.clone(),
            ]
        })
        .collect();

    if added.is_empty() {
        println!("Preset '{}' adds no new items.", preset);
    } else {
        println!("Preset '{}' adds {} items:", preset, added.len());
        print_table(&["Id", "Category", "Subcategory", "Name"], added);
    }

    if dry_run {
        println!("Dry run; nothing saved.");
        return Ok(());
    }

    let path = output.unwrap_or_else(|| config.schema.resolved_path());
    SchemaFileStorage::new(path.clone())
        .save(&merged)
        .with_context(|| format!("Failed to write schema: {}", path.display()))?;
    println!("Saved {} items to {}", merged.items.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use planboard_schema::default_schema;

    #[test]
    fn test_check_valid_document() {
        let json = serde_json::to_string(&default_schema().unwrap()).unwrap();
        let report = check(&json);
        assert!(report.valid);
        assert_eq!(report.items, default_schema().unwrap().items.len());
        assert!(report.content_hash.is_some());
    }

    #[test]
    fn test_check_rejects_missing_items() {
        let report = check(r#"{"version": "1.0.0"}"#);
        assert!(!report.valid);
        assert!(report.error.is_some());
    }

    #[test]
    fn test_merge_saves_to_output() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = PlanboardConfig::default();
        config.schema.path = Some(tmp.path().join("schema.json"));
        let output = tmp.path().join("merged.json");

        merge(&config, "buyers-portal", Some(output.clone()), false).unwrap();
        let saved = SchemaFileStorage::new(output).load().unwrap().unwrap();
        assert!(saved.items.len() > default_schema().unwrap().items.len());

        // dry run leaves the configured path untouched
        merge(&config, "buyers-portal", None, true).unwrap();
        assert!(!tmp.path().join("schema.json").exists());
    }
}
