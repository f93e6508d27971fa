//! `planboard scenario`: save, list and show compiled snapshots.

use crate::cli::compile::{self, CompileArgs};
use crate::cli::config::{scenarios_dir, PlanboardConfig};
use crate::cli::context::{self, CompileOutcome};
use crate::cli::output::{format_age, format_money, print_table};
use anyhow::{Context, Result};
use chrono::Utc;
use clap::Subcommand;
use planboard_engine::{DirectoryScenarioRepository, ScenarioRepository};
use planboard_ids::ScenarioId;
use std::sync::Arc;

#[derive(Debug, Subcommand)]
pub enum ScenarioAction {
    /// Compile and save the result as a named scenario
    Save {
        /// Scenario name (defaults to "Scenario <date>")
        #[arg(short, long)]
        name: Option<String>,

        #[command(flatten)]
        compile: CompileArgs,
    },

    /// List saved scenarios
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a saved scenario
    Show {
        /// Scenario id
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: ScenarioAction, config: &PlanboardConfig) -> Result<()> {
    let repository = DirectoryScenarioRepository::new(scenarios_dir());
    run_with(action, config, &repository)
}

fn run_with(action: ScenarioAction, config: &PlanboardConfig, repository: &dyn ScenarioRepository) -> Result<()> {
    match action {
        ScenarioAction::Save { name, compile } => save(config, repository, name.as_deref(), compile),
        ScenarioAction::List { json } => list(repository, json),
        ScenarioAction::Show { id, json } => show(config, repository, &id, json),
    }
}

fn save(
    config: &PlanboardConfig,
    repository: &dyn ScenarioRepository,
    name: Option<&str>,
    args: CompileArgs,
) -> Result<()> {
    let store = context::open_schema(&config.schema, args.schema.as_deref())?;
    let outcome = context::compile(config, &store, &args.selected_modules(), Some(name))?;
    let scenario = outcome
        .scenario
        .context("Session stopped before the scenario was saved")?;
    repository.store(&scenario)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&scenario)?);
    } else {
        println!("Saved scenario '{}' ({})", scenario.name, scenario.id);
        if let Some(hash) = &scenario.schema_hash {
            println!("  schema hash: {}", hash);
        }
        println!(
            "  break-even: {}",
            scenario.data.summary_metrics.break_even_year
        );
    }
    Ok(())
}

fn list(repository: &dyn ScenarioRepository, json: bool) -> Result<()> {
    let scenarios = repository.list()?;

    if json {
        let summaries: Vec<_> = scenarios
            .iter()
            .map(|s| {
                serde_json::json!({
                    "id": s.id,
                    "name": s.name,
                    "timestamp": s.timestamp,
                    "breakEvenYear": s.data.summary_metrics.break_even_year,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if scenarios.is_empty() {
        println!("No saved scenarios.");
        return Ok(());
    }

    let now = Utc::now();
    let rows = scenarios
        .iter()
        .map(|s| {
            vec![
                s.id.to_string(),
                s.name.clone(),
                format_age(s.timestamp, now),
                format_money(s.data.summary_metrics.total_three_year_profit),
                s.data.summary_metrics.break_even_year.to_string(),
            ]
        })
        .collect();
    print_table(&["Id", "Name", "Saved", "Rollup profit", "Break-even"], rows);
    Ok(())
}

fn show(config: &PlanboardConfig, repository: &dyn ScenarioRepository, id: &str, json: bool) -> Result<()> {
    let id = ScenarioId::parse(id).with_context(|| format!("Invalid scenario id: {}", id))?;
    let scenario = repository.load(&id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&scenario)?);
        return Ok(());
    }

    let horizon = config.engine.horizon()?;
    println!("{} ({})", scenario.name, scenario.id);
    println!("Saved {}", scenario.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
    println!();
    compile::print_outcome(
        &CompileOutcome {
            results: Arc::new(scenario.data),
            reports: Vec::new(),
            scenario: None,
        },
        horizon.periods(),
        true,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use planboard_engine::InMemoryScenarioRepository;

    #[derive(Debug, Parser)]
    struct TestCli {
        #[command(subcommand)]
        action: ScenarioAction,
    }

    fn isolated_config(tmp: &tempfile::TempDir) -> PlanboardConfig {
        let mut config = PlanboardConfig::default();
        config.schema.path = Some(tmp.path().join("schema.json"));
        config
    }

    #[test]
    fn test_save_then_show() {
        let tmp = tempfile::tempdir().unwrap();
        let config = isolated_config(&tmp);
        let repository = InMemoryScenarioRepository::new();

        let cli = TestCli::parse_from(["test", "save", "--name", "Base", "--all-modules"]);
        run_with(cli.action, &config, &repository).unwrap();

        let saved = repository.list().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].name, "Base");
        assert!(saved[0].data.totals.cost_breakdown["2026"].contains_key("employee-costs"));

        let cli = TestCli::parse_from(["test", "show", saved[0].id.as_str()]);
        run_with(cli.action, &config, &repository).unwrap();
    }

    #[test]
    fn test_show_unknown_id_fails() {
        let config = PlanboardConfig::default();
        let repository = InMemoryScenarioRepository::new();
        let id = ScenarioId::generate();
        assert!(show(&config, &repository, id.as_str(), false).is_err());
        assert!(show(&config, &repository, "not-a-uuid", false).is_err());
    }
}
