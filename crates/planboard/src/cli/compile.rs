//! `planboard compile`: schema plus built-in modules into per-period
//! totals, breakdowns and summary metrics.

use crate::cli::config::PlanboardConfig;
use crate::cli::context::{self, CompileOutcome};
use crate::cli::output::{color_for_amount, format_money, format_percent, print_amount_table, print_table};
use anyhow::Result;
use comfy_table::Color;
use planboard_engine::calculators::BuiltinModule;
use planboard_engine::results::Breakdown;
use planboard_engine::{CompiledResults, ProviderReport};
use std::path::PathBuf;

#[derive(Debug, clap::Args)]
pub struct CompileArgs {
    /// Built-in modules to register (employee-costs, transaction-fees)
    #[arg(short, long, value_delimiter = ',')]
    pub modules: Vec<BuiltinModule>,

    /// Register every built-in module
    #[arg(long, conflicts_with = "modules")]
    pub all_modules: bool,

    /// Schema document to compile instead of the configured one
    #[arg(long)]
    pub schema: Option<PathBuf>,

    /// Show per-source breakdowns
    #[arg(short, long)]
    pub breakdown: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl CompileArgs {
    pub fn selected_modules(&self) -> Vec<BuiltinModule> {
        if self.all_modules {
            BuiltinModule::ALL.to_vec()
        } else {
            self.modules.clone()
        }
    }
}

pub fn run(args: CompileArgs, config: &PlanboardConfig) -> Result<()> {
    let horizon = config.engine.horizon()?;
    let store = context::open_schema(&config.schema, args.schema.as_deref())?;
    let outcome = context::compile(config, &store, &args.selected_modules(), None)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(outcome.results.as_ref())?);
        return Ok(());
    }

    print_outcome(&outcome, horizon.periods(), args.breakdown);
    Ok(())
}

/// Print in the order of `periods`, which is the horizon order.
pub(crate) fn print_outcome(outcome: &CompileOutcome, periods: &[String], breakdown: bool) {
    let results = outcome.results.as_ref();
    print_totals(results, periods);

    if breakdown {
        println!();
        println!("COST BREAKDOWN");
        print_breakdown(periods, &results.totals.cost_breakdown);
        println!();
        println!("REVENUE BREAKDOWN");
        print_breakdown(periods, &results.totals.revenue_breakdown);
    }

    println!();
    print_summary(results);

    if !outcome.reports.is_empty() {
        println!();
        print_reports(&outcome.reports);
    }
}

fn totals_rows(results: &CompiledResults, periods: &[String]) -> Vec<(String, Vec<(f64, Option<Color>)>)> {
    periods
        .iter()
        .map(|period| {
            let net = results.net_profit(period);
            let amounts: Vec<(f64, Option<Color>)> = vec![
                (results.costs(period), None),
                (results.revenue(period), None),
                (net, color_for_amount(net)),
            ];
            (period.clone(), amounts)
        })
        .collect()
}

fn print_totals(results: &CompiledResults, periods: &[String]) {
    print_amount_table(&["Period", "Costs", "Revenue", "Net Profit"], totals_rows(results, periods));
}

fn print_breakdown(periods: &[String], breakdown: &Breakdown) {
    let mut sources: Vec<&String> = breakdown.values().flat_map(|by_source| by_source.keys()).collect();
    sources.sort();
    sources.dedup();

    if sources.is_empty() {
        println!("(no contributions)");
        return;
    }

    let mut headers = vec!["Source"];
    headers.extend(periods.iter().map(String::as_str));
    let rows = sources
        .into_iter()
        .map(|source| {
            let amounts: Vec<(f64, Option<Color>)> = periods
                .iter()
                .map(|period| {
                    let amount = breakdown
                        .get(period)
                        .and_then(|by_source| by_source.get(source))
                        .copied()
                        .unwrap_or(0.0);
                    (amount, None)
                })
                .collect();
            (source.clone(), amounts)
        })
        .collect();
    print_amount_table(&headers, rows);
}

fn print_summary(results: &CompiledResults) {
    let metrics = &results.summary_metrics;

    println!("SUMMARY");
    println!("  Rollup revenue:      {}", format_money(metrics.total_three_year_revenue));
    println!("  Rollup costs:        {}", format_money(metrics.total_three_year_costs));
    println!("  Rollup profit:       {}", format_money(metrics.total_three_year_profit));
    println!("  Avg yearly revenue:  {}", format_money(metrics.average_yearly_revenue));
    println!("  Avg yearly costs:    {}", format_money(metrics.average_yearly_costs));
    println!("  Revenue growth:      {}", format_percent(metrics.revenue_growth_rate));
    println!("  Cost growth:         {}", format_percent(metrics.cost_growth_rate));
    println!("  Break-even:          {}", metrics.break_even_year);
    println!(
        "  Schema data:         {}",
        if results.using_schema_data { "yes" } else { "no" }
    );
}

fn print_reports(reports: &[ProviderReport]) {
    let rows = reports
        .iter()
        .map(|report| {
            vec![
                report.module_id.clone(),
                report.kind.to_string(),
                report.outcome.to_string(),
            ]
        })
        .collect();
    print_table(&["Module", "Kind", "Outcome"], rows);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use planboard_engine::Horizon;

    #[derive(Debug, Parser)]
    struct TestCli {
        #[command(flatten)]
        args: CompileArgs,
    }

    #[test]
    fn test_module_list_parses() {
        let cli = TestCli::parse_from(["test", "--modules", "employee-costs,transaction_fees"]);
        assert_eq!(
            cli.args.selected_modules(),
            vec![BuiltinModule::EmployeeCosts, BuiltinModule::TransactionFees]
        );
    }

    #[test]
    fn test_all_modules() {
        let cli = TestCli::parse_from(["test", "--all-modules"]);
        assert_eq!(cli.args.selected_modules(), BuiltinModule::ALL.to_vec());
    }

    #[test]
    fn test_unknown_module_rejected() {
        assert!(TestCli::try_parse_from(["test", "--modules", "payroll"]).is_err());
    }

    #[test]
    fn test_rows_follow_horizon_order() {
        let horizon = Horizon::new(&["Q2", "Q10", "Q1"], 2).unwrap();
        let mut results = CompiledResults::initial(&horizon);
        results.totals.costs_by_year.insert("Q10".to_string(), 50.0);
        results.totals.revenues_by_year.insert("Q10".to_string(), 80.0);
        results.totals.net_profit_by_year.insert("Q10".to_string(), 30.0);

        let rows = totals_rows(&results, horizon.periods());
        let labels: Vec<&str> = rows.iter().map(|(period, _)| period.as_str()).collect();
        assert_eq!(labels, ["Q2", "Q10", "Q1"]);
        assert_eq!(rows[1].1[2], (30.0, Some(Color::Green)));
    }
}
