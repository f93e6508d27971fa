//! `planboard totals`: raw min/max bounds of the schema per period.

use crate::cli::config::PlanboardConfig;
use crate::cli::context;
use crate::cli::output::{color_for_amount, format_money, print_table_colored};
use anyhow::Result;
use comfy_table::Color;
use planboard_schema::{RangeTotal, SchemaTotals};
use std::path::PathBuf;

#[derive(Debug, clap::Args)]
pub struct TotalsArgs {
    /// Schema document to total instead of the configured one
    #[arg(long)]
    pub schema: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: TotalsArgs, config: &PlanboardConfig) -> Result<()> {
    let horizon = config.engine.horizon()?;
    let store = context::open_schema(&config.schema, args.schema.as_deref())?;
    let totals = store.calculate_totals(horizon.periods());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&totals)?);
        return Ok(());
    }

    print_table_colored(
        &["Period", "Costs min", "Costs max", "Revenue min", "Revenue max", "Net worst", "Net best"],
        rows(&totals, horizon.periods()),
    );
    Ok(())
}

fn rows(totals: &SchemaTotals, periods: &[String]) -> Vec<Vec<(String, Option<Color>)>> {
    let at = |bucket: &std::collections::BTreeMap<String, RangeTotal>, period: &str| {
        bucket.get(period).copied().unwrap_or_default()
    };

    periods
        .iter()
        .map(|period| {
            let costs = at(&totals.costs, period);
            let revenue = at(&totals.revenue, period);
            let net = at(&totals.net, period);
            vec![
                (period.clone(), None),
                (format_money(costs.min), None),
                (format_money(costs.max), None),
                (format_money(revenue.min), None),
                (format_money(revenue.max), None),
                (format_money(net.min), color_for_amount(net.min)),
                (format_money(net.max), color_for_amount(net.max)),
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use planboard_schema::{Category, SchemaCollection, SchemaItem};

    #[test]
    fn test_rows_pair_bounds_asymmetrically() {
        let schema = SchemaCollection::new("1.0.0")
            .with_item(SchemaItem::new("c", "Cost", Category::Cost, "ops").with_year("2026", 100.0, 300.0))
            .with_item(SchemaItem::new("r", "Rev", Category::Revenue, "sales").with_year("2026", 200.0, 500.0));
        let periods = vec!["2026".to_string(), "2027".to_string()];
        let totals = schema.calculate_totals(&periods[..]);

        let rows = rows(&totals, &periods);
        assert_eq!(rows.len(), 2);
        // worst case 200 - 300, best case 500 - 100
        assert_eq!(rows[0][5], ("-100".to_string(), Some(Color::Red)));
        assert_eq!(rows[0][6], ("400".to_string(), Some(Color::Green)));
        assert_eq!(rows[1][5], ("0".to_string(), None));
    }
}
