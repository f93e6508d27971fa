//! Raw min/max totals over schema items.

use crate::item::{Category, SchemaItem};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summed bounds for one period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeTotal {
    pub min: f64,
    pub max: f64,
}

/// Category totals keyed by period.
///
/// `net` pairs bounds asymmetrically: `net.min` is the worst case
/// (`revenue.min - costs.max`) and `net.max` the best case
/// (`revenue.max - costs.min`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaTotals {
    pub costs: BTreeMap<String, RangeTotal>,
    pub revenue: BTreeMap<String, RangeTotal>,
    pub net: BTreeMap<String, RangeTotal>,
}

impl SchemaTotals {
    pub fn from_items<'a, I, S>(items: I, periods: &[S]) -> Self
    where
        I: IntoIterator<Item = &'a SchemaItem>,
        S: AsRef<str>,
    {
        let mut totals = SchemaTotals::default();
        for period in periods {
            let period = period.as_ref().to_string();
            totals.costs.insert(period.clone(), RangeTotal::default());
            totals.revenue.insert(period.clone(), RangeTotal::default());
            totals.net.insert(period, RangeTotal::default());
        }

        for item in items {
            let bucket = match item.category {
                Category::Cost => &mut totals.costs,
                Category::Revenue => &mut totals.revenue,
            };
            for period in periods {
                // Items without data for a period contribute nothing to it.
                let (Some(range), Some(total)) =
                    (item.year_data.get(period.as_ref()), bucket.get_mut(period.as_ref()))
                else {
                    continue;
                };
                total.min += range.min;
                total.max += range.max;
            }
        }

        for period in periods {
            let period = period.as_ref();
            let costs = totals.costs[period];
            let revenue = totals.revenue[period];
            totals.net.insert(
                period.to_string(),
                RangeTotal {
                    min: revenue.min - costs.max,
                    max: revenue.max - costs.min,
                },
            );
        }

        totals
    }
}
