//! Schema line items
//!
//! A [`SchemaItem`] is one forecastable cost or revenue line. Each item
//! carries a min/max range per period key and free-form metadata.

use crate::error::{Result, SchemaError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Top-level category of a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Cost,
    Revenue,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Cost => "cost",
            Category::Revenue => "revenue",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Financial range for one period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearRange {
    pub min: f64,
    pub max: f64,
}

impl YearRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Point estimate used by compilation: the arithmetic mean of the bounds.
    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    /// Both bounds finite and `min <= max`.
    pub fn is_ordered(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}

/// Free-form item metadata. Known keys are typed; anything else is kept
/// verbatim in `extra` so imports round-trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    /// fixed / variable / semi-variable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub growth_percentage: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_unit_cost: Option<BTreeMap<String, f64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_unit_revenue: Option<BTreeMap<String, f64>>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ItemMetadata {
    pub fn described(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            unit: Some("currency".to_string()),
            ..Default::default()
        }
    }
}

/// A single forecastable cost or revenue line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaItem {
    /// Dotted path, e.g. `cost.employee.executives`
    pub id: String,
    pub name: String,
    pub category: Category,
    pub subcategory: String,
    /// Range per period key (`"2026"`, ...)
    pub year_data: BTreeMap<String, YearRange>,
    #[serde(default)]
    pub metadata: ItemMetadata,
}

impl SchemaItem {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: Category,
        subcategory: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            subcategory: subcategory.into(),
            year_data: BTreeMap::new(),
            metadata: ItemMetadata::default(),
        }
    }

    /// Set the range for one period
    pub fn with_year(mut self, period: impl Into<String>, min: f64, max: f64) -> Self {
        self.year_data.insert(period.into(), YearRange::new(min, max));
        self
    }

    pub fn with_metadata(mut self, metadata: ItemMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Midpoint for `period`, if the item has data for it.
    pub fn point_estimate(&self, period: &str) -> Option<f64> {
        self.year_data.get(period).map(YearRange::midpoint)
    }

    /// Check the id and every present year range.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(SchemaError::InvalidItem("item id must not be empty".to_string()));
        }
        validate_year_data(&self.id, &self.year_data)
    }

    /// Shallow-merge the provided fields into this item.
    pub fn apply(&mut self, patch: SchemaItemPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(subcategory) = patch.subcategory {
            self.subcategory = subcategory;
        }
        if let Some(year_data) = patch.year_data {
            self.year_data = year_data;
        }
        if let Some(metadata) = patch.metadata {
            self.metadata = metadata;
        }
    }
}

pub(crate) fn validate_year_data(id: &str, year_data: &BTreeMap<String, YearRange>) -> Result<()> {
    for (period, range) in year_data {
        if !range.is_ordered() {
            return Err(SchemaError::InvalidItem(format!(
                "{}: range for {} must satisfy min <= max (got min={}, max={})",
                id, period, range.min, range.max
            )));
        }
    }
    Ok(())
}

/// Partial update for [`SchemaItem::apply`]. Unset fields are left alone;
/// set fields replace the whole value (no nested merge).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaItemPatch {
    pub name: Option<String>,
    pub category: Option<Category>,
    pub subcategory: Option<String>,
    pub year_data: Option<BTreeMap<String, YearRange>>,
    pub metadata: Option<ItemMetadata>,
}

impl SchemaItemPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn subcategory(mut self, subcategory: impl Into<String>) -> Self {
        self.subcategory = Some(subcategory.into());
        self
    }

    pub fn year_data(mut self, year_data: BTreeMap<String, YearRange>) -> Self {
        self.year_data = Some(year_data);
        self
    }

    pub fn metadata(mut self, metadata: ItemMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
