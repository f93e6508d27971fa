//! The schema aggregate root
//!
//! [`SchemaCollection`] is the JSON document persisted by the store:
//! version, timestamp, declared subcategories, labels and the item map.
//! Compilation only ever reads a shared snapshot of it.

use crate::error::{Result, SchemaError};
use crate::item::{validate_year_data, Category, SchemaItem, YearRange};
use crate::totals::SchemaTotals;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Declared subcategories per category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaCategories {
    #[serde(default)]
    pub cost: Vec<String>,
    #[serde(default)]
    pub revenue: Vec<String>,
}

impl SchemaCategories {
    pub fn for_category(&self, category: Category) -> &[String] {
        match category {
            Category::Cost => &self.cost,
            Category::Revenue => &self.revenue,
        }
    }

    fn for_category_mut(&mut self, category: Category) -> &mut Vec<String> {
        match category {
            Category::Cost => &mut self.cost,
            Category::Revenue => &mut self.revenue,
        }
    }

    pub fn declares(&self, category: Category, subcategory: &str) -> bool {
        self.for_category(category).iter().any(|s| s == subcategory)
    }
}

/// An item whose subcategory is not declared under its category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubcategoryWarning {
    pub item_id: String,
    pub category: Category,
    pub subcategory: String,
}

impl std::fmt::Display for SubcategoryWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "item '{}' uses undeclared {} subcategory '{}'",
            self.item_id, self.category, self.subcategory
        )
    }
}

/// The canonical schema document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaCollection {
    pub version: String,

    pub last_updated: DateTime<Utc>,

    pub categories: SchemaCategories,

    #[serde(default)]
    pub subcategory_labels: BTreeMap<String, String>,

    pub items: BTreeMap<String, SchemaItem>,

    /// Named key metrics with a range per period (burn rate, margin, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metrics: BTreeMap<String, BTreeMap<String, YearRange>>,

    /// Scenario knobs carried through untouched
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scenario_parameters: BTreeMap<String, serde_json::Value>,
}

impl SchemaCollection {
    /// An empty collection with the given version.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            last_updated: Utc::now(),
            categories: SchemaCategories::default(),
            subcategory_labels: BTreeMap::new(),
            items: BTreeMap::new(),
            metrics: BTreeMap::new(),
            scenario_parameters: BTreeMap::new(),
        }
    }

    /// Declare a subcategory (idempotent) and optionally label it.
    pub fn declare_subcategory(
        &mut self,
        category: Category,
        subcategory: impl Into<String>,
        label: Option<&str>,
    ) {
        let subcategory = subcategory.into();
        let declared = self.categories.for_category_mut(category);
        if !declared.contains(&subcategory) {
            declared.push(subcategory.clone());
        }
        if let Some(label) = label {
            self.subcategory_labels.insert(subcategory, label.to_string());
        }
    }

    pub fn with_item(mut self, item: SchemaItem) -> Self {
        self.items.insert(item.id.clone(), item);
        self
    }

    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }

    /// Items whose subcategory is not declared for their category.
    ///
    /// The store tolerates these; callers decide whether to warn.
    pub fn undeclared_subcategories(&self) -> Vec<SubcategoryWarning> {
        self.items
            .values()
            .filter(|item| !self.categories.declares(item.category, &item.subcategory))
            .map(|item| SubcategoryWarning {
                item_id: item.id.clone(),
                category: item.category,
                subcategory: item.subcategory.clone(),
            })
            .collect()
    }

    /// Min/max totals per category and period, plus worst/best-case net.
    pub fn calculate_totals<S: AsRef<str>>(&self, periods: &[S]) -> SchemaTotals {
        SchemaTotals::from_items(self.items.values(), periods)
    }

    /// Union `preset` into a copy of this collection. On any key collision
    /// (item id, label, metric, scenario parameter) the existing entry is
    /// kept; the preset only fills gaps.
    pub fn merge_preset(&self, preset: &SchemaCollection) -> SchemaCollection {
        let mut merged = self.clone();

        for category in [Category::Cost, Category::Revenue] {
            for subcategory in preset.categories.for_category(category) {
                merged.declare_subcategory(category, subcategory.clone(), None);
            }
        }
        for (key, label) in &preset.subcategory_labels {
            merged
                .subcategory_labels
                .entry(key.clone())
                .or_insert_with(|| label.clone());
        }
        for (id, item) in &preset.items {
            merged.items.entry(id.clone()).or_insert_with(|| item.clone());
        }
        for (name, ranges) in &preset.metrics {
            merged.metrics.entry(name.clone()).or_insert_with(|| ranges.clone());
        }
        for (name, value) in &preset.scenario_parameters {
            merged
                .scenario_parameters
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }

        merged.touch();
        merged
    }

    /// Add every item in `items` whose id is not present yet.
    /// Returns how many were added.
    pub fn ensure_items<'a, I>(&mut self, items: I) -> usize
    where
        I: IntoIterator<Item = &'a SchemaItem>,
    {
        let mut added = 0;
        for item in items {
            if !self.items.contains_key(&item.id) {
                self.items.insert(item.id.clone(), item.clone());
                added += 1;
            }
        }
        added
    }

    /// Parse and validate an imported document.
    ///
    /// `version`, `categories` and `items` must be present; items must
    /// carry ordered ranges and ids matching their map keys. A missing
    /// `lastUpdated` is stamped with the current time.
    pub fn from_json_value(mut value: serde_json::Value) -> Result<Self> {
        let object = value
            .as_object_mut()
            .ok_or_else(|| SchemaError::Validation("schema document must be a JSON object".to_string()))?;

        for required in ["version", "categories", "items"] {
            match object.get(required) {
                None | Some(serde_json::Value::Null) => {
                    return Err(SchemaError::Validation(format!("missing required field '{}'", required)));
                }
                Some(_) => {}
            }
        }
        if !object.contains_key("lastUpdated") {
            object.insert(
                "lastUpdated".to_string(),
                serde_json::Value::String(Utc::now().to_rfc3339()),
            );
        }

        let collection: SchemaCollection = serde_json::from_value(value)
            .map_err(|e| SchemaError::Validation(format!("malformed schema document: {}", e)))?;
        collection.validate()?;
        Ok(collection)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| SchemaError::Validation(format!("schema document is not valid JSON: {}", e)))?;
        Self::from_json_value(value)
    }

    /// Structural checks applied on import.
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(SchemaError::Validation("version must not be empty".to_string()));
        }
        for (key, item) in &self.items {
            if key != &item.id {
                return Err(SchemaError::Validation(format!(
                    "item stored under '{}' declares id '{}'",
                    key, item.id
                )));
            }
            item.validate()
                .map_err(|e| SchemaError::Validation(e.to_string()))?;
        }
        for (name, ranges) in &self.metrics {
            validate_year_data(name, ranges).map_err(|e| SchemaError::Validation(e.to_string()))?;
        }
        Ok(())
    }

    /// SHA-256 over the canonical JSON of everything except `lastUpdated`.
    pub fn content_hash(&self) -> String {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct HashView<'a> {
            version: &'a str,
            categories: &'a SchemaCategories,
            subcategory_labels: &'a BTreeMap<String, String>,
            items: &'a BTreeMap<String, SchemaItem>,
            metrics: &'a BTreeMap<String, BTreeMap<String, YearRange>>,
            scenario_parameters: &'a BTreeMap<String, serde_json::Value>,
        }

        let view = HashView {
            version: &self.version,
            categories: &self.categories,
            subcategory_labels: &self.subcategory_labels,
            items: &self.items,
            metrics: &self.metrics,
            scenario_parameters: &self.scenario_parameters,
        };
        // BTreeMaps serialize in key order, so the bytes are canonical.
        let bytes = serde_json::to_vec(&view).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> SchemaCollection {
        let mut collection = SchemaCollection::new("1.0.0");
        collection.declare_subcategory(Category::Cost, "employee", Some("Employee Costs"));
        collection.declare_subcategory(Category::Revenue, "subscriptions", Some("Subscriptions"));
        collection.with_item(
            SchemaItem::new("cost.employee.a", "X", Category::Cost, "employee").with_year("2026", 1.0, 2.0),
        )
    }

    #[test]
    fn test_merge_preset_keeps_existing_items() {
        let existing = base();
        let mut preset = SchemaCollection::new("2.0.0");
        preset.declare_subcategory(Category::Cost, "employee", Some("Staff"));
        preset.declare_subcategory(Category::Revenue, "logistics", Some("Logistics Revenue"));
        let preset = preset
            .with_item(SchemaItem::new("cost.employee.a", "Y", Category::Cost, "employee"))
            .with_item(SchemaItem::new("revenue.logistics.ship", "Ship", Category::Revenue, "logistics"));

        let merged = existing.merge_preset(&preset);

        assert_eq!(merged.items["cost.employee.a"].name, "X");
        assert!(merged.items.contains_key("revenue.logistics.ship"));
        assert_eq!(merged.subcategory_labels["employee"], "Employee Costs");
        assert_eq!(merged.subcategory_labels["logistics"], "Logistics Revenue");
        assert_eq!(merged.categories.revenue, vec!["subscriptions", "logistics"]);
        // no duplicate subcategory
        assert_eq!(merged.categories.cost, vec!["employee"]);
        assert_eq!(merged.version, "1.0.0");
    }

    #[test]
    fn test_undeclared_subcategory_is_reported_not_rejected() {
        let collection = base().with_item(SchemaItem::new(
            "cost.travel.flights",
            "Flights",
            Category::Cost,
            "travel",
        ));
        let warnings = collection.undeclared_subcategories();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].item_id, "cost.travel.flights");
        assert!(warnings[0].to_string().contains("travel"));
        assert!(collection.validate().is_ok());
    }

    #[test]
    fn test_from_json_requires_top_level_fields() {
        let err = SchemaCollection::from_json_value(json!({"version": "1", "items": {}})).unwrap_err();
        assert!(matches!(err, SchemaError::Validation(msg) if msg.contains("categories")));

        let err = SchemaCollection::from_json_value(json!([1, 2])).unwrap_err();
        assert!(matches!(err, SchemaError::Validation(_)));

        let ok = SchemaCollection::from_json_value(json!({
            "version": "1.0.0",
            "categories": {"cost": ["employee"], "revenue": []},
            "items": {}
        }))
        .unwrap();
        assert!(ok.items.is_empty());
    }

    #[test]
    fn test_from_json_rejects_mismatched_keys_and_bad_ranges() {
        let mismatched = json!({
            "version": "1",
            "categories": {"cost": ["employee"]},
            "items": {"a": {"id": "b", "name": "B", "category": "cost", "subcategory": "employee", "yearData": {}}}
        });
        assert!(SchemaCollection::from_json_value(mismatched).is_err());

        let inverted = json!({
            "version": "1",
            "categories": {"cost": ["employee"]},
            "items": {"a": {"id": "a", "name": "A", "category": "cost", "subcategory": "employee",
                            "yearData": {"2026": {"min": 9, "max": 1}}}}
        });
        assert!(SchemaCollection::from_json_value(inverted).is_err());
    }

    #[test]
    fn test_content_hash_ignores_timestamp() {
        let a = base();
        let mut b = a.clone();
        b.last_updated = a.last_updated + chrono::Duration::seconds(30);
        assert_eq!(a.content_hash(), b.content_hash());
        assert_eq!(a.content_hash().len(), 64);
        assert!(a.content_hash().chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));

        let c = a.clone().with_item(SchemaItem::new("cost.employee.b", "B", Category::Cost, "employee"));
        assert_ne!(a.content_hash(), c.content_hash());
    }
}
