//! Bundled datasets
//!
//! - `default_schema.json`: the bootstrap dataset
//! - `supplemental_items.json`: items bootstrap always ensures are present
//! - `buyers_portal.json`: the alternate "buyers-portal" preset

use crate::collection::SchemaCollection;
use crate::error::{Result, SchemaError};
use crate::item::SchemaItem;
use std::collections::BTreeMap;

const DEFAULT_SCHEMA_JSON: &str = include_str!("../data/default_schema.json");
const SUPPLEMENTAL_ITEMS_JSON: &str = include_str!("../data/supplemental_items.json");
const BUYERS_PORTAL_JSON: &str = include_str!("../data/buyers_portal.json");

/// Names accepted by [`preset_by_name`].
pub const PRESET_NAMES: &[&str] = &["default", "buyers-portal"];

/// The default dataset exactly as shipped. Supplemental items are not
/// part of it; [`SchemaStore::bootstrap`](crate::SchemaStore::bootstrap)
/// adds them.
pub fn default_schema() -> Result<SchemaCollection> {
    SchemaCollection::from_json_str(DEFAULT_SCHEMA_JSON)
}

/// Items that bootstrap adds when missing. Existing items always win.
pub fn supplemental_items() -> Result<Vec<SchemaItem>> {
    let items: BTreeMap<String, SchemaItem> = serde_json::from_str(SUPPLEMENTAL_ITEMS_JSON)?;
    for item in items.values() {
        item.validate()?;
    }
    Ok(items.into_values().collect())
}

/// The buyers-portal preset, including its metrics and scenario parameters.
pub fn buyers_portal_preset() -> Result<SchemaCollection> {
    SchemaCollection::from_json_str(BUYERS_PORTAL_JSON)
}

pub fn preset_by_name(name: &str) -> Result<SchemaCollection> {
    match name.trim().to_ascii_lowercase().replace('_', "-").as_str() {
        "default" => default_schema(),
        "buyers-portal" | "buyersportal" => buyers_portal_preset(),
        other => Err(SchemaError::UnknownPreset(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Category;

    #[test]
    fn test_bundled_datasets_parse() {
        let base = default_schema().unwrap();
        assert_eq!(base.version, "1.0.0");
        assert_eq!(base.items.len(), 5);
        assert_eq!(supplemental_items().unwrap().len(), 24);

        let preset = buyers_portal_preset().unwrap();
        assert_eq!(preset.items.len(), 36);
        assert!(preset.metrics.contains_key("burnRate"));
        assert!(preset.scenario_parameters.contains_key("churnRate"));
    }

    #[test]
    fn test_supplemental_items_fit_default_subcategories() {
        let mut schema = default_schema().unwrap();
        assert_eq!(schema.ensure_items(&supplemental_items().unwrap()), 24);
        assert_eq!(schema.items.len(), 29);
        assert!(schema.undeclared_subcategories().is_empty());
        assert_eq!(
            schema.items["cost.employee.executives"].category,
            Category::Cost
        );
    }

    #[test]
    fn test_preset_lookup() {
        assert!(preset_by_name("Buyers_Portal").is_ok());
        assert!(matches!(
            preset_by_name("nope"),
            Err(SchemaError::UnknownPreset(name)) if name == "nope"
        ));
    }
}
