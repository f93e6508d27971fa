//! Schema store
//!
//! Owns the current [`SchemaCollection`] and publishes every new version
//! as an immutable `Arc` snapshot through a `tokio::sync::watch` channel.
//! Readers (the dashboard session) hold a receiver and never mutate.
//!
//! Edits referencing unknown ids are logged and ignored. Only a malformed
//! import is reported back to the caller.

use crate::collection::SchemaCollection;
use crate::defaults;
use crate::error::{Result, SchemaError};
use crate::item::{SchemaItem, SchemaItemPatch};
use crate::totals::SchemaTotals;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

pub struct SchemaStore {
    tx: watch::Sender<Arc<SchemaCollection>>,
}

impl SchemaStore {
    pub fn new(collection: SchemaCollection) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(collection));
        Self { tx }
    }

    /// Start from a previously saved blob if it is usable, otherwise from
    /// the default dataset. Supplemental items are ensured either way.
    pub fn bootstrap(saved: Option<&str>) -> Result<Self> {
        let restored = saved.and_then(|json| match SchemaCollection::from_json_str(json) {
            Ok(collection) => Some(collection),
            Err(err) => {
                error!(error = %err, "Saved schema is unusable, falling back to defaults");
                None
            }
        });

        let mut collection = match restored {
            Some(collection) => collection,
            None => defaults::default_schema()?,
        };
        let added = collection.ensure_items(&defaults::supplemental_items()?);
        collection.touch();
        info!(items = collection.items.len(), added, "Schema store bootstrapped");
        Ok(Self::new(collection))
    }

    /// Current snapshot (`getSchemaSnapshot`).
    pub fn snapshot(&self) -> Arc<SchemaCollection> {
        self.tx.borrow().clone()
    }

    /// Change notifications (`onSchemaChange`). Drop the receiver to
    /// unsubscribe.
    pub fn subscribe(&self) -> watch::Receiver<Arc<SchemaCollection>> {
        self.tx.subscribe()
    }

    pub fn get_item(&self, id: &str) -> Option<SchemaItem> {
        self.tx.borrow().items.get(id).cloned()
    }

    /// Shallow-merge `patch` into an existing item.
    ///
    /// An unknown id is a logged no-op. A patch that would leave the item
    /// with an inverted range is rejected and nothing changes.
    pub fn update_item(&mut self, id: &str, patch: SchemaItemPatch) -> Result<()> {
        let current = self.snapshot();
        let Some(existing) = current.items.get(id) else {
            let err = SchemaError::UnknownItem(id.to_string());
            warn!(error = %err, "update_item ignored");
            return Ok(());
        };

        let mut updated = existing.clone();
        updated.apply(patch);
        updated.id = id.to_string();
        updated.validate()?;

        let mut next = (*current).clone();
        next.items.insert(id.to_string(), updated);
        self.publish(next);
        debug!(item_id = id, "Schema item updated");
        Ok(())
    }

    /// Insert or replace an item.
    pub fn add_item(&mut self, item: SchemaItem) -> Result<()> {
        item.validate()?;
        let current = self.snapshot();
        if !current.categories.declares(item.category, &item.subcategory) {
            warn!(
                item_id = %item.id,
                category = %item.category,
                subcategory = %item.subcategory,
                "Schema item uses an undeclared subcategory"
            );
        }

        let mut next = (*current).clone();
        debug!(item_id = %item.id, "Schema item added");
        next.items.insert(item.id.clone(), item);
        self.publish(next);
        Ok(())
    }

    /// Remove an item. Returns whether anything was removed; an unknown id
    /// is a logged no-op.
    pub fn remove_item(&mut self, id: &str) -> bool {
        let current = self.snapshot();
        if !current.items.contains_key(id) {
            let err = SchemaError::UnknownItem(id.to_string());
            warn!(error = %err, "remove_item ignored");
            return false;
        }

        let mut next = (*current).clone();
        next.items.remove(id);
        self.publish(next);
        debug!(item_id = id, "Schema item removed");
        true
    }

    pub fn calculate_totals<S: AsRef<str>>(&self, periods: &[S]) -> SchemaTotals {
        self.tx.borrow().calculate_totals(periods)
    }

    pub fn export_snapshot(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(&*self.snapshot())?)
    }

    /// Pretty-printed JSON document.
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&*self.snapshot())?)
    }

    /// Replace the store contents with an imported document.
    ///
    /// `None` resets to the default dataset. A document missing `version`,
    /// `categories` or `items` (or failing validation) is rejected with
    /// [`SchemaError::Validation`] and the store keeps its prior state.
    pub fn import_snapshot(&mut self, blob: Option<serde_json::Value>) -> Result<()> {
        let mut collection = match blob {
            None => {
                info!("Resetting schema store to defaults");
                defaults::default_schema()?
            }
            Some(value) => SchemaCollection::from_json_value(value).map_err(|err| {
                error!(error = %err, "Schema import rejected");
                err
            })?,
        };
        collection.touch();
        for warning in collection.undeclared_subcategories() {
            warn!(%warning, "Imported schema item uses an undeclared subcategory");
        }
        info!(items = collection.items.len(), version = %collection.version, "Schema imported");
        self.publish(collection);
        Ok(())
    }

    pub fn import_json(&mut self, json: &str) -> Result<()> {
        let value: serde_json::Value = serde_json::from_str(json).map_err(|e| {
            let err = SchemaError::Validation(format!("schema document is not valid JSON: {}", e));
            error!(error = %err, "Schema import rejected");
            err
        })?;
        self.import_snapshot(Some(value))
    }

    /// Merge a preset into the current schema (existing entries win) and
    /// publish the result.
    pub fn merge_preset(&mut self, preset: &SchemaCollection) -> Arc<SchemaCollection> {
        let current = self.snapshot();
        let before = current.items.len();
        let merged = current.merge_preset(preset);
        info!(
            added = merged.items.len() - before,
            total = merged.items.len(),
            "Preset merged into schema"
        );
        self.publish(merged);
        self.snapshot()
    }

    fn publish(&mut self, mut next: SchemaCollection) {
        next.touch();
        self.tx.send_replace(Arc::new(next));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Category, YearRange};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn small_store() -> SchemaStore {
        let mut collection = SchemaCollection::new("1.0.0");
        collection.declare_subcategory(Category::Cost, "employee", None);
        collection.declare_subcategory(Category::Revenue, "other", None);
        SchemaStore::new(
            collection
                .with_item(SchemaItem::new("cost.employee.a", "A", Category::Cost, "employee").with_year("2026", 100.0, 200.0))
                .with_item(SchemaItem::new("revenue.other.b", "B", Category::Revenue, "other").with_year("2026", 300.0, 500.0)),
        )
    }

    #[test]
    fn test_update_unknown_item_is_noop() {
        let mut store = small_store();
        let before = store.snapshot();
        store
            .update_item("cost.missing", SchemaItemPatch::new().name("Ghost"))
            .unwrap();
        assert!(Arc::ptr_eq(&before, &store.snapshot()));
    }

    #[test]
    fn test_update_merges_fields() {
        let mut store = small_store();
        store
            .update_item("cost.employee.a", SchemaItemPatch::new().name("Renamed"))
            .unwrap();
        let item = store.get_item("cost.employee.a").unwrap();
        assert_eq!(item.name, "Renamed");
        assert_eq!(item.year_data["2026"], YearRange::new(100.0, 200.0));
    }

    #[test]
    fn test_update_rejects_inverted_range() {
        let mut store = small_store();
        let mut bad = BTreeMap::new();
        bad.insert("2026".to_string(), YearRange::new(9.0, 1.0));
        let result = store.update_item("cost.employee.a", SchemaItemPatch::new().year_data(bad));
        assert!(matches!(result, Err(SchemaError::InvalidItem(_))));
        assert_eq!(store.get_item("cost.employee.a").unwrap().year_data["2026"].min, 100.0);
    }

    #[test]
    fn test_add_requires_id() {
        let mut store = small_store();
        let result = store.add_item(SchemaItem::new("", "Nameless", Category::Cost, "employee"));
        assert!(matches!(result, Err(SchemaError::InvalidItem(_))));
        assert_eq!(store.snapshot().items.len(), 2);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut store = small_store();
        assert!(!store.remove_item("nope"));
        assert!(store.remove_item("revenue.other.b"));
        assert!(store.get_item("revenue.other.b").is_none());
    }

    #[test]
    fn test_totals_use_asymmetric_net() {
        let store = small_store();
        let totals = store.calculate_totals(&["2026"]);
        assert_eq!(totals.net["2026"].min, 100.0);
        assert_eq!(totals.net["2026"].max, 400.0);
    }

    #[test]
    fn test_import_invalid_keeps_prior_state() {
        let mut store = small_store();
        let before = store.snapshot();
        let err = store
            .import_snapshot(Some(json!({"version": "2.0.0", "items": {}})))
            .unwrap_err();
        assert!(matches!(err, SchemaError::Validation(_)));
        assert!(Arc::ptr_eq(&before, &store.snapshot()));

        assert!(store.import_json("{not json").is_err());
        assert!(Arc::ptr_eq(&before, &store.snapshot()));
    }

    #[test]
    fn test_export_import_round_trip() {
        let mut store = small_store();
        let exported = store.export_json().unwrap();
        store.remove_item("cost.employee.a");
        store.import_json(&exported).unwrap();
        assert!(store.get_item("cost.employee.a").is_some());
    }

    #[test]
    fn test_import_none_resets_to_defaults() {
        let mut store = small_store();
        store.import_snapshot(None).unwrap();
        assert!(store.get_item("cost.employee.executives").is_some());
        assert!(store.get_item("cost.employee.a").is_none());
        // the bare dataset, without supplemental items
        assert_eq!(store.snapshot().items.len(), 5);
        assert!(store.get_item("revenue.other.api_access").is_none());
    }

    #[test]
    fn test_subscribers_see_changes() {
        let mut store = small_store();
        let mut rx = store.subscribe();
        assert!(!rx.has_changed().unwrap());

        store.remove_item("cost.employee.a");
        assert!(rx.has_changed().unwrap());
        let seen = rx.borrow_and_update().clone();
        assert!(!seen.items.contains_key("cost.employee.a"));

        // ignored edits do not notify
        store.remove_item("cost.employee.a");
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_bootstrap_falls_back_on_garbage() {
        let store = SchemaStore::bootstrap(Some("{\"version\": 1")).unwrap();
        assert_eq!(store.snapshot().items.len(), 29);

        let mut saved = SchemaCollection::new("9.9.9");
        saved.declare_subcategory(Category::Cost, "employee", None);
        let saved = saved.with_item(
            SchemaItem::new("cost.employee.product_management", "Mine", Category::Cost, "employee")
                .with_year("2026", 1.0, 1.0),
        );
        let json = serde_json::to_string(&saved).unwrap();
        let store = SchemaStore::bootstrap(Some(&json)).unwrap();
        let snapshot = store.snapshot();
        assert_eq!(snapshot.version, "9.9.9");
        // saved item wins over the supplemental one with the same id
        assert_eq!(snapshot.items["cost.employee.product_management"].name, "Mine");
        assert_eq!(snapshot.items.len(), 24);
    }
}
