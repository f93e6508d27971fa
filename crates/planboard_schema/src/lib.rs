//! Forecast Schema
//!
//! The schema is the canonical set of forecastable line items. Each item
//! carries a min/max range per period; the dashboard compiles point
//! estimates (midpoints) from it.
//!
//! # Lifecycle
//!
//! 1. **Bootstrap**: restore a saved document or start from the bundled
//!    defaults, then ensure the supplemental items exist
//! 2. **Edit**: add, update and remove items through [`SchemaStore`]
//! 3. **Publish**: every accepted edit becomes a new immutable snapshot on
//!    the store's watch channel
//! 4. **Persist**: export to JSON or save with [`SchemaFileStorage`]
//!
//! Edits that reference unknown ids are logged and ignored. Imports are
//! validated up front and rejected as a whole.
//!
//! # Modules
//!
//! - [`item`]: line items, ranges and metadata
//! - [`collection`]: the schema document, merging and hashing
//! - [`totals`]: raw min/max totals per category
//! - [`store`]: the live, observable store
//! - [`storage`]: JSON file persistence
//! - [`defaults`]: bundled datasets and presets

pub mod collection;
pub mod defaults;
pub mod error;
pub mod item;
pub mod storage;
pub mod store;
pub mod totals;

pub use collection::{SchemaCategories, SchemaCollection, SubcategoryWarning};
pub use defaults::{buyers_portal_preset, default_schema, preset_by_name, supplemental_items, PRESET_NAMES};
pub use error::{Result, SchemaError};
pub use item::{Category, ItemMetadata, SchemaItem, SchemaItemPatch, YearRange};
pub use storage::SchemaFileStorage;
pub use store::SchemaStore;
pub use totals::{RangeTotal, SchemaTotals};
