//! CLI module for Planboard
//!
//! Every command loads the same schema store (configured document,
//! supplemental items, presets) and compiles it on a fresh session.

pub mod compile;
pub mod config;
pub mod context;
pub mod output;
pub mod scenario;
pub mod schema;
pub mod totals;
