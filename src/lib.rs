//! Expense tracking over flat CSV, JSON and XLSX files.
//!
//! [`RecordModel`] holds the records and the derived view (sorted,
//! filtered, grouped, pivoted) and notifies observers of every change.
//! [`CategoryTreeModel`] is a read-only per-category projection.

pub mod chart;
pub mod error;
pub mod fmt;
pub mod formats;
pub mod item_model;
pub mod models;
pub mod query;
pub mod record_model;
pub mod settings;
pub mod signals;
pub mod table;
pub mod tree_model;
pub mod validate;

pub use error::{DepensesError, Result};
pub use record_model::RecordModel;
pub use tree_model::CategoryTreeModel;
