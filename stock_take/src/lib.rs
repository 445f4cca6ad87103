//! Stock Take - barcode scan inventory counting
//!
//! Each scan either increments an existing item's quantity or registers a new
//! item. Items live in a single SQLite table; the engine validates edits before
//! anything is written.

pub mod database;
pub mod engine;
pub mod error;
pub mod export;
pub mod models;
pub mod web;

pub use database::{init_schema, open_database};
pub use engine::{NewItemPolicy, ScanOutcome};
pub use error::{Result, StockError, StoreError};
pub use models::{Item, ItemPatch, ScanRequest, TextEdit};
