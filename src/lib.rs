#![deny(missing_docs)]

//! # DynamoDB Model
//!
//! A declarative record model on top of Amazon DynamoDB tables.
//!
//! ## Overview
//!
//! Tables are described once as a list of columns with types, defaults and key
//! roles. Model instances then read and write records of that table without
//! hand-written expression strings:
//! - Primary keys are derived from the record, through a secondary index when
//!   the sort key is not known
//! - Update expressions and placeholders are generated deterministically
//! - Throttled calls are retried with exponential backoff
//! - Queries are paginated and batch reads driven until no key is unprocessed
//!
//! ## Quick Example
//!
//! ```no_run
//! use dynamodb_model::{
//!     AccessLayer, FetchRow, FetchedRow, Model, Persistence, Settings,
//!     schema::{self, Column, SecondaryIndex, ValueType},
//! };
//! use serde_json::{Value, json};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = schema::register::<Value>(
//!     "orders",
//!     vec![
//!         Column::new("customer", ValueType::String).partition_key(),
//!         Column::new("order_id", ValueType::String).sort_key(),
//!         Column::new("placed", ValueType::String),
//!         Column::new("status", ValueType::String).with_default(json!("open")),
//!     ],
//!     Some(SecondaryIndex {
//!         name: "by_placed".to_string(),
//!         partition_key: "customer".to_string(),
//!         sort_key: "placed".to_string(),
//!     }),
//! )?;
//! let access = AccessLayer::connect(schema, &Settings::default()).await;
//!
//! let mut order = Model::new(&access);
//! order.populate([
//!     ("customer".to_string(), json!("c1")),
//!     ("order_id".to_string(), json!("o1")),
//!     ("placed".to_string(), json!("2024-01-01")),
//! ]);
//! order.save(None).await?;
//!
//! // No order id: the key is found through `by_placed`
//! let mut lookup = Model::new(&access);
//! lookup.populate([
//!     ("customer".to_string(), json!("c1")),
//!     ("placed".to_string(), json!("2024-01-01")),
//! ]);
//! if let FetchedRow::Row(Some(row)) = lookup.fetch_row(FetchRow::default()).await? {
//!     println!("{row:?}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`mod@schema`] - Column declarations and table registration
//! - [`mod@access`] - The operation set bound to one table
//! - [`mod@model`] - Model instances and the [`Persistence`] trait
//! - [`mod@resolve`] - Primary key resolution
//! - [`mod@retry`] - Backoff for transient store errors
//! - [`mod@store`] - The store seam and its `aws_sdk_dynamodb::Client` binding
//! - [`mod@common`], [`mod@read`], [`mod@write`] - Request shaping

/// Table binding and the operations models run through it.
pub mod access;

/// Common utilities for keys, conditions, and attribute selection.
pub mod common;

/// Error types.
pub mod error;

/// Model instances and the persistence trait.
pub mod model;

/// Read requests: get, query, scan and batch get, with their driving loops.
pub mod read;

/// Primary key resolution.
pub mod resolve;

/// Retry with exponential backoff.
pub mod retry;

/// Table schemas.
pub mod schema;

/// Connection and retry settings.
pub mod settings;

/// The store seam.
pub mod store;

/// Write requests: put, update and delete.
pub mod write;

pub use access::{AccessLayer, FetchRow, FetchedRow};
pub use error::{Error, Result};
pub use model::{Model, Persistence};
pub use schema::{Record, TableSchema};
pub use settings::Settings;
pub use store::Store;
