//! Read requests and the loops that drive them to completion.
//!
//! This module provides request shaping for reading data from DynamoDB:
//! - Getting individual items by primary key
//! - Querying items with key conditions, across pages
//! - Scanning the table one page at a time
//! - Batch retrieving multiple items until no key is left unprocessed

/// Batch get item request and the unprocessed-key continuation loop.
pub mod batch_get_item;

/// Common read inputs, pages, cursors and the pagination loop.
pub mod common;

/// Get item request for retrieving a single item by primary key.
pub mod get_item;

/// Query request for retrieving items with key conditions.
pub mod query;

/// Scan request for retrieving items from a whole table.
pub mod scan;
