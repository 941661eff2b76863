//! Write requests.
//!
//! This module provides request shaping for writing data to DynamoDB:
//! - Putting new items or replacing existing ones
//! - Setting attributes through a deterministic update expression
//! - Deleting items by primary key

/// Empty value stripping shared by puts and updates.
pub mod common;

/// Delete item request for removing items from tables.
pub mod delete_item;

/// Put item request for creating or replacing items.
pub mod put_item;

/// Update item request and the update expression builder.
pub mod update_item;
