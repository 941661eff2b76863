//! The remote partitioned key-value store the access layer talks to.
//!
//! [`Store`] is the seam between request shaping and the network. The
//! `aws_sdk_dynamodb::Client` implementation lives in [`mod@client`]; anything
//! else speaking the same request types (local emulators, test doubles) can
//! stand in for it.

/// `Store` implementation backed by the AWS SDK client.
pub mod client;

#[cfg(test)]
pub(crate) mod memory;

use crate::{
    common,
    error::StoreError,
    read::{self, batch_get_item, get_item, query, scan},
    write::{delete_item, put_item, update_item},
};

use async_trait::async_trait;
use aws_sdk_dynamodb::types;

/// One round trip per method; every call may fail with a classified
/// [`StoreError`].
///
/// Implementations must tolerate concurrent use if the access layer built on
/// them is shared between tasks.
#[async_trait]
pub trait Store: Send + Sync {
    /// Read one item by primary key.
    async fn get_item(
        &self,
        input: get_item::GetItemInput,
    ) -> Result<Option<common::Item>, StoreError>;

    /// Create or replace one item.
    async fn put_item(&self, input: put_item::PutItemInput) -> Result<(), StoreError>;

    /// Delete one item by primary key.
    async fn delete_item(&self, input: delete_item::DeleteItemInput) -> Result<(), StoreError>;

    /// Apply an update expression to one item.
    ///
    /// Returns the attributes selected by the input's return values, if any.
    async fn update_item(
        &self,
        input: update_item::UpdateItemInput,
    ) -> Result<Option<common::Item>, StoreError>;

    /// Read one page of items matching a key condition.
    async fn query(&self, input: query::QueryInput) -> Result<read::common::Page, StoreError>;

    /// Read one page of the whole table.
    async fn scan(&self, input: scan::ScanInput) -> Result<read::common::Page, StoreError>;

    /// Resolve a batch of keys, possibly leaving some unprocessed.
    async fn batch_get_item(
        &self,
        request: batch_get_item::BatchRequest,
    ) -> Result<batch_get_item::BatchResponse, StoreError>;

    /// Describe a table.
    async fn describe_table(
        &self,
        table_name: &str,
    ) -> Result<Option<types::TableDescription>, StoreError>;
}
