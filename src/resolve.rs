//! Canonical primary key resolution for candidate records.

use crate::{
    common::{self, key},
    error::{Error, Result},
    read,
    retry::RetryPolicy,
    schema::{Record, TableSchema},
    store::Store,
};

use serde::{Serialize, de::DeserializeOwned};

/// Derives the primary key of a record, falling back to a lookup through the
/// secondary index when the sort key is missing.
pub struct KeyResolver<'a, S: ?Sized, T> {
    schema: &'a TableSchema<T>,
    store: &'a S,
    retry: RetryPolicy,
}

impl<'a, S, T> KeyResolver<'a, S, T>
where
    S: Store + ?Sized,
    T: Serialize + DeserializeOwned + Clone,
{
    /// Resolver for `schema`'s table on `store`.
    pub fn new(schema: &'a TableSchema<T>, store: &'a S, retry: RetryPolicy) -> Self {
        Self {
            schema,
            store,
            retry,
        }
    }

    /// Resolve the primary key of `candidate`.
    ///
    /// A record carrying every key attribute resolves without any store call.
    /// When only the sort key is missing, the index partition and sort
    /// attributes are looked up through the index, with a single query for
    /// at most one item.
    pub async fn resolve(&self, candidate: &Record<T>) -> Result<key::Keys<T>> {
        let partition_key = self.schema.partition_key();
        let Some(partition_value) = candidate.get(partition_key) else {
            return Err(Error::MissingKey {
                partition_key: partition_key.to_string(),
            });
        };
        let partition_key = key::Key {
            name: partition_key.to_string(),
            value: partition_value.clone(),
        };
        let Some(sort_key) = self.schema.sort_key() else {
            return Ok(key::Keys {
                partition_key,
                sort_key: None,
            });
        };
        if let Some(sort_value) = candidate.get(sort_key) {
            return Ok(key::Keys {
                partition_key,
                sort_key: Some(key::Key {
                    name: sort_key.to_string(),
                    value: sort_value.clone(),
                }),
            });
        }
        self.resolve_through_index(candidate, sort_key).await
    }

    async fn resolve_through_index(
        &self,
        candidate: &Record<T>,
        sort_key: &str,
    ) -> Result<key::Keys<T>> {
        let Some(index) = self.schema.secondary_index() else {
            return Err(Error::IndexFallback {
                sort_key: sort_key.to_string(),
                reason: "no secondary index configured".to_string(),
            });
        };
        let (Some(index_partition), Some(index_sort)) = (
            candidate.get(&index.partition_key),
            candidate.get(&index.sort_key),
        ) else {
            return Err(Error::IndexFallback {
                sort_key: sort_key.to_string(),
                reason: format!(
                    "index `{}` needs both `{}` and `{}`",
                    index.name, index.partition_key, index.sort_key
                ),
            });
        };
        let query = read::query::Query {
            key_condition: read::query::KeyConditionExpression {
                partition_key: key::Key {
                    name: index.partition_key.clone(),
                    value: index_partition.clone(),
                },
                sort_key_condition: Some(common::condition::KeyCondition::equals(
                    index.sort_key.clone(),
                    index_sort.clone(),
                )),
            },
            multiple_read_args: read::common::MultipleReadArgs {
                index_name: Some(index.name.clone()),
                limit: Some(1),
                table_name: self.schema.table_name().to_string(),
                ..Default::default()
            },
            scan_index_forward: None,
        };
        let input: read::query::QueryInput = query.try_into()?;
        let page = self
            .retry
            .execute("Query", || self.store.query(input.clone()))
            .await?;
        let keys = match page.items.first() {
            Some(item) => key::Keys::read_from(item, self.schema.partition_key(), Some(sort_key))?,
            None => None,
        };
        keys.ok_or_else(|| Error::NotFound {
            index: index.name.clone(),
        })
    }
}
