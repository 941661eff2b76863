use crate::{
    common,
    error::{Error, Result},
};

use indexmap::IndexMap;
use serde::Serialize;
use std::future::Future;

/// Most keys the store resolves in a single batch get request.
pub const MAX_BATCH_GET_KEYS: usize = 100;

/// Table name to the store keys to read from it.
pub type BatchRequest = IndexMap<String, Vec<common::Item>>;

/// What one batch get round trip returned.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchResponse {
    /// Table name to the items resolved in this round.
    pub responses: IndexMap<String, Vec<common::Item>>,
    /// Keys the store did not get to; empty when the batch is complete.
    pub unprocessed: BatchRequest,
}

/// Batch get item request.
///
/// ```rust
/// use dynamodb_model::{common, read};
/// use indexmap::IndexMap;
///
/// let batch_get = read::batch_get_item::BatchGetItem {
///     items: IndexMap::from([(
///         "users".to_string(),
///         vec![common::key::Keys {
///             partition_key: common::key::Key {
///                 name: "id".to_string(),
///                 value: "1".to_string(),
///             },
///             ..Default::default()
///         }],
///     )]),
/// };
/// let request: read::batch_get_item::BatchRequest = batch_get.try_into().unwrap();
/// assert_eq!(request["users"].len(), 1);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchGetItem<T> {
    /// Table name to the primary keys to retrieve.
    pub items: IndexMap<String, Vec<common::key::Keys<T>>>,
}

impl<T: Serialize> TryFrom<BatchGetItem<T>> for BatchRequest {
    type Error = serde_dynamo::Error;

    fn try_from(batch_get_item: BatchGetItem<T>) -> serde_dynamo::Result<Self> {
        let mut request = Self::with_capacity(batch_get_item.items.len());
        for (table_name, keys) in batch_get_item.items {
            let mut serialized_keys = Vec::with_capacity(keys.len());
            for key in keys {
                serialized_keys.push(key.try_into()?);
            }
            request.insert(table_name, serialized_keys);
        }
        Ok(request)
    }
}

/// Split a request into requests of at most `max_keys` keys each, keeping
/// table and key order.
pub fn split(request: BatchRequest, max_keys: usize) -> Vec<BatchRequest> {
    let max_keys = max_keys.max(1);
    let mut chunks = Vec::new();
    let mut current = BatchRequest::new();
    let mut size = 0;
    for (table_name, keys) in request {
        for key in keys {
            if size == max_keys {
                chunks.push(std::mem::take(&mut current));
                size = 0;
            }
            current.entry(table_name.clone()).or_default().push(key);
            size += 1;
        }
    }
    if size > 0 {
        chunks.push(current);
    }
    chunks
}

fn pending_keys(request: &BatchRequest) -> usize {
    request.values().map(Vec::len).sum()
}

/// Drives a batch get to completion by resubmitting unprocessed keys.
///
/// Resubmission is not delayed and is independent of the transient-error
/// retry each submission goes through. `max_rounds` bounds the number of
/// submissions; `None` leaves them unbounded. Either way a round that
/// resolves no item and leaves at least as many keys unprocessed as it
/// submitted ends the loop with [`Error::BatchIncomplete`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchFetcher {
    /// Most submissions made before giving up with [`Error::BatchIncomplete`].
    pub max_rounds: Option<usize>,
}

impl BatchFetcher {
    /// Fetcher that gives up after `max_rounds` submissions.
    pub fn with_max_rounds(max_rounds: usize) -> Self {
        Self {
            max_rounds: Some(max_rounds),
        }
    }

    /// Submit `request`, then exactly its unprocessed subset, until nothing is
    /// left unprocessed. Returns every resolved item grouped by table.
    ///
    /// An empty request issues no call. Gives up when the round cap is hit or
    /// a round makes no progress.
    pub async fn fetch_all<F, Fut>(
        &self,
        request: BatchRequest,
        mut submit: F,
    ) -> Result<IndexMap<String, Vec<common::Item>>>
    where
        F: FnMut(BatchRequest) -> Fut,
        Fut: Future<Output = Result<BatchResponse>>,
    {
        let mut items: IndexMap<String, Vec<common::Item>> = IndexMap::new();
        let mut pending = request;
        pending.retain(|_, keys| !keys.is_empty());
        let mut rounds = 0;
        while !pending.is_empty() {
            if self.max_rounds.is_some_and(|max_rounds| rounds >= max_rounds) {
                return Err(Error::BatchIncomplete {
                    rounds,
                    unprocessed: pending,
                });
            }
            let submitted = pending_keys(&pending);
            let response = submit(pending).await?;
            rounds += 1;
            let resolved = pending_keys(&response.responses);
            for (table_name, table_items) in response.responses {
                items.entry(table_name).or_default().extend(table_items);
            }
            pending = response.unprocessed;
            pending.retain(|_, keys| !keys.is_empty());
            if resolved == 0 && pending_keys(&pending) >= submitted {
                return Err(Error::BatchIncomplete {
                    rounds,
                    unprocessed: pending,
                });
            }
            if !pending.is_empty() {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    rounds,
                    unprocessed = pending_keys(&pending),
                    "resubmitting unprocessed keys"
                );
            }
        }
        Ok(items)
    }
}
