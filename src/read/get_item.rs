use crate::{common, read};

use serde::Serialize;
use serde_dynamo::{Error, Result};

/// Store-ready get item request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GetItemInput {
    /// The primary key of the item.
    pub keys: common::Item,
    /// Table, consistency and projection.
    pub single_read_operation: read::common::SingleReadInput,
}

/// Get item request.
///
/// ```rust
/// use dynamodb_model::{common, read};
///
/// let get_item = read::get_item::GetItem {
///     keys: common::key::Keys {
///         partition_key: common::key::Key {
///             name: "id".to_string(),
///             value: "1".to_string(),
///         },
///         ..Default::default()
///     },
///     single_read_args: read::common::SingleReadArgs {
///         table_name: "users".to_string(),
///         ..Default::default()
///     },
/// };
/// let input: read::get_item::GetItemInput = get_item.try_into().unwrap();
/// assert_eq!(input.single_read_operation.table_name, "users");
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GetItem<T> {
    /// The primary key of the item to retrieve.
    pub keys: common::key::Keys<T>,
    /// Additional read arguments (table name, consistent read, selection).
    pub single_read_args: read::common::SingleReadArgs,
}

impl<T: Serialize> TryFrom<GetItem<T>> for GetItemInput {
    type Error = Error;

    fn try_from(get_item: GetItem<T>) -> Result<Self> {
        Ok(Self {
            keys: get_item.keys.try_into()?,
            single_read_operation: get_item.single_read_args.into(),
        })
    }
}
