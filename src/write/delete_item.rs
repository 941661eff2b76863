use crate::common;

use serde::Serialize;
use serde_dynamo::{Error, Result};

/// Store-ready delete item request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeleteItemInput {
    /// The primary key of the item.
    pub keys: common::Item,
    /// The table to delete from.
    pub table_name: String,
}

/// Delete item request.
///
/// ```rust
/// use dynamodb_model::{common, write};
///
/// let delete_item = write::delete_item::DeleteItem {
///     keys: common::key::Keys {
///         partition_key: common::key::Key {
///             name: "id".to_string(),
///             value: "1".to_string(),
///         },
///         ..Default::default()
///     },
///     table_name: "users".to_string(),
/// };
/// let input: write::delete_item::DeleteItemInput = delete_item.try_into().unwrap();
/// assert_eq!(input.keys.len(), 1);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct DeleteItem<T> {
    /// The primary key of the item to delete.
    pub keys: common::key::Keys<T>,
    /// The table to delete from.
    pub table_name: String,
}

impl<T: Serialize> TryFrom<DeleteItem<T>> for DeleteItemInput {
    type Error = Error;

    fn try_from(delete_item: DeleteItem<T>) -> Result<Self> {
        Ok(Self {
            keys: delete_item.keys.try_into()?,
            table_name: delete_item.table_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use aws_sdk_dynamodb::types;
    use rstest::rstest;
    use serde_json::Value;

    #[rstest]
    #[case::partition_only(
        common::key::Keys {
            partition_key: common::key::Key {
                name: "a".to_string(),
                value: Value::String("b".to_string()),
            },
            ..Default::default()
        },
        common::Item::from([
            ("a".to_string(), types::AttributeValue::S("b".to_string())),
        ])
    )]
    #[case::composite(
        common::key::Keys {
            partition_key: common::key::Key {
                name: "a".to_string(),
                value: Value::String("b".to_string()),
            },
            sort_key: Some(common::key::Key {
                name: "c".to_string(),
                value: Value::from(4),
            }),
        },
        common::Item::from([
            ("a".to_string(), types::AttributeValue::S("b".to_string())),
            ("c".to_string(), types::AttributeValue::N("4".to_string())),
        ])
    )]
    fn test_delete_item(#[case] keys: common::key::Keys<Value>, #[case] expected: common::Item) {
        let input: DeleteItemInput = DeleteItem {
            keys,
            table_name: "t".to_string(),
        }
        .try_into()
        .unwrap();
        assert_eq!(input.keys, expected);
        assert_eq!(input.table_name, "t");
    }
}
