use crate::{common, schema, write};

use serde::Serialize;
use serde_dynamo::{Error, Result, to_item};

/// Store-ready put item request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PutItemInput {
    /// The full item to write.
    pub item: common::Item,
    /// The table to write to.
    pub table_name: String,
}

/// Put item request: create or replace one item.
///
/// ```rust
/// use dynamodb_model::write;
/// use indexmap::IndexMap;
/// use serde_json::{Value, json};
///
/// let put_item = write::put_item::PutItem {
///     item: IndexMap::from([
///         ("id".to_string(), json!("1")),
///         ("nickname".to_string(), Value::Null),
///     ]),
///     drop_empty: true,
///     table_name: "users".to_string(),
/// };
/// let input: write::put_item::PutItemInput = put_item.try_into().unwrap();
/// assert!(!input.item.contains_key("nickname"));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct PutItem<T> {
    /// The record to write.
    pub item: schema::Record<T>,
    /// Strip null and empty string values, nested maps included.
    pub drop_empty: bool,
    /// The table to write to.
    pub table_name: String,
}

impl<T: Serialize> TryFrom<PutItem<T>> for PutItemInput {
    type Error = Error;

    fn try_from(put_item: PutItem<T>) -> Result<Self> {
        let mut item: common::Item = to_item(put_item.item)?;
        if put_item.drop_empty {
            write::common::drop_empty_values(&mut item);
        }
        Ok(Self {
            item,
            table_name: put_item.table_name,
        })
    }
}
