use crate::common;

use serde::{Serialize, de::DeserializeOwned};
use serde_dynamo::{Error, Result, from_attribute_value, to_attribute_value};

/// Key component.
///
/// ```rust
/// use dynamodb_model::common::key;
///
/// let key = key::Key {
///     name: "id".to_string(),
///     value: "1".to_string(),
/// };
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Key<T> {
    /// The attribute name of the key.
    pub name: String,
    /// The value of the key.
    pub value: T,
}

/// Primary key (partition key and optional sort key).
///
/// ```rust
/// use dynamodb_model::common::key;
///
/// let keys = key::Keys {
///     partition_key: key::Key {
///         name: "id".to_string(),
///         value: "1".to_string(),
///     },
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Keys<T> {
    /// The partition key (required).
    pub partition_key: Key<T>,
    /// The sort key (optional, only for tables with composite primary keys).
    pub sort_key: Option<Key<T>>,
}

impl<T> Keys<T> {
    /// Whether `name` is one of the key attributes.
    pub fn contains(&self, name: &str) -> bool {
        self.partition_key.name == name
            || self
                .sort_key
                .as_ref()
                .is_some_and(|sort_key| sort_key.name == name)
    }
}

impl<T: DeserializeOwned> Keys<T> {
    /// Read the primary key attributes off a store item.
    ///
    /// Returns `None` when the item lacks one of the named attributes.
    pub fn read_from(
        item: &common::Item,
        partition_key: &str,
        sort_key: Option<&str>,
    ) -> Result<Option<Self>> {
        let Some(partition_value) = item.get(partition_key) else {
            return Ok(None);
        };
        let partition_key = Key {
            name: partition_key.to_string(),
            value: from_attribute_value(partition_value.clone())?,
        };
        let sort_key = match sort_key {
            Some(name) => match item.get(name) {
                Some(sort_value) => Some(Key {
                    name: name.to_string(),
                    value: from_attribute_value(sort_value.clone())?,
                }),
                None => return Ok(None),
            },
            None => None,
        };
        Ok(Some(Self {
            partition_key,
            sort_key,
        }))
    }
}

impl<T: Serialize> TryFrom<Keys<T>> for common::Item {
    type Error = Error;

    fn try_from(key: Keys<T>) -> Result<Self> {
        let partition_key_value = to_attribute_value(key.partition_key.value)?;
        let mut keys = Self::from([(key.partition_key.name, partition_key_value)]);
        if let Some(sort_key) = key.sort_key {
            let sort_key_value = to_attribute_value(sort_key.value)?;
            keys.insert(sort_key.name, sort_key_value);
        }
        Ok(keys)
    }
}
