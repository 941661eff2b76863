//! Table schema declaration and validation.
//!
//! A schema is registered once from an ordered list of column declarations.
//! Registration is a pure function: every key-role check happens inside one
//! call and the resulting [`TableSchema`] is immutable.

use crate::error::SchemaError;

use aws_sdk_dynamodb::types;
use indexmap::IndexMap;
use serde::Serialize;
use serde_dynamo::to_attribute_value;

/// A record: column name to value, in column declaration order.
pub type Record<T> = IndexMap<String, T>;

/// Role a column plays in the table's primary key.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum KeyRole {
    /// Plain attribute.
    #[default]
    None,
    /// The partition key.
    Partition,
    /// The sort key.
    Sort,
}

/// Store-level type of a column's values.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ValueType {
    /// `S`
    String,
    /// `N`
    Number,
    /// `B`
    Binary,
    /// `BOOL`
    Boolean,
    /// `L`
    List,
    /// `M`
    Map,
    /// `SS`
    StringSet,
    /// `NS`
    NumberSet,
    /// `BS`
    BinarySet,
    /// `NULL`
    Null,
}

impl ValueType {
    /// Whether a store value has this type.
    pub fn matches(&self, value: &types::AttributeValue) -> bool {
        matches!(
            (self, value),
            (Self::String, types::AttributeValue::S(_))
                | (Self::Number, types::AttributeValue::N(_))
                | (Self::Binary, types::AttributeValue::B(_))
                | (Self::Boolean, types::AttributeValue::Bool(_))
                | (Self::List, types::AttributeValue::L(_))
                | (Self::Map, types::AttributeValue::M(_))
                | (Self::StringSet, types::AttributeValue::Ss(_))
                | (Self::NumberSet, types::AttributeValue::Ns(_))
                | (Self::BinarySet, types::AttributeValue::Bs(_))
                | (Self::Null, types::AttributeValue::Null(_))
        )
    }
}

/// Column declaration.
///
/// ```rust
/// use dynamodb_model::schema::{Column, ValueType};
///
/// let id: Column<String> = Column::new("id", ValueType::String).partition_key();
/// let status = Column::new("status", ValueType::String).with_default("active".to_string());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Column<T> {
    /// The attribute name.
    pub name: String,
    /// The store type of the column's values.
    pub value_type: ValueType,
    /// The value a fresh record starts with.
    pub default: Option<T>,
    /// The column's primary key role.
    pub key_role: KeyRole,
}

impl<T> Column<T> {
    /// Plain column without a default.
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            default: None,
            key_role: KeyRole::None,
        }
    }

    /// Mark the column as the partition key.
    pub fn partition_key(mut self) -> Self {
        self.key_role = KeyRole::Partition;
        self
    }

    /// Mark the column as the sort key.
    pub fn sort_key(mut self) -> Self {
        self.key_role = KeyRole::Sort;
        self
    }

    /// Set the value a fresh record starts with.
    pub fn with_default(mut self, default: T) -> Self {
        self.default = Some(default);
        self
    }
}

/// Local secondary index able to locate an item when its sort key is unknown.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct SecondaryIndex {
    /// The index name.
    pub name: String,
    /// The index partition attribute.
    pub partition_key: String,
    /// The index sort attribute.
    pub sort_key: String,
}

/// Immutable, validated description of one table.
#[derive(Clone, Debug, PartialEq)]
pub struct TableSchema<T> {
    table_name: String,
    partition_key: String,
    sort_key: Option<String>,
    secondary_index: Option<SecondaryIndex>,
    columns: Vec<Column<T>>,
}

/// Validate column declarations and build the table schema.
///
/// Fails when more than one column claims the partition or the sort role, when
/// no column is the partition key, when a default does not serialize to its
/// column type, or when the secondary index cannot be resolved to the table.
///
/// ```rust
/// use dynamodb_model::schema::{self, Column, ValueType};
///
/// let schema = schema::register::<String>(
///     "users",
///     vec![
///         Column::new("id", ValueType::String).partition_key(),
///         Column::new("created", ValueType::String).sort_key(),
///         Column::new("name", ValueType::String),
///     ],
///     None,
/// )
/// .unwrap();
/// assert_eq!(schema.sort_key(), Some("created"));
/// ```
pub fn register<T: Serialize>(
    table_name: impl Into<String>,
    columns: Vec<Column<T>>,
    secondary_index: Option<SecondaryIndex>,
) -> Result<TableSchema<T>, SchemaError> {
    let mut partition_key: Option<&str> = None;
    let mut sort_key: Option<&str> = None;
    for column in &columns {
        match column.key_role {
            KeyRole::Partition => match partition_key {
                Some(first) => {
                    return Err(SchemaError::DuplicatePartitionKey {
                        first: first.to_string(),
                        second: column.name.clone(),
                    });
                }
                None => partition_key = Some(column.name.as_str()),
            },
            KeyRole::Sort => match sort_key {
                Some(first) => {
                    return Err(SchemaError::DuplicateSortKey {
                        first: first.to_string(),
                        second: column.name.clone(),
                    });
                }
                None => sort_key = Some(column.name.as_str()),
            },
            KeyRole::None => {}
        }
        if let Some(default) = &column.default {
            let value: types::AttributeValue =
                to_attribute_value(default).map_err(|err| SchemaError::UnserializableDefault {
                    column: column.name.clone(),
                    reason: err.to_string(),
                })?;
            if !column.value_type.matches(&value) {
                return Err(SchemaError::DefaultTypeMismatch {
                    column: column.name.clone(),
                    expected: column.value_type,
                });
            }
        }
    }
    let partition_key = partition_key
        .ok_or(SchemaError::MissingPartitionKey)?
        .to_string();
    let sort_key = sort_key.map(str::to_string);
    if let Some(index) = &secondary_index {
        for attribute in [&index.partition_key, &index.sort_key] {
            if !columns.iter().any(|column| &column.name == attribute) {
                return Err(SchemaError::UnknownIndexAttribute {
                    index: index.name.clone(),
                    attribute: attribute.clone(),
                });
            }
        }
        if sort_key.as_ref() == Some(&index.sort_key) {
            return Err(SchemaError::IndexShadowsSortKey {
                index: index.name.clone(),
                attribute: index.sort_key.clone(),
            });
        }
    }
    Ok(TableSchema {
        table_name: table_name.into(),
        partition_key,
        sort_key,
        secondary_index,
        columns,
    })
}

impl<T> TableSchema<T> {
    /// The table name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// The partition key column name.
    pub fn partition_key(&self) -> &str {
        &self.partition_key
    }

    /// The sort key column name, if the table has one.
    pub fn sort_key(&self) -> Option<&str> {
        self.sort_key.as_deref()
    }

    /// The local secondary index, if configured.
    pub fn secondary_index(&self) -> Option<&SecondaryIndex> {
        self.secondary_index.as_ref()
    }

    /// All columns, in declaration order.
    pub fn columns(&self) -> &[Column<T>] {
        &self.columns
    }

    /// Whether `name` is a declared column.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column.name == name)
    }

    /// Whether `name` is the partition or the sort key.
    pub fn is_key(&self, name: &str) -> bool {
        self.partition_key == name || self.sort_key.as_deref() == Some(name)
    }

    /// Columns that are not part of the primary key.
    pub fn non_key_columns(&self) -> impl Iterator<Item = &Column<T>> {
        self.columns
            .iter()
            .filter(|column| column.key_role == KeyRole::None)
    }

    /// Rearrange `record` into column declaration order.
    ///
    /// Attributes the schema does not declare keep their relative order after
    /// the declared ones.
    pub fn order(&self, mut record: Record<T>) -> Record<T> {
        let mut ordered = Record::with_capacity(record.len());
        for column in &self.columns {
            if let Some(value) = record.shift_remove(&column.name) {
                ordered.insert(column.name.clone(), value);
            }
        }
        ordered.extend(record);
        ordered
    }
}

impl<T: Clone> TableSchema<T> {
    /// Default values of the non-key columns that declare one.
    pub fn defaults(&self) -> Record<T> {
        self.non_key_columns()
            .filter_map(|column| {
                column
                    .default
                    .as_ref()
                    .map(|default| (column.name.clone(), default.clone()))
            })
            .collect()
    }
}
