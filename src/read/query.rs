use crate::{common, read, schema};

use aws_sdk_dynamodb::types;
use serde::Serialize;
use serde_dynamo::{Error, Result};

/// Store-ready query request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryInput {
    /// Key condition written against name and value placeholders.
    pub key_condition_expression: String,
    /// Table, index, filter, projection, paging.
    pub multiple_read_operation: read::common::MultipleReadInput,
    /// Ascending (`true`) or descending sort key order.
    pub scan_index_forward: Option<bool>,
}

/// Key condition of a query: equality on the partition key, optionally
/// narrowed by a condition on the sort key.
///
/// ```rust
/// use dynamodb_model::{common, read};
///
/// let key_condition = read::query::KeyConditionExpression {
///     partition_key: common::key::Key {
///         name: "user_id".to_string(),
///         value: "u1".to_string(),
///     },
///     sort_key_condition: Some(common::condition::KeyCondition {
///         name: "created".to_string(),
///         condition: common::condition::Condition::BeginsWith("2024".to_string()),
///     }),
/// };
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KeyConditionExpression<T> {
    /// The partition key value to match.
    pub partition_key: common::key::Key<T>,
    /// Optional condition on the sort key.
    pub sort_key_condition: Option<common::condition::KeyCondition<T>>,
}

impl<T: Serialize> KeyConditionExpression<T> {
    /// Build the expression, numbering value placeholders from `index`.
    pub(crate) fn get_expression_operation(
        self,
        index: &mut usize,
    ) -> Result<common::ExpressionInput> {
        let partition_key = common::condition::KeyCondition::equals(
            self.partition_key.name,
            self.partition_key.value,
        );
        let mut conditions = vec![partition_key];
        conditions.extend(self.sort_key_condition);
        common::condition::KeyCondition::get_expression_operation(
            conditions,
            &common::condition::LogicalOperator::And,
            index,
        )
    }
}

impl<T> From<common::key::Keys<T>> for KeyConditionExpression<T> {
    /// Exact match on a full primary key.
    fn from(keys: common::key::Keys<T>) -> Self {
        Self {
            partition_key: keys.partition_key,
            sort_key_condition: keys.sort_key.map(|sort_key| {
                common::condition::KeyCondition::equals(sort_key.name, sort_key.value)
            }),
        }
    }
}

/// Query request.
///
/// ```rust
/// use dynamodb_model::{common, read};
///
/// let query = read::query::Query {
///     key_condition: read::query::KeyConditionExpression {
///         partition_key: common::key::Key {
///             name: "id".to_string(),
///             value: "1".to_string(),
///         },
///         ..Default::default()
///     },
///     multiple_read_args: read::common::MultipleReadArgs {
///         table_name: "users".to_string(),
///         ..Default::default()
///     },
///     ..Default::default()
/// };
/// let input: read::query::QueryInput = query.try_into().unwrap();
/// assert_eq!(input.key_condition_expression, "#id = :id_eq0");
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query<T> {
    /// Which items of the partition to read.
    pub key_condition: KeyConditionExpression<T>,
    /// Additional read arguments (table name, filter, selection, etc.).
    pub multiple_read_args: read::common::MultipleReadArgs<T>,
    /// Whether to read the sort key forward (ascending) or backward (descending).
    pub scan_index_forward: Option<bool>,
}

impl<T: Serialize> TryFrom<Query<T>> for QueryInput {
    type Error = Error;

    fn try_from(query: Query<T>) -> Result<Self> {
        // key condition placeholders come first, the filter continues the numbering
        let mut index = 0;
        let key_condition = query.key_condition.get_expression_operation(&mut index)?;
        let mut multiple_read_operation = query.multiple_read_args.into_input(&mut index)?;
        let key_condition_expression = key_condition.merge_into(
            &mut multiple_read_operation.expression_attribute_names,
            &mut multiple_read_operation.expression_attribute_values,
        );
        Ok(Self {
            key_condition_expression,
            multiple_read_operation,
            scan_index_forward: query.scan_index_forward,
        })
    }
}

/// What a query returns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SelectMode {
    /// Every attribute of the matching items.
    #[default]
    AllAttributes,
    /// Only the number of matching items.
    Count,
}

impl SelectMode {
    /// The `Select` parameter to send. All attributes is the store's default
    /// and cannot be combined with a projection, so it is left unset.
    fn as_select(self) -> Option<types::Select> {
        match self {
            Self::AllAttributes => None,
            Self::Count => Some(types::Select::Count),
        }
    }
}

/// A complete query against one table, driven across pages.
///
/// `limit` is both the per-page item limit sent to the store and the number of
/// accumulated items after which no further page is requested. The result may
/// exceed it by up to one page.
#[derive(Clone, Debug, PartialEq)]
pub struct QuerySpec<T> {
    /// Which items of the partition to read.
    pub key_condition: KeyConditionExpression<T>,
    /// Filter applied after the key condition.
    pub filter: Option<common::condition::Filter<T>>,
    /// Secondary index to read instead of the table.
    pub index_name: Option<String>,
    /// Result count after which paging stops.
    pub limit: Option<usize>,
    /// Items or count.
    pub select: SelectMode,
    /// Attributes to return; all when empty.
    pub selection: common::selection::Selection,
    /// Sort key order.
    pub scan_index_forward: Option<bool>,
}

impl<T> QuerySpec<T> {
    /// Spec with only a key condition; everything else left at its default.
    pub fn new(key_condition: impl Into<KeyConditionExpression<T>>) -> Self {
        Self {
            key_condition: key_condition.into(),
            filter: None,
            index_name: None,
            limit: None,
            select: SelectMode::default(),
            selection: common::selection::Selection::default(),
            scan_index_forward: None,
        }
    }

    /// Query request against `table_name`, starting at the first page.
    pub fn into_query(self, table_name: impl Into<String>) -> Query<T> {
        Query {
            key_condition: self.key_condition,
            multiple_read_args: read::common::MultipleReadArgs {
                filter: self.filter,
                index_name: self.index_name,
                limit: self
                    .limit
                    .map(|limit| i32::try_from(limit).unwrap_or(i32::MAX)),
                select: self.select.as_select(),
                selection: self.selection,
                table_name: table_name.into(),
                ..Default::default()
            },
            scan_index_forward: self.scan_index_forward,
        }
    }
}

/// Result of a query: the decoded items, or their count in count mode.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryOutput<T> {
    /// Items of every page read, in page order.
    Items(Vec<schema::Record<T>>),
    /// Sum of the page counts.
    Count(usize),
}
