//! The operation set models run against one table.
//!
//! [`AccessLayer`] composes request shaping (key resolution, update
//! expressions) with execution (retry, pagination, batch continuation)
//! against a [`Store`].

use crate::{
    common::{self, key, selection::Selection},
    error::{Error, Result},
    read::{
        self,
        batch_get_item::{self, BatchFetcher, BatchRequest},
        common::{PageCursor, Paginated},
        query::{KeyConditionExpression, Query, QueryOutput, QuerySpec, SelectMode},
        scan::ScanPage,
    },
    resolve::KeyResolver,
    retry::RetryPolicy,
    schema::{Record, TableSchema},
    settings::Settings,
    store::Store,
    write,
};

use aws_sdk_dynamodb::{Client, types};
use indexmap::IndexMap;
use serde::{Serialize, de::DeserializeOwned};
use serde_dynamo::{from_item, to_attribute_value};

/// How [`AccessLayer::fetch_row`] selects and returns rows.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchRow<T> {
    /// Attributes the lookup conditions on. Empty means the primary key
    /// columns. Without the partition key among them, a single scan page is
    /// returned instead.
    pub conditional_items: Vec<String>,
    /// Key condition to query with; derived from the record when `None`.
    pub key_condition: Option<KeyConditionExpression<T>>,
    /// Filter applied after the key condition.
    pub filter: Option<common::condition::Filter<T>>,
    /// Attributes to return; all when empty.
    pub attributes_to_fetch: Selection,
    /// Whether the lookup targets one item by its full primary key. When
    /// `false`, every item of the partition is returned.
    pub has_sort_key: bool,
}

impl<T> Default for FetchRow<T> {
    fn default() -> Self {
        Self {
            conditional_items: Vec::new(),
            key_condition: None,
            filter: None,
            attributes_to_fetch: Selection::default(),
            has_sort_key: true,
        }
    }
}

/// What [`AccessLayer::fetch_row`] found.
#[derive(Clone, Debug, PartialEq)]
pub enum FetchedRow<T> {
    /// The first matching item, if any.
    Row(Option<Record<T>>),
    /// Every matching item.
    Rows(Vec<Record<T>>),
    /// The first scan page, returned when the partition key is not a condition.
    Page(ScanPage<T>),
}

/// Table binding: schema, store, retry policy and batch continuation.
///
/// Holds no per-call state, so one instance serves any number of sequential
/// or concurrent operations.
///
/// ```rust,no_run
/// use dynamodb_model::{
///     access::AccessLayer,
///     schema::{self, Column, ValueType},
///     settings::Settings,
/// };
/// use serde_json::Value;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let schema = schema::register::<Value>(
///     "users",
///     vec![Column::new("id", ValueType::String).partition_key()],
///     None,
/// )?;
/// let access = AccessLayer::connect(schema, &Settings::default()).await;
/// let page = access.fetch_all_rows(None).await?;
/// println!("{} users on the first page", page.items.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct AccessLayer<S, T> {
    schema: TableSchema<T>,
    store: S,
    retry: RetryPolicy,
    batch: BatchFetcher,
}

impl<T> AccessLayer<Client, T> {
    /// Bind `schema` to a DynamoDB client built from `settings`.
    pub async fn connect(schema: TableSchema<T>, settings: &Settings) -> Self {
        Self {
            schema,
            store: settings.client().await,
            retry: settings.retry_policy(),
            batch: BatchFetcher::default(),
        }
    }
}

impl<S, T> AccessLayer<S, T> {
    /// Bind `schema` to `store` with the default retry policy.
    pub fn new(schema: TableSchema<T>, store: S) -> Self {
        Self {
            schema,
            store,
            retry: RetryPolicy::default(),
            batch: BatchFetcher::default(),
        }
    }

    /// Replace the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the batch continuation settings.
    pub fn with_batch_fetcher(mut self, batch: BatchFetcher) -> Self {
        self.batch = batch;
        self
    }

    /// The bound table schema.
    pub fn schema(&self) -> &TableSchema<T> {
        &self.schema
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The retry policy applied to every store call.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }
}

impl<S, T> AccessLayer<S, T>
where
    S: Store,
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    fn decode(&self, item: common::Item) -> Result<Record<T>> {
        let record: Record<T> = from_item(item)?;
        Ok(self.schema.order(record))
    }

    fn decode_all(&self, items: Vec<common::Item>) -> Result<Vec<Record<T>>> {
        items.into_iter().map(|item| self.decode(item)).collect()
    }

    fn partition_only(&self, record: &Record<T>) -> Result<key::Keys<T>> {
        let partition_key = self.schema.partition_key();
        match record.get(partition_key) {
            Some(value) => Ok(key::Keys {
                partition_key: key::Key {
                    name: partition_key.to_string(),
                    value: value.clone(),
                },
                sort_key: None,
            }),
            None => Err(Error::MissingKey {
                partition_key: partition_key.to_string(),
            }),
        }
    }

    fn strip_empty(record: Record<T>) -> Result<Record<T>> {
        let mut stripped = Record::with_capacity(record.len());
        for (name, value) in record {
            if !write::common::is_empty_value(&to_attribute_value(&value)?) {
                stripped.insert(name, value);
            }
        }
        Ok(stripped)
    }

    /// Derive the primary key of `record`, through the secondary index if the
    /// sort key is missing.
    pub async fn resolve_keys(&self, record: &Record<T>) -> Result<key::Keys<T>> {
        KeyResolver::new(&self.schema, &self.store, self.retry)
            .resolve(record)
            .await
    }

    async fn query_pages(&self, query: Query<T>, limit: Option<usize>) -> Result<Paginated> {
        let input: read::query::QueryInput = query.try_into()?;
        read::common::paginate(
            |cursor| {
                let mut input = input.clone();
                input.multiple_read_operation.exclusive_start_key =
                    cursor.map(PageCursor::into_item);
                async move {
                    self.retry
                        .execute("Query", || self.store.query(input.clone()))
                        .await
                }
            },
            limit,
        )
        .await
    }

    /// Write `record`, or only the listed `columns` of it, replacing any item
    /// with the same key. An empty `columns` list writes the whole record.
    /// Null and empty string values are not written.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "dynamodb_model.save",
            skip_all,
            fields(table = self.schema.table_name()),
            err
        )
    )]
    pub async fn save(&self, record: &Record<T>, columns: Option<&[&str]>) -> Result<()> {
        let item = match columns {
            Some(columns) if !columns.is_empty() => record
                .iter()
                .filter(|(name, _)| columns.contains(&name.as_str()))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
            _ => record.clone(),
        };
        let input: write::put_item::PutItemInput = write::put_item::PutItem {
            item,
            drop_empty: true,
            table_name: self.schema.table_name().to_string(),
        }
        .try_into()?;
        self.retry
            .execute("PutItem", || self.store.put_item(input.clone()))
            .await
    }

    /// Read one item by its full primary key.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "dynamodb_model.get_row",
            skip_all,
            fields(table = self.schema.table_name()),
            err
        )
    )]
    pub async fn get_row(
        &self,
        keys: key::Keys<T>,
        selection: Selection,
    ) -> Result<Option<Record<T>>> {
        let input: read::get_item::GetItemInput = read::get_item::GetItem {
            keys,
            single_read_args: read::common::SingleReadArgs {
                selection,
                table_name: self.schema.table_name().to_string(),
                ..Default::default()
            },
        }
        .try_into()?;
        let item = self
            .retry
            .execute("GetItem", || self.store.get_item(input.clone()))
            .await?;
        item.map(|item| self.decode(item)).transpose()
    }

    /// Look up the row(s) matching `record`.
    ///
    /// Without the partition key among `conditional_items` this returns the
    /// first scan page. Otherwise the table is queried with the given key
    /// condition, or one derived from `record`: the full primary key when
    /// `has_sort_key` is set, else the partition key alone.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "dynamodb_model.fetch_row",
            skip_all,
            fields(table = self.schema.table_name()),
            err
        )
    )]
    pub async fn fetch_row(&self, record: &Record<T>, args: FetchRow<T>) -> Result<FetchedRow<T>> {
        let partition_key = self.schema.partition_key();
        let conditions_on_partition = if args.conditional_items.is_empty() {
            true
        } else {
            args.conditional_items
                .iter()
                .any(|name| name == partition_key)
        };
        if !conditions_on_partition {
            return Ok(FetchedRow::Page(self.fetch_all_rows(None).await?));
        }
        let key_condition = match args.key_condition {
            Some(key_condition) => key_condition,
            None if args.has_sort_key => self.resolve_keys(record).await?.into(),
            None => self.partition_only(record)?.into(),
        };
        let spec = QuerySpec {
            filter: args.filter,
            selection: args.attributes_to_fetch,
            ..QuerySpec::new(key_condition)
        };
        let query = spec.into_query(self.schema.table_name());
        if args.has_sort_key {
            let paginated = self.query_pages(query, Some(1)).await?;
            let first = paginated.items.into_iter().next();
            Ok(FetchedRow::Row(first.map(|item| self.decode(item)).transpose()?))
        } else {
            let paginated = self.query_pages(query, None).await?;
            Ok(FetchedRow::Rows(self.decode_all(paginated.items)?))
        }
    }

    /// Read one page of the whole table, starting after `cursor`.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "dynamodb_model.fetch_all_rows",
            skip_all,
            fields(table = self.schema.table_name()),
            err
        )
    )]
    pub async fn fetch_all_rows(&self, cursor: Option<PageCursor>) -> Result<ScanPage<T>> {
        let input: read::scan::ScanInput = read::scan::Scan::<T> {
            multiple_read_args: read::common::MultipleReadArgs {
                exclusive_start_key: cursor,
                table_name: self.schema.table_name().to_string(),
                ..Default::default()
            },
        }
        .try_into()?;
        let page = self
            .retry
            .execute("Scan", || self.store.scan(input.clone()))
            .await?;
        Ok(ScanPage {
            items: self.decode_all(page.items)?,
            cursor: page.last_evaluated_key,
        })
    }

    /// Read the items with the given primary keys.
    ///
    /// Keys go out in batches of at most [`batch_get_item::MAX_BATCH_GET_KEYS`],
    /// each driven until the store leaves no key unprocessed. Keys with no
    /// item are skipped.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "dynamodb_model.fetch_rows_on_keys",
            skip_all,
            fields(table = self.schema.table_name(), keys = keys.len()),
            err
        )
    )]
    pub async fn fetch_rows_on_keys(&self, keys: Vec<key::Keys<T>>) -> Result<Vec<Record<T>>> {
        let request: BatchRequest = batch_get_item::BatchGetItem {
            items: IndexMap::from([(self.schema.table_name().to_string(), keys)]),
        }
        .try_into()?;
        let mut records = Vec::new();
        for chunk in batch_get_item::split(request, batch_get_item::MAX_BATCH_GET_KEYS) {
            let items = self
                .batch
                .fetch_all(chunk, |request| async move {
                    self.retry
                        .execute("BatchGetItem", || self.store.batch_get_item(request.clone()))
                        .await
                })
                .await?;
            for (_, table_items) in items {
                records.extend(self.decode_all(table_items)?);
            }
        }
        Ok(records)
    }

    /// Every item of the partition `value`, or their count.
    pub async fn query_on_partition_key(
        &self,
        value: T,
        limit: Option<usize>,
        select: SelectMode,
    ) -> Result<QueryOutput<T>> {
        let key_condition = KeyConditionExpression {
            partition_key: key::Key {
                name: self.schema.partition_key().to_string(),
                value,
            },
            sort_key_condition: None,
        };
        self.query_table(QuerySpec {
            limit,
            select,
            ..QuerySpec::new(key_condition)
        })
        .await
    }

    /// Run `spec` across pages until done or until its limit is reached.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "dynamodb_model.query_table",
            skip_all,
            fields(table = self.schema.table_name()),
            err
        )
    )]
    pub async fn query_table(&self, spec: QuerySpec<T>) -> Result<QueryOutput<T>> {
        let select = spec.select;
        let limit = spec.limit;
        let paginated = self
            .query_pages(spec.into_query(self.schema.table_name()), limit)
            .await?;
        match select {
            SelectMode::Count => Ok(QueryOutput::Count(paginated.count)),
            SelectMode::AllAttributes => Ok(QueryOutput::Items(self.decode_all(paginated.items)?)),
        }
    }

    /// Set the non-key attributes of `record`, overlaid with `values`, on the
    /// item with the record's primary key.
    ///
    /// Only declared columns of `values` are applied. With `drop_empty`, null
    /// and empty string values are skipped. When no attribute is left to set,
    /// no call is made and `None` is returned; otherwise the item as stored
    /// after the update.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "dynamodb_model.update_row",
            skip_all,
            fields(table = self.schema.table_name()),
            err
        )
    )]
    pub async fn update_row(
        &self,
        record: &Record<T>,
        values: Option<Record<T>>,
        drop_empty: bool,
    ) -> Result<Option<Record<T>>> {
        let mut attributes = record.clone();
        for (name, value) in values.into_iter().flatten() {
            if self.schema.has_column(&name) {
                attributes.insert(name, value);
            }
        }
        if drop_empty {
            attributes = Self::strip_empty(attributes)?;
        }
        let keys = self.resolve_keys(&attributes).await?;
        let update = write::update_item::UpdateItem {
            keys,
            attributes,
            drop_empty,
            return_values: Some(types::ReturnValue::AllNew),
            table_name: self.schema.table_name().to_string(),
        };
        let Some(input) = update.into_input()? else {
            return Ok(None);
        };
        let item = self
            .retry
            .execute("UpdateItem", || self.store.update_item(input.clone()))
            .await?;
        item.map(|item| self.decode(item)).transpose()
    }

    /// Delete the item with `key`, or with the key derived from `record`: the
    /// full primary key when `has_sort_key` is set, else the partition key.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "dynamodb_model.delete_row",
            skip_all,
            fields(table = self.schema.table_name()),
            err
        )
    )]
    pub async fn delete_row(
        &self,
        record: &Record<T>,
        key: Option<key::Keys<T>>,
        has_sort_key: bool,
    ) -> Result<()> {
        let keys = match key {
            Some(keys) => keys,
            None if has_sort_key => self.resolve_keys(record).await?,
            None => self.partition_only(record)?,
        };
        let input: write::delete_item::DeleteItemInput = write::delete_item::DeleteItem {
            keys,
            table_name: self.schema.table_name().to_string(),
        }
        .try_into()?;
        self.retry
            .execute("DeleteItem", || self.store.delete_item(input.clone()))
            .await
    }

    /// The store's description of the bound table.
    pub async fn describe_table(&self) -> Result<Option<types::TableDescription>> {
        let table_name = self.schema.table_name();
        self.retry
            .execute("DescribeTable", || self.store.describe_table(table_name))
            .await
    }
}
