//! Model instances: one record bound to an [`AccessLayer`].

use crate::{
    access::{AccessLayer, FetchRow, FetchedRow},
    common::key::Keys,
    error::Result,
    read::{
        common::PageCursor,
        query::{QueryOutput, QuerySpec, SelectMode},
        scan::ScanPage,
    },
    schema::Record,
    store::Store,
};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

/// Operations a model instance runs against its table.
///
/// Record-centric operations (`save`, `fetch_row`, `update_row`,
/// `delete_row`) act on the instance's own record; the others are table-wide
/// and only use the binding.
#[async_trait]
pub trait Persistence<T> {
    /// Write the record, or only the listed columns of it.
    async fn save(&self, columns: Option<&[&str]>) -> Result<()>;

    /// Look up the row(s) matching the record.
    async fn fetch_row(&self, args: FetchRow<T>) -> Result<FetchedRow<T>>;

    /// Read one page of the whole table.
    async fn fetch_all_rows(&self, cursor: Option<PageCursor>) -> Result<ScanPage<T>>;

    /// Read the items with the given primary keys.
    async fn fetch_rows_on_keys(&self, keys: Vec<Keys<T>>) -> Result<Vec<Record<T>>>;

    /// Every item of one partition, or their count.
    async fn query_on_partition_key(
        &self,
        value: T,
        limit: Option<usize>,
        select: SelectMode,
    ) -> Result<QueryOutput<T>>;

    /// Run a query across pages.
    async fn query_table(&self, spec: QuerySpec<T>) -> Result<QueryOutput<T>>;

    /// Overlay `values` on the record and write its non-key attributes.
    async fn update_row(
        &mut self,
        values: Option<Record<T>>,
        drop_empty: bool,
    ) -> Result<Option<Record<T>>>;

    /// Delete the record's item, or the item with `key`.
    async fn delete_row(&self, key: Option<Keys<T>>, has_sort_key: bool) -> Result<()>;
}

/// A record of one table together with the layer that persists it.
///
/// ```rust,no_run
/// use dynamodb_model::{
///     access::AccessLayer,
///     model::{Model, Persistence},
///     schema::{self, Column, ValueType},
///     settings::Settings,
/// };
/// use serde_json::{Value, json};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let schema = schema::register::<Value>(
///     "users",
///     vec![
///         Column::new("id", ValueType::String).partition_key(),
///         Column::new("visits", ValueType::Number).with_default(json!(0)),
///     ],
///     None,
/// )?;
/// let access = AccessLayer::connect(schema, &Settings::default()).await;
/// let mut user = Model::new(&access);
/// user.populate([("id".to_string(), json!("u1"))]);
/// user.save(None).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Model<'a, S, T> {
    access: &'a AccessLayer<S, T>,
    record: Record<T>,
}

impl<'a, S, T: Clone> Model<'a, S, T> {
    /// Instance holding the declared defaults.
    pub fn new(access: &'a AccessLayer<S, T>) -> Self {
        Self {
            access,
            record: access.schema().defaults(),
        }
    }

    /// Instance holding the declared columns of `record`.
    pub fn from_record(access: &'a AccessLayer<S, T>, record: Record<T>) -> Self {
        let mut model = Self::new(access);
        model.populate(record);
        model
    }

    /// Set the declared columns among `values`; the rest are ignored.
    pub fn populate(&mut self, values: impl IntoIterator<Item = (String, T)>) {
        let schema = self.access.schema();
        for (name, value) in values {
            if schema.has_column(&name) {
                self.record.insert(name, value);
            }
        }
    }

    /// Like [`Self::populate`], but key columns are left untouched.
    pub fn populate_columns(&mut self, values: impl IntoIterator<Item = (String, T)>) {
        let schema = self.access.schema();
        for (name, value) in values {
            if schema.has_column(&name) && !schema.is_key(&name) {
                self.record.insert(name, value);
            }
        }
    }

    /// Unset every non-key column not listed in `ignore`.
    pub fn clear_columns(&mut self, ignore: &[&str]) {
        let schema = self.access.schema();
        self.record
            .retain(|name, _| schema.is_key(name) || ignore.contains(&name.as_str()));
    }

    /// Restore the declared default of every non-key column not listed in
    /// `ignore`. Columns without a default keep their value.
    pub fn reset_to_defaults(&mut self, ignore: &[&str]) {
        for (name, default) in self.access.schema().defaults() {
            if !ignore.contains(&name.as_str()) {
                self.record.insert(name, default);
            }
        }
    }

    /// Value of one column.
    pub fn get(&self, name: &str) -> Option<&T> {
        self.record.get(name)
    }

    /// The record in column declaration order.
    pub fn to_record(&self) -> Record<T> {
        self.access.schema().order(self.record.clone())
    }

    /// The listed columns that hold a value, in the order given.
    pub fn select_columns(&self, names: &[&str]) -> Record<T> {
        names
            .iter()
            .filter_map(|&name| {
                self.record
                    .get(name)
                    .map(|value| (name.to_string(), value.clone()))
            })
            .collect()
    }

    /// The layer this instance persists through.
    pub fn access(&self) -> &'a AccessLayer<S, T> {
        self.access
    }
}

impl<S, T> Model<'_, S, T>
where
    S: Store,
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    /// Fetch the row matching the record; when one is found, replace the
    /// non-key columns with its values. Key columns are left as they are.
    pub async fn fetch_and_populate(&mut self, args: FetchRow<T>) -> Result<FetchedRow<T>> {
        let fetched = self.access.fetch_row(&self.record, args).await?;
        if let FetchedRow::Row(Some(row)) = &fetched {
            self.clear_columns(&[]);
            self.populate_columns(row.clone());
        }
        Ok(fetched)
    }
}

#[async_trait]
impl<S, T> Persistence<T> for Model<'_, S, T>
where
    S: Store,
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    async fn save(&self, columns: Option<&[&str]>) -> Result<()> {
        self.access.save(&self.record, columns).await
    }

    async fn fetch_row(&self, args: FetchRow<T>) -> Result<FetchedRow<T>> {
        self.access.fetch_row(&self.record, args).await
    }

    async fn fetch_all_rows(&self, cursor: Option<PageCursor>) -> Result<ScanPage<T>> {
        self.access.fetch_all_rows(cursor).await
    }

    async fn fetch_rows_on_keys(&self, keys: Vec<Keys<T>>) -> Result<Vec<Record<T>>> {
        self.access.fetch_rows_on_keys(keys).await
    }

    async fn query_on_partition_key(
        &self,
        value: T,
        limit: Option<usize>,
        select: SelectMode,
    ) -> Result<QueryOutput<T>> {
        self.access
            .query_on_partition_key(value, limit, select)
            .await
    }

    async fn query_table(&self, spec: QuerySpec<T>) -> Result<QueryOutput<T>> {
        self.access.query_table(spec).await
    }

    async fn update_row(
        &mut self,
        values: Option<Record<T>>,
        drop_empty: bool,
    ) -> Result<Option<Record<T>>> {
        if let Some(values) = values {
            self.populate(values);
        }
        let updated = self.access.update_row(&self.record, None, drop_empty).await?;
        if let Some(updated) = &updated {
            self.populate(updated.clone());
        }
        Ok(updated)
    }

    async fn delete_row(&self, key: Option<Keys<T>>, has_sort_key: bool) -> Result<()> {
        self.access
            .delete_row(&self.record, key, has_sort_key)
            .await
    }
}
