//! In-memory `Store` for tests.
//!
//! Understands the expressions this crate emits: `AND`-joined equality
//! conditions, `#a, #b` projections and `SET #var1 = :a, ...` updates.

use crate::{
    common,
    error::StoreError,
    read::{self, batch_get_item, get_item, query, scan},
    store::Store,
    write::{delete_item, put_item, update_item},
};

use async_trait::async_trait;
use aws_sdk_dynamodb::types;
use std::{
    collections::{self, VecDeque},
    sync::Mutex,
};

type Names = Option<collections::HashMap<String, String>>;
type Values = Option<collections::HashMap<String, types::AttributeValue>>;

struct Table {
    partition_key: String,
    sort_key: Option<String>,
    items: Vec<common::Item>,
}

impl Table {
    fn key_of(&self, item: &common::Item) -> common::Item {
        let mut key = common::Item::new();
        for name in std::iter::once(&self.partition_key).chain(self.sort_key.as_ref()) {
            if let Some(value) = item.get(name) {
                key.insert(name.clone(), value.clone());
            }
        }
        key
    }

    fn position(&self, key: &common::Item) -> Option<usize> {
        self.items.iter().position(|item| matches(item, key))
    }
}

fn matches(item: &common::Item, attributes: &common::Item) -> bool {
    attributes
        .iter()
        .all(|(name, value)| item.get(name) == Some(value))
}

fn validation(message: impl Into<String>) -> StoreError {
    StoreError::new("ValidationException", message)
}

fn resolve_name(names: &Names, placeholder: &str) -> Result<String, StoreError> {
    names
        .as_ref()
        .and_then(|names| names.get(placeholder))
        .cloned()
        .ok_or_else(|| validation(format!("unknown name placeholder {placeholder}")))
}

fn resolve_value(values: &Values, placeholder: &str) -> Result<types::AttributeValue, StoreError> {
    values
        .as_ref()
        .and_then(|values| values.get(placeholder))
        .cloned()
        .ok_or_else(|| validation(format!("unknown value placeholder {placeholder}")))
}

/// Parse `#a = :a_eq0 AND #b = :b_eq1` into the attributes to match.
fn equalities(
    expression: &str,
    names: &Names,
    values: &Values,
) -> Result<common::Item, StoreError> {
    let mut attributes = common::Item::new();
    for clause in expression.split(" AND ") {
        let (name, value) = clause
            .split_once(" = ")
            .ok_or_else(|| validation(format!("unsupported condition {clause}")))?;
        attributes.insert(resolve_name(names, name)?, resolve_value(values, value)?);
    }
    Ok(attributes)
}

fn project(
    item: &common::Item,
    projection: &Option<String>,
    names: &Names,
) -> Result<common::Item, StoreError> {
    let Some(projection) = projection else {
        return Ok(item.clone());
    };
    let mut projected = common::Item::new();
    for placeholder in projection.split(", ") {
        let name = resolve_name(names, placeholder)?;
        if let Some(value) = item.get(&name) {
            projected.insert(name, value.clone());
        }
    }
    Ok(projected)
}

/// Test double holding tables in memory.
pub(crate) struct MemoryStore {
    tables: Mutex<collections::HashMap<String, Table>>,
    calls: Mutex<Vec<&'static str>>,
    failures: Mutex<VecDeque<StoreError>>,
    batch_requests: Mutex<Vec<batch_get_item::BatchRequest>>,
    page_size: Option<usize>,
    batch_capacity: Option<usize>,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self {
            tables: Mutex::new(collections::HashMap::new()),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
            batch_requests: Mutex::new(Vec::new()),
            page_size: None,
            batch_capacity: None,
        }
    }

    /// Declare a table and its primary key.
    pub(crate) fn with_table(
        self,
        name: &str,
        partition_key: &str,
        sort_key: Option<&str>,
    ) -> Self {
        self.tables.lock().unwrap().insert(
            name.to_string(),
            Table {
                partition_key: partition_key.to_string(),
                sort_key: sort_key.map(str::to_string),
                items: Vec::new(),
            },
        );
        self
    }

    /// Evaluate at most `page_size` items per query or scan page.
    pub(crate) fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Resolve at most `capacity` keys per batch get, leaving the rest unprocessed.
    pub(crate) fn with_batch_capacity(mut self, capacity: usize) -> Self {
        self.batch_capacity = Some(capacity);
        self
    }

    pub(crate) fn insert(&self, table_name: &str, item: common::Item) {
        let mut tables = self.tables.lock().unwrap();
        let table = tables.get_mut(table_name).unwrap();
        let key = table.key_of(&item);
        match table.position(&key) {
            Some(position) => table.items[position] = item,
            None => table.items.push(item),
        }
    }

    pub(crate) fn items(&self, table_name: &str) -> Vec<common::Item> {
        self.tables.lock().unwrap()[table_name].items.clone()
    }

    /// Fail the next calls, in order, with these errors.
    pub(crate) fn fail_next(&self, errors: impl IntoIterator<Item = StoreError>) {
        self.failures.lock().unwrap().extend(errors);
    }

    /// Names of the store calls made so far.
    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn batch_requests(&self) -> Vec<batch_get_item::BatchRequest> {
        self.batch_requests.lock().unwrap().clone()
    }

    fn call(&self, operation: &'static str) -> Result<(), StoreError> {
        self.calls.lock().unwrap().push(operation);
        match self.failures.lock().unwrap().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn with_existing_table<R>(
        &self,
        table_name: &str,
        f: impl FnOnce(&mut Table) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        match tables.get_mut(table_name) {
            Some(table) => f(table),
            None => Err(StoreError::new(
                "ResourceNotFoundException",
                format!("table {table_name} not found"),
            )),
        }
    }

    fn read_page(
        &self,
        input: read::common::MultipleReadInput,
        key_condition: Option<&str>,
    ) -> Result<read::common::Page, StoreError> {
        let names = &input.expression_attribute_names;
        let values = &input.expression_attribute_values;
        let key_condition = key_condition
            .map(|expression| equalities(expression, names, values))
            .transpose()?;
        let filter = input
            .filter_expression
            .as_deref()
            .map(|expression| equalities(expression, names, values))
            .transpose()?;
        let page_size = match (input.limit, self.page_size) {
            (Some(limit), Some(page_size)) => page_size.min(usize::try_from(limit).unwrap_or(0)),
            (Some(limit), None) => usize::try_from(limit).unwrap_or(0),
            (None, page_size) => page_size.unwrap_or(usize::MAX),
        };
        self.with_existing_table(&input.table_name, |table| {
            let candidates: Vec<&common::Item> = table
                .items
                .iter()
                .filter(|item| key_condition.as_ref().is_none_or(|key| matches(item, key)))
                .collect();
            let start = match &input.exclusive_start_key {
                Some(cursor) => candidates
                    .iter()
                    .position(|item| matches(item, cursor))
                    .map_or(candidates.len(), |position| position + 1),
                None => 0,
            };
            let evaluated: Vec<&common::Item> =
                candidates.iter().skip(start).take(page_size).copied().collect();
            let last_evaluated_key = match evaluated.last() {
                Some(last) if start + evaluated.len() < candidates.len() => {
                    Some(read::common::PageCursor::from(table.key_of(last)))
                }
                _ => None,
            };
            let mut items = Vec::new();
            for item in evaluated {
                if filter.as_ref().is_none_or(|filter| matches(item, filter)) {
                    items.push(project(item, &input.projection_expression, names)?);
                }
            }
            let count = items.len();
            if input.select == Some(types::Select::Count) {
                items.clear();
            }
            Ok(read::common::Page {
                items,
                count,
                last_evaluated_key,
            })
        })
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_item(
        &self,
        input: get_item::GetItemInput,
    ) -> Result<Option<common::Item>, StoreError> {
        self.call("GetItem")?;
        let single_read = input.single_read_operation;
        self.with_existing_table(&single_read.table_name, |table| {
            match table.position(&input.keys) {
                Some(position) => Ok(Some(project(
                    &table.items[position],
                    &single_read.projection_expression,
                    &single_read.expression_attribute_names,
                )?)),
                None => Ok(None),
            }
        })
    }

    async fn put_item(&self, input: put_item::PutItemInput) -> Result<(), StoreError> {
        self.call("PutItem")?;
        self.with_existing_table(&input.table_name, |table| {
            let key = table.key_of(&input.item);
            match table.position(&key) {
                Some(position) => table.items[position] = input.item,
                None => table.items.push(input.item),
            }
            Ok(())
        })
    }

    async fn delete_item(&self, input: delete_item::DeleteItemInput) -> Result<(), StoreError> {
        self.call("DeleteItem")?;
        self.with_existing_table(&input.table_name, |table| {
            if let Some(position) = table.position(&input.keys) {
                table.items.remove(position);
            }
            Ok(())
        })
    }

    async fn update_item(
        &self,
        input: update_item::UpdateItemInput,
    ) -> Result<Option<common::Item>, StoreError> {
        self.call("UpdateItem")?;
        let names = Some(input.expression_attribute_names);
        let values = Some(input.expression_attribute_values);
        let assignments = input
            .update_expression
            .strip_prefix("SET ")
            .ok_or_else(|| validation("only SET updates are supported"))?;
        let mut updates = Vec::new();
        for assignment in assignments.split(", ") {
            let (name, value) = assignment
                .split_once(" = ")
                .ok_or_else(|| validation(format!("unsupported assignment {assignment}")))?;
            updates.push((resolve_name(&names, name)?, resolve_value(&values, value)?));
        }
        self.with_existing_table(&input.table_name, |table| {
            let position = match table.position(&input.keys) {
                Some(position) => position,
                None => {
                    table.items.push(input.keys.clone());
                    table.items.len() - 1
                }
            };
            let item = &mut table.items[position];
            item.extend(updates);
            Ok((input.return_values == Some(types::ReturnValue::AllNew)).then(|| item.clone()))
        })
    }

    async fn query(&self, input: query::QueryInput) -> Result<read::common::Page, StoreError> {
        self.call("Query")?;
        self.read_page(
            input.multiple_read_operation,
            Some(&input.key_condition_expression),
        )
    }

    async fn scan(&self, input: scan::ScanInput) -> Result<read::common::Page, StoreError> {
        self.call("Scan")?;
        self.read_page(input.multiple_read_operation, None)
    }

    async fn batch_get_item(
        &self,
        request: batch_get_item::BatchRequest,
    ) -> Result<batch_get_item::BatchResponse, StoreError> {
        self.call("BatchGetItem")?;
        self.batch_requests.lock().unwrap().push(request.clone());
        let tables = self.tables.lock().unwrap();
        let mut response = batch_get_item::BatchResponse::default();
        let mut capacity = self.batch_capacity.unwrap_or(usize::MAX);
        for (table_name, keys) in request {
            let table = tables.get(&table_name).ok_or_else(|| {
                StoreError::new(
                    "ResourceNotFoundException",
                    format!("table {table_name} not found"),
                )
            })?;
            for key in keys {
                if capacity == 0 {
                    response
                        .unprocessed
                        .entry(table_name.clone())
                        .or_default()
                        .push(key);
                    continue;
                }
                capacity -= 1;
                let resolved = response.responses.entry(table_name.clone()).or_default();
                if let Some(position) = table.position(&key) {
                    resolved.push(table.items[position].clone());
                }
            }
        }
        Ok(response)
    }

    async fn describe_table(
        &self,
        table_name: &str,
    ) -> Result<Option<types::TableDescription>, StoreError> {
        self.call("DescribeTable")?;
        self.with_existing_table(table_name, |table| {
            Ok(Some(
                types::TableDescription::builder()
                    .table_name(table_name)
                    .item_count(i64::try_from(table.items.len()).unwrap_or(i64::MAX))
                    .build(),
            ))
        })
    }
}
