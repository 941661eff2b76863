use crate::{common, error::Result};

use aws_sdk_dynamodb::types;
use serde::Serialize;
use std::{collections, future::Future};

/// Request settings shared by single-item reads.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SingleReadInput {
    /// Whether to use a strongly consistent read.
    pub consistent_read: Option<bool>,
    /// Name placeholders used by the projection expression.
    pub expression_attribute_names: Option<collections::HashMap<String, String>>,
    /// Which attributes to return; all when `None`.
    pub projection_expression: Option<String>,
    /// The table to read from.
    pub table_name: String,
}

/// Arguments for single-item read operations (GetItem).
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct SingleReadArgs {
    /// Whether to use a consistent read.
    ///
    /// `true` for strongly consistent reads, `false` or `None` for eventually consistent reads.
    pub consistent_read: Option<bool>,
    /// Which attributes to retrieve; an empty selection retrieves all of them.
    pub selection: common::selection::Selection,
    /// The name of the table to read from.
    pub table_name: String,
}

impl From<SingleReadArgs> for SingleReadInput {
    fn from(single_read_args: SingleReadArgs) -> Self {
        let (expression_attribute_names, projection_expression) =
            if single_read_args.selection.is_empty() {
                (None, None)
            } else {
                let selection: common::ExpressionInput = single_read_args.selection.into();
                (
                    Some(selection.expression_attribute_names),
                    Some(selection.expression),
                )
            };
        Self {
            consistent_read: single_read_args.consistent_read,
            expression_attribute_names,
            projection_expression,
            table_name: single_read_args.table_name,
        }
    }
}

/// Request settings shared by multi-item reads (Query, Scan).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MultipleReadInput {
    /// Whether to use a strongly consistent read.
    pub consistent_read: Option<bool>,
    /// Where the page starts; `None` for the first page.
    pub exclusive_start_key: Option<common::Item>,
    /// Name placeholders used by any expression of the request.
    pub expression_attribute_names: Option<collections::HashMap<String, String>>,
    /// Value placeholders used by any expression of the request.
    pub expression_attribute_values: Option<collections::HashMap<String, types::AttributeValue>>,
    /// Filter applied after the key condition.
    pub filter_expression: Option<String>,
    /// Secondary index to read instead of the table.
    pub index_name: Option<String>,
    /// Maximum items evaluated per page.
    pub limit: Option<i32>,
    /// Which attributes to return; all when `None`.
    pub projection_expression: Option<String>,
    /// Items or count only.
    pub select: Option<types::Select>,
    /// The table to read from.
    pub table_name: String,
}

/// Arguments for multiple-item read operations (Query, Scan).
#[derive(Clone, Debug, PartialEq)]
pub struct MultipleReadArgs<T> {
    /// Whether to use a consistent read.
    pub consistent_read: Option<bool>,
    /// Continue a previous read from this cursor.
    pub exclusive_start_key: Option<PageCursor>,
    /// Filter applied to the items read.
    pub filter: Option<common::condition::Filter<T>>,
    /// The name of a secondary index to read instead of the base table.
    pub index_name: Option<String>,
    /// Maximum number of items evaluated per page.
    pub limit: Option<i32>,
    /// Items or count only.
    pub select: Option<types::Select>,
    /// Which attributes to retrieve; an empty selection retrieves all of them.
    pub selection: common::selection::Selection,
    /// The name of the table to read from.
    pub table_name: String,
}

impl<T> Default for MultipleReadArgs<T> {
    fn default() -> Self {
        Self {
            consistent_read: None,
            exclusive_start_key: None,
            filter: None,
            index_name: None,
            limit: None,
            select: None,
            selection: common::selection::Selection::default(),
            table_name: String::new(),
        }
    }
}

impl<T: Serialize> MultipleReadArgs<T> {
    /// Build the input, numbering filter value placeholders from `index`.
    pub(crate) fn into_input(self, index: &mut usize) -> serde_dynamo::Result<MultipleReadInput> {
        let mut input = MultipleReadInput {
            consistent_read: self.consistent_read,
            exclusive_start_key: self.exclusive_start_key.map(PageCursor::into_item),
            index_name: self.index_name,
            limit: self.limit,
            select: self.select,
            table_name: self.table_name,
            ..Default::default()
        };
        if let Some(filter) = self.filter {
            let filter = filter.get_expression_operation(index)?;
            let filter_expression = filter.merge_into(
                &mut input.expression_attribute_names,
                &mut input.expression_attribute_values,
            );
            input.filter_expression = Some(filter_expression);
        }
        if !self.selection.is_empty() {
            let selection: common::ExpressionInput = self.selection.into();
            let projection_expression = selection.merge_into(
                &mut input.expression_attribute_names,
                &mut input.expression_attribute_values,
            );
            input.projection_expression = Some(projection_expression);
        }
        Ok(input)
    }
}

impl<T: Serialize> TryFrom<MultipleReadArgs<T>> for MultipleReadInput {
    type Error = serde_dynamo::Error;

    fn try_from(multiple_read_args: MultipleReadArgs<T>) -> serde_dynamo::Result<Self> {
        multiple_read_args.into_input(&mut 0)
    }
}

/// Opaque continuation token: the last evaluated key of a previous page.
#[derive(Clone, Debug, PartialEq)]
pub struct PageCursor(common::Item);

impl PageCursor {
    /// The store key the next page starts after.
    pub fn into_item(self) -> common::Item {
        self.0
    }
}

impl From<common::Item> for PageCursor {
    fn from(item: common::Item) -> Self {
        Self(item)
    }
}

/// One page returned by a query or a scan.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    /// The items of the page; empty in count-only mode.
    pub items: Vec<common::Item>,
    /// How many items matched on this page.
    pub count: usize,
    /// Where the next page starts; `None` when there are no more pages.
    pub last_evaluated_key: Option<PageCursor>,
}

/// Items and count accumulated over every page read.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Paginated {
    /// Items of every page, in page order.
    pub items: Vec<common::Item>,
    /// Sum of the page counts.
    pub count: usize,
    /// Number of pages requested.
    pub pages: usize,
}

/// Drive a paged read until the store reports no next cursor, or until at
/// least `limit` items have been accumulated.
///
/// The limit is checked once per completed page, so the result may overshoot
/// it by up to one page of items. Once done, the loop never re-enters.
pub async fn paginate<F, Fut>(mut fetch_page: F, limit: Option<usize>) -> Result<Paginated>
where
    F: FnMut(Option<PageCursor>) -> Fut,
    Fut: Future<Output = Result<Page>>,
{
    let mut paginated = Paginated::default();
    let mut cursor = None;
    loop {
        let page = fetch_page(cursor.take()).await?;
        paginated.pages += 1;
        paginated.count += page.count;
        paginated.items.extend(page.items);
        let limit_reached = limit.is_some_and(|limit| paginated.items.len() >= limit);
        match page.last_evaluated_key {
            Some(next) if !limit_reached => cursor = Some(next),
            _ => break,
        }
    }
    Ok(paginated)
}

/// apply common single read operation settings to a builder
#[macro_export]
#[doc(hidden)]
macro_rules! apply_single_read_operation {
    ($builder:expr, $single_read_operation:expr) => {
        $builder
            .set_consistent_read($single_read_operation.consistent_read)
            .set_expression_attribute_names($single_read_operation.expression_attribute_names)
            .set_projection_expression($single_read_operation.projection_expression)
            .table_name($single_read_operation.table_name)
    };
}

/// apply common multiple read operation settings to a builder
#[macro_export]
#[doc(hidden)]
macro_rules! apply_multiple_read_operation {
    ($builder:expr, $multiple_read_operation:expr) => {
        $builder
            .set_consistent_read($multiple_read_operation.consistent_read)
            .set_exclusive_start_key($multiple_read_operation.exclusive_start_key)
            .set_expression_attribute_names($multiple_read_operation.expression_attribute_names)
            .set_expression_attribute_values($multiple_read_operation.expression_attribute_values)
            .set_filter_expression($multiple_read_operation.filter_expression)
            .set_index_name($multiple_read_operation.index_name)
            .set_limit($multiple_read_operation.limit)
            .set_projection_expression($multiple_read_operation.projection_expression)
            .set_select($multiple_read_operation.select)
            .table_name($multiple_read_operation.table_name)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn item(id: usize) -> common::Item {
        common::Item::from([("id".to_string(), types::AttributeValue::N(id.to_string()))])
    }

    /// Pages of the given sizes; every page but the last carries a cursor.
    fn pages(sizes: &[usize]) -> Vec<Page> {
        let mut next_id = 0;
        sizes
            .iter()
            .enumerate()
            .map(|(position, size)| {
                let items: Vec<_> = (next_id..next_id + size).map(item).collect();
                next_id += size;
                let last_evaluated_key = (position + 1 < sizes.len())
                    .then(|| PageCursor::from(item(next_id - 1)));
                Page {
                    count: items.len(),
                    items,
                    last_evaluated_key,
                }
            })
            .collect()
    }

    async fn run(sizes: &[usize], limit: Option<usize>) -> (Paginated, Vec<Option<PageCursor>>) {
        let pages = pages(sizes);
        let calls = AtomicUsize::new(0);
        let cursors = std::sync::Mutex::new(Vec::new());
        let paginated = paginate(
            |cursor| {
                cursors.lock().unwrap().push(cursor);
                let page = pages[calls.fetch_add(1, Ordering::SeqCst)].clone();
                async move { Ok(page) }
            },
            limit,
        )
        .await
        .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), paginated.pages);
        (paginated, cursors.into_inner().unwrap())
    }

    #[rstest]
    #[case::no_limit(&[10, 10, 5], None, 3, 25)]
    #[case::limit_mid_second_page(&[10, 10, 5], Some(15), 2, 20)]
    #[case::limit_on_page_boundary(&[10, 10, 5], Some(10), 1, 10)]
    #[case::limit_above_total(&[10, 10, 5], Some(100), 3, 25)]
    #[case::single_page(&[3], None, 1, 3)]
    #[case::empty_page(&[0], Some(1), 1, 0)]
    #[tokio::test]
    async fn test_paginate(
        #[case] sizes: &[usize],
        #[case] limit: Option<usize>,
        #[case] expected_pages: usize,
        #[case] expected_items: usize,
    ) {
        let (paginated, _) = run(sizes, limit).await;
        assert_eq!(paginated.pages, expected_pages);
        assert_eq!(paginated.items.len(), expected_items);
        assert_eq!(paginated.count, expected_items);
    }

    #[tokio::test]
    async fn test_paginate_resubmits_last_evaluated_key() {
        let (_, cursors) = run(&[2, 2, 1], None).await;
        assert_eq!(
            cursors,
            vec![
                None,
                Some(PageCursor::from(item(1))),
                Some(PageCursor::from(item(3))),
            ]
        );
    }

    #[tokio::test]
    async fn test_paginate_stops_on_error() {
        let calls = AtomicUsize::new(0);
        let result = paginate(
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(crate::error::Error::store(
                        "Query",
                        crate::error::StoreError::new("ValidationException", "a"),
                    ))
                }
            },
            None,
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[rstest]
    #[case::empty(
        MultipleReadArgs {
            table_name: "a".to_string(),
            ..Default::default()
        },
        MultipleReadInput {
            table_name: "a".to_string(),
            ..Default::default()
        }
    )]
    #[case::full(
        MultipleReadArgs {
            consistent_read: Some(true),
            exclusive_start_key: Some(
                PageCursor::from(
                    item(1)
                )
            ),
            filter: Some(
                common::condition::Filter {
                    conditions: vec![
                        common::condition::KeyCondition::equals(
                            "b",
                            serde_json::Value::String(
                                "c".to_string()
                            ),
                        ),
                    ],
                    ..Default::default()
                }
            ),
            index_name: Some(
                "d".to_string()
            ),
            limit: Some(5),
            select: Some(
                types::Select::AllAttributes
            ),
            selection: common::selection::Selection(
                vec![
                    "e".to_string(),
                ]
            ),
            table_name: "f".to_string(),
        },
        MultipleReadInput {
            consistent_read: Some(true),
            exclusive_start_key: Some(
                item(1)
            ),
            expression_attribute_names: Some(
                collections::HashMap::from(
                    [
                        ("#b".to_string(), "b".to_string()),
                        ("#e".to_string(), "e".to_string()),
                    ]
                )
            ),
            expression_attribute_values: Some(
                collections::HashMap::from(
                    [(
                        ":b_eq0".to_string(),
                        types::AttributeValue::S(
                            "c".to_string()
                        ),
                    )]
                )
            ),
            filter_expression: Some(
                "#b = :b_eq0".to_string()
            ),
            index_name: Some(
                "d".to_string()
            ),
            limit: Some(5),
            projection_expression: Some(
                "#e".to_string()
            ),
            select: Some(
                types::Select::AllAttributes
            ),
            table_name: "f".to_string(),
        }
    )]
    fn test_multiple_read_input(
        #[case] args: MultipleReadArgs<serde_json::Value>,
        #[case] expected: MultipleReadInput,
    ) {
        let actual: MultipleReadInput = args.try_into().unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_single_read_input() {
        let input: SingleReadInput = SingleReadArgs {
            consistent_read: Some(false),
            selection: common::selection::Selection(vec!["a".to_string(), "b".to_string()]),
            table_name: "c".to_string(),
        }
        .into();
        assert_eq!(
            input,
            SingleReadInput {
                consistent_read: Some(false),
                expression_attribute_names: Some(collections::HashMap::from([
                    ("#a".to_string(), "a".to_string()),
                    ("#b".to_string(), "b".to_string()),
                ])),
                projection_expression: Some("#a, #b".to_string()),
                table_name: "c".to_string(),
            }
        );
    }
}
