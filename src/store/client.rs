use crate::{
    common,
    error::StoreError,
    read::{self, batch_get_item, get_item, query, scan},
    store::Store,
    write::{delete_item, put_item, update_item},
};

use async_trait::async_trait;
use aws_sdk_dynamodb::{Client, types};
use indexmap::IndexMap;
use std::collections;

fn into_page(
    items: Option<Vec<common::Item>>,
    count: i32,
    last_evaluated_key: Option<common::Item>,
) -> read::common::Page {
    read::common::Page {
        items: items.unwrap_or_default(),
        count: usize::try_from(count).unwrap_or_default(),
        last_evaluated_key: last_evaluated_key
            .filter(|key| !key.is_empty())
            .map(read::common::PageCursor::from),
    }
}

#[async_trait]
impl Store for Client {
    async fn get_item(
        &self,
        input: get_item::GetItemInput,
    ) -> Result<Option<common::Item>, StoreError> {
        let builder = Client::get_item(self).set_key(Some(input.keys));
        let output = crate::apply_single_read_operation!(builder, input.single_read_operation)
            .send()
            .await?;
        Ok(output.item)
    }

    async fn put_item(&self, input: put_item::PutItemInput) -> Result<(), StoreError> {
        Client::put_item(self)
            .set_item(Some(input.item))
            .table_name(input.table_name)
            .send()
            .await?;
        Ok(())
    }

    async fn delete_item(&self, input: delete_item::DeleteItemInput) -> Result<(), StoreError> {
        Client::delete_item(self)
            .set_key(Some(input.keys))
            .table_name(input.table_name)
            .send()
            .await?;
        Ok(())
    }

    async fn update_item(
        &self,
        input: update_item::UpdateItemInput,
    ) -> Result<Option<common::Item>, StoreError> {
        let output = Client::update_item(self)
            .set_key(Some(input.keys))
            .update_expression(input.update_expression)
            .set_expression_attribute_names(Some(input.expression_attribute_names))
            .set_expression_attribute_values(Some(input.expression_attribute_values))
            .set_return_values(input.return_values)
            .table_name(input.table_name)
            .send()
            .await?;
        Ok(output.attributes)
    }

    async fn query(&self, input: query::QueryInput) -> Result<read::common::Page, StoreError> {
        let builder = Client::query(self)
            .key_condition_expression(input.key_condition_expression)
            .set_scan_index_forward(input.scan_index_forward);
        let output = crate::apply_multiple_read_operation!(builder, input.multiple_read_operation)
            .send()
            .await?;
        Ok(into_page(
            output.items,
            output.count,
            output.last_evaluated_key,
        ))
    }

    async fn scan(&self, input: scan::ScanInput) -> Result<read::common::Page, StoreError> {
        let builder = Client::scan(self);
        let output = crate::apply_multiple_read_operation!(builder, input.multiple_read_operation)
            .send()
            .await?;
        Ok(into_page(
            output.items,
            output.count,
            output.last_evaluated_key,
        ))
    }

    async fn batch_get_item(
        &self,
        request: batch_get_item::BatchRequest,
    ) -> Result<batch_get_item::BatchResponse, StoreError> {
        let mut request_items = collections::HashMap::with_capacity(request.len());
        for (table_name, keys) in request {
            let keys_and_attributes = types::KeysAndAttributes::builder()
                .set_keys(Some(keys))
                .build()
                .map_err(|err| StoreError::new("ConstructionFailure", err.to_string()))?;
            request_items.insert(table_name, keys_and_attributes);
        }
        let output = Client::batch_get_item(self)
            .set_request_items(Some(request_items))
            .send()
            .await?;
        let responses: IndexMap<_, _> = output.responses.unwrap_or_default().into_iter().collect();
        let unprocessed = output
            .unprocessed_keys
            .unwrap_or_default()
            .into_iter()
            .map(|(table_name, keys_and_attributes)| (table_name, keys_and_attributes.keys))
            .collect();
        Ok(batch_get_item::BatchResponse {
            responses,
            unprocessed,
        })
    }

    async fn describe_table(
        &self,
        table_name: &str,
    ) -> Result<Option<types::TableDescription>, StoreError> {
        let output = Client::describe_table(self)
            .table_name(table_name)
            .send()
            .await?;
        Ok(output.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    fn item(id: &str) -> common::Item {
        common::Item::from([("id".to_string(), types::AttributeValue::S(id.to_string()))])
    }

    #[rstest]
    #[case::last_page(Some(vec![item("a")]), 1, None, None)]
    #[case::more_pages(Some(vec![item("a")]), 1, Some(item("a")), Some(item("a")))]
    #[case::empty_cursor_is_no_cursor(None, 0, Some(common::Item::new()), None)]
    #[case::negative_count(None, -1, None, None)]
    fn test_into_page(
        #[case] items: Option<Vec<common::Item>>,
        #[case] count: i32,
        #[case] last_evaluated_key: Option<common::Item>,
        #[case] expected_cursor: Option<common::Item>,
    ) {
        let expected_items = items.clone().unwrap_or_default();
        let page = into_page(items, count, last_evaluated_key);
        assert_eq!(page.items, expected_items);
        assert_eq!(page.count, usize::try_from(count).unwrap_or_default());
        assert_eq!(
            page.last_evaluated_key.map(read::common::PageCursor::into_item),
            expected_cursor
        );
    }
}
