use crate::{common, schema, write};

use aws_sdk_dynamodb::types;
use indexmap::IndexMap;
use serde::Serialize;
use serde_dynamo::{Result, to_attribute_value};
use std::collections;

/// Build a `SET` update expression from attributes, in iteration order.
///
/// The i-th attribute (1-indexed) is named through `#var{i}` and valued
/// through `:{attribute}`. Both placeholder maps have one entry per attribute.
///
/// ```rust
/// use aws_sdk_dynamodb::types::AttributeValue;
/// use dynamodb_model::write::update_item;
/// use indexmap::IndexMap;
///
/// let update = update_item::build_update_expression(IndexMap::from([
///     ("a".to_string(), AttributeValue::N("1".to_string())),
///     ("b".to_string(), AttributeValue::N("2".to_string())),
/// ]));
/// assert_eq!(update.expression, "SET #var1 = :a, #var2 = :b");
/// ```
pub fn build_update_expression(
    attributes: IndexMap<String, types::AttributeValue>,
) -> common::ExpressionInput {
    let mut assignments = Vec::with_capacity(attributes.len());
    let mut expression_attribute_names = collections::HashMap::with_capacity(attributes.len());
    let mut expression_attribute_values = collections::HashMap::with_capacity(attributes.len());
    for (position, (attribute, value)) in attributes.into_iter().enumerate() {
        let name_placeholder = common::placeholder(&format!("var{}", position + 1));
        let value_placeholder = format!(":{attribute}");
        assignments.push(format!("{name_placeholder} = {value_placeholder}"));
        expression_attribute_names.insert(name_placeholder, attribute);
        expression_attribute_values.insert(value_placeholder, value);
    }
    common::ExpressionInput {
        expression: format!("SET {}", assignments.join(", ")),
        expression_attribute_names,
        expression_attribute_values,
    }
}

/// Store-ready update item request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateItemInput {
    /// The primary key of the item.
    pub keys: common::Item,
    /// The `SET` expression.
    pub update_expression: String,
    /// Name placeholders of the update expression.
    pub expression_attribute_names: collections::HashMap<String, String>,
    /// Value placeholders of the update expression.
    pub expression_attribute_values: collections::HashMap<String, types::AttributeValue>,
    /// Which attributes the store returns after the update.
    pub return_values: Option<types::ReturnValue>,
    /// The table to update.
    pub table_name: String,
}

/// Update item request: set attributes on the item with the given key.
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateItem<T> {
    /// The primary key of the item to update.
    pub keys: common::key::Keys<T>,
    /// Attributes to set; key attributes are ignored.
    pub attributes: schema::Record<T>,
    /// Skip null and empty string values, and strip them inside nested maps.
    pub drop_empty: bool,
    /// Which attributes the store returns after the update.
    pub return_values: Option<types::ReturnValue>,
    /// The table to update.
    pub table_name: String,
}

impl<T: Serialize> UpdateItem<T> {
    /// Build the store request, or `None` when no attribute is left to set.
    pub fn into_input(self) -> Result<Option<UpdateItemInput>> {
        let mut attributes = IndexMap::with_capacity(self.attributes.len());
        for (name, value) in self.attributes {
            if self.keys.contains(&name) {
                continue;
            }
            let mut value = to_attribute_value(value)?;
            if self.drop_empty {
                if write::common::is_empty_value(&value) {
                    continue;
                }
                if let types::AttributeValue::M(nested) = &mut value {
                    write::common::drop_empty_values(nested);
                }
            }
            attributes.insert(name, value);
        }
        if attributes.is_empty() {
            return Ok(None);
        }
        let update = build_update_expression(attributes);
        Ok(Some(UpdateItemInput {
            keys: self.keys.try_into()?,
            update_expression: update.expression,
            expression_attribute_names: update.expression_attribute_names,
            expression_attribute_values: update.expression_attribute_values,
            return_values: self.return_values,
            table_name: self.table_name,
        }))
    }
}
