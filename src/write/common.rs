use crate::common;

use aws_sdk_dynamodb::types;

/// Whether a store value counts as empty: null, or an empty string.
pub fn is_empty_value(value: &types::AttributeValue) -> bool {
    match value {
        types::AttributeValue::Null(_) => true,
        types::AttributeValue::S(value) => value.is_empty(),
        _ => false,
    }
}

/// Remove empty values from `item`, descending into nested maps.
///
/// A nested map emptied this way is kept as an empty map.
pub fn drop_empty_values(item: &mut common::Item) {
    item.retain(|_, value| !is_empty_value(value));
    for value in item.values_mut() {
        if let types::AttributeValue::M(nested) = value {
            drop_empty_values(nested);
        }
    }
}
