use crate::common;

use aws_sdk_dynamodb::types;
use serde::Serialize;
use serde_dynamo::{Result, to_attribute_value};
use std::{collections, ops};

/// Logical operator for combining conditions.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum LogicalOperator {
    /// Logical AND - all conditions must be true.
    #[default]
    And,
    /// Logical OR - at least one condition must be true.
    Or,
}

impl ops::Deref for LogicalOperator {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::And => " AND ",
            Self::Or => " OR ",
        }
    }
}

/// Condition types for DynamoDB expressions.
///
/// Key conditions accept the comparison, `Between` and `BeginsWith` forms;
/// filters accept every variant.
///
/// ```rust
/// use dynamodb_model::common::condition;
///
/// let eq = condition::Condition::Equals("value".to_string());
/// let gt = condition::Condition::GreaterThan(100);
/// let null: condition::Condition<String> = condition::Condition::Null;
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Condition<T> {
    /// Checks if an attribute begins with a specified prefix (string types only).
    BeginsWith(String),
    /// Checks if an attribute value is between two values (inclusive).
    Between(T, T),
    /// Checks if an attribute contains a specified value.
    Contains(T),
    /// Checks if an attribute value equals a specified value.
    Equals(T),
    /// Checks if an attribute value is greater than a specified value.
    GreaterThan(T),
    /// Checks if an attribute value is greater than or equal to a specified value.
    GreaterThanOrEqual(T),
    /// Checks if an attribute value is less than a specified value.
    LessThan(T),
    /// Checks if an attribute value is less than or equal to a specified value.
    LessThanOrEqual(T),
    /// Checks if an attribute value does not equal a specified value.
    NotEqual(T),
    /// Checks if an attribute exists.
    NotNull,
    /// Checks if an attribute does not exist.
    Null,
}

impl<T: Serialize> Condition<T> {
    fn comparison(
        value: T,
        operator: &str,
        suffix: &str,
        key: &str,
        key_placeholder: &str,
        index: &mut usize,
        values: &mut collections::HashMap<String, types::AttributeValue>,
    ) -> Result<String> {
        let value = to_attribute_value(value)?;
        let value_placeholder = format!(":{key}_{suffix}{index}");
        *index += 1;
        let expression = format!("{key_placeholder} {operator} {value_placeholder}");
        values.insert(value_placeholder, value);
        Ok(expression)
    }

    fn get_expression(
        self,
        key: &str,
        key_placeholder: &str,
        index: &mut usize,
    ) -> Result<(String, collections::HashMap<String, types::AttributeValue>)> {
        let mut values = collections::HashMap::new();
        let expression = match self {
            Self::BeginsWith(prefix) => {
                let value_placeholder = format!(":{key}_begins_with{index}");
                *index += 1;
                let expression = format!("begins_with({key_placeholder}, {value_placeholder})");
                values.insert(value_placeholder, types::AttributeValue::S(prefix));
                expression
            }
            Self::Between(low, high) => {
                let low = to_attribute_value(low)?;
                let high = to_attribute_value(high)?;
                let low_placeholder = format!(":{key}_between{index}");
                *index += 1;
                let high_placeholder = format!(":{key}_between{index}");
                *index += 1;
                let expression =
                    format!("{key_placeholder} BETWEEN {low_placeholder} AND {high_placeholder}");
                values.insert(low_placeholder, low);
                values.insert(high_placeholder, high);
                expression
            }
            Self::Contains(value) => {
                let value = to_attribute_value(value)?;
                let value_placeholder = format!(":{key}_contains{index}");
                *index += 1;
                let expression = format!("contains({key_placeholder}, {value_placeholder})");
                values.insert(value_placeholder, value);
                expression
            }
            Self::Equals(value) => {
                Self::comparison(value, "=", "eq", key, key_placeholder, index, &mut values)?
            }
            Self::GreaterThan(value) => {
                Self::comparison(value, ">", "gt", key, key_placeholder, index, &mut values)?
            }
            Self::GreaterThanOrEqual(value) => {
                Self::comparison(value, ">=", "gte", key, key_placeholder, index, &mut values)?
            }
            Self::LessThan(value) => {
                Self::comparison(value, "<", "lt", key, key_placeholder, index, &mut values)?
            }
            Self::LessThanOrEqual(value) => {
                Self::comparison(value, "<=", "lte", key, key_placeholder, index, &mut values)?
            }
            Self::NotEqual(value) => {
                Self::comparison(value, "<>", "ne", key, key_placeholder, index, &mut values)?
            }
            Self::NotNull => format!("attribute_exists({key_placeholder})"),
            Self::Null => format!("attribute_not_exists({key_placeholder})"),
        };
        Ok((expression, values))
    }
}

/// Condition applied to an attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyCondition<T> {
    /// The condition to apply to the attribute.
    pub condition: Condition<T>,
    /// The name of the attribute to apply the condition to.
    pub name: String,
}

impl<T> KeyCondition<T> {
    /// Equality condition on `name`.
    pub fn equals(name: impl Into<String>, value: T) -> Self {
        Self {
            condition: Condition::Equals(value),
            name: name.into(),
        }
    }
}

impl<T: Serialize> KeyCondition<T> {
    /// Join conditions with `operator`, numbering value placeholders from `index`.
    pub(crate) fn get_expression_operation(
        conditions: Vec<Self>,
        operator: &LogicalOperator,
        index: &mut usize,
    ) -> Result<common::ExpressionInput> {
        let mut expressions = Vec::with_capacity(conditions.len());
        let mut expression_attribute_names = collections::HashMap::with_capacity(conditions.len());
        let mut expression_attribute_values = collections::HashMap::new();
        for key_condition in conditions {
            let placeholder = common::placeholder(&key_condition.name);
            let (expression, condition_values) =
                key_condition
                    .condition
                    .get_expression(&key_condition.name, &placeholder, index)?;
            expressions.push(expression);
            expression_attribute_names.insert(placeholder, key_condition.name);
            expression_attribute_values.extend(condition_values);
        }
        let expression = expressions.join(&**operator);
        let operation = common::ExpressionInput {
            expression,
            expression_attribute_names,
            expression_attribute_values,
        };
        Ok(operation)
    }
}

/// Filter applied to the items a query or scan reads.
///
/// ```rust
/// use dynamodb_model::common::condition;
///
/// let filter = condition::Filter {
///     operator: condition::LogicalOperator::And,
///     conditions: vec![condition::KeyCondition::equals("status", "active".to_string())],
/// };
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Filter<T> {
    /// How the conditions combine.
    pub operator: LogicalOperator,
    /// The conditions to combine.
    pub conditions: Vec<KeyCondition<T>>,
}

impl<T> Default for Filter<T> {
    fn default() -> Self {
        Self {
            operator: LogicalOperator::And,
            conditions: Vec::new(),
        }
    }
}

impl<T: Serialize> Filter<T> {
    pub(crate) fn get_expression_operation(
        self,
        index: &mut usize,
    ) -> Result<common::ExpressionInput> {
        KeyCondition::get_expression_operation(self.conditions, &self.operator, index)
    }
}
