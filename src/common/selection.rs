use crate::common;

use std::collections;

/// Attributes to select in a projection expression.
///
/// ```rust
/// use dynamodb_model::common::selection;
///
/// let selection = selection::Selection(vec![
///     "id".to_string(),
///     "name".to_string(),
/// ]);
/// ```
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Selection(pub Vec<String>);

impl Selection {
    /// Whether nothing is selected, meaning every attribute is returned.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Selection> for common::ExpressionInput {
    fn from(selection: Selection) -> Self {
        let operations = selection
            .0
            .into_iter()
            .map(|attribute| {
                let placeholder = common::placeholder(&attribute);
                common::ExpressionInput {
                    expression: placeholder.clone(),
                    expression_attribute_names: collections::HashMap::from([(
                        placeholder,
                        attribute,
                    )]),
                    ..Default::default()
                }
            })
            .collect();
        common::ExpressionInput::merge(", ", operations)
    }
}
