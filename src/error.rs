//! Error types returned by the access layer.

use crate::read::batch_get_item::BatchRequest;

use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use std::{error, fmt};

/// Store error codes that signal temporary capacity exhaustion.
const TRANSIENT_CODES: [&str; 3] = [
    "ProvisionedThroughputExceededException",
    "ThrottlingException",
    "RequestLimitExceeded",
];

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Schema declaration errors, raised while registering a table schema.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum SchemaError {
    /// More than one column declares the partition key role.
    #[error("partition key can only be one: `{first}` and `{second}` both declare it")]
    DuplicatePartitionKey {
        /// The column that declared the role first.
        first: String,
        /// The column that declared it again.
        second: String,
    },
    /// More than one column declares the sort key role.
    #[error("sort key can only be one: `{first}` and `{second}` both declare it")]
    DuplicateSortKey {
        /// The column that declared the role first.
        first: String,
        /// The column that declared it again.
        second: String,
    },
    /// No column declares the partition key role.
    #[error("no column declares the partition key")]
    MissingPartitionKey,
    /// A column default does not serialize to the declared value type.
    #[error("default value of `{column}` does not match its declared type {expected:?}")]
    DefaultTypeMismatch {
        /// The offending column.
        column: String,
        /// The declared value type.
        expected: crate::schema::ValueType,
    },
    /// A secondary index refers to an attribute that is not a declared column.
    #[error("index `{index}` refers to undeclared attribute `{attribute}`")]
    UnknownIndexAttribute {
        /// The index name.
        index: String,
        /// The undeclared attribute.
        attribute: String,
    },
    /// The secondary index sort attribute is the table sort key itself.
    #[error("index `{index}` sort attribute `{attribute}` is the table sort key")]
    IndexShadowsSortKey {
        /// The index name.
        index: String,
        /// The shadowed attribute.
        attribute: String,
    },
    /// A column default could not be serialized at all.
    #[error("default value of `{column}` cannot be serialized: {reason}")]
    UnserializableDefault {
        /// The offending column.
        column: String,
        /// The serializer message.
        reason: String,
    },
}

/// Error reported by a [`Store`](crate::store::Store) for a single call.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct StoreError {
    /// The store error code, e.g. `ThrottlingException`.
    pub code: String,
    /// The store error message.
    pub message: String,
}

impl StoreError {
    /// Create a store error from a code and a message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Whether the error belongs to the throttling class and may be retried.
    pub fn is_transient(&self) -> bool {
        TRANSIENT_CODES.contains(&self.code.as_str())
    }
}

impl<E, R> From<SdkError<E, R>> for StoreError
where
    E: ProvideErrorMetadata + error::Error + 'static,
    R: fmt::Debug + 'static,
{
    fn from(err: SdkError<E, R>) -> Self {
        let code = match (err.code(), &err) {
            (Some(code), _) => code.to_string(),
            (None, SdkError::ConstructionFailure(_)) => "ConstructionFailure".to_string(),
            (None, SdkError::TimeoutError(_)) => "TimeoutError".to_string(),
            (None, SdkError::DispatchFailure(_)) => "DispatchFailure".to_string(),
            (None, SdkError::ResponseError(_)) => "ResponseError".to_string(),
            (None, _) => "Unhandled".to_string(),
        };
        let message = match err.message() {
            Some(message) => message.to_string(),
            None => DisplayErrorContext(&err).to_string(),
        };
        Self { code, message }
    }
}

/// Errors returned by access layer operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The schema declaration is invalid.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// The candidate record lacks the partition key.
    #[error("partition key `{partition_key}` not present in the request")]
    MissingKey {
        /// The partition key column name.
        partition_key: String,
    },
    /// The sort key is missing and no secondary index can stand in for it.
    #[error("sort key `{sort_key}` not present in the request and no usable index: {reason}")]
    IndexFallback {
        /// The sort key column name.
        sort_key: String,
        /// Why the index path was unusable.
        reason: String,
    },
    /// The secondary index lookup matched no item.
    #[error("no item found through index `{index}`")]
    NotFound {
        /// The index that was queried.
        index: String,
    },
    /// The store rejected the call, immediately or after exhausting retries.
    #[error("{operation} operation failed. Error Code: {code}. Error: {message}")]
    StoreOperation {
        /// The operation name, e.g. `GetItem`.
        operation: &'static str,
        /// The store error code.
        code: String,
        /// The store error message.
        message: String,
    },
    /// A value could not be converted to or from its store representation.
    #[error(transparent)]
    Serialization(#[from] serde_dynamo::Error),
    /// Batch continuation hit its round cap with keys still unprocessed.
    #[error("batch get stopped after {rounds} rounds with unprocessed keys left")]
    BatchIncomplete {
        /// Rounds submitted before giving up.
        rounds: usize,
        /// Keys the store never resolved.
        unprocessed: BatchRequest,
    },
}

impl Error {
    pub(crate) fn store(operation: &'static str, err: StoreError) -> Self {
        Self::StoreOperation {
            operation,
            code: err.code,
            message: err.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case::provisioned("ProvisionedThroughputExceededException", true)]
    #[case::throttling("ThrottlingException", true)]
    #[case::request_limit("RequestLimitExceeded", true)]
    #[case::conditional("ConditionalCheckFailedException", false)]
    #[case::validation("ValidationException", false)]
    #[case::dispatch("DispatchFailure", false)]
    fn test_is_transient(#[case] code: &str, #[case] expected: bool) {
        let err = StoreError::new(code, "a");
        assert_eq!(err.is_transient(), expected);
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::new("ThrottlingException", "slow down");
        assert_eq!(err.to_string(), "ThrottlingException: slow down");
    }

    #[test]
    fn test_store_operation_message() {
        let err = Error::store("GetItem", StoreError::new("ValidationException", "bad key"));
        assert_eq!(
            err.to_string(),
            "GetItem operation failed. Error Code: ValidationException. Error: bad key"
        );
    }
}
