use crate::{read, schema};

use serde::Serialize;
use serde_dynamo::{Error, Result};

/// Store-ready scan request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScanInput {
    /// Table, filter, projection, paging.
    pub multiple_read_operation: read::common::MultipleReadInput,
}

/// Scan request.
///
/// ```rust
/// use dynamodb_model::read;
/// use serde_json::Value;
///
/// let scan: read::scan::Scan<Value> = read::scan::Scan {
///     multiple_read_args: read::common::MultipleReadArgs {
///         table_name: "users".to_string(),
///         ..Default::default()
///     },
/// };
/// let input: read::scan::ScanInput = scan.try_into().unwrap();
/// assert_eq!(input.multiple_read_operation.table_name, "users");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Scan<T> {
    /// Read arguments (table name, start key, filter, selection, etc.).
    pub multiple_read_args: read::common::MultipleReadArgs<T>,
}

impl<T: Serialize> TryFrom<Scan<T>> for ScanInput {
    type Error = Error;

    fn try_from(scan: Scan<T>) -> Result<Self> {
        Ok(Self {
            multiple_read_operation: scan.multiple_read_args.try_into()?,
        })
    }
}

/// One decoded page of a table scan.
#[derive(Clone, Debug, PartialEq)]
pub struct ScanPage<T> {
    /// The records of the page.
    pub items: Vec<schema::Record<T>>,
    /// Pass back to read the next page; `None` after the last one.
    pub cursor: Option<read::common::PageCursor>,
}
