//! Typed result mapping.

use objql_ir::Row;

use crate::error::Error;

/// Maps an untyped result row into a typed record.
///
/// Rows are keyed by the column names the statement selected; implementors
/// look fields up by those keys (or by alias) and convert values with the
/// [`objql_ir::Value`] accessors.
///
/// ```rust
/// use objql_core::{Error, FromRow};
/// use objql_ir::Row;
///
/// struct AccountName(String);
///
/// impl FromRow for AccountName {
///     fn from_row(row: &Row) -> Result<Self, Error> {
///         let name = row
///             .get("name")
///             .and_then(|v| v.as_str())
///             .ok_or_else(|| Error::mapping("missing 'name'"))?;
///         Ok(AccountName(name.to_string()))
///     }
/// }
/// ```
pub trait FromRow: Sized {
    /// Convert a row into the typed record.
    fn from_row(row: &Row) -> Result<Self, Error>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> Result<Self, Error> {
        Ok(row.clone())
    }
}
