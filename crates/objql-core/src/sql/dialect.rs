//! SQL dialect differences: quoting, case-insensitive LIKE, null ordering,
//! and pagination style.

use serde::{Deserialize, Serialize};

/// Target SQL dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SqlDialect {
    /// PostgreSQL: double-quoted identifiers, ILIKE, native NULLS ordering,
    /// LIMIT/OFFSET.
    Postgres,
    /// SQL Server: bracketed identifiers, CASE-emulated NULLS ordering,
    /// OFFSET/FETCH pagination that requires an ORDER BY.
    Mssql,
    /// Testing-only dialect emitting bare identifiers.
    Mock,
}

impl SqlDialect {
    /// Quote an identifier.
    pub fn quote(&self, ident: &str) -> String {
        match self {
            SqlDialect::Postgres => format!("\"{}\"", ident.replace('"', "\"\"")),
            SqlDialect::Mssql => format!("[{}]", ident.replace(']', "]]")),
            SqlDialect::Mock => ident.to_string(),
        }
    }

    /// The LIKE-family operator keyword.
    pub fn like_operator(&self) -> &'static str {
        match self {
            SqlDialect::Postgres => "ILIKE",
            SqlDialect::Mssql | SqlDialect::Mock => "LIKE",
        }
    }

    /// Whether `NULLS FIRST/LAST` is accepted natively.
    pub fn supports_nulls_ordering(&self) -> bool {
        !matches!(self, SqlDialect::Mssql)
    }

    /// Whether pagination uses `OFFSET … ROWS FETCH NEXT … ROWS ONLY`.
    pub fn uses_offset_fetch(&self) -> bool {
        matches!(self, SqlDialect::Mssql)
    }
}
