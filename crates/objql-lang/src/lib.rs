//! DSQL parser for the OBJQL query engine.
//!
//! DSQL is an object query language modeled after Salesforce SOQL: queries
//! name logical objects rather than physical tables, traverse relationships
//! through dotted field paths, and support aggregation, subqueries, and the
//! usual filter/order/group/paging clauses.
//!
//! # Syntax
//!
//! ```text
//! SELECT Id, Name FROM Account
//! SELECT Id, Account.Name FROM Contact WHERE Account.Industry = 'Tech'
//! SELECT StageName, COUNT(Id) FROM Opportunity GROUP BY StageName HAVING COUNT(Id) > 5
//! SELECT Id FROM Account WHERE Id IN (SELECT AccountId FROM Contact)
//! SELECT Id FROM Account ORDER BY Name DESC NULLS FIRST LIMIT 10 OFFSET 20
//! ```
//!
//! Keywords are case-insensitive. `LIKE` patterns whose `%` placement matches
//! are classified into `CONTAINS` / `STARTS_WITH` / `ENDS_WITH`.
//!
//! Logical operators bind left-to-right by first occurrence rather than SQL
//! precedence; see [`parse`] and the parser module docs.
//!
//! # Usage
//!
//! ```rust
//! let query = objql_lang::parse("SELECT Id, Name FROM Account WHERE Name = 'Acme'").unwrap();
//! assert_eq!(query.from_object, "Account");
//! ```

mod error;
mod lexer;
mod parser;
mod span;

pub use error::ParseError;
pub use parser::parse;
pub use span::{offset_to_line_col, Span};
