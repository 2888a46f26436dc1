//! OBJQL core — query compilation, row-level security, and execution.
//!
//! The engine accepts DSQL (a SOQL-like object query language), rewrites the
//! parsed tree with row-level security predicates, optimizes it against
//! catalog statistics, emits dialect-specific parameterized SQL, and
//! executes it through a pluggable async driver, memoizing plans and result
//! sets along the way.
//!
//! ```no_run
//! use std::sync::Arc;
//! use objql_core::{QueryEngine, SecurityContext, StaticCatalog};
//! # async fn example(driver: Arc<dyn objql_core::QueryDriver>) -> Result<(), objql_core::Error> {
//! let catalog = Arc::new(StaticCatalog::new());
//! let engine = QueryEngine::new(driver, catalog.clone(), catalog);
//!
//! let context = SecurityContext::new("user-1");
//! let rows = engine.query("SELECT Id, Name FROM Account", &context).await?;
//! # let _ = rows; Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod mapper;
pub mod query;
pub mod security;
pub mod sql;

pub use catalog::{
    DataType, FieldMetadata, MetadataProvider, ObjectMetadata, Relationship, RelationshipKind,
    StaticCatalog, StatisticsProvider,
};
pub use config::EngineConfig;
pub use driver::{DriverError, QueryDriver};
pub use engine::{CacheStatisticsReport, OutcomeMetadata, QueryEngine, QueryOutcome};
pub use error::Error;
pub use mapper::FromRow;
pub use query::{Plan, QueryHash};
pub use security::{
    AccessMode, AccessPolicy, PolicyKind, PolicyRegistry, SecurityContext, SecurityError,
};
pub use sql::{GeneratedSql, SqlDialect, SqlGenerator};

/// Re-export the IR so embedders need only this crate.
pub use objql_ir as ir;
