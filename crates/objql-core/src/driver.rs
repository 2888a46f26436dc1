//! The physical database driver interface.
//!
//! The engine hands the driver a parameterized statement and receives
//! untyped rows back; parameter substitution, pooling, and wire concerns
//! all live behind this trait.

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use objql_ir::{Row, Value};

/// A driver-level failure.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct DriverError {
    /// Driver-provided description.
    pub message: String,
}

impl DriverError {
    /// Create a driver error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Executes parameterized SQL against the physical database.
///
/// Implementations must be safe to share across concurrent queries; the
/// engine assumes any underlying pool is itself thread-safe. The
/// cancellation token is the per-call token — drivers should abort in-flight
/// work when it fires.
#[async_trait]
pub trait QueryDriver: Send + Sync {
    /// Execute a statement and return all rows.
    async fn execute(
        &self,
        sql: &str,
        params: &[(String, Value)],
        cancel: &CancellationToken,
    ) -> Result<Vec<Row>, DriverError>;

    /// Execute a statement and yield rows lazily.
    ///
    /// The default implementation buffers through [`QueryDriver::execute`];
    /// drivers with native cursors should override it.
    async fn execute_streaming(
        &self,
        sql: &str,
        params: &[(String, Value)],
        cancel: &CancellationToken,
    ) -> Result<BoxStream<'static, Result<Row, DriverError>>, DriverError> {
        let rows = self.execute(sql, params, cancel).await?;
        Ok(Box::pin(futures::stream::iter(rows.into_iter().map(Ok))))
    }
}
