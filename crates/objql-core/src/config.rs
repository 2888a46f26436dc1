//! Engine configuration.

use std::time::Duration;

use crate::sql::SqlDialect;

/// Default plan cache capacity.
pub const DEFAULT_PLAN_CACHE_SIZE: usize = 1000;

/// Default plan cache TTL (1 hour).
pub const DEFAULT_PLAN_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Default result cache capacity.
pub const DEFAULT_RESULT_CACHE_SIZE: usize = 100;

/// Default result cache TTL (5 minutes).
pub const DEFAULT_RESULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Result sets larger than this are never cached.
pub const DEFAULT_MAX_RESULT_CACHE_ROWS: usize = 1000;

/// Default upper bound on parallel relationship fetches.
pub const DEFAULT_MAX_PARALLEL_DEGREE: usize = 4;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Target SQL dialect.
    pub dialect: SqlDialect,

    /// Apply the RLS enforcer to every query.
    pub enable_rls: bool,

    /// Memoize optimized plans.
    pub enable_plan_cache: bool,

    /// Memoize result sets up to `max_result_cache_rows`.
    pub enable_result_cache: bool,

    /// Plan cache capacity.
    pub plan_cache_size: usize,

    /// Plan cache entry TTL.
    pub plan_cache_ttl: Duration,

    /// Result cache capacity.
    pub result_cache_size: usize,

    /// Result cache entry TTL.
    pub result_cache_ttl: Duration,

    /// Largest result set (in rows) the result cache will hold.
    pub max_result_cache_rows: usize,

    /// Allow the parallel relationship-loading strategy.
    pub enable_parallel: bool,

    /// Cap on concurrent relationship fetches.
    pub max_parallel_degree: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dialect: SqlDialect::Postgres,
            enable_rls: true,
            enable_plan_cache: true,
            enable_result_cache: false,
            plan_cache_size: DEFAULT_PLAN_CACHE_SIZE,
            plan_cache_ttl: DEFAULT_PLAN_CACHE_TTL,
            result_cache_size: DEFAULT_RESULT_CACHE_SIZE,
            result_cache_ttl: DEFAULT_RESULT_CACHE_TTL,
            max_result_cache_rows: DEFAULT_MAX_RESULT_CACHE_ROWS,
            enable_parallel: true,
            max_parallel_degree: DEFAULT_MAX_PARALLEL_DEGREE,
        }
    }
}

impl EngineConfig {
    /// Create a configuration for the given dialect with all other defaults.
    pub fn new(dialect: SqlDialect) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    /// Enable or disable RLS enforcement.
    pub fn with_rls(mut self, enabled: bool) -> Self {
        self.enable_rls = enabled;
        self
    }

    /// Enable or disable the result cache.
    pub fn with_result_cache(mut self, enabled: bool) -> Self {
        self.enable_result_cache = enabled;
        self
    }

    /// Set the largest cacheable result set.
    pub fn with_max_result_cache_rows(mut self, rows: usize) -> Self {
        self.max_result_cache_rows = rows;
        self
    }

    /// Cap concurrent relationship fetches.
    pub fn with_max_parallel_degree(mut self, degree: usize) -> Self {
        self.max_parallel_degree = degree.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.plan_cache_size, 1000);
        assert_eq!(config.plan_cache_ttl, Duration::from_secs(3600));
        assert_eq!(config.result_cache_size, 100);
        assert_eq!(config.result_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.max_result_cache_rows, 1000);
        assert_eq!(config.max_parallel_degree, 4);
        assert!(config.enable_rls);
        assert!(config.enable_plan_cache);
        assert!(!config.enable_result_cache);
    }

    #[test]
    fn test_builders() {
        let config = EngineConfig::new(SqlDialect::Mssql)
            .with_rls(false)
            .with_result_cache(true)
            .with_max_parallel_degree(0);
        assert_eq!(config.dialect, SqlDialect::Mssql);
        assert!(!config.enable_rls);
        assert!(config.enable_result_cache);
        assert_eq!(config.max_parallel_degree, 1);
    }
}
