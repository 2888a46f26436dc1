//! The public query engine surface.
//!
//! One call runs the whole pipeline: parse → join resolution → RLS rewrite →
//! hash → cache probes → optimize → generate → execute. The security context
//! is passed explicitly per call; a per-call cancellation token propagates
//! into the driver and the parallel fan-out, and timeouts are deadlines
//! armed on that token.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use objql_ir::{Query, Row};

use crate::catalog::{MetadataProvider, StatisticsProvider};
use crate::config::EngineConfig;
use crate::driver::QueryDriver;
use crate::error::Error;
use crate::mapper::FromRow;
use crate::query::{
    resolve_joins, Optimizer, Plan, PlanCache, PlanCacheStatistics, QueryExecutor, QueryHash,
    ResultCache, ResultCacheStatistics,
};
use crate::security::{
    AccessMode, AccessPolicy, PolicyRegistry, RlsEnforcer, SecurityContext, SecurityError,
};

/// How often the background sweeper evicts expired cache entries.
pub const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Combined cache statistics.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStatisticsReport {
    /// Plan cache statistics.
    pub plans: PlanCacheStatistics,
    /// Result cache statistics.
    pub results: ResultCacheStatistics,
}

/// Execution details attached to a [`QueryOutcome`].
#[derive(Debug, Clone, Default)]
pub struct OutcomeMetadata {
    /// Plan id, when a plan was produced or reused.
    pub plan_id: Option<String>,
    /// Whether the plan came from the plan cache.
    pub plan_cache_hit: bool,
    /// Whether the rows came from the result cache.
    pub result_cache_hit: bool,
}

/// The instrumented result of [`QueryEngine::execute`].
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    /// Result rows (empty on failure).
    pub records: Vec<Row>,
    /// Whether the call succeeded.
    pub success: bool,
    /// The error message on failure.
    pub error: Option<String>,
    /// Wall-clock duration of the call.
    pub execution_time: Duration,
    /// Number of rows returned.
    pub record_count: usize,
    /// Execution details.
    pub metadata: OutcomeMetadata,
}

struct RunOutput {
    rows: Vec<Row>,
    plan_id: Option<String>,
    plan_cache_hit: bool,
    result_cache_hit: bool,
}

/// The query engine.
pub struct QueryEngine {
    driver: Arc<dyn QueryDriver>,
    metadata: Arc<dyn MetadataProvider>,
    statistics: Arc<dyn StatisticsProvider>,
    enforcer: RlsEnforcer,
    plan_cache: PlanCache,
    result_cache: ResultCache,
    config: EngineConfig,
}

impl QueryEngine {
    /// Create an engine with the default configuration and default RLS
    /// policies.
    pub fn new(
        driver: Arc<dyn QueryDriver>,
        metadata: Arc<dyn MetadataProvider>,
        statistics: Arc<dyn StatisticsProvider>,
    ) -> Self {
        Self::with_config(driver, metadata, statistics, EngineConfig::default())
    }

    /// Create an engine with an explicit configuration.
    pub fn with_config(
        driver: Arc<dyn QueryDriver>,
        metadata: Arc<dyn MetadataProvider>,
        statistics: Arc<dyn StatisticsProvider>,
        config: EngineConfig,
    ) -> Self {
        Self {
            plan_cache: PlanCache::new(config.plan_cache_size, config.plan_cache_ttl),
            result_cache: ResultCache::new(
                config.result_cache_size,
                config.result_cache_ttl,
                config.max_result_cache_rows,
            ),
            enforcer: RlsEnforcer::default(),
            driver,
            metadata,
            statistics,
            config,
        }
    }

    /// Replace the policy registry.
    pub fn with_policies(mut self, registry: PolicyRegistry) -> Self {
        self.enforcer = RlsEnforcer::new(registry);
        self
    }

    /// Register a policy for an object (or `"*"`).
    pub fn register_policy(&mut self, object: impl Into<String>, policy: Arc<dyn AccessPolicy>) {
        self.enforcer.registry_mut().register(object, policy);
    }

    /// Run a query and return untyped rows.
    #[instrument(skip_all, fields(user = %context.user_id))]
    pub async fn query(
        &self,
        dsql: &str,
        context: &SecurityContext,
    ) -> Result<Vec<Row>, Error> {
        self.query_with_cancel(dsql, context, &CancellationToken::new())
            .await
    }

    /// Run a query under a caller-supplied cancellation token.
    pub async fn query_with_cancel(
        &self,
        dsql: &str,
        context: &SecurityContext,
        cancel: &CancellationToken,
    ) -> Result<Vec<Row>, Error> {
        Ok(self.run(dsql, context, cancel).await?.rows)
    }

    /// Run a query with a deadline; the deadline cancels in-flight work.
    pub async fn query_with_timeout(
        &self,
        dsql: &str,
        context: &SecurityContext,
        timeout: Duration,
    ) -> Result<Vec<Row>, Error> {
        let cancel = CancellationToken::new();
        tokio::select! {
            result = self.query_with_cancel(dsql, context, &cancel) => result,
            _ = tokio::time::sleep(timeout) => {
                cancel.cancel();
                Err(Error::Timeout(timeout))
            }
        }
    }

    /// Run a query and map rows into typed records.
    pub async fn query_as<T: FromRow>(
        &self,
        dsql: &str,
        context: &SecurityContext,
    ) -> Result<Vec<T>, Error> {
        let rows = self.query(dsql, context).await?;
        rows.iter().map(T::from_row).collect()
    }

    /// Run a query and report the outcome instead of failing.
    #[instrument(skip_all, fields(user = %context.user_id))]
    pub async fn execute(&self, dsql: &str, context: &SecurityContext) -> QueryOutcome {
        self.execute_with_cancel(dsql, context, &CancellationToken::new())
            .await
    }

    /// Instrumented execution under a caller-supplied cancellation token.
    pub async fn execute_with_cancel(
        &self,
        dsql: &str,
        context: &SecurityContext,
        cancel: &CancellationToken,
    ) -> QueryOutcome {
        let started = Instant::now();
        match self.run(dsql, context, cancel).await {
            Ok(output) => QueryOutcome {
                record_count: output.rows.len(),
                records: output.rows,
                success: true,
                error: None,
                execution_time: started.elapsed(),
                metadata: OutcomeMetadata {
                    plan_id: output.plan_id,
                    plan_cache_hit: output.plan_cache_hit,
                    result_cache_hit: output.result_cache_hit,
                },
            },
            Err(error) => {
                warn!(%error, "query failed");
                QueryOutcome {
                    records: Vec::new(),
                    success: false,
                    error: Some(error.to_string()),
                    execution_time: started.elapsed(),
                    record_count: 0,
                    metadata: OutcomeMetadata::default(),
                }
            }
        }
    }

    /// Plan a query without executing it.
    pub fn explain(&self, dsql: &str, context: &SecurityContext) -> Result<Plan, Error> {
        let query = self.prepare(dsql, context)?;
        Optimizer::new(&*self.metadata, &*self.statistics).optimize(query)
    }

    /// Check a record against the applicable policies, raising
    /// `SecurityError` when none grants access.
    pub fn validate_record_access(
        &self,
        object: &str,
        record: &Row,
        mode: AccessMode,
        context: &SecurityContext,
    ) -> Result<(), Error> {
        let metadata = self.metadata.object(object)?;
        if self.enforcer.validate(&metadata, record, mode, context)? {
            Ok(())
        } else {
            Err(SecurityError::AccessDenied(format!(
                "no policy grants {:?} access to '{}' for user '{}'",
                mode, object, context.user_id
            ))
            .into())
        }
    }

    /// Drop cached plans and results that depend on an object.
    pub fn invalidate_cache(&self, object: &str) {
        let plans = self.plan_cache.invalidate_object(object);
        let results = self.result_cache.invalidate_object(object);
        debug!(object, plans, results, "invalidated cache entries");
    }

    /// Drop all cached plans and results.
    pub fn clear_caches(&self) {
        self.plan_cache.clear();
        self.result_cache.clear();
    }

    /// Current cache statistics.
    pub fn cache_statistics(&self) -> CacheStatisticsReport {
        CacheStatisticsReport {
            plans: self.plan_cache.statistics(),
            results: self.result_cache.statistics(),
        }
    }

    /// Spawn the periodic TTL sweeper for both caches.
    pub fn spawn_cache_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(CACHE_SWEEP_INTERVAL);
            loop {
                ticker.tick().await;
                let plans = engine.plan_cache.sweep_expired();
                let results = engine.result_cache.sweep_expired();
                if plans + results > 0 {
                    debug!(plans, results, "swept expired cache entries");
                }
            }
        })
    }

    /// Parse, resolve joins, and apply RLS.
    fn prepare(&self, dsql: &str, context: &SecurityContext) -> Result<Query, Error> {
        let mut query = objql_lang::parse(dsql)?;
        resolve_joins(&mut query, &*self.metadata, &*self.statistics)?;
        if self.config.enable_rls {
            let metadata = self.metadata.object(&query.from_object)?;
            query = self.enforcer.apply(query, &metadata, context)?;
        }
        Ok(query)
    }

    async fn run(
        &self,
        dsql: &str,
        context: &SecurityContext,
        cancel: &CancellationToken,
    ) -> Result<RunOutput, Error> {
        let query = self.prepare(dsql, context)?;
        let key = QueryHash::compute(&query, self.config.enable_rls.then_some(context));

        if self.config.enable_result_cache {
            if let Some(rows) = self.result_cache.get(&key) {
                debug!(key = %key, "result cache hit");
                return Ok(RunOutput {
                    rows: rows.as_ref().clone(),
                    plan_id: None,
                    plan_cache_hit: false,
                    result_cache_hit: true,
                });
            }
        }
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let (plan, plan_cache_hit) = self.plan(query, &key)?;

        let executor = QueryExecutor::new(&*self.driver, &*self.metadata, self.config.dialect);
        let parallel = self
            .config
            .enable_parallel
            .then_some(self.config.max_parallel_degree);
        let rows = executor.run(&plan, cancel, parallel).await?;

        if self.config.enable_result_cache {
            self.result_cache
                .insert(key, rows.clone(), plan.query.referenced_objects());
        }

        Ok(RunOutput {
            rows,
            plan_id: Some(plan.plan_id.clone()),
            plan_cache_hit,
            result_cache_hit: false,
        })
    }

    fn plan(&self, query: Query, key: &QueryHash) -> Result<(Arc<Plan>, bool), Error> {
        if self.config.enable_plan_cache {
            if let Some(plan) = self.plan_cache.get(key) {
                return Ok((plan, true));
            }
        }
        let plan = Arc::new(Optimizer::new(&*self.metadata, &*self.statistics).optimize(query)?);
        if self.config.enable_plan_cache {
            self.plan_cache.insert(key.clone(), Arc::clone(&plan));
        }
        Ok((plan, false))
    }
}
