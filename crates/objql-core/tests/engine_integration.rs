//! End-to-end tests for the query engine pipeline.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use objql_core::ir::{CompareOp, Condition, LogicalOp, Row, Value};
use objql_core::query::FilterEvaluator;
use objql_core::{
    AccessMode, DataType, DriverError, EngineConfig, Error, FieldMetadata, FromRow,
    ObjectMetadata, QueryDriver, QueryEngine, Relationship, SecurityContext, SqlDialect,
    StaticCatalog,
};

type Handler = Box<dyn Fn(&str) -> Result<Vec<Row>, DriverError> + Send + Sync>;

/// Driver that records every statement and answers from a handler.
struct ScriptedDriver {
    handler: Handler,
    calls: Mutex<Vec<(String, Vec<(String, Value)>)>>,
}

impl ScriptedDriver {
    fn new(handler: impl Fn(&str) -> Result<Vec<Row>, DriverError> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn empty() -> Arc<Self> {
        Self::new(|_| Ok(Vec::new()))
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn last_sql(&self) -> String {
        self.calls.lock().unwrap().last().unwrap().0.clone()
    }

    fn last_params(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().last().unwrap().1.clone()
    }

    fn statements(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(sql, _)| sql.clone()).collect()
    }
}

#[async_trait]
impl QueryDriver for ScriptedDriver {
    async fn execute(
        &self,
        sql: &str,
        params: &[(String, Value)],
        _cancel: &CancellationToken,
    ) -> Result<Vec<Row>, DriverError> {
        self.calls
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));
        (self.handler)(sql)
    }
}

/// Driver that stalls until cancelled.
struct StalledDriver;

#[async_trait]
impl QueryDriver for StalledDriver {
    async fn execute(
        &self,
        _sql: &str,
        _params: &[(String, Value)],
        cancel: &CancellationToken,
    ) -> Result<Vec<Row>, DriverError> {
        cancel.cancelled().await;
        Err(DriverError::new("aborted"))
    }
}

fn row(pairs: &[(&str, Value)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// CRM-shaped catalog shared by most tests.
fn crm_catalog() -> Arc<StaticCatalog> {
    Arc::new(
        StaticCatalog::new()
            .with_object(
                ObjectMetadata::new("Account", "accounts")
                    .with_field(
                        FieldMetadata::new("Id", "id", DataType::Id)
                            .indexed()
                            .required()
                            .with_selectivity(0.001),
                    )
                    .with_field(
                        FieldMetadata::new("Name", "name", DataType::Text)
                            .indexed()
                            .with_selectivity(0.1),
                    )
                    .with_field(FieldMetadata::new(
                        "AnnualRevenue",
                        "annual_revenue",
                        DataType::Double,
                    ))
                    .with_field(FieldMetadata::new("owner_id", "owner_id", DataType::Id))
                    .with_field(FieldMetadata::new(
                        "territory_id",
                        "territory_id",
                        DataType::Id,
                    ))
                    .rls_enabled()
                    .with_row_count(5_000),
            )
            .with_object(
                ObjectMetadata::new("Contact", "contacts")
                    .with_field(FieldMetadata::new("Id", "id", DataType::Id).indexed())
                    .with_field(FieldMetadata::new("Email", "email", DataType::Text))
                    .with_field(FieldMetadata::new("AccountId", "account_id", DataType::Id))
                    .with_relationship(Relationship::lookup("Account", "Account", "AccountId", "Id"))
                    .with_row_count(20_000),
            )
            .with_object(
                ObjectMetadata::new("Opportunity", "opportunities")
                    .with_field(FieldMetadata::new("Id", "id", DataType::Id))
                    .with_field(FieldMetadata::new("StageName", "stage_name", DataType::Text))
                    .with_row_count(900),
            )
            .with_object(
                ObjectMetadata::new("Share", "shares")
                    .with_field(FieldMetadata::new("record_id", "record_id", DataType::Id))
                    .with_field(FieldMetadata::new(
                        "user_or_group_id",
                        "user_or_group_id",
                        DataType::Id,
                    ))
                    .with_row_count(40_000),
            )
            .with_object(
                ObjectMetadata::new("UserRoleHierarchy", "user_role_hierarchy")
                    .with_field(FieldMetadata::new(
                        "subordinate_user_id",
                        "subordinate_user_id",
                        DataType::Id,
                    ))
                    .with_field(FieldMetadata::new(
                        "supervisor_user_id",
                        "supervisor_user_id",
                        DataType::Id,
                    ))
                    .with_row_count(300),
            ),
    )
}

fn engine_with(
    driver: Arc<dyn QueryDriver>,
    catalog: Arc<StaticCatalog>,
    config: EngineConfig,
) -> QueryEngine {
    QueryEngine::with_config(driver, catalog.clone(), catalog, config)
}

fn user() -> SecurityContext {
    SecurityContext::new("u1")
}

#[tokio::test]
async fn postgres_select_generates_expected_sql_and_params() {
    let driver = ScriptedDriver::empty();
    let engine = engine_with(
        driver.clone(),
        crm_catalog(),
        EngineConfig::new(SqlDialect::Postgres).with_rls(false),
    );

    engine
        .query("SELECT Id, Name FROM Account WHERE Name = 'Acme'", &user())
        .await
        .unwrap();

    assert_eq!(
        driver.last_sql(),
        "SELECT t0.\"id\", t0.\"name\" FROM \"accounts\" t0 WHERE t0.\"name\" = @p0"
    );
    assert_eq!(
        driver.last_params(),
        vec![("p0".to_string(), Value::String("Acme".into()))]
    );
}

#[tokio::test]
async fn dotted_reference_joins_and_qualifies_columns() {
    let driver = ScriptedDriver::empty();
    let engine = engine_with(
        driver.clone(),
        crm_catalog(),
        EngineConfig::new(SqlDialect::Postgres).with_rls(false),
    );

    engine
        .query("SELECT Id, Account.Name FROM Contact", &user())
        .await
        .unwrap();

    let sql = driver.last_sql();
    assert!(sql.contains("LEFT JOIN \"accounts\" t1 ON t0.\"account_id\" = t1.\"id\""));
    assert!(sql.contains("t1.\"name\""));
}

#[tokio::test]
async fn aggregate_query_plans_and_generates_group_having() {
    let driver = ScriptedDriver::empty();
    let engine = engine_with(
        driver.clone(),
        crm_catalog(),
        EngineConfig::new(SqlDialect::Postgres).with_rls(false),
    );

    let dsql =
        "SELECT StageName, COUNT(Id) FROM Opportunity GROUP BY StageName HAVING COUNT(Id) > 5";
    let plan = engine.explain(dsql, &user()).unwrap();
    assert!(plan.query.is_aggregate());
    assert_eq!(plan.query.group_by, vec!["StageName"]);
    assert!(plan.use_hash_aggregation);
    match plan.query.having.as_ref().unwrap() {
        Condition::Compare { op, value, .. } => {
            assert_eq!(*op, CompareOp::Gt);
            assert_eq!(*value, Value::Int(5));
        }
        other => panic!("expected Compare, got {:?}", other),
    }

    engine.query(dsql, &user()).await.unwrap();
    let sql = driver.last_sql();
    assert!(sql.contains("GROUP BY t0.\"stage_name\""));
    assert!(sql.contains("HAVING COUNT(t0.\"id\") > @p0"));
}

#[tokio::test]
async fn mssql_limit_without_order_pages_from_zero() {
    let driver = ScriptedDriver::empty();
    let engine = engine_with(
        driver.clone(),
        crm_catalog(),
        EngineConfig::new(SqlDialect::Mssql).with_rls(false),
    );

    engine
        .query("SELECT Id FROM Account LIMIT 10", &user())
        .await
        .unwrap();

    assert!(driver
        .last_sql()
        .contains("OFFSET 0 ROWS FETCH NEXT 10 ROWS ONLY"));
}

#[tokio::test]
async fn rls_composes_policies_under_the_user_filter() {
    let driver = ScriptedDriver::empty();
    let engine = engine_with(
        driver.clone(),
        crm_catalog(),
        EngineConfig::new(SqlDialect::Postgres),
    );
    let context = user().with_territory("t-1");

    let plan = engine
        .explain(
            "SELECT Id FROM Account WHERE AnnualRevenue > 100",
            &context,
        )
        .unwrap();

    // (user filter) AND (owner OR shared OR hierarchy OR territory).
    match plan.query.filter.as_ref().unwrap() {
        Condition::Logical { op, left, right } => {
            assert_eq!(*op, LogicalOp::And);
            assert_eq!(**left, Condition::gt("AnnualRevenue", 100i64));
            assert_eq!(or_leaves(right), 5);
        }
        other => panic!("expected Logical, got {:?}", other),
    }

    engine
        .query("SELECT Id FROM Account WHERE AnnualRevenue > 100", &context)
        .await
        .unwrap();
    let sql = driver.last_sql();
    assert!(sql.contains("t0.\"annual_revenue\" > @p0"));
    assert!(sql.contains("t0.\"owner_id\" = @p1"));
    assert!(sql.contains("IN (SELECT t0.\"record_id\" FROM \"shares\" t0"));
    assert!(sql.contains("IN (SELECT t0.\"subordinate_user_id\" FROM \"user_role_hierarchy\" t0"));
    assert!(sql.contains("t0.\"territory_id\" IN ("));
}

#[tokio::test]
async fn admin_queries_skip_rls_predicates() {
    let driver = ScriptedDriver::empty();
    let engine = engine_with(
        driver.clone(),
        crm_catalog(),
        EngineConfig::new(SqlDialect::Postgres),
    );

    engine
        .query("SELECT Id FROM Account", &SecurityContext::admin("root"))
        .await
        .unwrap();

    let sql = driver.last_sql();
    assert!(!sql.contains("owner_id"));
    assert!(!sql.contains("WHERE"));
}

#[tokio::test]
async fn enforced_filter_is_a_subset_of_the_original() {
    let engine = engine_with(
        ScriptedDriver::empty(),
        crm_catalog(),
        EngineConfig::new(SqlDialect::Postgres),
    );

    let original = Condition::gt("AnnualRevenue", 100i64);
    let enforced = engine
        .explain("SELECT Id FROM Account WHERE AnnualRevenue > 100", &user())
        .unwrap()
        .query
        .filter
        .unwrap();

    let owned_rich = row(&[
        ("AnnualRevenue", Value::Int(200)),
        ("owner_id", Value::String("u1".into())),
    ]);
    let owned_poor = row(&[
        ("AnnualRevenue", Value::Int(50)),
        ("owner_id", Value::String("u1".into())),
    ]);
    let foreign_rich = row(&[
        ("AnnualRevenue", Value::Int(200)),
        ("owner_id", Value::String("u2".into())),
    ]);

    for record in [&owned_rich, &owned_poor, &foreign_rich] {
        let passes_enforced = FilterEvaluator::evaluate(&enforced, record).unwrap();
        let passes_original = FilterEvaluator::evaluate(&original, record).unwrap();
        // Monotonicity: everything visible after enforcement was visible before.
        assert!(!passes_enforced || passes_original);
    }
    assert!(FilterEvaluator::evaluate(&enforced, &owned_rich).unwrap());
    assert!(!FilterEvaluator::evaluate(&enforced, &foreign_rich).unwrap());
}

#[tokio::test]
async fn join_reordering_picks_the_cheapest_order() {
    let catalog = Arc::new(
        StaticCatalog::new()
            .with_object(
                ObjectMetadata::new("Base", "base")
                    .with_field(FieldMetadata::new("Id", "id", DataType::Id))
                    .with_field(
                        FieldMetadata::new("AId", "a_id", DataType::Id).with_selectivity(1.0),
                    )
                    .with_field(
                        FieldMetadata::new("BId", "b_id", DataType::Id).with_selectivity(0.01),
                    )
                    .with_field(
                        FieldMetadata::new("CId", "c_id", DataType::Id).with_selectivity(0.1),
                    )
                    .with_relationship(Relationship::lookup("a", "A", "AId", "Id"))
                    .with_relationship(Relationship::lookup("b", "B", "BId", "Id"))
                    .with_relationship(Relationship::lookup("c", "C", "CId", "Id"))
                    .with_row_count(1_000),
            )
            .with_object(big_target("A", 1_000_000))
            .with_object(big_target("B", 100))
            .with_object(big_target("C", 10_000)),
    );
    let engine = engine_with(
        ScriptedDriver::empty(),
        catalog,
        EngineConfig::new(SqlDialect::Mock).with_rls(false),
    );

    let plan = engine
        .explain("SELECT a.Name, b.Name, c.Name FROM Base", &user())
        .unwrap();
    let order: Vec<&str> = plan
        .join_order
        .iter()
        .map(|j| j.relationship.as_str())
        .collect();
    assert_eq!(order, vec!["b", "c", "a"]);
}

fn big_target(name: &str, rows: u64) -> ObjectMetadata {
    ObjectMetadata::new(name, name.to_lowercase())
        .with_field(FieldMetadata::new("Id", "id", DataType::Id))
        .with_field(FieldMetadata::new("Name", "name", DataType::Text))
        .with_row_count(rows)
}

#[tokio::test]
async fn repeated_queries_hit_the_plan_cache() {
    let engine = engine_with(
        ScriptedDriver::empty(),
        crm_catalog(),
        EngineConfig::new(SqlDialect::Postgres).with_rls(false),
    );

    let first = engine.execute("SELECT Id FROM Account", &user()).await;
    assert!(first.success);
    assert!(!first.metadata.plan_cache_hit);

    let second = engine.execute("SELECT Id FROM Account", &user()).await;
    assert!(second.metadata.plan_cache_hit);
    assert_eq!(first.metadata.plan_id, second.metadata.plan_id);

    let stats = engine.cache_statistics();
    assert_eq!(stats.plans.total_entries, 1);
    assert_eq!(stats.plans.total_hits, 1);
}

#[tokio::test]
async fn result_cache_round_trip_and_object_invalidation() {
    let driver = ScriptedDriver::new(|_| {
        Ok(vec![row(&[("id", Value::String("001".into()))])])
    });
    let engine = engine_with(
        driver.clone(),
        crm_catalog(),
        EngineConfig::new(SqlDialect::Postgres)
            .with_rls(false)
            .with_result_cache(true),
    );

    let first = engine.execute("SELECT Id FROM Account", &user()).await;
    assert!(first.success);
    assert!(!first.metadata.result_cache_hit);
    assert_eq!(driver.call_count(), 1);

    let second = engine.execute("SELECT Id FROM Account", &user()).await;
    assert!(second.metadata.result_cache_hit);
    assert_eq!(second.records, first.records);
    assert_eq!(driver.call_count(), 1);

    engine.invalidate_cache("Account");
    let third = engine.execute("SELECT Id FROM Account", &user()).await;
    assert!(!third.metadata.result_cache_hit);
    assert_eq!(driver.call_count(), 2);
}

#[tokio::test]
async fn oversized_results_bypass_the_result_cache() {
    let driver = ScriptedDriver::new(|_| {
        Ok((0..5)
            .map(|i| row(&[("id", Value::Int(i))]))
            .collect())
    });
    let engine = engine_with(
        driver.clone(),
        crm_catalog(),
        EngineConfig::new(SqlDialect::Postgres)
            .with_rls(false)
            .with_result_cache(true)
            .with_max_result_cache_rows(3),
    );

    engine.query("SELECT Id FROM Account", &user()).await.unwrap();
    engine.query("SELECT Id FROM Account", &user()).await.unwrap();
    assert_eq!(driver.call_count(), 2);
}

#[tokio::test]
async fn per_user_cache_keys_do_not_leak_across_identities() {
    let driver = ScriptedDriver::new(|_| {
        Ok(vec![row(&[("id", Value::String("001".into()))])])
    });
    let engine = engine_with(
        driver.clone(),
        crm_catalog(),
        EngineConfig::new(SqlDialect::Postgres).with_result_cache(true),
    );

    engine
        .query("SELECT Id FROM Account", &user())
        .await
        .unwrap();
    engine
        .query("SELECT Id FROM Account", &SecurityContext::new("u2"))
        .await
        .unwrap();

    // Different identities must not share cached rows.
    assert_eq!(driver.call_count(), 2);
}

#[tokio::test]
async fn literals_never_reach_the_statement_text() {
    let driver = ScriptedDriver::empty();
    let engine = engine_with(
        driver.clone(),
        crm_catalog(),
        EngineConfig::new(SqlDialect::Postgres).with_rls(false),
    );

    engine
        .query(
            "SELECT Id FROM Account WHERE Name = 'Acme' AND AnnualRevenue > 31337 AND Name LIKE '%classified%'",
            &user(),
        )
        .await
        .unwrap();

    let sql = driver.last_sql();
    assert!(!sql.contains("Acme"));
    assert!(!sql.contains("31337"));
    assert!(!sql.contains("classified"));
    assert_eq!(driver.last_params().len(), 3);
}

#[tokio::test]
async fn cancelled_token_aborts_before_the_driver_runs() {
    let driver = ScriptedDriver::empty();
    let engine = engine_with(
        driver.clone(),
        crm_catalog(),
        EngineConfig::new(SqlDialect::Postgres).with_rls(false),
    );

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = engine
        .query_with_cancel("SELECT Id FROM Account", &user(), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    assert_eq!(driver.call_count(), 0);
}

#[tokio::test]
async fn deadline_cancels_a_stalled_driver() {
    let engine = engine_with(
        Arc::new(StalledDriver),
        crm_catalog(),
        EngineConfig::new(SqlDialect::Postgres).with_rls(false),
    );

    let err = engine
        .query_with_timeout("SELECT Id FROM Account", &user(), Duration::from_millis(20))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout(_)));
}

#[tokio::test]
async fn driver_failures_wrap_the_generated_statement() {
    let driver = ScriptedDriver::new(|_| Err(DriverError::new("relation missing")));
    let engine = engine_with(
        driver,
        crm_catalog(),
        EngineConfig::new(SqlDialect::Postgres).with_rls(false),
    );

    let err = engine.query("SELECT Id FROM Account", &user()).await.unwrap_err();
    match err {
        Error::Sql { message, sql } => {
            assert_eq!(message, "relation missing");
            assert!(sql.contains("FROM \"accounts\""));
        }
        other => panic!("expected Sql, got {:?}", other),
    }
}

#[tokio::test]
async fn execute_reports_failures_instead_of_panicking() {
    let engine = engine_with(
        ScriptedDriver::empty(),
        crm_catalog(),
        EngineConfig::new(SqlDialect::Postgres).with_rls(false),
    );

    let outcome = engine.execute("SELEC Id FROM Account", &user()).await;
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("parse error"));
    assert_eq!(outcome.record_count, 0);
}

#[tokio::test]
async fn record_access_validation_uses_policies() {
    let engine = engine_with(
        ScriptedDriver::empty(),
        crm_catalog(),
        EngineConfig::new(SqlDialect::Postgres),
    );

    let owned = row(&[("owner_id", Value::String("u1".into()))]);
    engine
        .validate_record_access("Account", &owned, AccessMode::Read, &user())
        .unwrap();

    let foreign = row(&[("owner_id", Value::String("u2".into()))]);
    let err = engine
        .validate_record_access("Account", &foreign, AccessMode::Read, &user())
        .unwrap_err();
    assert!(matches!(err, Error::Security(_)));
}

struct AccountRecord {
    id: String,
}

impl FromRow for AccountRecord {
    fn from_row(r: &Row) -> Result<Self, Error> {
        let id = r
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::mapping("missing 'id'"))?;
        Ok(AccountRecord { id: id.to_string() })
    }
}

#[tokio::test]
async fn typed_queries_map_rows() {
    let driver = ScriptedDriver::new(|_| {
        Ok(vec![
            row(&[("id", Value::String("001".into()))]),
            row(&[("id", Value::String("002".into()))]),
        ])
    });
    let engine = engine_with(
        driver,
        crm_catalog(),
        EngineConfig::new(SqlDialect::Postgres).with_rls(false),
    );

    let accounts: Vec<AccountRecord> = engine
        .query_as("SELECT Id FROM Account", &user())
        .await
        .unwrap();
    assert_eq!(accounts.len(), 2);
    assert_eq!(accounts[0].id, "001");
}

#[tokio::test]
async fn parallel_relationship_loading_merges_children_in_parent_order() {
    let catalog = Arc::new(
        StaticCatalog::new()
            .with_object(
                ObjectMetadata::new("Ticket", "tickets")
                    .with_field(FieldMetadata::new("Id", "id", DataType::Id))
                    .with_field(FieldMetadata::new("OwnerId", "owner_ref", DataType::Id))
                    .with_field(FieldMetadata::new("QueueId", "queue_id", DataType::Id))
                    .with_relationship(Relationship::lookup("Owner", "Agent", "OwnerId", "Id"))
                    .with_relationship(Relationship::lookup("Queue", "Queue", "QueueId", "Id"))
                    .with_row_count(100_000),
            )
            .with_object(
                ObjectMetadata::new("Agent", "agents")
                    .with_field(FieldMetadata::new("Id", "id", DataType::Id))
                    .with_field(FieldMetadata::new("Name", "name", DataType::Text))
                    .with_row_count(50),
            )
            .with_object(
                ObjectMetadata::new("Queue", "queues")
                    .with_field(FieldMetadata::new("Id", "id", DataType::Id))
                    .with_field(FieldMetadata::new("Label", "label", DataType::Text))
                    .with_row_count(10),
            ),
    );

    let driver = ScriptedDriver::new(|sql| {
        if sql.contains("FROM tickets") {
            Ok(vec![
                row(&[
                    ("id", Value::String("t1".into())),
                    ("owner_ref", Value::String("a1".into())),
                    ("queue_id", Value::String("q1".into())),
                ]),
                row(&[
                    ("id", Value::String("t2".into())),
                    ("owner_ref", Value::String("a2".into())),
                    ("queue_id", Value::String("q1".into())),
                ]),
            ])
        } else if sql.contains("FROM agents") {
            Ok(vec![
                row(&[("id", Value::String("a1".into())), ("name", Value::String("Avery".into()))]),
                row(&[("id", Value::String("a2".into())), ("name", Value::String("Blake".into()))]),
            ])
        } else if sql.contains("FROM queues") {
            Ok(vec![row(&[
                ("id", Value::String("q1".into())),
                ("label", Value::String("Support".into())),
            ])])
        } else {
            Err(DriverError::new(format!("unexpected statement: {}", sql)))
        }
    });

    let engine = engine_with(
        driver.clone(),
        catalog,
        EngineConfig::new(SqlDialect::Mock).with_rls(false),
    );

    let rows = engine
        .query("SELECT Id, Owner.Name, Queue.Label FROM Ticket", &user())
        .await
        .unwrap();

    // One base statement plus one per relationship.
    assert_eq!(driver.call_count(), 3);
    let statements = driver.statements();
    assert!(statements[0].contains("FROM tickets"));
    assert!(!statements[0].contains("JOIN"));

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["id"], Value::String("t1".into()));
    assert_eq!(rows[0]["Owner.name"], Value::String("Avery".into()));
    assert_eq!(rows[0]["Queue.label"], Value::String("Support".into()));
    assert_eq!(rows[1]["id"], Value::String("t2".into()));
    assert_eq!(rows[1]["Owner.name"], Value::String("Blake".into()));
}

#[tokio::test]
async fn clear_caches_empties_both_caches() {
    let engine = engine_with(
        ScriptedDriver::empty(),
        crm_catalog(),
        EngineConfig::new(SqlDialect::Postgres)
            .with_rls(false)
            .with_result_cache(true),
    );

    engine.query("SELECT Id FROM Account", &user()).await.unwrap();
    assert_eq!(engine.cache_statistics().plans.total_entries, 1);

    engine.clear_caches();
    let stats = engine.cache_statistics();
    assert_eq!(stats.plans.total_entries, 0);
    assert_eq!(stats.results.total_entries, 0);
}

fn or_leaves(condition: &Condition) -> usize {
    match condition {
        Condition::Logical {
            op: LogicalOp::Or,
            left,
            right,
        } => or_leaves(left) + or_leaves(right),
        _ => 1,
    }
}
