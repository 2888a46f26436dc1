//! Plan execution against the driver.
//!
//! The common path generates one joined statement and hands it to the
//! driver. Plans that request parallel loading instead run the base query
//! without joins, fetch each relationship as a concurrent child select
//! bounded by the parallel degree, and merge children onto parents by
//! foreign key — parent row order is never changed, and the first failing
//! branch cancels its siblings and fails the call.

use std::collections::HashMap;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use objql_ir::{Condition, Join, JoinType, Query, Row, SelectItem, Value};

use crate::catalog::{MetadataProvider, ObjectMetadata};
use crate::driver::QueryDriver;
use crate::error::Error;
use crate::sql::{GeneratedSql, SqlDialect, SqlGenerator};

use super::optimizer::Plan;

/// Executes plans against a driver.
pub struct QueryExecutor<'a> {
    driver: &'a dyn QueryDriver,
    metadata: &'a dyn MetadataProvider,
    dialect: SqlDialect,
}

impl<'a> QueryExecutor<'a> {
    /// Create an executor.
    pub fn new(
        driver: &'a dyn QueryDriver,
        metadata: &'a dyn MetadataProvider,
        dialect: SqlDialect,
    ) -> Self {
        Self {
            driver,
            metadata,
            dialect,
        }
    }

    /// Execute a plan and return its rows in driver order.
    ///
    /// `max_parallel_degree` is `Some` when the configuration allows the
    /// parallel relationship-loading strategy; it caps the plan's own
    /// degree.
    pub async fn run(
        &self,
        plan: &Plan,
        cancel: &CancellationToken,
        max_parallel_degree: Option<usize>,
    ) -> Result<Vec<Row>, Error> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        match max_parallel_degree {
            Some(cap) if plan.use_parallel && !plan.join_order.is_empty() => {
                let degree = plan.parallel_degree.min(cap).max(1);
                self.run_with_relationship_loading(plan, degree, cancel).await
            }
            _ => {
                let generator = SqlGenerator::new(self.dialect, self.metadata);
                let generated = generator.generate(plan)?;
                self.execute_sql(&generated, cancel).await
            }
        }
    }

    async fn execute_sql(
        &self,
        generated: &GeneratedSql,
        cancel: &CancellationToken,
    ) -> Result<Vec<Row>, Error> {
        debug!(sql = %generated.sql, params = generated.params.len(), "executing statement");
        tokio::select! {
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = self.driver.execute(&generated.sql, &generated.params, cancel) => {
                result.map_err(|e| Error::Sql {
                    message: e.message,
                    sql: generated.sql.clone(),
                })
            }
        }
    }

    async fn run_with_relationship_loading(
        &self,
        plan: &Plan,
        degree: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<Row>, Error> {
        let base_query = strip_relationships(&plan.query);
        let generator = SqlGenerator::new(self.dialect, self.metadata);
        let generated = generator.generate_query(&base_query, &[])?;
        let parents = self.execute_sql(&generated, cancel).await?;
        if parents.is_empty() {
            return Ok(parents);
        }

        let base_meta = self.metadata.object(&plan.query.from_object)?;
        let child_cancel = cancel.child_token();

        debug!(
            relationships = plan.join_order.len(),
            degree, "loading relationships in parallel"
        );
        let mut fetches = futures::stream::iter(plan.join_order.iter().map(|join| {
            let token = child_cancel.clone();
            let fields = child_fields(join, &plan.query);
            let parents = &parents;
            let base_meta = &base_meta;
            async move {
                self.load_relationship(base_meta, join, &fields, parents, &token)
                    .await
                    .map(|rows| (join.relationship.clone(), rows))
            }
        }))
        .buffer_unordered(degree);

        let mut children: HashMap<String, Vec<Row>> = HashMap::new();
        while let Some(result) = fetches.next().await {
            match result {
                Ok((relationship, rows)) => {
                    children.insert(relationship, rows);
                }
                Err(error) => {
                    // First failure aborts the sibling fetches.
                    child_cancel.cancel();
                    return Err(error);
                }
            }
        }
        drop(fetches);

        let mut rows = parents;
        for join in &plan.join_order {
            let target_meta = self.metadata.object(&join.target_object)?;
            let child_rows = children.remove(&join.relationship).unwrap_or_default();
            rows = merge_relationship(rows, join, child_rows, &base_meta, &target_meta)?;
        }
        Ok(rows)
    }

    async fn load_relationship(
        &self,
        base: &ObjectMetadata,
        join: &Join,
        fields: &[String],
        parents: &[Row],
        cancel: &CancellationToken,
    ) -> Result<Vec<Row>, Error> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let fk_column = column_of(base, &join.foreign_key)?;
        let mut keys: Vec<Value> = Vec::new();
        for row in parents {
            if let Some(value) = row.get(&fk_column) {
                if !value.is_null() && !keys.contains(value) {
                    keys.push(value.clone());
                }
            }
        }
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let child_query = Query::select(
            join.target_object.clone(),
            fields.iter().map(String::as_str).collect(),
        )
        .with_filter(Condition::in_values(join.primary_key.clone(), keys));

        let generator = SqlGenerator::new(self.dialect, self.metadata);
        let generated = generator.generate_query(&child_query, &[])?;
        self.execute_sql(&generated, cancel).await
    }
}

/// The base query with joins and dotted selects removed; foreign-key fields
/// are force-included so merging has keys to probe with.
fn strip_relationships(query: &Query) -> Query {
    let mut base = query.clone();
    base.select
        .retain(|item| !matches!(item, SelectItem::Field { name, .. } if name.contains('.')));
    for join in &query.joins {
        let present = base
            .select
            .iter()
            .any(|item| matches!(item, SelectItem::Field { name, .. } if name == &join.foreign_key));
        if !present {
            base.select.push(SelectItem::field(join.foreign_key.clone()));
        }
    }
    base.joins.clear();
    base
}

/// Child fields a relationship's select needs: the dotted selections for
/// this relationship plus its referenced key.
fn child_fields(join: &Join, query: &Query) -> Vec<String> {
    let mut fields: Vec<String> = query
        .select
        .iter()
        .filter_map(|item| match item {
            SelectItem::Field { name, .. } => name
                .split_once('.')
                .filter(|(prefix, _)| *prefix == join.relationship)
                .map(|(_, rest)| rest.to_string()),
            _ => None,
        })
        .collect();
    if !fields.iter().any(|f| f == &join.primary_key) {
        fields.push(join.primary_key.clone());
    }
    fields
}

/// Hash-merge children onto parents by foreign key, preserving parent order.
///
/// Child columns are attached under `relationship.column` keys. Inner joins
/// drop parents with no match; left and right joins keep them.
fn merge_relationship(
    parents: Vec<Row>,
    join: &Join,
    children: Vec<Row>,
    base: &ObjectMetadata,
    target: &ObjectMetadata,
) -> Result<Vec<Row>, Error> {
    let fk_column = column_of(base, &join.foreign_key)?;
    let pk_column = column_of(target, &join.primary_key)?;

    // Build phase: index children by referenced-key value.
    let mut by_key: HashMap<String, Vec<&Row>> = HashMap::new();
    for child in &children {
        if let Some(value) = child.get(&pk_column) {
            if !value.is_null() {
                by_key.entry(value_key(value)).or_default().push(child);
            }
        }
    }

    // Probe phase, in parent order.
    let mut merged = Vec::with_capacity(parents.len());
    for parent in parents {
        let key = parent
            .get(&fk_column)
            .filter(|v| !v.is_null())
            .map(value_key);
        match key.as_ref().and_then(|k| by_key.get(k)) {
            Some(matches) => {
                for child in matches {
                    let mut row = parent.clone();
                    for (column, value) in child.iter() {
                        row.insert(
                            format!("{}.{}", join.relationship, column),
                            value.clone(),
                        );
                    }
                    merged.push(row);
                }
            }
            None => {
                if join.join_type != JoinType::Inner {
                    merged.push(parent);
                }
            }
        }
    }
    Ok(merged)
}

fn column_of(object: &ObjectMetadata, field: &str) -> Result<String, Error> {
    object
        .field(field)
        .map(|f| f.column_name.clone())
        .ok_or_else(|| {
            Error::metadata(format!(
                "unknown field '{}' on object '{}'",
                field, object.object_name
            ))
        })
}

fn value_key(value: &Value) -> String {
    format!("{:?}", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DataType, FieldMetadata};

    fn join(relationship: &str, join_type: JoinType) -> Join {
        Join {
            relationship: relationship.to_string(),
            target_object: "Account".to_string(),
            foreign_key: "AccountId".to_string(),
            primary_key: "Id".to_string(),
            join_type,
            estimated_rows: 10,
            selectivity: 0.5,
        }
    }

    fn contact_meta() -> ObjectMetadata {
        ObjectMetadata::new("Contact", "contacts")
            .with_field(FieldMetadata::new("Id", "id", DataType::Id))
            .with_field(FieldMetadata::new("AccountId", "account_id", DataType::Id))
    }

    fn account_meta() -> ObjectMetadata {
        ObjectMetadata::new("Account", "accounts")
            .with_field(FieldMetadata::new("Id", "id", DataType::Id))
            .with_field(FieldMetadata::new("Name", "name", DataType::Text))
    }

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_strip_relationships() {
        let mut query = Query::select("Contact", vec!["Id", "Account.Name"]);
        query.joins = vec![join("Account", JoinType::Left)];

        let base = strip_relationships(&query);
        assert!(base.joins.is_empty());
        let names: Vec<&str> = base
            .select
            .iter()
            .filter_map(|item| match item {
                SelectItem::Field { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["Id", "AccountId"]);
    }

    #[test]
    fn test_child_fields_include_referenced_key() {
        let query = Query::select("Contact", vec!["Id", "Account.Name"]);
        let fields = child_fields(&join("Account", JoinType::Left), &query);
        assert_eq!(fields, vec!["Name".to_string(), "Id".to_string()]);
    }

    #[test]
    fn test_merge_preserves_parent_order_and_prefixes_columns() {
        let parents = vec![
            row(&[("id", Value::Int(1)), ("account_id", Value::String("a1".into()))]),
            row(&[("id", Value::Int(2)), ("account_id", Value::String("a2".into()))]),
        ];
        let children = vec![
            row(&[("id", Value::String("a2".into())), ("name", Value::String("Globex".into()))]),
            row(&[("id", Value::String("a1".into())), ("name", Value::String("Acme".into()))]),
        ];

        let merged = merge_relationship(
            parents,
            &join("Account", JoinType::Left),
            children,
            &contact_meta(),
            &account_meta(),
        )
        .unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0]["id"], Value::Int(1));
        assert_eq!(merged[0]["Account.name"], Value::String("Acme".into()));
        assert_eq!(merged[1]["id"], Value::Int(2));
        assert_eq!(merged[1]["Account.name"], Value::String("Globex".into()));
    }

    #[test]
    fn test_inner_join_drops_unmatched_parents() {
        let parents = vec![
            row(&[("id", Value::Int(1)), ("account_id", Value::String("a1".into()))]),
            row(&[("id", Value::Int(2)), ("account_id", Value::Null)]),
        ];
        let children = vec![row(&[
            ("id", Value::String("a1".into())),
            ("name", Value::String("Acme".into())),
        ])];

        let inner = merge_relationship(
            parents.clone(),
            &join("Account", JoinType::Inner),
            children.clone(),
            &contact_meta(),
            &account_meta(),
        )
        .unwrap();
        assert_eq!(inner.len(), 1);

        let left = merge_relationship(
            parents,
            &join("Account", JoinType::Left),
            children,
            &contact_meta(),
            &account_meta(),
        )
        .unwrap();
        assert_eq!(left.len(), 2);
        assert!(!left[1].contains_key("Account.name"));
    }

    #[test]
    fn test_one_to_many_merge_duplicates_parent() {
        let parents = vec![row(&[
            ("id", Value::Int(1)),
            ("account_id", Value::String("a1".into())),
        ])];
        let children = vec![
            row(&[("id", Value::String("a1".into())), ("name", Value::String("x".into()))]),
            row(&[("id", Value::String("a1".into())), ("name", Value::String("y".into()))]),
        ];

        let merged = merge_relationship(
            parents,
            &join("Account", JoinType::Left),
            children,
            &contact_meta(),
            &account_meta(),
        )
        .unwrap();
        assert_eq!(merged.len(), 2);
    }
}
