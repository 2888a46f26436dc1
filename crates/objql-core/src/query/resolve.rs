//! Relationship resolution: dotted field references become joins.

use tracing::warn;

use objql_ir::{Condition, Join, Query, SelectItem};

use crate::catalog::{MetadataProvider, StatisticsProvider};
use crate::error::Error;

/// Materialize joins for every dotted field reference in the query.
///
/// The select list, filter, and ordering are scanned for dotted names; each
/// distinct leading segment is looked up as a relationship on the base
/// object's metadata and appended as a [`Join`], deduplicated by
/// relationship name. A missing relationship is only a warning here — the
/// SQL generator raises `Metadata` when the reference is actually emitted.
///
/// Joins are annotated for the optimizer: `estimated_rows` from the target
/// object's statistics and `selectivity` from the FK field's selectivity on
/// the base object (1.0 when unknown).
pub fn resolve_joins(
    query: &mut Query,
    metadata: &dyn MetadataProvider,
    statistics: &dyn StatisticsProvider,
) -> Result<(), Error> {
    let object = metadata.object(&query.from_object)?;

    for prefix in dotted_prefixes(query) {
        if query.joins.iter().any(|j| j.relationship == prefix) {
            continue;
        }
        match object.relationship(&prefix) {
            Some(relationship) => {
                let selectivity = statistics
                    .field_selectivity(&object.object_name, &relationship.foreign_key)
                    .unwrap_or(1.0);
                query.joins.push(Join {
                    relationship: relationship.name.clone(),
                    target_object: relationship.target_object.clone(),
                    foreign_key: relationship.foreign_key.clone(),
                    primary_key: relationship.referenced_key.clone(),
                    join_type: relationship.join_type(),
                    estimated_rows: statistics.row_count(&relationship.target_object),
                    selectivity,
                });
            }
            None => {
                warn!(
                    object = %query.from_object,
                    relationship = %prefix,
                    "dotted reference names an unknown relationship"
                );
            }
        }
    }

    // Subqueries resolve against their own base objects.
    for item in &mut query.select {
        if let SelectItem::Subquery { query: sub, .. } = item {
            resolve_joins(sub, metadata, statistics)?;
        }
    }
    if let Some(filter) = &mut query.filter {
        resolve_condition_subqueries(filter, metadata, statistics)?;
    }
    if let Some(having) = &mut query.having {
        resolve_condition_subqueries(having, metadata, statistics)?;
    }

    Ok(())
}

fn resolve_condition_subqueries(
    condition: &mut Condition,
    metadata: &dyn MetadataProvider,
    statistics: &dyn StatisticsProvider,
) -> Result<(), Error> {
    match condition {
        Condition::InSubquery { query, .. } => resolve_joins(query, metadata, statistics),
        Condition::Logical { left, right, .. } => {
            resolve_condition_subqueries(left, metadata, statistics)?;
            resolve_condition_subqueries(right, metadata, statistics)
        }
        _ => Ok(()),
    }
}

/// Distinct dotted-reference prefixes in first-seen order.
fn dotted_prefixes(query: &Query) -> Vec<String> {
    let mut prefixes: Vec<String> = Vec::new();
    let mut push = |name: &str| {
        // Aggregate-call field text (e.g. "COUNT(Id)") is not a field path.
        if name.contains('(') {
            return;
        }
        if let Some((prefix, _)) = name.split_once('.') {
            if !prefixes.iter().any(|p| p == prefix) {
                prefixes.push(prefix.to_string());
            }
        }
    };

    for item in &query.select {
        if let SelectItem::Field { name, .. } = item {
            push(name);
        }
    }
    if let Some(filter) = &query.filter {
        for field in filter.referenced_fields() {
            push(field);
        }
    }
    for order in &query.order_by {
        push(&order.field);
    }
    prefixes
}
