//! Dialect-aware SQL rendering.
//!
//! All literals are bound as parameters; only pagination integers appear
//! inline. Column references resolve through the catalog: the base object is
//! aliased `t0` and each join `tN` by its 1-based position in the plan's
//! join order. Unknown fields and unresolved relationships raise `Metadata`.

use std::sync::Arc;

use objql_ir::{
    AggregateFunction, CompareOp, Condition, Join, JoinType, NullsOrder, OrderSpec, Query,
    SelectItem, SortDirection, Value,
};

use crate::catalog::{MetadataProvider, ObjectMetadata};
use crate::error::Error;
use crate::query::Plan;

use super::dialect::SqlDialect;
use super::params::{GeneratedSql, ParameterBag};

/// Renders plans into parameterized SQL.
pub struct SqlGenerator<'a> {
    dialect: SqlDialect,
    metadata: &'a dyn MetadataProvider,
}

/// Column resolution scope for one SELECT level.
struct Scope {
    dialect: SqlDialect,
    base: Arc<ObjectMetadata>,
    joins: Vec<(Join, Arc<ObjectMetadata>)>,
}

impl Scope {
    fn resolve(
        metadata: &dyn MetadataProvider,
        query: &Query,
        join_order: &[Join],
        dialect: SqlDialect,
    ) -> Result<Self, Error> {
        let base = metadata.object(&query.from_object)?;
        let joins = join_order
            .iter()
            .map(|join| Ok((join.clone(), metadata.object(&join.target_object)?)))
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(Self {
            dialect,
            base,
            joins,
        })
    }

    /// Resolve a (possibly dotted) field to a qualified, quoted column.
    fn column(&self, field: &str) -> Result<String, Error> {
        if let Some((prefix, rest)) = field.split_once('.') {
            let position = self
                .joins
                .iter()
                .position(|(join, _)| join.relationship == prefix)
                .ok_or_else(|| {
                    Error::metadata(format!(
                        "unresolved relationship '{}' on object '{}'",
                        prefix, self.base.object_name
                    ))
                })?;
            let (_, target) = &self.joins[position];
            let column = target.field(rest).ok_or_else(|| {
                Error::metadata(format!(
                    "unknown field '{}' on object '{}'",
                    rest, target.object_name
                ))
            })?;
            Ok(format!(
                "t{}.{}",
                position + 1,
                self.dialect.quote(&column.column_name)
            ))
        } else {
            let column = self.base.field(field).ok_or_else(|| {
                Error::metadata(format!(
                    "unknown field '{}' on object '{}'",
                    field, self.base.object_name
                ))
            })?;
            Ok(format!("t0.{}", self.dialect.quote(&column.column_name)))
        }
    }
}

impl<'a> SqlGenerator<'a> {
    /// Create a generator for the given dialect.
    pub fn new(dialect: SqlDialect, metadata: &'a dyn MetadataProvider) -> Self {
        Self { dialect, metadata }
    }

    /// Render a plan.
    pub fn generate(&self, plan: &Plan) -> Result<GeneratedSql, Error> {
        self.generate_query(&plan.query, &plan.join_order)
    }

    /// Render a query with an explicit join order.
    pub fn generate_query(&self, query: &Query, join_order: &[Join]) -> Result<GeneratedSql, Error> {
        let mut params = ParameterBag::new();
        let sql = self.render_query(query, join_order, &mut params)?;
        Ok(GeneratedSql {
            sql,
            params: params.into_params(),
        })
    }

    fn render_query(
        &self,
        query: &Query,
        join_order: &[Join],
        params: &mut ParameterBag,
    ) -> Result<String, Error> {
        let scope = Scope::resolve(self.metadata, query, join_order, self.dialect)?;

        let mut sql = String::from("SELECT ");
        let items = query
            .select
            .iter()
            .map(|item| self.render_select_item(&scope, item, params))
            .collect::<Result<Vec<_>, Error>>()?;
        sql.push_str(&items.join(", "));

        sql.push_str(" FROM ");
        sql.push_str(&self.dialect.quote(&scope.base.table_name));
        sql.push_str(" t0");

        for (position, (join, target)) in scope.joins.iter().enumerate() {
            let keyword = match join.join_type {
                JoinType::Inner => "INNER JOIN",
                JoinType::Left => "LEFT JOIN",
                JoinType::Right => "RIGHT JOIN",
            };
            let fk = scope.base.field(&join.foreign_key).ok_or_else(|| {
                Error::metadata(format!(
                    "unknown foreign key '{}' on object '{}'",
                    join.foreign_key, scope.base.object_name
                ))
            })?;
            let pk = target.field(&join.primary_key).ok_or_else(|| {
                Error::metadata(format!(
                    "unknown key '{}' on object '{}'",
                    join.primary_key, target.object_name
                ))
            })?;
            sql.push_str(&format!(
                " {} {} t{} ON t0.{} = t{}.{}",
                keyword,
                self.dialect.quote(&target.table_name),
                position + 1,
                self.dialect.quote(&fk.column_name),
                position + 1,
                self.dialect.quote(&pk.column_name),
            ));
        }

        if let Some(filter) = &query.filter {
            sql.push_str(" WHERE ");
            sql.push_str(&self.render_condition(&scope, filter, params)?);
        }

        if !query.group_by.is_empty() {
            let columns = query
                .group_by
                .iter()
                .map(|field| scope.column(field))
                .collect::<Result<Vec<_>, Error>>()?;
            sql.push_str(" GROUP BY ");
            sql.push_str(&columns.join(", "));
        }

        if let Some(having) = &query.having {
            sql.push_str(" HAVING ");
            sql.push_str(&self.render_condition(&scope, having, params)?);
        }

        let has_order = !query.order_by.is_empty();
        if has_order {
            let items = query
                .order_by
                .iter()
                .map(|order| self.render_order_item(&scope, order))
                .collect::<Result<Vec<_>, Error>>()?;
            sql.push_str(" ORDER BY ");
            sql.push_str(&items.join(", "));
        }

        let paging = query.limit.is_some() || query.offset.is_some();
        if self.dialect.uses_offset_fetch() {
            if paging {
                if !has_order {
                    // OFFSET/FETCH is rejected without an ORDER BY.
                    sql.push_str(" ORDER BY (SELECT NULL)");
                }
                sql.push_str(&format!(" OFFSET {} ROWS", query.offset.unwrap_or(0)));
                if let Some(limit) = query.limit {
                    sql.push_str(&format!(" FETCH NEXT {} ROWS ONLY", limit));
                }
            }
        } else {
            if let Some(limit) = query.limit {
                sql.push_str(&format!(" LIMIT {}", limit));
            }
            if let Some(offset) = query.offset {
                sql.push_str(&format!(" OFFSET {}", offset));
            }
        }

        Ok(sql)
    }

    fn render_select_item(
        &self,
        scope: &Scope,
        item: &SelectItem,
        params: &mut ParameterBag,
    ) -> Result<String, Error> {
        let (expr, alias) = match item {
            SelectItem::Field { name, alias } => (scope.column(name)?, alias),
            SelectItem::Aggregate {
                function,
                field,
                alias,
            } => (
                self.render_aggregate(scope, *function, field.as_deref())?,
                alias,
            ),
            SelectItem::Subquery { query, alias } => {
                let inner = self.render_query(query, &query.joins, params)?;
                (format!("({})", inner), alias)
            }
        };
        Ok(match alias {
            Some(alias) => format!("{} AS {}", expr, self.dialect.quote(alias)),
            None => expr,
        })
    }

    fn render_aggregate(
        &self,
        scope: &Scope,
        function: AggregateFunction,
        field: Option<&str>,
    ) -> Result<String, Error> {
        Ok(match field {
            None => format!("{}(*)", function.sql_name()),
            Some(field) => {
                let column = scope.column(field)?;
                match function {
                    AggregateFunction::CountDistinct => format!("COUNT(DISTINCT {})", column),
                    _ => format!("{}({})", function.sql_name(), column),
                }
            }
        })
    }

    fn render_condition(
        &self,
        scope: &Scope,
        condition: &Condition,
        params: &mut ParameterBag,
    ) -> Result<String, Error> {
        match condition {
            Condition::Logical { op, left, right } => {
                let keyword = match op {
                    objql_ir::LogicalOp::And => "AND",
                    objql_ir::LogicalOp::Or => "OR",
                };
                Ok(format!(
                    "({} {} {})",
                    self.render_condition(scope, left, params)?,
                    keyword,
                    self.render_condition(scope, right, params)?
                ))
            }
            Condition::Compare { field, op, value } => {
                let expr = self.render_field_expr(scope, field)?;
                if op.is_like_family() {
                    let raw = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    let pattern = match op {
                        CompareOp::Contains => format!("%{}%", raw),
                        CompareOp::StartsWith => format!("{}%", raw),
                        CompareOp::EndsWith => format!("%{}", raw),
                        _ => raw,
                    };
                    let placeholder = params.bind(Value::String(pattern));
                    Ok(format!(
                        "{} {} {}",
                        expr,
                        self.dialect.like_operator(),
                        placeholder
                    ))
                } else {
                    let keyword = match op {
                        CompareOp::Eq => "=",
                        CompareOp::Ne => "<>",
                        CompareOp::Lt => "<",
                        CompareOp::Le => "<=",
                        CompareOp::Gt => ">",
                        CompareOp::Ge => ">=",
                        _ => unreachable!("like-family handled above"),
                    };
                    let placeholder = params.bind(value.clone());
                    Ok(format!("{} {} {}", expr, keyword, placeholder))
                }
            }
            Condition::InList {
                field,
                values,
                negated,
            } => {
                if values.is_empty() {
                    // An empty IN list can match nothing at all.
                    return Ok(if *negated { "1 = 1" } else { "1 = 0" }.to_string());
                }
                let expr = self.render_field_expr(scope, field)?;
                let placeholders: Vec<String> =
                    values.iter().map(|v| params.bind(v.clone())).collect();
                Ok(format!(
                    "{} {} ({})",
                    expr,
                    if *negated { "NOT IN" } else { "IN" },
                    placeholders.join(", ")
                ))
            }
            Condition::InSubquery {
                field,
                query,
                negated,
            } => {
                let expr = self.render_field_expr(scope, field)?;
                let inner = self.render_query(query, &query.joins, params)?;
                Ok(format!(
                    "{} {} ({})",
                    expr,
                    if *negated { "NOT IN" } else { "IN" },
                    inner
                ))
            }
            Condition::Null { field, negated } => {
                let expr = self.render_field_expr(scope, field)?;
                Ok(format!(
                    "{} IS {}NULL",
                    expr,
                    if *negated { "NOT " } else { "" }
                ))
            }
        }
    }

    /// A condition field is either a column reference or, in HAVING, an
    /// aggregate call rendered over the qualified column.
    fn render_field_expr(&self, scope: &Scope, field: &str) -> Result<String, Error> {
        match parse_aggregate_call(field) {
            Some((function, argument)) => {
                self.render_aggregate(scope, function, argument.as_deref())
            }
            None => scope.column(field),
        }
    }

    fn render_order_item(&self, scope: &Scope, order: &OrderSpec) -> Result<String, Error> {
        let column = scope.column(&order.field)?;
        let direction = match order.direction {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        if self.dialect.supports_nulls_ordering() {
            let nulls = match order.nulls {
                NullsOrder::First => "FIRST",
                NullsOrder::Last => "LAST",
            };
            Ok(format!("{} {} NULLS {}", column, direction, nulls))
        } else {
            let (when_null, otherwise) = match order.nulls {
                NullsOrder::First => (0, 1),
                NullsOrder::Last => (1, 0),
            };
            Ok(format!(
                "CASE WHEN {} IS NULL THEN {} ELSE {} END, {} {}",
                column, when_null, otherwise, column, direction
            ))
        }
    }
}

/// Parse aggregate-call field text like `COUNT(Id)` or `COUNT(DISTINCT x)`.
fn parse_aggregate_call(field: &str) -> Option<(AggregateFunction, Option<String>)> {
    let open = field.find('(')?;
    if !field.ends_with(')') {
        return None;
    }
    let function = AggregateFunction::from_name(&field[..open])?;
    let inner = field[open + 1..field.len() - 1].trim();
    if inner == "*" {
        return Some((function, None));
    }
    if let Some(rest) = inner.strip_prefix("DISTINCT ") {
        return Some((AggregateFunction::CountDistinct, Some(rest.trim().to_string())));
    }
    Some((function, Some(inner.to_string())))
}
