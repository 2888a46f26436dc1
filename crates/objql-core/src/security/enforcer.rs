//! Query rewriting and record validation against access policies.

use tracing::debug;

use objql_ir::{Condition, Query, Row};

use crate::catalog::ObjectMetadata;
use crate::error::Error;
use crate::query::FilterEvaluator;

use super::context::SecurityContext;
use super::error::SecurityError;
use super::policy::{AccessMode, PolicyRegistry};

/// Applies row-level security to queries and records.
pub struct RlsEnforcer {
    registry: PolicyRegistry,
}

impl RlsEnforcer {
    /// Create an enforcer over the given registry.
    pub fn new(registry: PolicyRegistry) -> Self {
        Self { registry }
    }

    /// Mutable access to the policy registry.
    pub fn registry_mut(&mut self) -> &mut PolicyRegistry {
        &mut self.registry
    }

    /// Rewrite a query so it only sees rows the context may see.
    ///
    /// Returns the query unchanged for administrators, for objects without
    /// RLS, and when no policy is applicable. Otherwise the applicable
    /// policies' predicates are OR-ed together (any grant suffices) and
    /// AND-ed onto the existing filter.
    pub fn apply(
        &self,
        mut query: Query,
        metadata: &ObjectMetadata,
        context: &SecurityContext,
    ) -> Result<Query, SecurityError> {
        if context.is_admin() {
            return Ok(query);
        }
        if !metadata.has_rls {
            return Ok(query);
        }

        let predicate = self.access_predicate(&query.from_object, AccessMode::Read, context)?;
        let Some(predicate) = predicate else {
            return Ok(query);
        };

        debug!(object = %query.from_object, user = %context.user_id, "applying row-level security");
        query.filter = Some(match query.filter.take() {
            Some(user_filter) => Condition::and(user_filter, predicate),
            None => predicate,
        });
        Ok(query)
    }

    /// Build the OR-combined predicate of all applicable policies.
    fn access_predicate(
        &self,
        object: &str,
        mode: AccessMode,
        context: &SecurityContext,
    ) -> Result<Option<Condition>, SecurityError> {
        let mut predicates = Vec::new();
        for policy in self.registry.for_object(object) {
            if !policy.applies_to(mode) || !policy.applicable(context) {
                continue;
            }
            predicates.push(policy.build(context)?);
        }
        Ok(Condition::any_of(predicates))
    }

    /// Evaluate the applicable policies against a record in memory.
    ///
    /// Access is granted when ANY applicable policy's predicate evaluates to
    /// true. Subquery predicates cannot be evaluated without the driver and
    /// count as not-granting. Mirrors the query path: administrators,
    /// RLS-free objects, and objects with no applicable policy are granted.
    pub fn validate(
        &self,
        metadata: &ObjectMetadata,
        record: &Row,
        mode: AccessMode,
        context: &SecurityContext,
    ) -> Result<bool, Error> {
        if context.is_admin() || !metadata.has_rls {
            return Ok(true);
        }

        let mut any_applicable = false;
        for policy in self.registry.for_object(&metadata.object_name) {
            if !policy.applies_to(mode) || !policy.applicable(context) {
                continue;
            }
            any_applicable = true;
            let predicate = policy.build(context)?;
            if FilterEvaluator::evaluate(&predicate, record)? {
                return Ok(true);
            }
        }

        Ok(!any_applicable)
    }
}

impl Default for RlsEnforcer {
    fn default() -> Self {
        Self::new(PolicyRegistry::with_defaults())
    }
}
