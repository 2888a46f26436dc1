//! Access policy definitions.
//!
//! A policy builds a filter predicate from the security context. Policies
//! are registered per object name or under the `"*"` wildcard; a record is
//! visible when ANY applicable policy grants access.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use objql_ir::{Condition, Query};

use super::context::SecurityContext;
use super::error::SecurityError;

/// Object key under which wildcard policies are registered.
pub const WILDCARD_OBJECT: &str = "*";

/// Kind of access being checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessMode {
    /// Read access.
    Read,
    /// Write access.
    Write,
    /// Delete access.
    Delete,
}

/// Policy taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyKind {
    /// Visible when owned by the current user.
    OwnerBased,
    /// Visible when owned or explicitly shared.
    SharingBased,
    /// Visible when owned by a subordinate in the role hierarchy.
    HierarchyBased,
    /// Visible within the user's territories.
    TerritoryBased,
    /// Deployment-specific policy.
    Custom,
}

/// An access policy.
pub trait AccessPolicy: Send + Sync {
    /// Policy name, unique within its object bucket.
    fn name(&self) -> &str;

    /// Policy kind.
    fn kind(&self) -> PolicyKind;

    /// Whether this policy participates in the given access mode.
    fn applies_to(&self, _mode: AccessMode) -> bool {
        true
    }

    /// Whether this policy can build a predicate for the context.
    fn applicable(&self, context: &SecurityContext) -> bool;

    /// Build the access predicate for the context.
    fn build(&self, context: &SecurityContext) -> Result<Condition, SecurityError>;
}

fn require_user(context: &SecurityContext) -> Result<&str, SecurityError> {
    if context.user_id.is_empty() {
        Err(SecurityError::PolicyError(
            "security context has no user id".to_string(),
        ))
    } else {
        Ok(&context.user_id)
    }
}

/// Grants access to records owned by the current user.
#[derive(Debug, Clone)]
pub struct OwnerPolicy {
    owner_field: String,
}

impl Default for OwnerPolicy {
    fn default() -> Self {
        Self::new("owner_id")
    }
}

impl OwnerPolicy {
    /// Create a policy over a custom owner field.
    pub fn new(owner_field: impl Into<String>) -> Self {
        Self {
            owner_field: owner_field.into(),
        }
    }
}

impl AccessPolicy for OwnerPolicy {
    fn name(&self) -> &str {
        "owner"
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::OwnerBased
    }

    fn applicable(&self, context: &SecurityContext) -> bool {
        !context.user_id.is_empty()
    }

    fn build(&self, context: &SecurityContext) -> Result<Condition, SecurityError> {
        let user = require_user(context)?;
        Ok(Condition::eq(self.owner_field.clone(), user))
    }
}

/// Grants access to owned records and records shared through the `Share`
/// object.
#[derive(Debug, Clone, Default)]
pub struct SharingPolicy;

impl AccessPolicy for SharingPolicy {
    fn name(&self) -> &str {
        "sharing"
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::SharingBased
    }

    fn applicable(&self, context: &SecurityContext) -> bool {
        !context.user_id.is_empty()
    }

    fn build(&self, context: &SecurityContext) -> Result<Condition, SecurityError> {
        let user = require_user(context)?;
        let shares = Query::select("Share", vec!["record_id"])
            .with_filter(Condition::eq("user_or_group_id", user));
        Ok(Condition::or(
            Condition::eq("owner_id", user),
            Condition::in_subquery("id", shares),
        ))
    }
}

/// Grants access to records owned by subordinates in the role hierarchy.
#[derive(Debug, Clone, Default)]
pub struct HierarchyPolicy;

impl AccessPolicy for HierarchyPolicy {
    fn name(&self) -> &str {
        "hierarchy"
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::HierarchyBased
    }

    fn applicable(&self, context: &SecurityContext) -> bool {
        !context.user_id.is_empty()
    }

    fn build(&self, context: &SecurityContext) -> Result<Condition, SecurityError> {
        let user = require_user(context)?;
        let subordinates = Query::select("UserRoleHierarchy", vec!["subordinate_user_id"])
            .with_filter(Condition::eq("supervisor_user_id", user));
        Ok(Condition::in_subquery("owner_id", subordinates))
    }
}

/// Grants access to records inside the user's territories.
#[derive(Debug, Clone, Default)]
pub struct TerritoryPolicy;

impl AccessPolicy for TerritoryPolicy {
    fn name(&self) -> &str {
        "territory"
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::TerritoryBased
    }

    // An empty territory list can never match; stay out of the predicate.
    fn applicable(&self, context: &SecurityContext) -> bool {
        !context.territory_ids.is_empty()
    }

    fn build(&self, context: &SecurityContext) -> Result<Condition, SecurityError> {
        Ok(Condition::in_values(
            "territory_id",
            context.territory_ids.clone(),
        ))
    }
}

/// A deployment-specific policy built from a closure.
pub struct CustomPolicy<F> {
    name: String,
    build_fn: F,
}

impl<F> CustomPolicy<F>
where
    F: Fn(&SecurityContext) -> Result<Condition, SecurityError> + Send + Sync,
{
    /// Create a custom policy.
    pub fn new(name: impl Into<String>, build_fn: F) -> Self {
        Self {
            name: name.into(),
            build_fn,
        }
    }
}

impl<F> AccessPolicy for CustomPolicy<F>
where
    F: Fn(&SecurityContext) -> Result<Condition, SecurityError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::Custom
    }

    fn applicable(&self, _context: &SecurityContext) -> bool {
        true
    }

    fn build(&self, context: &SecurityContext) -> Result<Condition, SecurityError> {
        (self.build_fn)(context)
    }
}

/// Registry of policies keyed by object name, with a `"*"` wildcard bucket.
///
/// Object-specific policies win: wildcard policies apply only to objects
/// with no policies of their own.
pub struct PolicyRegistry {
    policies: HashMap<String, Vec<Arc<dyn AccessPolicy>>>,
}

impl PolicyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            policies: HashMap::new(),
        }
    }

    /// Create a registry with the four default policies registered as
    /// wildcards.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(WILDCARD_OBJECT, Arc::new(OwnerPolicy::default()));
        registry.register(WILDCARD_OBJECT, Arc::new(SharingPolicy));
        registry.register(WILDCARD_OBJECT, Arc::new(HierarchyPolicy));
        registry.register(WILDCARD_OBJECT, Arc::new(TerritoryPolicy));
        registry
    }

    /// Register a policy for an object (or `"*"`), replacing any policy of
    /// the same name in that bucket.
    pub fn register(&mut self, object: impl Into<String>, policy: Arc<dyn AccessPolicy>) {
        let bucket = self.policies.entry(object.into()).or_default();
        bucket.retain(|existing| existing.name() != policy.name());
        bucket.push(policy);
    }

    /// Policies for an object: its own bucket if non-empty, else wildcards.
    pub fn for_object(&self, object: &str) -> &[Arc<dyn AccessPolicy>] {
        match self.policies.get(object) {
            Some(bucket) if !bucket.is_empty() => bucket,
            _ => self
                .policies
                .get(WILDCARD_OBJECT)
                .map(Vec::as_slice)
                .unwrap_or(&[]),
        }
    }
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> SecurityContext {
        SecurityContext::new("u1")
    }

    #[test]
    fn test_owner_policy() {
        let policy = OwnerPolicy::default();
        assert!(policy.applicable(&user()));
        assert!(!policy.applicable(&SecurityContext::default()));

        let cond = policy.build(&user()).unwrap();
        assert_eq!(cond, Condition::eq("owner_id", "u1"));
    }

    #[test]
    fn test_sharing_policy_shape() {
        let cond = SharingPolicy.build(&user()).unwrap();
        match cond {
            Condition::Logical { op, left, right } => {
                assert_eq!(op, objql_ir::LogicalOp::Or);
                assert_eq!(*left, Condition::eq("owner_id", "u1"));
                match *right {
                    Condition::InSubquery { ref field, ref query, negated } => {
                        assert_eq!(field, "id");
                        assert_eq!(query.from_object, "Share");
                        assert!(!negated);
                    }
                    ref other => panic!("expected InSubquery, got {:?}", other),
                }
            }
            other => panic!("expected Logical, got {:?}", other),
        }
    }

    #[test]
    fn test_hierarchy_policy_shape() {
        let cond = HierarchyPolicy.build(&user()).unwrap();
        match cond {
            Condition::InSubquery { field, query, .. } => {
                assert_eq!(field, "owner_id");
                assert_eq!(query.from_object, "UserRoleHierarchy");
            }
            other => panic!("expected InSubquery, got {:?}", other),
        }
    }

    #[test]
    fn test_territory_policy_applicability() {
        let policy = TerritoryPolicy;
        assert!(!policy.applicable(&user()));

        let with_territories = user().with_territory("t-1").with_territory("t-2");
        assert!(policy.applicable(&with_territories));

        let cond = policy.build(&with_territories).unwrap();
        match cond {
            Condition::InList { field, values, .. } => {
                assert_eq!(field, "territory_id");
                assert_eq!(values.len(), 2);
            }
            other => panic!("expected InList, got {:?}", other),
        }
    }

    #[test]
    fn test_policy_without_user_fails_to_build() {
        let err = OwnerPolicy::default()
            .build(&SecurityContext::default())
            .unwrap_err();
        assert!(matches!(err, SecurityError::PolicyError(_)));
    }

    #[test]
    fn test_registry_object_overrides_wildcard() {
        let mut registry = PolicyRegistry::with_defaults();
        assert_eq!(registry.for_object("Account").len(), 4);

        registry.register("Account", Arc::new(OwnerPolicy::new("account_owner")));
        assert_eq!(registry.for_object("Account").len(), 1);
        assert_eq!(registry.for_object("Contact").len(), 4);
    }

    #[test]
    fn test_registry_replaces_same_name() {
        let mut registry = PolicyRegistry::new();
        registry.register("Account", Arc::new(OwnerPolicy::default()));
        registry.register("Account", Arc::new(OwnerPolicy::new("owner_user_id")));
        assert_eq!(registry.for_object("Account").len(), 1);
    }

    #[test]
    fn test_policy_kinds_serialize() {
        let json = serde_json::to_string(&PolicyKind::TerritoryBased).unwrap();
        let back: PolicyKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, PolicyKind::TerritoryBased);

        let json = serde_json::to_string(&AccessMode::Write).unwrap();
        let back: AccessMode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AccessMode::Write);
    }

    #[test]
    fn test_custom_policy() {
        let policy = CustomPolicy::new("org", |ctx: &SecurityContext| {
            let org = ctx
                .attribute("org_id")
                .cloned()
                .ok_or_else(|| SecurityError::PolicyError("missing org_id".into()))?;
            Ok(Condition::Compare {
                field: "org_id".into(),
                op: objql_ir::CompareOp::Eq,
                value: org,
            })
        });

        assert_eq!(policy.kind(), PolicyKind::Custom);
        assert!(policy.build(&user()).is_err());
        let ctx = user().with_attribute("org_id", "org-1");
        assert!(policy.build(&ctx).is_ok());
    }
}
