//! Security context that accompanies a single query execution.
//!
//! The context is passed explicitly along the pipeline; it is never shared
//! implicitly across executions, so concurrent queries can carry different
//! identities.

use std::collections::{HashMap, HashSet};

use objql_ir::Value;

/// Role that bypasses all row-level security.
pub const ADMIN_ROLE: &str = "SystemAdministrator";

/// Identity and authorization attributes for one query execution.
#[derive(Debug, Clone, Default)]
pub struct SecurityContext {
    /// Current user id.
    pub user_id: String,
    /// Granted roles.
    pub roles: HashSet<String>,
    /// Granted permissions.
    pub permissions: HashSet<String>,
    /// Territory ids visible to the user.
    pub territory_ids: Vec<Value>,
    /// Free-form attributes for custom policies.
    pub attributes: HashMap<String, Value>,
}

impl SecurityContext {
    /// Create a context for the given user.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    /// Create a context carrying the administrator role.
    pub fn admin(user_id: impl Into<String>) -> Self {
        Self::new(user_id).with_role(ADMIN_ROLE)
    }

    /// Add a role.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    /// Add a permission.
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    /// Add a territory id.
    pub fn with_territory(mut self, territory: impl Into<Value>) -> Self {
        self.territory_ids.push(territory.into());
        self
    }

    /// Set a custom attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Check if this context bypasses row-level security.
    pub fn is_admin(&self) -> bool {
        self.roles.contains(ADMIN_ROLE)
    }

    /// Get a custom attribute.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Roles in sorted order, for stable cache keying.
    pub fn sorted_roles(&self) -> Vec<&str> {
        let mut roles: Vec<&str> = self.roles.iter().map(String::as_str).collect();
        roles.sort_unstable();
        roles
    }
}
