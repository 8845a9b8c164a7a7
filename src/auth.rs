//! Caller identity for request-scoped authorization.
//!
//! The engine never reads session state from globals: every request-scoped
//! operation receives the acting identity explicitly, which keeps tests
//! deterministic with synthetic identities.
//!
//! Roles are numeric privilege bands where a smaller id carries more
//! privilege; an anonymous caller acts with the public role.

use serde::{Deserialize, Serialize};

/// Numeric role identifier. Smaller ids are more privileged.
pub type RoleId = i32;

/// Default role assigned to anonymous callers.
pub const PUBLIC_ROLE: RoleId = 10;

/// The identity a request acts under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CallerIdentity {
    /// User id, if authenticated.
    pub user_id: Option<String>,
    /// Role id, if authenticated.
    pub role_id: Option<RoleId>,
}

impl CallerIdentity {
    /// An anonymous caller; acts with the public role.
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            role_id: None,
        }
    }

    /// An authenticated caller with an explicit role.
    pub fn authenticated(user_id: impl Into<String>, role_id: RoleId) -> Self {
        Self {
            user_id: Some(user_id.into()),
            role_id: Some(role_id),
        }
    }

    /// Whether this caller is anonymous.
    pub fn is_anonymous(&self) -> bool {
        self.user_id.is_none()
    }

    /// The role this caller acts with: its own role, or the public role
    /// when none is set.
    pub fn acting_role(&self, public_role: RoleId) -> RoleId {
        self.role_id.unwrap_or(public_role)
    }
}
