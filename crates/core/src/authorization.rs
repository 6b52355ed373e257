//! Role-based permission checks.
//!
//! The acting user is always an explicit [`Actor`] argument; nothing here reads request or
//! session state.

use crate::constants::{MSG_ACCOUNT_CLOSED, MSG_UNAUTHORIZED_ACTION};
use crate::models::{User, UserId};
use crate::{ClinicError, ClinicResult};
use medassist_types::Role;

/// Roles allowed to record clinical findings and manage patients.
pub const CLINICAL_ROLES: &[Role] = &[Role::Admin, Role::Doctor, Role::Nurse];

/// Roles allowed to perform administrative operations.
pub const ADMIN_ROLES: &[Role] = &[Role::Admin];

/// The authenticated user on whose behalf an operation runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Builds the actor for a stored user.
    ///
    /// # Errors
    ///
    /// Returns `ClinicError::Forbidden` if the account has been closed.
    pub fn from_user(user: &User) -> ClinicResult<Self> {
        if !user.is_active {
            return Err(ClinicError::Forbidden(MSG_ACCOUNT_CLOSED.into()));
        }
        Ok(Self::new(user.id, user.role))
    }
}

pub fn has_role(actor: &Actor, allowed: &[Role]) -> bool {
    allowed.contains(&actor.role)
}

/// [`has_role`] as a guard.
///
/// # Errors
///
/// Returns `ClinicError::Forbidden` when the actor's role is not in `allowed`.
pub fn require_role(actor: &Actor, allowed: &[Role]) -> ClinicResult<()> {
    if has_role(actor, allowed) {
        Ok(())
    } else {
        tracing::warn!(user_id = actor.user_id, role = %actor.role, "action refused for role");
        Err(ClinicError::Forbidden(MSG_UNAUTHORIZED_ACTION.into()))
    }
}
