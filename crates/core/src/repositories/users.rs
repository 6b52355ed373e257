//! User administration and actor resolution.
//!
//! Everything except [`UserService::resolve_actor`] and [`UserService::bootstrap_admin`] is
//! restricted to administrators. Credentials and sessions live outside this crate: callers
//! authenticate a user id and ask this service which [`Actor`] it maps to.

use crate::authorization::{require_role, Actor, ADMIN_ROLES};
use crate::constants::{MSG_BOOTSTRAP_REFUSED, MSG_UNAUTHENTICATED};
use crate::models::{NewUser, User, UserId};
use crate::store::{Store, StoreTx};
use crate::validation::{taken_message, validate_user, UserInput};
use crate::{ClinicError, ClinicResult};
use chrono::Utc;
use medassist_types::{Role, ValidationErrors};
use std::sync::Arc;

#[derive(Debug)]
pub struct UserService<S> {
    store: Arc<S>,
}

impl<S> Clone for UserService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

fn insert_unique(tx: &mut dyn StoreTx, new: &NewUser) -> ClinicResult<User> {
    if tx.user_email_taken(&new.email)? {
        return Err(ValidationErrors::single("email", taken_message("email")).into());
    }
    tx.insert_user(new, Utc::now())
}

impl<S: Store> UserService<S> {
    /// Creates a user directory service.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Maps an authenticated user id to the actor operations run as.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated` if no such user exists.
    /// - `Forbidden` if the account is closed.
    pub fn resolve_actor(&self, user_id: UserId) -> ClinicResult<Actor> {
        let user = self
            .store
            .transaction(|tx| tx.find_user(user_id))?
            .ok_or_else(|| ClinicError::Unauthenticated(MSG_UNAUTHENTICATED.into()))?;
        Actor::from_user(&user)
    }

    /// Creates the first administrator of an empty directory.
    ///
    /// # Errors
    ///
    /// `Forbidden` once any user exists.
    pub fn bootstrap_admin(&self, name: &str, email: &str) -> ClinicResult<User> {
        let new = validate_user(&UserInput {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            role: Some(Role::Admin.as_str().to_string()),
        })?;
        let user = self.store.transaction(|tx| {
            if tx.count_users()? > 0 {
                return Err(ClinicError::Forbidden(MSG_BOOTSTRAP_REFUSED.into()));
            }
            insert_unique(tx, &new)
        })?;
        tracing::info!(user_id = user.id, "bootstrap administrator created");
        Ok(user)
    }

    /// Lists staff accounts, open and closed.
    ///
    /// # Arguments
    ///
    /// * `actor` - Requesting user; must be an administrator
    /// * `search` - Optional case-insensitive substring of name or email
    ///
    /// # Errors
    ///
    /// Returns `ClinicError::Forbidden` for non-administrators.
    pub fn list(&self, actor: &Actor, search: Option<&str>) -> ClinicResult<Vec<User>> {
        require_role(actor, ADMIN_ROLES)?;
        self.store.transaction(|tx| tx.list_users(search))
    }

    /// Fetches one staff account.
    ///
    /// # Arguments
    ///
    /// * `actor` - Requesting user; must be an administrator
    /// * `user_id` - Id of the account
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-administrators, then `NotFound` for an unknown id.
    pub fn get(&self, actor: &Actor, user_id: UserId) -> ClinicResult<User> {
        require_role(actor, ADMIN_ROLES)?;
        self.store.transaction(|tx| {
            tx.find_user(user_id)?
                .ok_or_else(|| ClinicError::not_found("User", user_id))
        })
    }

    /// Adds a staff account. New accounts start active.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-administrators; `Validation` for bad fields or a taken email.
    pub fn create(&self, actor: &Actor, input: &UserInput) -> ClinicResult<User> {
        require_role(actor, ADMIN_ROLES)?;
        let new = validate_user(input)?;
        let user = self.store.transaction(|tx| insert_unique(tx, &new))?;
        tracing::info!(
            user_id = user.id,
            role = %user.role,
            created_by = actor.user_id,
            "user created"
        );
        Ok(user)
    }

    /// Flips the account between active and closed.
    pub fn toggle_account_status(&self, actor: &Actor, user_id: UserId) -> ClinicResult<User> {
        require_role(actor, ADMIN_ROLES)?;
        let user = self.store.transaction(|tx| {
            let mut user = tx
                .find_user(user_id)?
                .ok_or_else(|| ClinicError::not_found("User", user_id))?;
            user.is_active = !user.is_active;
            tx.set_user_active(user_id, user.is_active)?;
            Ok(user)
        })?;
        tracing::info!(
            user_id,
            is_active = user.is_active,
            changed_by = actor.user_id,
            "account status changed"
        );
        Ok(user)
    }
}
