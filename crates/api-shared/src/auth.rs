//! Resolving the acting user.
//!
//! Sessions and credentials are handled upstream of the API. Requests carry the authenticated
//! user's id in the [`USER_ID_HEADER`] header; the API turns it into an
//! [`Actor`](medassist_core::Actor) through the user directory.

use medassist_core::constants::MSG_UNAUTHENTICATED;
use medassist_core::{Actor, ClinicError, ClinicResult, Store, UserService};

/// Header naming the authenticated user.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Parses the raw header value into a user id.
///
/// # Errors
///
/// `ClinicError::Unauthenticated` if the header is missing or not a positive integer.
pub fn parse_user_id(raw: Option<&str>) -> ClinicResult<i64> {
    raw.map(str::trim)
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|id| *id > 0)
        .ok_or_else(|| ClinicError::Unauthenticated(MSG_UNAUTHENTICATED.into()))
}

/// Parses the header and resolves it to an active user's [`Actor`].
pub fn authenticate<S: Store>(users: &UserService<S>, raw: Option<&str>) -> ClinicResult<Actor> {
    let user_id = parse_user_id(raw)?;
    users.resolve_actor(user_id)
}
