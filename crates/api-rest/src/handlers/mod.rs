//! HTTP handlers, grouped by resource.

pub mod clinical_records;
pub mod encounters;
pub mod health;
pub mod patients;
pub mod users;

use crate::error::ApiResult;
use medassist_core::ClinicResult;

/// Runs a store-backed service call on tokio's blocking pool.
///
/// SQLite calls hold the store mutex and may wait out the busy timeout, so they never run on a
/// runtime worker thread.
pub(crate) async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> ClinicResult<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await??)
}
