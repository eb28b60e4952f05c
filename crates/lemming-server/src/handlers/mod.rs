//! Route handlers, one module per surface area.

pub mod disambiguation;
pub mod health;
pub mod ltl;
pub mod planning;
pub mod scenarios;

use crate::error::AppResult;

/// Run a CPU-bound pipeline stage off the async workers.
pub(crate) async fn blocking<T, F>(work: F) -> AppResult<T>
where
    F: FnOnce() -> lemming_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(work).await??)
}
