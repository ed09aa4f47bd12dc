//! Process-wide default pool.
//!
//! Free functions that delegate to a replaceable [`Pool`]. They add no
//! behaviour of their own. Prefer passing an `Arc<Pool>` to the code that
//! needs it; these exist for call sites where threading a handle through is
//! not worth it. [`set_default`] injects the instance they use.

use crate::controller::WorkerCap;
use crate::error::{PoolError, TaskError};
use crate::pool::Pool;
use crate::signals::Signal;

use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

lazy_static::lazy_static! {
  static ref DEFAULT_POOL: RwLock<Arc<Pool>> = RwLock::new(Pool::with_defaults());
}

/// Replaces the default pool. Work already submitted to the previous one
/// keeps running there.
pub fn set_default(pool: Arc<Pool>) {
  *DEFAULT_POOL.write() = pool;
}

/// The pool the free functions currently delegate to.
pub fn default_pool() -> Arc<Pool> {
  DEFAULT_POOL.read().clone()
}

/// [`Pool::go`] on the default pool.
pub fn go<F, Fut>(f: F)
where
  F: FnOnce(CancellationToken) -> Fut + Send + 'static,
  Fut: Future<Output = ()> + Send + 'static,
{
  default_pool().go(f);
}

/// [`Pool::go_err`] on the default pool.
pub fn go_err<F, Fut>(f: F)
where
  F: FnOnce(CancellationToken) -> Fut + Send + 'static,
  Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
  default_pool().go_err(f);
}

/// [`Pool::wait`] on the default pool.
pub async fn wait() {
  default_pool().wait().await;
}

/// [`Pool::wait_signal`] on the default pool.
pub async fn wait_signal(signals: &[Signal]) -> Result<Signal, PoolError> {
  default_pool().wait_signal(signals).await
}

/// [`Pool::set_worker_cap`] on the default pool.
pub fn set_worker_cap(cap: impl Into<WorkerCap>) {
  default_pool().set_worker_cap(cap);
}

/// [`Pool::worker_count`] on the default pool.
pub fn worker_count() -> usize {
  default_pool().worker_count()
}

/// [`Pool::task_count`] on the default pool.
pub fn task_count() -> usize {
  default_pool().task_count()
}
