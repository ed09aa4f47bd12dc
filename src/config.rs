use crate::controller::WorkerCap;
use crate::fault::{Fault, RecoverFn};

use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle as TokioHandle;
use tokio_util::sync::CancellationToken;

pub(crate) const DEFAULT_POOL_NAME: &str = "gopool";

/// Construction options for a [`Pool`](crate::Pool).
///
/// Every option has a default, so `PoolConfig::default()` gives an unbounded
/// pool with a fresh root token that logs panics and spawns its workers on
/// the ambient Tokio runtime.
#[derive(Clone, Default)]
pub struct PoolConfig {
  pub(crate) name: Option<String>,
  pub(crate) parent_token: Option<CancellationToken>,
  pub(crate) worker_cap: WorkerCap,
  pub(crate) recover: Option<RecoverFn>,
  pub(crate) runtime: Option<TokioHandle>,
}

impl PoolConfig {
  pub fn new() -> Self {
    Self::default()
  }

  /// Name carried in every log record the pool emits.
  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = Some(name.into());
    self
  }

  /// Makes the pool's shutdown token a child of `parent`: cancelling the
  /// parent cancels the pool, not the other way round.
  pub fn with_parent_token(mut self, parent: CancellationToken) -> Self {
    self.parent_token = Some(parent);
    self
  }

  /// Initial worker cap. Negative integers mean unbounded.
  pub fn with_worker_cap(mut self, cap: impl Into<WorkerCap>) -> Self {
    self.worker_cap = cap.into();
    self
  }

  /// Replaces the default panic logging with a custom recovery callback.
  pub fn with_recover<F>(mut self, recover: F) -> Self
  where
    F: Fn(&CancellationToken, Fault) + Send + Sync + 'static,
  {
    self.recover = Some(Arc::new(recover));
    self
  }

  /// Runtime the workers are spawned on. Without one the runtime current at
  /// submission time is used.
  pub fn with_runtime(mut self, handle: TokioHandle) -> Self {
    self.runtime = Some(handle);
    self
  }
}

impl fmt::Debug for PoolConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PoolConfig")
      .field("name", &self.name)
      .field("parent_token", &self.parent_token)
      .field("worker_cap", &self.worker_cap)
      .field("custom_recover", &self.recover.is_some())
      .field("runtime", &self.runtime.is_some())
      .finish()
  }
}
