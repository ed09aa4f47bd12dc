use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Counts submitted-but-unfinished tasks and wakes waiters when the count
/// drops to zero.
#[derive(Default)]
pub(crate) struct CompletionTracker {
  outstanding: AtomicUsize,
  idle: Notify,
}

impl CompletionTracker {
  pub(crate) fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  /// Registers one outstanding task.
  ///
  /// The returned guard travels with the task and unregisters it when
  /// dropped, whether the task ran to completion, failed, panicked or was
  /// discarded without running.
  pub(crate) fn register(self: &Arc<Self>) -> Completion {
    self.outstanding.fetch_add(1, Ordering::AcqRel);
    Completion {
      tracker: Arc::clone(self),
    }
  }

  pub(crate) fn outstanding(&self) -> usize {
    self.outstanding.load(Ordering::Acquire)
  }

  /// Resolves once no task is outstanding.
  ///
  /// Registrations that race with this call extend the wait.
  pub(crate) async fn wait_idle(&self) {
    loop {
      let notified = self.idle.notified();
      tokio::pin!(notified);
      // Enabled before the check so a completion landing in between still
      // wakes us.
      notified.as_mut().enable();
      if self.outstanding() == 0 {
        return;
      }
      notified.await;
    }
  }

  fn complete_one(&self) {
    if self.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
      self.idle.notify_waiters();
    }
  }
}

impl fmt::Debug for CompletionTracker {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CompletionTracker")
      .field("outstanding", &self.outstanding())
      .finish_non_exhaustive()
  }
}

/// RAII registration of one outstanding task. Its `Drop` impl decrements
/// the tracker exactly once.
#[derive(Debug)]
pub(crate) struct Completion {
  tracker: Arc<CompletionTracker>,
}

impl Drop for Completion {
  fn drop(&mut self) {
    self.tracker.complete_one();
  }
}
