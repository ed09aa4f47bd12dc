use crate::completion::Completion;
use crate::error::TaskError;

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

/// The future a submitted task produces once it is handed the pool's
/// shutdown token.
pub(crate) type TaskFuture = Pin<Box<dyn Future<Output = Result<(), TaskError>> + Send + 'static>>;

type TaskFn = Box<dyn FnOnce(CancellationToken) -> TaskFuture + Send + 'static>;

/// Internal representation of a submitted task while it sits in the queue
/// and while a worker runs it.
///
/// The completion guard is taken at submission time, so the pool's
/// outstanding count drops exactly once however the task ends.
pub(crate) struct QueuedTask {
  pub(crate) task_id: u64,
  run: TaskFn,
  completion: Completion,
}

impl QueuedTask {
  pub(crate) fn new<F, Fut>(task_id: u64, completion: Completion, f: F) -> Self
  where
    F: FnOnce(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
  {
    Self {
      task_id,
      run: Box::new(move |token| -> TaskFuture { Box::pin(f(token)) }),
      completion,
    }
  }

  /// Splits the task into its body and its completion guard.
  ///
  /// The body is a future that first calls the submitted closure, so a panic
  /// raised synchronously by the closure surfaces while polling it.
  pub(crate) fn into_parts(self, token: CancellationToken) -> (TaskFuture, Completion) {
    let run = self.run;
    (Box::pin(async move { run(token).await }), self.completion)
  }
}

impl fmt::Debug for QueuedTask {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("QueuedTask")
      .field("task_id", &self.task_id)
      .finish_non_exhaustive()
  }
}
