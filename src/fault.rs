use std::any::Any;
use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// A panic caught while a task was running.
///
/// Handed to the pool's recovery callback together with the pool's shared
/// token. The worker that ran the task keeps going.
pub struct Fault {
  task_id: u64,
  payload: Box<dyn Any + Send + 'static>,
}

impl Fault {
  pub(crate) fn new(task_id: u64, payload: Box<dyn Any + Send + 'static>) -> Self {
    Self { task_id, payload }
  }

  /// The pool-assigned id of the task that panicked.
  pub fn task_id(&self) -> u64 {
    self.task_id
  }

  /// The panic message, when the payload is a string (the case for
  /// `panic!` with a format string).
  pub fn message(&self) -> Option<&str> {
    if let Some(s) = self.payload.downcast_ref::<&'static str>() {
      Some(s)
    } else {
      self.payload.downcast_ref::<String>().map(String::as_str)
    }
  }

  /// The raw panic payload.
  pub fn payload(&self) -> &(dyn Any + Send + 'static) {
    &*self.payload
  }

  /// Gives back the payload, e.g. to resume the panic elsewhere with
  /// `std::panic::resume_unwind`.
  pub fn into_payload(self) -> Box<dyn Any + Send + 'static> {
    self.payload
  }
}

impl fmt::Debug for Fault {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Fault")
      .field("task_id", &self.task_id)
      .field("message", &self.message())
      .finish_non_exhaustive()
  }
}

impl fmt::Display for Fault {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.message() {
      Some(msg) => write!(f, "task {} panicked: {}", self.task_id, msg),
      None => write!(f, "task {} panicked with a non-string payload", self.task_id),
    }
  }
}

/// Recovery callback invoked once per panicking task.
pub type RecoverFn = Arc<dyn Fn(&CancellationToken, Fault) + Send + Sync + 'static>;

/// The recovery callback used when none is configured: one error record.
pub(crate) fn log_fault(pool_name: Arc<String>) -> RecoverFn {
  Arc::new(move |_token: &CancellationToken, fault: Fault| {
    tracing::error!(
      pool_name = %*pool_name,
      task_id = fault.task_id(),
      panic = %fault,
      "Task panicked during execution."
    );
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::panic::{catch_unwind, AssertUnwindSafe};

  fn capture(f: impl FnOnce()) -> Box<dyn Any + Send + 'static> {
    catch_unwind(AssertUnwindSafe(f)).expect_err("closure should panic")
  }

  #[test]
  fn test_message_from_static_str_panic() {
    let fault = Fault::new(7, capture(|| panic!("boom")));
    assert_eq!(fault.task_id(), 7);
    assert_eq!(fault.message(), Some("boom"));
    assert_eq!(fault.to_string(), "task 7 panicked: boom");
  }

  #[test]
  fn test_message_from_formatted_panic() {
    let id = 3;
    let fault = Fault::new(1, capture(move || panic!("task {id} failed")));
    assert_eq!(fault.message(), Some("task 3 failed"));
  }

  #[test]
  fn test_non_string_payload_has_no_message() {
    let fault = Fault::new(2, capture(|| std::panic::panic_any(42u32)));
    assert_eq!(fault.message(), None);
    assert_eq!(fault.payload().downcast_ref::<u32>(), Some(&42));
    assert_eq!(*fault.into_payload().downcast::<u32>().unwrap(), 42);
  }
}
