use thiserror::Error;

/// The failure outcome a task submitted through `go_err` may return.
///
/// The pool logs it and drops it; it is never surfaced to the submitter.
pub type TaskError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur within the `gopool` pool.
///
/// Submission and waiting cannot fail; only hooking into the operating
/// system can.
#[derive(Error, Debug, PartialEq)]
pub enum PoolError {
  #[error("Failed to register a listener for OS signal {signal}: {reason}")]
  SignalRegistration { signal: String, reason: String },

  #[error("OS signal {0} cannot be listened for on this platform")]
  UnsupportedSignal(String),
}
