//! OS termination signals the shutdown sequence can wait for.
//!
//! Listeners are registered eagerly by [`listen`] so a signal that arrives
//! between registration and the first poll is not lost.
//!
//! On Unix every [`Signal`] variant maps to a `tokio::signal::unix`
//! listener. Elsewhere only [`Signal::Interrupt`] is available, through
//! [`tokio::signal::ctrl_c`].

use crate::error::PoolError;

use std::fmt;

/// An operating system signal that can trigger graceful shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
  /// `SIGINT`, Ctrl-C in a terminal.
  Interrupt,
  /// `SIGTERM`, the default kill signal used by systemd and Kubernetes.
  Terminate,
  /// `SIGQUIT`.
  Quit,
  /// `SIGHUP`.
  Hangup,
  /// `SIGUSR1`.
  UserDefined1,
  /// `SIGUSR2`.
  UserDefined2,
}

impl Signal {
  /// What `wait_signal` listens for when given an empty set.
  pub const DEFAULT_SHUTDOWN: [Signal; 2] = [Signal::Interrupt, Signal::Terminate];

  pub fn as_str(&self) -> &'static str {
    match self {
      Signal::Interrupt => "SIGINT",
      Signal::Terminate => "SIGTERM",
      Signal::Quit => "SIGQUIT",
      Signal::Hangup => "SIGHUP",
      Signal::UserDefined1 => "SIGUSR1",
      Signal::UserDefined2 => "SIGUSR2",
    }
  }

  #[cfg(unix)]
  fn kind(self) -> tokio::signal::unix::SignalKind {
    use tokio::signal::unix::SignalKind;
    match self {
      Signal::Interrupt => SignalKind::interrupt(),
      Signal::Terminate => SignalKind::terminate(),
      Signal::Quit => SignalKind::quit(),
      Signal::Hangup => SignalKind::hangup(),
      Signal::UserDefined1 => SignalKind::user_defined1(),
      Signal::UserDefined2 => SignalKind::user_defined2(),
    }
  }
}

impl fmt::Display for Signal {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Registered listeners for a set of signals.
pub(crate) struct SignalListener {
  #[cfg(unix)]
  streams: Vec<(Signal, tokio::signal::unix::Signal)>,
}

/// Registers a listener for every signal in `signals`, or for
/// [`Signal::DEFAULT_SHUTDOWN`] when the slice is empty.
///
/// Must be called from within a Tokio runtime.
#[cfg(unix)]
pub(crate) fn listen(signals: &[Signal]) -> Result<SignalListener, PoolError> {
  let signals = if signals.is_empty() {
    &Signal::DEFAULT_SHUTDOWN[..]
  } else {
    signals
  };

  let mut streams = Vec::with_capacity(signals.len());
  for &signal in signals {
    if streams.iter().any(|(registered, _)| *registered == signal) {
      continue;
    }
    let stream = tokio::signal::unix::signal(signal.kind()).map_err(|e| PoolError::SignalRegistration {
      signal: signal.to_string(),
      reason: e.to_string(),
    })?;
    streams.push((signal, stream));
  }
  Ok(SignalListener { streams })
}

#[cfg(not(unix))]
pub(crate) fn listen(signals: &[Signal]) -> Result<SignalListener, PoolError> {
  if let Some(unsupported) = signals.iter().find(|s| **s != Signal::Interrupt) {
    return Err(PoolError::UnsupportedSignal(unsupported.to_string()));
  }
  Ok(SignalListener {})
}

impl SignalListener {
  /// Resolves with the first signal received.
  #[cfg(unix)]
  pub(crate) async fn recv(mut self) -> Signal {
    let pending = self.streams.iter_mut().map(|(signal, stream)| {
      let signal = *signal;
      Box::pin(async move {
        stream.recv().await;
        signal
      })
    });
    let (received, _, _) = futures::future::select_all(pending).await;
    received
  }

  #[cfg(not(unix))]
  pub(crate) async fn recv(self) -> Signal {
    if let Err(e) = tokio::signal::ctrl_c().await {
      tracing::error!("Failed to listen for Ctrl-C: {}", e);
    }
    Signal::Interrupt
  }
}

impl fmt::Debug for SignalListener {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut s = f.debug_struct("SignalListener");
    #[cfg(unix)]
    s.field(
      "signals",
      &self.streams.iter().map(|(signal, _)| *signal).collect::<Vec<_>>(),
    );
    s.finish()
  }
}
