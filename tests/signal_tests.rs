#![cfg(unix)]

mod common;

use common::setup_tracing_for_test;
use gopool::{Pool, PoolConfig, Signal};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::{sleep, timeout};

fn send_to_self(sig: &str) {
  let status = Command::new("kill")
    .arg(format!("-{sig}"))
    .arg(std::process::id().to_string())
    .status()
    .expect("failed to run kill");
  assert!(status.success());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_wait_signal_cancels_and_waits_for_cleanup() {
  setup_tracing_for_test();
  // Keeps Tokio's handler installed for the whole test, so a stray delivery
  // can never fall back to the default action and kill the test binary.
  let _keep_handler = signal(SignalKind::user_defined1()).unwrap();

  let pool = Pool::new(PoolConfig::new().with_name("test_pool_wait_signal"));
  let accept_loop_stopped = Arc::new(AtomicBool::new(false));
  let drained = Arc::new(AtomicBool::new(false));

  let stopped = accept_loop_stopped.clone();
  pool.go(move |token| async move {
    // Stand-in for an accept loop that polls the shared token.
    while !token.is_cancelled() {
      sleep(Duration::from_millis(5)).await;
    }
    stopped.store(true, Ordering::SeqCst);
  });
  let done = drained.clone();
  pool.go(move |token| async move {
    token.cancelled().await;
    // Stand-in for draining open connections.
    sleep(Duration::from_millis(100)).await;
    done.store(true, Ordering::SeqCst);
  });

  let waiter = {
    let pool = pool.clone();
    tokio::spawn(async move { pool.wait_signal(&[Signal::UserDefined1]).await })
  };

  sleep(Duration::from_millis(100)).await;
  assert!(!waiter.is_finished());
  assert!(!pool.is_cancelled());

  send_to_self("USR1");

  let received = timeout(Duration::from_secs(5), waiter)
    .await
    .expect("wait_signal did not return after the signal")
    .unwrap()
    .unwrap();
  assert_eq!(received, Signal::UserDefined1);
  assert!(pool.is_cancelled());
  assert!(accept_loop_stopped.load(Ordering::SeqCst));
  assert!(drained.load(Ordering::SeqCst), "wait_signal returned before the drain finished");
  assert_eq!(pool.outstanding_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_wait_signal_ignores_signals_outside_the_set() {
  setup_tracing_for_test();
  let _keep_usr2 = signal(SignalKind::user_defined2()).unwrap();
  let _keep_hup = signal(SignalKind::hangup()).unwrap();

  let pool = Pool::new(PoolConfig::new().with_name("test_pool_signal_set"));
  let waiter = {
    let pool = pool.clone();
    tokio::spawn(async move { pool.wait_signal(&[Signal::Hangup]).await })
  };

  sleep(Duration::from_millis(100)).await;
  send_to_self("USR2");
  sleep(Duration::from_millis(100)).await;
  assert!(!waiter.is_finished());
  assert!(!pool.is_cancelled());

  send_to_self("HUP");
  let received = timeout(Duration::from_secs(5), waiter).await.unwrap().unwrap().unwrap();
  assert_eq!(received, Signal::Hangup);
  assert!(pool.is_cancelled());
}
