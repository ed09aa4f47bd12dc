use gopool::{Pool, PoolConfig};
use std::time::Duration;
use tracing::{info, warn};

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false)
    .init();
  info!("--- Task Panic Example ---");

  let pool = Pool::new(
    PoolConfig::new()
      .with_name("panic_pool")
      .with_worker_cap(1)
      .with_recover(|token, fault| {
        warn!(
          task_id = fault.task_id(),
          cancelled = token.is_cancelled(),
          "Recovered from a panicking task: {}",
          fault
        );
      }),
  );

  pool.go(|_| async {
    info!("Panicking Task: Starting...");
    tokio::time::sleep(Duration::from_millis(100)).await;
    info!("Panicking Task: About to panic!");
    panic!("This task is designed to panic!");
  });

  pool.go(|_| async {
    info!("Normal Task: runs on the same single worker after the panic.");
  });

  pool.wait().await;
  info!("Pool still usable; workers live: {}", pool.worker_count());
  info!("--- Task Panic Example End ---");
}
