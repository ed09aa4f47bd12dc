use gopool::{Pool, PoolConfig, Signal, TaskError};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false)
    .init();
  info!("--- Graceful Shutdown Example (press Ctrl-C to stop) ---");

  let pool = Pool::new(PoolConfig::new().with_name("server_pool"));
  let listener = TcpListener::bind("127.0.0.1:8080").await?;

  // Accept loop: stops accepting once the shared token is cancelled. Every
  // connection is handled by its own pool task, so shutdown waits for them.
  let connections = pool.clone();
  pool.go_err(move |token| async move {
    loop {
      tokio::select! {
        _ = token.cancelled() => {
          info!("Server: shutdown requested, no longer accepting.");
          return Ok::<(), TaskError>(());
        }
        accepted = listener.accept() => {
          let (mut stream, peer) = accepted?;
          connections.go_err(move |_| async move {
            info!("Server: serving {} (takes 3s)", peer);
            tokio::time::sleep(Duration::from_secs(3)).await;
            stream.write_all(b"hello world\n").await?;
            info!("Server: finished {}", peer);
            Ok::<(), TaskError>(())
          });
        }
      }
    }
  });

  // Client: one request against the server above.
  pool.go_err(|_| async move {
    tokio::time::sleep(Duration::from_millis(100)).await;
    let mut stream = TcpStream::connect("127.0.0.1:8080").await?;
    let mut body = String::new();
    stream.read_to_string(&mut body).await?;
    info!("Client: got {:?}", body.trim_end());
    Ok::<(), TaskError>(())
  });

  let received = pool.wait_signal(&[Signal::Interrupt, Signal::Terminate]).await?;
  info!("Stopped after {}. All in-flight connections were served.", received);
  info!("--- Graceful Shutdown Example End ---");
  Ok(())
}
