//! Running blocking CDP calls from async code.

use std::sync::Arc;

use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::Mutex;
use tokio::task::JoinError;

/// Runs blocking operations one at a time on the blocking pool.
///
/// The permit travels into the blocking closure, so a caller that stops
/// waiting (a timeout, a dropped future) does not free the gate. The next
/// operation starts only after the previous one has really returned.
#[derive(Debug, Clone, Default)]
pub struct BlockingGate {
    lock: Arc<Mutex<()>>,
}

impl BlockingGate {
    pub async fn run<T, F>(&self, op: F) -> Result<T, JoinError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let permit = Arc::clone(&self.lock).lock_owned().await;
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            op()
        })
        .await
    }
}

/// Runs a blocking closure from synchronous code that may sit on an async worker
/// (e.g. `Drop`). On a multi-threaded runtime the worker is handed off first.
pub fn off_async_worker<T>(op: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(op)
        }
        _ => op(),
    }
}
