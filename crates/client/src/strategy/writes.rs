//! Joinable background cache writes.
//!
//! Storing a response never delays the caller, but the write still has a
//! join point: [`BackgroundWrites::flush`] waits for every write spawned so
//! far, so a host can settle them before shutdown or a purge.
//!
//! Writes are tracked as plain [`JoinHandle`]s. Dropping a handle detaches the
//! task instead of aborting it, so a cancelled flush never tears down a write.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;

type Handles = Vec<JoinHandle<()>>;

#[derive(Clone, Default)]
pub struct BackgroundWrites {
    tasks: Arc<Mutex<Handles>>,
}

impl BackgroundWrites {
    pub fn new() -> Self {
        Self::default()
    }

    fn handles(&self) -> MutexGuard<'_, Handles> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn a write. Finished writes are reaped on the way.
    pub fn spawn<F>(&self, write: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.handles();
        tasks.retain(|handle| !handle.is_finished());
        tasks.push(tokio::spawn(write));
    }

    /// Wait until every write spawned before or during the call has settled.
    ///
    /// Returns how many writes were waited on. If the returned future is
    /// dropped early, writes it had not joined yet go back to the pending set.
    pub async fn flush(&self) -> usize {
        let mut settled = 0;
        loop {
            let mut batch = Batch { owner: self, handles: std::mem::take(&mut *self.handles()) };
            if batch.handles.is_empty() {
                return settled;
            }
            while let Some(handle) = batch.handles.last_mut() {
                log_join_error(handle.await);
                batch.handles.pop();
                settled += 1;
            }
        }
    }

    #[cfg(test)]
    fn pending(&self) -> usize {
        let mut tasks = self.handles();
        tasks.retain(|handle| !handle.is_finished());
        tasks.len()
    }
}

/// Handles taken out by one round of `flush`.
struct Batch<'a> {
    owner: &'a BackgroundWrites,
    handles: Handles,
}

impl Drop for Batch<'_> {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            self.owner.handles().append(&mut self.handles);
        }
    }
}

fn log_join_error(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        tracing::warn!(error = %e, "background cache write did not complete");
    }
}
