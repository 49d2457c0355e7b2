//! Decision Recorder
//!
//! Bounded queue between the request path and the store. Recording is
//! best-effort: a full queue or a failing store is logged and counted,
//! never surfaced to the caller of `check_transaction`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::store::DecisionStore;
use super::types::DecisionRecord;

enum Command {
    Record(Box<DecisionRecord>),
    Flush(oneshot::Sender<()>),
}

#[derive(Debug, Default)]
struct Counters {
    recorded: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderStats {
    pub recorded: u64,
    pub dropped: u64,
    pub failed: u64,
}

pub struct DecisionRecorder {
    sender: mpsc::Sender<Command>,
    counters: Arc<Counters>,
    worker: JoinHandle<()>,
}

impl DecisionRecorder {
    /// Start the background writer. Must be called inside a tokio runtime.
    pub fn spawn(store: Arc<dyn DecisionStore>, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let counters = Arc::new(Counters::default());
        let worker = tokio::spawn(run_writer(store, receiver, counters.clone()));

        Self {
            sender,
            counters,
            worker,
        }
    }

    /// Queue a record; returns false when it was dropped
    pub fn record(&self, record: DecisionRecord) -> bool {
        let transaction_id = record.transaction_id().to_string();
        match self.sender.try_send(Command::Record(Box::new(record))) {
            Ok(()) => true,
            Err(e) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(transaction_id = %transaction_id, error = %e, "Decision record dropped");
                false
            }
        }
    }

    /// Wait until everything queued before this call has been written
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.sender.send(Command::Flush(done)).await.is_ok() {
            let _ = wait.await;
        }
    }

    pub fn stats(&self) -> RecorderStats {
        RecorderStats {
            recorded: self.counters.recorded.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    /// Drain the queue and stop the writer
    pub async fn shutdown(self) {
        drop(self.sender);
        if let Err(e) = self.worker.await {
            tracing::error!(error = %e, "Decision writer task failed");
        }
        tracing::info!(recorded = self.counters.recorded.load(Ordering::Relaxed), "Decision recorder shutdown");
    }
}

async fn run_writer(
    store: Arc<dyn DecisionStore>,
    mut receiver: mpsc::Receiver<Command>,
    counters: Arc<Counters>,
) {
    while let Some(command) = receiver.recv().await {
        match command {
            Command::Record(record) => {
                let store = store.clone();
                let transaction_id = record.transaction_id().to_string();
                let written = tokio::task::spawn_blocking(move || store.save_decision(&record)).await;

                match written {
                    Ok(Ok(())) => {
                        counters.recorded.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(Err(e)) => {
                        counters.failed.fetch_add(1, Ordering::Relaxed);
                        tracing::error!(transaction_id = %transaction_id, error = %e, "Failed to persist decision");
                    }
                    Err(e) => {
                        counters.failed.fetch_add(1, Ordering::Relaxed);
                        tracing::error!(transaction_id = %transaction_id, error = %e, "Decision write task panicked");
                    }
                }
            }
            Command::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}
