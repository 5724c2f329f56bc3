//! Background batch writer.
//!
//! Lines handed to [`BatchWriter::enqueue`] are buffered per database and
//! written by a tokio task when `batch_actions` lines are pending, when the
//! flush interval elapses, and once more on close. The task never outlives
//! the runtime and never blocks its shutdown.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::ClientConfig;
use crate::error::{BridgeError, BridgeResult};

/// Destination of flushed batches.
pub trait LineSink: Send + Sync + 'static {
    /// Write newline-joined line-protocol records to `database`.
    fn write_lines(&self, database: &str, body: String) -> impl Future<Output = BridgeResult<()>> + Send;
}

#[derive(Debug)]
struct BatchLine {
    database: String,
    line: String,
}

#[derive(Default)]
struct PendingBatch {
    by_database: BTreeMap<String, Vec<String>>,
    len: usize,
}

impl PendingBatch {
    fn push(&mut self, entry: BatchLine) {
        self.by_database
            .entry(entry.database)
            .or_default()
            .push(entry.line);
        self.len += 1;
    }

    fn take(&mut self) -> BTreeMap<String, Vec<String>> {
        self.len = 0;
        std::mem::take(&mut self.by_database)
    }
}

/// Handle to a running flush task.
pub struct BatchWriter {
    endpoint: String,
    tx: mpsc::Sender<BatchLine>,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl BatchWriter {
    /// Start the flush task on the current tokio runtime.
    pub fn spawn<S: LineSink>(
        sink: Arc<S>,
        config: &ClientConfig,
        endpoint: impl Into<String>,
    ) -> Result<Self, tokio::runtime::TryCurrentError> {
        let runtime = tokio::runtime::Handle::try_current()?;
        let endpoint = endpoint.into();
        let (tx, rx) = mpsc::channel(config.buffer_limit.max(1));
        let (shutdown, shutdown_rx) = watch::channel(false);

        let task = runtime.spawn(run_flusher(
            sink,
            rx,
            shutdown_rx,
            config.batch_actions.max(1),
            config.flush_interval(),
            endpoint.clone(),
        ));

        Ok(BatchWriter {
            endpoint,
            tx,
            shutdown,
            task: Mutex::new(Some(task)),
        })
    }

    /// Queue one line for `database`. Waits while the buffer is full.
    pub async fn enqueue(&self, database: &str, line: impl Into<String>) -> BridgeResult<()> {
        let entry = BatchLine {
            database: database.to_string(),
            line: line.into(),
        };
        self.tx
            .send(entry)
            .await
            .map_err(|_| BridgeError::ClientClosed {
                endpoint: self.endpoint.clone(),
            })
    }

    /// Whether the flush task is still accepting lines.
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Flush pending lines and stop the task.
    pub async fn close(&self) -> Result<(), tokio::task::JoinError> {
        let _ = self.shutdown.send(true);
        let task = self.task.lock().take();
        match task {
            Some(task) => task.await,
            None => Ok(()),
        }
    }
}

impl Drop for BatchWriter {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

async fn run_flusher<S: LineSink>(
    sink: Arc<S>,
    mut rx: mpsc::Receiver<BatchLine>,
    mut shutdown: watch::Receiver<bool>,
    batch_actions: usize,
    flush_interval: Duration,
    endpoint: String,
) {
    let mut pending = PendingBatch::default();
    let mut ticker = tokio::time::interval(flush_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            entry = rx.recv() => match entry {
                Some(entry) => {
                    pending.push(entry);
                    if pending.len >= batch_actions {
                        flush(sink.as_ref(), &mut pending, &endpoint).await;
                    }
                }
                None => break,
            },
            _ = ticker.tick() => flush(sink.as_ref(), &mut pending, &endpoint).await,
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    rx.close();
    while let Ok(entry) = rx.try_recv() {
        pending.push(entry);
    }
    flush(sink.as_ref(), &mut pending, &endpoint).await;
    tracing::debug!(endpoint = %endpoint, "batch_flusher_stopped");
}

async fn flush<S: LineSink>(sink: &S, pending: &mut PendingBatch, endpoint: &str) {
    if pending.len == 0 {
        return;
    }
    for (database, lines) in pending.take() {
        let count = lines.len();
        if let Err(e) = sink.write_lines(&database, lines.join("\n")).await {
            // Background writes have no caller to report to
            tracing::warn!(endpoint, database = %database, lines = count, error = %e, "batch_flush_failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingSink {
        writes: Mutex<Vec<(String, String)>>,
        fail_first: AtomicUsize,
    }

    impl LineSink for RecordingSink {
        fn write_lines(
            &self,
            database: &str,
            body: String,
        ) -> impl Future<Output = BridgeResult<()>> + Send {
            let failing = self
                .fail_first
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if !failing {
                self.writes.lock().push((database.to_string(), body));
            }
            async move {
                if failing {
                    Err(BridgeError::Write {
                        status: 500,
                        message: "timeout".to_string(),
                    })
                } else {
                    Ok(())
                }
            }
        }
    }

    fn slow_config(batch_actions: usize) -> ClientConfig {
        ClientConfig {
            batch_actions,
            flush_interval_ms: 60_000,
            buffer_limit: 16,
            ..ClientConfig::default()
        }
    }

    async fn wait_for_writes(sink: &RecordingSink, n: usize) {
        for _ in 0..200 {
            if sink.writes.lock().len() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {n} batch writes");
    }

    #[tokio::test]
    async fn test_flushes_when_batch_full() {
        let sink = Arc::new(RecordingSink::default());
        let writer = BatchWriter::spawn(Arc::clone(&sink), &slow_config(2), "test").unwrap();

        writer.enqueue("metrics", "cpu value=1").await.unwrap();
        writer.enqueue("metrics", "cpu value=2").await.unwrap();
        wait_for_writes(&sink, 1).await;

        let writes = sink.writes.lock().clone();
        assert_eq!(writes, vec![("metrics".to_string(), "cpu value=1\ncpu value=2".to_string())]);
        writer.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_flushes_pending_per_database() {
        let sink = Arc::new(RecordingSink::default());
        let writer = BatchWriter::spawn(Arc::clone(&sink), &slow_config(100), "test").unwrap();

        writer.enqueue("a", "m v=1").await.unwrap();
        writer.enqueue("b", "m v=2").await.unwrap();
        writer.enqueue("a", "m v=3").await.unwrap();
        writer.close().await.unwrap();

        let writes = sink.writes.lock().clone();
        assert_eq!(
            writes,
            vec![
                ("a".to_string(), "m v=1\nm v=3".to_string()),
                ("b".to_string(), "m v=2".to_string()),
            ]
        );
        assert!(!writer.is_running());
    }

    #[tokio::test]
    async fn test_enqueue_after_close_fails() {
        let sink = Arc::new(RecordingSink::default());
        let writer = BatchWriter::spawn(sink, &slow_config(10), "http://db?username=u").unwrap();
        writer.close().await.unwrap();

        let err = writer.enqueue("metrics", "cpu value=1").await.unwrap_err();
        assert!(matches!(err, BridgeError::ClientClosed { .. }));
        // Second close is a no-op
        writer.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_flush_does_not_stop_flusher() {
        let sink = Arc::new(RecordingSink {
            fail_first: AtomicUsize::new(1),
            ..RecordingSink::default()
        });
        let writer = BatchWriter::spawn(Arc::clone(&sink), &slow_config(1), "test").unwrap();

        writer.enqueue("metrics", "lost value=1").await.unwrap();
        writer.enqueue("metrics", "kept value=2").await.unwrap();
        wait_for_writes(&sink, 1).await;

        assert_eq!(sink.writes.lock()[0].1, "kept value=2");
        writer.close().await.unwrap();
    }

    #[test]
    fn test_spawn_requires_runtime() {
        let sink = Arc::new(RecordingSink::default());
        assert!(BatchWriter::spawn(sink, &ClientConfig::default(), "test").is_err());
    }
}
