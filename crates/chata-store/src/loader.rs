//! Concurrent bulk loading of one-record-per-file directories.
//!
//! A walker task lists the directory and spawns one parser task per entry.
//! Parsers push their results into a bounded queue that the caller drains.
//! The walker joins every parser before dropping its sender, so the queue
//! closes only after the last producer has finished. Individual failures are
//! reported to a [`LoadObserver`] and counted; they never stop the scan.

use std::future::Future;
use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::error::{Result, StoreError};

/// Capacity of the result queue between parser tasks and the consumer.
pub const LOAD_QUEUE_CAPACITY: usize = 16;

/// Receives per-file outcomes of a bulk load.
pub trait LoadObserver: Send + Sync {
    fn loaded(&self, _path: &Path) {}

    fn failed(&self, path: &Path, error: &StoreError);
}

/// Logs load outcomes through `tracing`.
#[derive(Debug, Clone, Copy)]
pub struct TracingObserver {
    /// Record kind used in log lines, e.g. `"user"`.
    pub kind: &'static str,
}

impl TracingObserver {
    pub const fn new(kind: &'static str) -> Self {
        Self { kind }
    }
}

impl LoadObserver for TracingObserver {
    fn loaded(&self, path: &Path) {
        debug!(kind = self.kind, path = %path.display(), "Loaded record");
    }

    fn failed(&self, path: &Path, err: &StoreError) {
        error!(kind = self.kind, path = %path.display(), error = %err, "Error loading record");
    }
}

/// Discards every outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl LoadObserver for NoopObserver {
    fn failed(&self, _path: &Path, _error: &StoreError) {}
}

/// Everything a bulk load produced.
#[derive(Debug)]
pub struct LoadOutcome<T> {
    pub records: Vec<T>,
    pub failures: usize,
    pub last_error: Option<StoreError>,
}

impl<T> LoadOutcome<T> {
    /// Split into the successful records and the aggregate result.
    pub fn into_parts(self) -> (Vec<T>, Result<()>) {
        let result = match self.last_error {
            None => Ok(()),
            Some(last) => Err(StoreError::Load {
                failures: self.failures,
                last: Box::new(last),
            }),
        };
        (self.records, result)
    }
}

/// Parse every regular file directly inside `dir` with `parse`, in parallel.
///
/// Fails up front only when `dir` itself cannot be listed. Sub-directories
/// and other non-regular entries are skipped.
pub async fn load_dir<T, F, Fut>(
    dir: &Path,
    observer: &dyn LoadObserver,
    parse: F,
) -> Result<LoadOutcome<T>>
where
    T: Send + 'static,
    F: Fn(PathBuf) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let mut entries = tokio::fs::read_dir(dir).await?;
    let (tx, mut rx) = mpsc::channel::<(PathBuf, Result<T>)>(LOAD_QUEUE_CAPACITY);
    let walk_root = dir.to_path_buf();

    let walker = tokio::spawn(async move {
        let mut parsers = JoinSet::new();

        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let tx = tx.clone();
                    let parse = parse.clone();
                    parsers.spawn(async move {
                        let path = entry.path();
                        let result = match entry.file_type().await {
                            Ok(file_type) if file_type.is_file() => parse(path.clone()).await,
                            Ok(_) => return,
                            Err(e) => Err(StoreError::Io(e)),
                        };
                        // The receiver outlives every sender.
                        let _ = tx.send((path, result)).await;
                    });
                }
                Ok(None) => break,
                Err(e) => {
                    let _ = tx.send((walk_root.clone(), Err(StoreError::Io(e)))).await;
                    break;
                }
            }
        }

        while let Some(joined) = parsers.join_next().await {
            if let Err(e) = joined {
                let _ = tx
                    .send((walk_root.clone(), Err(StoreError::Task(e.to_string()))))
                    .await;
            }
        }
    });

    let mut outcome = LoadOutcome {
        records: Vec::new(),
        failures: 0,
        last_error: None,
    };

    while let Some((path, result)) = rx.recv().await {
        match result {
            Ok(record) => {
                observer.loaded(&path);
                outcome.records.push(record);
            }
            Err(e) => {
                observer.failed(&path, &e);
                outcome.failures += 1;
                outcome.last_error = Some(e);
            }
        }
    }

    walker
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?;

    Ok(outcome)
}
