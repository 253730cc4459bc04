// src/core/autosave.rs
//! Debounced persistence. Every edit hands the scheduler a fresh snapshot and
//! restarts the quiet period; only the latest snapshot is written once the
//! period elapses without further edits.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::persistence::{Destination, Snapshot};
use crate::error::CvError;

pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq)]
pub enum SaveStatus {
    Idle,
    Pending,
    Saving,
    Saved { at: DateTime<Utc> },
    /// Transient "not saved" indicator, cleared by the next successful write
    Failed { message: String },
}

enum Command {
    Changed(Snapshot),
    Cancel,
    ClearLocal,
    Flush(Snapshot, oneshot::Sender<Result<(), CvError>>),
}

pub struct Autosave {
    tx: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<SaveStatus>,
    handle: JoinHandle<()>,
}

impl Autosave {
    /// Start the scheduler task on the current tokio runtime
    pub fn spawn(destination: Destination, quiet: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(SaveStatus::Idle);

        info!(
            "Autosave started ({} destination, {} ms quiet period)",
            destination.label(),
            quiet.as_millis()
        );
        let handle = tokio::spawn(run(destination, quiet, rx, status_tx));

        Self { tx, status, handle }
    }

    /// Replace the pending snapshot and restart the quiet period
    pub fn schedule(&self, snapshot: Snapshot) {
        if self.tx.send(Command::Changed(snapshot)).is_err() {
            warn!("Autosave task is gone, edit will not be persisted");
        }
    }

    /// Drop the pending snapshot without writing it
    pub fn cancel(&self) {
        let _ = self.tx.send(Command::Cancel);
    }

    /// Drop the pending snapshot and erase the local copy, in order with
    /// any write already queued
    pub fn clear_local(&self) {
        let _ = self.tx.send(Command::ClearLocal);
    }

    /// Write `snapshot` now, discarding whatever was pending
    pub async fn flush(&self, snapshot: Snapshot) -> Result<(), CvError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Flush(snapshot, reply_tx))
            .map_err(|_| CvError::Persistence("autosave task is not running".to_string()))?;
        reply_rx
            .await
            .map_err(|_| CvError::Persistence("autosave task stopped during flush".to_string()))?
    }

    pub fn status(&self) -> watch::Receiver<SaveStatus> {
        self.status.clone()
    }

    pub fn current_status(&self) -> SaveStatus {
        self.status.borrow().clone()
    }

    /// Stop accepting edits and wait for an in-flight write to finish.
    /// A pending, not yet due, snapshot is dropped.
    pub async fn shutdown(self) {
        let Self { tx, handle, .. } = self;
        drop(tx);
        if let Err(e) = handle.await {
            warn!("Autosave task ended abnormally: {}", e);
        }
    }
}

async fn run(
    destination: Destination,
    quiet: Duration,
    mut rx: mpsc::UnboundedReceiver<Command>,
    status: watch::Sender<SaveStatus>,
) {
    let mut pending: Option<Snapshot> = None;

    loop {
        let command = match pending.take() {
            None => match rx.recv().await {
                Some(command) => command,
                None => break,
            },
            Some(snapshot) => {
                tokio::select! {
                    command = rx.recv() => match command {
                        Some(command) => {
                            pending = Some(snapshot);
                            command
                        }
                        None => {
                            debug!("Autosave closed with a pending snapshot, dropping it");
                            break;
                        }
                    },
                    _ = tokio::time::sleep(quiet) => {
                        let _ = write(&destination, &snapshot, &status).await;
                        continue;
                    }
                }
            }
        };

        match command {
            Command::Changed(snapshot) => {
                pending = Some(snapshot);
                status.send_replace(SaveStatus::Pending);
            }
            Command::Cancel => {
                if pending.take().is_some() {
                    status.send_replace(SaveStatus::Idle);
                }
            }
            Command::ClearLocal => {
                pending = None;
                match destination.clear_local().await {
                    Ok(()) => {
                        status.send_replace(SaveStatus::Idle);
                    }
                    Err(e) => {
                        let err = CvError::persistence(e);
                        warn!("{}", err);
                        status.send_replace(SaveStatus::Failed {
                            message: err.to_string(),
                        });
                    }
                }
            }
            Command::Flush(snapshot, reply) => {
                pending = None;
                let result = write(&destination, &snapshot, &status).await;
                let _ = reply.send(result);
            }
        }
    }

    debug!("Autosave task finished");
}

async fn write(
    destination: &Destination,
    snapshot: &Snapshot,
    status: &watch::Sender<SaveStatus>,
) -> Result<(), CvError> {
    status.send_replace(SaveStatus::Saving);

    match destination.persist(snapshot).await {
        Ok(()) => {
            status.send_replace(SaveStatus::Saved { at: Utc::now() });
            Ok(())
        }
        Err(e) => {
            let err = CvError::persistence(e);
            warn!("{}", err);
            status.send_replace(SaveStatus::Failed {
                message: err.to_string(),
            });
            Err(err)
        }
    }
}
