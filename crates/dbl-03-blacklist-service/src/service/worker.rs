//! Serialized update worker
//!
//! Update requests go through an unbounded queue to a single consumer
//! task, so cycles never overlap and run in submission order. Each cycle
//! runs on the blocking pool; the submitter gets the outcome through a
//! oneshot reply.

use std::sync::Arc;

use shared_types::BlacklistSource;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use super::registry::FilterRegistry;
use crate::domain::UpdateSummary;
use crate::error::RegistryError;

type UpdateResult = Result<UpdateSummary, RegistryError>;

struct UpdateJob {
    sources: Vec<BlacklistSource>,
    reply: oneshot::Sender<UpdateResult>,
}

/// Handle for one submitted update cycle
///
/// Dropping the ticket does not cancel the cycle.
#[derive(Debug)]
pub struct UpdateTicket {
    receiver: oneshot::Receiver<UpdateResult>,
}

impl UpdateTicket {
    fn failed(error: RegistryError) -> Self {
        let (reply, receiver) = oneshot::channel();
        let _ = reply.send(Err(error));
        Self { receiver }
    }

    /// Wait for the cycle to finish
    pub async fn wait(self) -> UpdateResult {
        self.receiver
            .await
            .unwrap_or(Err(RegistryError::WorkerStopped))
    }
}

pub struct UpdateWorker {
    sender: Option<mpsc::UnboundedSender<UpdateJob>>,
    handle: Option<JoinHandle<()>>,
}

impl UpdateWorker {
    /// Spawn the consumer task. Must be called within a Tokio runtime.
    pub fn spawn(registry: Arc<FilterRegistry>) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<UpdateJob>();

        let handle = tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                let registry = registry.clone();
                let UpdateJob { sources, reply } = job;

                let result =
                    match tokio::task::spawn_blocking(move || registry.apply_update(&sources))
                        .await
                    {
                        Ok(result) => result,
                        Err(e) => {
                            error!(error = %e, "Update cycle panicked");
                            Err(RegistryError::WorkerPanicked(e.to_string()))
                        }
                    };

                if reply.send(result).is_err() {
                    debug!("Update ticket dropped before completion");
                }
            }
            debug!("Update worker stopped");
        });

        Self {
            sender: Some(sender),
            handle: Some(handle),
        }
    }

    pub fn submit(&self, sources: Vec<BlacklistSource>) -> UpdateTicket {
        let Some(sender) = &self.sender else {
            return UpdateTicket::failed(RegistryError::WorkerStopped);
        };

        let (reply, receiver) = oneshot::channel();
        match sender.send(UpdateJob { sources, reply }) {
            Ok(()) => UpdateTicket { receiver },
            Err(_) => UpdateTicket::failed(RegistryError::WorkerStopped),
        }
    }

    /// Stop accepting jobs and wait for queued cycles to finish.
    pub async fn shutdown(&mut self) -> Result<(), RegistryError> {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            handle
                .await
                .map_err(|e| RegistryError::WorkerPanicked(e.to_string()))?;
        }
        Ok(())
    }
}
