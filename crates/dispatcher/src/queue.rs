//! Job queue endpoints
//!
//! [`JobSubmitter`] is the producer side of the ingestion queue,
//! [`JobReceiver`] the worker side of the job queue.
//!
//! Both queues are rendezvous points: every job travels with a oneshot
//! acknowledgement, and the sender counts the job as handed over only once
//! the receiver has acknowledged it. A job whose sender stopped waiting is
//! skipped by the receiver.

use async_channel::Receiver;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use contracts::Job;

use crate::error::DispatcherError;

/// A job waiting to be accepted
#[derive(Debug)]
pub(crate) struct Handoff {
    job: Job,
    ack: oneshot::Sender<()>,
}

impl Handoff {
    /// Wrap `job`, returning the receiver that resolves once it is accepted
    pub(crate) fn new(job: Job) -> (Self, oneshot::Receiver<()>) {
        let (ack, accepted) = oneshot::channel();
        (Self { job, ack }, accepted)
    }

    /// Acknowledge and take the job; `None` if the sender gave up on it
    pub(crate) fn accept(self) -> Option<Job> {
        match self.ack.send(()) {
            Ok(()) => Some(self.job),
            Err(()) => {
                debug!(job_id = %self.job.id, "hand-off withdrawn, job skipped");
                None
            }
        }
    }

    pub(crate) fn job(&self) -> &Job {
        &self.job
    }
}

/// Sending side of the ingestion queue
#[derive(Debug, Clone)]
pub struct JobSubmitter {
    tx: mpsc::Sender<Handoff>,
}

impl JobSubmitter {
    pub(crate) fn new(tx: mpsc::Sender<Handoff>) -> Self {
        Self { tx }
    }

    /// Hand a job to the dispatcher, waiting until the dispatcher takes it.
    ///
    /// # Errors
    /// `DispatcherError::Closed` once the dispatcher has shut down, including
    /// when it shuts down while this job is still queued.
    pub async fn submit(&self, job: Job) -> Result<(), DispatcherError> {
        let (handoff, accepted) = Handoff::new(job);
        self.tx
            .send(handoff)
            .await
            .map_err(|_| DispatcherError::Closed)?;
        accepted.await.map_err(|_| DispatcherError::Closed)
    }
}

/// Receiving side of the job queue, shared by all workers
#[derive(Debug, Clone)]
pub struct JobReceiver {
    rx: Receiver<Handoff>,
}

impl JobReceiver {
    pub(crate) fn new(rx: Receiver<Handoff>) -> Self {
        Self { rx }
    }

    /// Next accepted job, or `None` once the queue is closed and drained.
    ///
    /// Jobs the dispatcher abandoned while they sat in the queue are skipped.
    pub async fn recv(&self) -> Option<Job> {
        loop {
            let handoff = self.rx.recv().await.ok()?;
            if let Some(job) = handoff.accept() {
                return Some(job);
            }
        }
    }
}
