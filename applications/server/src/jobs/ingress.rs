/// Background processing of inbound messages
///
/// The broker push endpoint hands each message to the pool and waits for a
/// worker to finish it, so a message is only acknowledged once it has been
/// applied. The queue is bounded; when it is full the message is refused
/// and the bridge redelivers later.
use crate::error::{Result, ServerError};
use crate::services::EventIngress;
use refrain_core::InboundMessage;
use std::{collections::VecDeque, sync::Arc};
use tokio::sync::{oneshot, Mutex, Notify};

/// A message plus the channel its outcome is reported on
struct Job {
    message: InboundMessage,
    done: oneshot::Sender<refrain_core::Result<()>>,
}

/// Shared work queue drained by a fixed set of worker tasks
pub struct IngressQueue {
    queue: Mutex<VecDeque<Job>>,
    notify: Notify,
    ingress: Arc<EventIngress>,
    workers: usize,
    capacity: usize,
}

impl IngressQueue {
    pub fn new(ingress: Arc<EventIngress>, workers: usize, capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            notify: Notify::new(),
            ingress,
            workers,
            capacity,
        }
    }

    /// Start worker tasks
    pub fn start(self: &Arc<Self>) {
        for worker_id in 0..self.workers {
            let queue = Arc::clone(self);
            tokio::spawn(async move {
                tracing::info!("Ingress worker {} started", worker_id);
                queue.worker_loop(worker_id).await;
            });
        }
    }

    /// Queue a decoded message and wait until a worker has handled it
    ///
    /// Fails with `Unavailable` when the queue is full, and with the handler's
    /// error when redelivering the message could succeed.
    pub async fn process(&self, message: InboundMessage) -> Result<()> {
        let kind = message.kind();
        let (done, outcome) = oneshot::channel();

        {
            let mut queue = self.queue.lock().await;
            if queue.len() >= self.capacity {
                tracing::warn!(kind, capacity = self.capacity, "Ingress queue full, refusing message");
                return Err(ServerError::Unavailable(format!(
                    "ingress queue is full ({} messages)",
                    self.capacity
                )));
            }
            queue.push_back(Job { message, done });
        }
        tracing::debug!(kind, "Enqueued inbound message");
        self.notify.notify_one();

        match outcome.await {
            Ok(result) => result.map_err(ServerError::from),
            Err(_) => Err(ServerError::Internal(format!(
                "ingress worker dropped a {kind} message"
            ))),
        }
    }

    async fn worker_loop(&self, worker_id: usize) {
        loop {
            let job = {
                let mut queue = self.queue.lock().await;
                queue.pop_front()
            };

            match job {
                Some(Job { message, done }) => {
                    tracing::debug!(worker_id, kind = message.kind(), "Processing inbound message");
                    // Chained refills run detached
                    let outcome = self.ingress.dispatch(message).await.map(drop);
                    if done.send(outcome).is_err() {
                        tracing::debug!(worker_id, "Sender went away before the outcome was ready");
                    }
                }
                None => self.notify.notified().await,
            }
        }
    }

    /// Messages waiting for a worker
    pub async fn queue_length(&self) -> usize {
        let queue = self.queue.lock().await;
        queue.len()
    }
}
