//! Supervised gateway listener
//!
//! Upstream stanzas enter through an [`InboundSender`] (fed by the bridge
//! webhook) and are drained by a single task that hands them to the
//! [`Dispatcher`] one at a time, in delivery order. Stopping closes the queue
//! to new deliveries; everything already accepted is still dispatched.

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::message::UpstreamMessage;
use crate::relay::Dispatcher;

/// Why an upstream message could not be queued
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// Queue at capacity; the bridge should redeliver
    #[error("inbound queue is full")]
    Full,
    /// Listener has stopped
    #[error("gateway listener is not running")]
    Closed,
}

/// Producer side of the inbound queue
#[derive(Clone)]
pub struct InboundSender {
    tx: mpsc::Sender<UpstreamMessage>,
}

impl InboundSender {
    /// Queue a message without waiting for capacity
    pub fn deliver(&self, message: UpstreamMessage) -> Result<(), DeliveryError> {
        self.tx.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

/// Create the bounded inbound queue
pub fn inbound_channel(capacity: usize) -> (InboundSender, mpsc::Receiver<UpstreamMessage>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (InboundSender { tx }, rx)
}

/// Single consumer of the inbound queue
pub struct GatewayListener;

impl GatewayListener {
    /// Start draining `inbound` into the dispatcher
    pub fn spawn(mut inbound: mpsc::Receiver<UpstreamMessage>, dispatcher: Dispatcher) -> ListenerHandle {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            info!("Gateway listener started");
            let mut processed: u64 = 0;

            let mut stopping = false;

            loop {
                let next = if stopping {
                    inbound.recv().await
                } else {
                    tokio::select! {
                        biased;
                        _ = &mut stop_rx => {
                            debug!("Gateway listener received stop signal, draining queue");
                            // Accepted events still run; new deliveries see `Closed`.
                            inbound.close();
                            stopping = true;
                            continue;
                        }
                        next = inbound.recv() => next,
                    }
                };

                let Some(message) = next else {
                    if !stopping {
                        warn!("Inbound queue closed");
                    }
                    break;
                };

                dispatcher.handle(&message).await;
                processed += 1;
            }

            info!("Gateway listener stopped after {} events", processed);
        });

        ListenerHandle {
            stop: Some(stop_tx),
            task,
        }
    }
}

/// Lifecycle handle for a running listener
///
/// Dropping the handle also stops the listener once the queue is drained.
pub struct ListenerHandle {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    /// Whether the listener task has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signal the listener to stop and wait until every queued event is dispatched
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(e) = (&mut self.task).await {
            error!("Gateway listener task failed: {}", e);
        }
    }
}
