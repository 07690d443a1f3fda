//! Live feed of inbound gateway traffic
//!
//! At most one viewer is attached at a time; attaching replaces the previous
//! one, whose stream then ends. Publishing never waits: a contended slot, a
//! full buffer or a departed viewer simply drops the event.

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

use crate::gateway::UpstreamMessage;

/// Events buffered for a slow viewer before dropping
const LIVE_BUFFER: usize = 64;

/// Optional single-viewer mirror of upstream messages
#[derive(Clone, Default)]
pub struct LiveFeed {
    sink: Arc<Mutex<Option<mpsc::Sender<UpstreamMessage>>>>,
}

impl LiveFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a viewer, replacing any existing one
    pub fn attach(&self) -> mpsc::Receiver<UpstreamMessage> {
        let (tx, rx) = mpsc::channel(LIVE_BUFFER);
        let previous = self
            .sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(tx);
        if previous.is_some() {
            debug!("Live viewer replaced");
        }
        rx
    }

    /// Detach the current viewer, if any
    pub fn detach(&self) {
        self.sink.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    pub fn is_attached(&self) -> bool {
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Mirror a message to the viewer. Returns whether it was handed over.
    pub fn publish(&self, message: &UpstreamMessage) -> bool {
        let Ok(mut slot) = self.sink.try_lock() else {
            return false;
        };
        let Some(tx) = slot.as_ref() else {
            return false;
        };

        match tx.try_send(message.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!("Live viewer lagging, dropping event");
                false
            }
            Err(TrySendError::Closed(_)) => {
                slot.take();
                debug!("Live viewer gone, detached");
                false
            }
        }
    }
}
