//! Dispatch progress events
//!
//! An in-process event bus built on `tokio::sync::broadcast`. The dispatcher
//! emits events as a batch runs; hosts subscribe to drive notices or logs.
//! Emitting never blocks: with no subscribers the event is dropped, and a
//! lagging subscriber misses the oldest events instead of slowing dispatch.
//!
//! # Example
//!
//! ```no_run
//! use libteaser::events::{Event, EventBus};
//!
//! # async fn example() {
//! let event_bus = EventBus::new(100);
//! let mut receiver = event_bus.subscribe();
//!
//! event_bus.emit(Event::DispatchStarted {
//!     subject_id: "42".to_string(),
//!     dispatch_id: "d-1".to_string(),
//!     credentials: vec!["facebook:12".to_string()],
//! });
//!
//! if let Ok(event) = receiver.recv().await {
//!     println!("Received: {:?}", event);
//! }
//! # }
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::types::{CredentialKey, OutcomeKind};

pub type EventReceiver = broadcast::Receiver<Event>;

/// Default per-subscriber buffer
pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Receive every event emitted after this call
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: Event) {
        // Err only means nobody is listening
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A batch passed the marker check and is about to publish
    DispatchStarted {
        subject_id: String,
        /// Unique per batch, for correlating log lines
        dispatch_id: String,
        /// `platform:id` of every credential in the batch
        credentials: Vec<String>,
    },

    /// One credential finished (published, failed or skipped)
    CredentialFinished {
        subject_id: String,
        dispatch_id: String,
        key: CredentialKey,
        status: OutcomeKind,
        /// Error or skip reason, if any
        detail: Option<String>,
    },

    /// Every credential finished and the marker is set
    DispatchCompleted {
        subject_id: String,
        dispatch_id: String,
        published: usize,
        failed: usize,
        skipped: usize,
    },
}
