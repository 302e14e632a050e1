//! In-process fan-out of context state transitions.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::context::state::{ContextSnapshot, Section, SectionStatus};

/// One section transition and the snapshot it produced
#[derive(Debug, Clone)]
pub struct ContextEvent {
    pub epoch: u64,
    pub section: Section,
    pub status: SectionStatus,
    pub snapshot: Arc<ContextSnapshot>,
}

#[derive(Clone, Default)]
pub struct ContextBus {
    senders: Arc<Mutex<Vec<Sender<ContextEvent>>>>,
}

impl ContextBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<ContextEvent> {
        let (sender, receiver) = channel();
        self.senders.lock().push(sender);
        receiver
    }

    /// Deliver to every live subscriber; dropped receivers are forgotten.
    pub fn emit(&self, event: ContextEvent) {
        self.senders
            .lock()
            .retain(|sender| sender.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.senders.lock().len()
    }
}
