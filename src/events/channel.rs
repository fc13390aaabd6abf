//! Unbounded crossbeam channel between the organizer core and its presenter.

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::Event;

/// Handed to discovery, gathering and placement workers.
///
/// Sending never blocks. Once the receiver is gone events are dropped.
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    pub fn send(&self, event: Event) {
        let _ = self.inner.send(event);
    }
}

/// Presentation side of the channel
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Blocks for each event until every sender has been dropped
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }

    /// Events already queued, without waiting for more
    pub fn drain(&self) -> Vec<Event> {
        self.inner.try_iter().collect()
    }
}

pub struct EventChannel;

impl EventChannel {
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (EventSender, EventReceiver) {
        let (inner_tx, inner_rx) = unbounded();
        (
            EventSender { inner: inner_tx },
            EventReceiver { inner: inner_rx },
        )
    }
}

/// For callers that run a pipeline without watching its progress.
pub fn null_sender() -> EventSender {
    EventChannel::new().0
}
