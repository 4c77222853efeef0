//! Single-slot mailbox
//!
//! A mailbox hands exactly one [`Event`] from a producer to a long-polling
//! consumer. Sending never blocks: it either fills the slot or hands the event
//! back to the caller. The consumer waits with a deadline and, when the
//! deadline passes, drains the slot under the same lock a producer would take,
//! so an event that raced the timeout is still returned and every later send
//! is refused immediately.
//!
//! ```text
//!   Waiting ──send──▶ Filled(event) ──receive──▶ Closed
//!      │                                           ▲
//!      └──────── timeout / receiver dropped ───────┘
//! ```

use std::sync::Arc;
use std::time::Duration;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::trace;

use crate::types::Event;

#[derive(Debug)]
enum SlotState {
    /// A consumer is (or will shortly be) waiting and the slot is empty
    Waiting,
    /// An event was delivered and not yet taken
    Filled(Event),
    /// The consumer is done; nothing more will be taken
    Closed,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<SlotState>,
    notify: Notify,
}

/// Create a connected sender/receiver pair
pub fn mailbox() -> (MailboxSender, MailboxReceiver) {
    let shared = Arc::new(Shared {
        state: Mutex::new(SlotState::Waiting),
        notify: Notify::new(),
    });
    (
        MailboxSender { shared: shared.clone() },
        MailboxReceiver { shared },
    )
}

/// Why a send did not deliver. The event is handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrySendError {
    /// The slot already holds an undelivered event
    Full(Event),
    /// The consumer timed out or went away
    Closed(Event),
}

impl TrySendError {
    pub fn into_inner(self) -> Event {
        match self {
            TrySendError::Full(event) | TrySendError::Closed(event) => event,
        }
    }
}

/// Producer half, kept in a registry while the consumer polls
#[derive(Debug, Clone)]
pub struct MailboxSender {
    shared: Arc<Shared>,
}

impl MailboxSender {
    /// Deliver `event` without blocking
    pub fn try_send(&self, event: Event) -> Result<(), TrySendError> {
        let mut state = self.shared.state.lock();
        match *state {
            SlotState::Waiting => {
                *state = SlotState::Filled(event);
                drop(state);
                // notify_one stores a permit when nobody is parked yet, so a
                // consumer that starts waiting after this still wakes up.
                self.shared.notify.notify_one();
                Ok(())
            }
            SlotState::Filled(_) => Err(TrySendError::Full(event)),
            SlotState::Closed => Err(TrySendError::Closed(event)),
        }
    }

    /// Whether both senders feed the same mailbox
    pub fn same_mailbox(&self, other: &MailboxSender) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    pub fn is_closed(&self) -> bool {
        matches!(*self.shared.state.lock(), SlotState::Closed)
    }
}

/// Consumer half, owned by exactly one long-polling request
#[derive(Debug)]
pub struct MailboxReceiver {
    shared: Arc<Shared>,
}

impl MailboxReceiver {
    /// Wait for an event for at most `timeout`.
    ///
    /// Returns [`Event::Timeout`] when nothing arrived in time. The mailbox is
    /// closed on return either way.
    pub async fn receive(self, timeout: Duration) -> Event {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(event) = self.take() {
                return event;
            }
            if tokio::time::timeout_at(deadline, self.shared.notify.notified())
                .await
                .is_err()
            {
                trace!("mailbox wait timed out, draining slot");
                return self.close().unwrap_or(Event::Timeout);
            }
        }
    }

    /// Close the mailbox and return whatever was left in the slot
    pub fn close(&self) -> Option<Event> {
        let mut state = self.shared.state.lock();
        match std::mem::replace(&mut *state, SlotState::Closed) {
            SlotState::Filled(event) => Some(event),
            SlotState::Waiting | SlotState::Closed => None,
        }
    }

    fn take(&self) -> Option<Event> {
        let mut state = self.shared.state.lock();
        if let SlotState::Filled(event) = *state {
            *state = SlotState::Closed;
            Some(event)
        } else {
            None
        }
    }
}

impl Drop for MailboxReceiver {
    fn drop(&mut self) {
        // A cancelled poll must not leave producers thinking someone listens.
        *self.shared.state.lock() = SlotState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_before_receive_is_not_lost() {
        let (tx, rx) = mailbox();
        tx.try_send(Event::Incoming).unwrap();

        let event = rx.receive(Duration::from_millis(50)).await;
        assert_eq!(event, Event::Incoming);
    }

    #[tokio::test]
    async fn test_send_while_waiting_wakes_receiver() {
        let (tx, rx) = mailbox();
        let waiter = tokio::spawn(rx.receive(Duration::from_secs(5)));

        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.try_send(Event::Open).unwrap();

        assert_eq!(waiter.await.unwrap(), Event::Open);
    }

    #[tokio::test]
    async fn test_timeout_returns_sentinel_and_closes() {
        let (tx, rx) = mailbox();
        let event = rx.receive(Duration::from_millis(20)).await;

        assert_eq!(event, Event::Timeout);
        assert!(tx.is_closed());
        assert_eq!(tx.try_send(Event::Answer), Err(TrySendError::Closed(Event::Answer)));
    }

    #[test]
    fn test_capacity_is_one() {
        let (tx, _rx) = mailbox();
        tx.try_send(Event::Answer).unwrap();

        let err = tx.try_send(Event::Open).unwrap_err();
        assert_eq!(err, TrySendError::Full(Event::Open));
        assert_eq!(err.into_inner(), Event::Open);
    }

    #[test]
    fn test_close_drains_filled_slot() {
        let (tx, rx) = mailbox();
        tx.try_send(Event::Cancel).unwrap();

        assert_eq!(rx.close(), Some(Event::Cancel));
        assert_eq!(rx.close(), None);
    }

    #[test]
    fn test_dropped_receiver_refuses_sends() {
        let (tx, rx) = mailbox();
        let other = tx.clone();
        drop(rx);

        assert!(tx.same_mailbox(&other));
        assert!(matches!(tx.try_send(Event::Reject), Err(TrySendError::Closed(_))));
    }
}
