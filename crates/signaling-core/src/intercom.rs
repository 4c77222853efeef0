//! Channel between the answering plugin and the intercom device
//!
//! At most one device poll is registered at a time. Control messages produced
//! while nobody is polling (or while the current poll is winding down) are
//! kept in a single pending slot, newest wins, and handed to the next poll
//! without waiting.

use std::time::Duration;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{Result, SignalingError};
use crate::mailbox::{mailbox, MailboxReceiver, MailboxSender};
use crate::types::Event;

#[derive(Debug, Default)]
struct IntercomSlot {
    waiter: Option<MailboxSender>,
    pending: Option<Event>,
}

#[derive(Debug, Default)]
pub struct IntercomChannel {
    slot: Mutex<IntercomSlot>,
}

/// Outcome of starting a device poll
#[derive(Debug)]
pub enum IntercomPoll<'a> {
    /// A buffered message was waiting; no need to block
    Ready(Event),
    /// Registered as the waiter
    Waiting(IntercomWait<'a>),
}

impl IntercomChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a device poll: drain the pending message if there is one,
    /// otherwise register as the single waiter.
    pub fn open_poll(&self) -> Result<IntercomPoll<'_>> {
        let mut slot = self.slot.lock();
        if slot.waiter.is_some() {
            return Err(SignalingError::IntercomAlreadyPolling);
        }
        if let Some(event) = slot.pending.take() {
            debug!(%event, "intercom poll drained pending message");
            return Ok(IntercomPoll::Ready(event));
        }

        let (sender, receiver) = mailbox();
        slot.waiter = Some(sender.clone());
        debug!("intercom poll registered");
        Ok(IntercomPoll::Waiting(IntercomWait {
            channel: self,
            sender,
            receiver: Some(receiver),
        }))
    }

    /// Deliver a control message to the device, buffering it when it cannot
    /// be handed over right now.
    pub fn deliver(&self, event: Event) {
        let mut slot = self.slot.lock();
        if let Some(waiter) = &slot.waiter {
            match waiter.try_send(event) {
                Ok(()) => {
                    debug!(%event, "intercom message delivered");
                    return;
                }
                Err(err) => {
                    debug!(?err, "intercom waiter cannot take message, buffering");
                }
            }
        }
        if let Some(previous) = slot.pending.replace(event) {
            debug!(%previous, %event, "pending intercom message overwritten");
        } else {
            debug!(%event, "intercom message buffered");
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.slot.lock().waiter.is_some()
    }

    /// Message that the next poll would receive immediately
    pub fn pending(&self) -> Option<Event> {
        self.slot.lock().pending
    }

    fn release(&self, sender: &MailboxSender, receiver: Option<MailboxReceiver>) {
        let mut slot = self.slot.lock();
        // Close under the channel lock so a concurrent deliver either landed
        // in the mailbox (recovered here) or sees no waiter and buffers.
        if let Some(event) = receiver.and_then(|receiver| receiver.close()) {
            debug!(%event, "returning undelivered intercom message to pending");
            slot.pending.get_or_insert(event);
        }
        if slot.waiter.as_ref().is_some_and(|current| current.same_mailbox(sender)) {
            slot.waiter = None;
            debug!("intercom poll released");
        }
    }
}

/// A registered device poll. Dropping it frees the waiter slot.
#[derive(Debug)]
pub struct IntercomWait<'a> {
    channel: &'a IntercomChannel,
    sender: MailboxSender,
    receiver: Option<MailboxReceiver>,
}

impl IntercomWait<'_> {
    /// Wait for the next control message, then free the waiter slot
    pub async fn wait(mut self, timeout: Duration) -> Event {
        match self.receiver.take() {
            Some(receiver) => receiver.receive(timeout).await,
            None => Event::Timeout,
        }
    }
}

impl Drop for IntercomWait<'_> {
    fn drop(&mut self) {
        self.channel.release(&self.sender, self.receiver.take());
    }
}
