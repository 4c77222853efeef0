//! Registry of plugins currently long-polling for notifications

use std::collections::HashMap;
use std::time::Duration;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::{Result, SignalingError};
use crate::mailbox::{mailbox, MailboxReceiver, MailboxSender, TrySendError};
use crate::types::{Event, PluginId};

/// Plugin id to mailbox of the poll that plugin has outstanding.
///
/// An entry lives exactly as long as its [`PluginPoll`] guard.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    waiters: Mutex<HashMap<PluginId, MailboxSender>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a poll for `id`.
    ///
    /// Fails if that plugin already has a poll outstanding; the existing
    /// registration is left untouched.
    pub fn register(&self, id: PluginId) -> Result<PluginPoll<'_>> {
        let mut waiters = self.waiters.lock();
        if waiters.contains_key(&id) {
            return Err(SignalingError::PluginAlreadyPolling(id));
        }
        let (sender, receiver) = mailbox();
        waiters.insert(id.clone(), sender.clone());
        debug!(plugin = %id, polling = waiters.len(), "plugin poll registered");

        Ok(PluginPoll {
            registry: self,
            id,
            sender,
            receiver: Some(receiver),
        })
    }

    /// Send `event` to every polling plugin. Never blocks; mailboxes that
    /// cannot take the event are skipped. Returns the number delivered.
    pub fn broadcast(&self, event: Event) -> usize {
        let waiters = self.waiters.lock();
        let mut delivered = 0;
        for (id, sender) in waiters.iter() {
            match sender.try_send(event) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => trace!(plugin = %id, %event, "mailbox full, dropped"),
                Err(TrySendError::Closed(_)) => trace!(plugin = %id, %event, "poll finishing, dropped"),
            }
        }
        debug!(%event, delivered, polling = waiters.len(), "broadcast to plugins");
        delivered
    }

    pub fn is_polling(&self, id: &PluginId) -> bool {
        self.waiters.lock().contains_key(id)
    }

    /// Ids of all plugins currently polling
    pub fn polling(&self) -> Vec<PluginId> {
        self.waiters.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.waiters.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.lock().is_empty()
    }

    fn deregister(&self, id: &PluginId, sender: &MailboxSender) {
        let mut waiters = self.waiters.lock();
        // Only remove the entry this poll inserted.
        if waiters.get(id).is_some_and(|current| current.same_mailbox(sender)) {
            waiters.remove(id);
            debug!(plugin = %id, polling = waiters.len(), "plugin poll released");
        }
    }
}

/// An outstanding plugin poll. Dropping it releases the registry entry, which
/// also covers a request cancelled mid-wait.
#[derive(Debug)]
pub struct PluginPoll<'a> {
    registry: &'a PluginRegistry,
    id: PluginId,
    sender: MailboxSender,
    receiver: Option<MailboxReceiver>,
}

impl PluginPoll<'_> {
    pub fn plugin_id(&self) -> &PluginId {
        &self.id
    }

    /// Wait for the next event for this plugin, then release the entry
    pub async fn wait(mut self, timeout: Duration) -> Event {
        match self.receiver.take() {
            Some(receiver) => receiver.receive(timeout).await,
            None => Event::Timeout,
        }
    }
}

impl Drop for PluginPoll<'_> {
    fn drop(&mut self) {
        if let Some(receiver) = self.receiver.take() {
            if let Some(event) = receiver.close() {
                trace!(plugin = %self.id, %event, "discarding undelivered plugin event");
            }
        }
        self.registry.deregister(&self.id, &self.sender);
    }
}
