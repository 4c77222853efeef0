//! Call coordinator
//!
//! Owns the call state and both registries and exposes the call lifecycle as
//! plain methods. One coordinator exists per process; tests create their own.
//!
//! Lock order:
//! - `call` may be held while taking the intercom channel lock, so control
//!   messages reach the device in the order arbitration decided them.
//! - The plugin registry lock is never held together with `call`.
//! - The intercom poll path never takes `call`.
//!
//! The first rule is the one nesting that exists. The intercom lock is a leaf:
//! nothing acquires another lock while holding it, so `call -> intercom` cannot
//! form a cycle. Releasing `call` before delivering would avoid the nesting, but
//! two concurrent decisions could then reach the device out of order.

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

use crate::call_state::{AnswerOutcome, CallPhase};
use crate::config::SignalingConfig;
use crate::error::Result;
use crate::intercom::{IntercomChannel, IntercomPoll};
use crate::plugin_registry::PluginRegistry;
use crate::types::{Event, PluginId};

#[derive(Debug)]
pub struct CallCoordinator {
    config: SignalingConfig,
    call: Mutex<CallPhase>,
    plugins: PluginRegistry,
    intercom: IntercomChannel,
}

/// Point-in-time view of the coordinator, for operators
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoordinatorSnapshot {
    pub ringing: bool,
    pub answered_by: Option<PluginId>,
    pub polling_plugins: Vec<PluginId>,
    pub intercom_waiting: bool,
    pub pending: Option<Event>,
}

impl CallCoordinator {
    pub fn new(config: SignalingConfig) -> Self {
        Self {
            config,
            call: Mutex::new(CallPhase::Idle),
            plugins: PluginRegistry::new(),
            intercom: IntercomChannel::new(),
        }
    }

    pub fn config(&self) -> &SignalingConfig {
        &self.config
    }

    /// The intercom announces a call. Starts a new ring cycle and notifies
    /// every polling plugin; returns how many were reached.
    pub fn incoming_call(&self, link: impl Into<String>) -> usize {
        self.call.lock().incoming(link.into());
        info!("incoming call, ringing");
        self.plugins.broadcast(Event::Incoming)
    }

    /// The intercom reports the call was rejected before anyone answered
    pub fn rejected_call(&self) {
        self.call.lock().reject_call();
        info!("call rejected at the intercom, idle");
    }

    /// Long poll for plugin `id`
    pub async fn poll_event(&self, id: &PluginId) -> Result<Event> {
        // Always waits: a ring that is already in progress is not replayed, so a
        // plugin polling in a loop blocks until the next broadcast or timeout.
        let poll = self.plugins.register(id.clone())?;
        Ok(poll.wait(self.config.poll_timeout).await)
    }

    pub fn answer(&self, id: &PluginId) -> AnswerOutcome {
        let mut call = self.call.lock();
        let outcome = call.answer(id);
        match &outcome {
            AnswerOutcome::Answered { .. } => {
                info!(plugin = %id, "call answered");
                self.intercom.deliver(Event::Answer);
            }
            AnswerOutcome::Busy => debug!(plugin = %id, "answer refused, call already claimed"),
            AnswerOutcome::NoIncomingCall => debug!(plugin = %id, "answer refused, nothing ringing"),
        }
        outcome
    }

    pub fn cancel(&self, id: &PluginId) -> Event {
        let mut call = self.call.lock();
        let outcome = call.cancel(id);
        self.forward(id, outcome.forward);
        outcome.reply
    }

    pub fn open(&self, id: &PluginId) -> Event {
        let mut call = self.call.lock();
        let outcome = call.open(id);
        self.forward(id, outcome.forward);
        outcome.reply
    }

    pub fn reject(&self, id: &PluginId) -> Event {
        let mut call = self.call.lock();
        let outcome = call.reject(id);
        self.forward(id, outcome.forward);
        outcome.reply
    }

    /// Long poll for the intercom device
    pub async fn poll_intercom(&self) -> Result<Event> {
        match self.intercom.open_poll()? {
            IntercomPoll::Ready(event) => Ok(event),
            IntercomPoll::Waiting(wait) => Ok(wait.wait(self.config.poll_timeout).await),
        }
    }

    /// Each part is read under its own lock; the parts are not mutually
    /// consistent under concurrent traffic.
    pub fn snapshot(&self) -> CoordinatorSnapshot {
        let (ringing, answered_by) = {
            let call = self.call.lock();
            (call.is_ringing(), call.answered_by().cloned())
        };
        CoordinatorSnapshot {
            ringing,
            answered_by,
            polling_plugins: self.plugins.polling(),
            intercom_waiting: self.intercom.is_waiting(),
            pending: self.intercom.pending(),
        }
    }

    // Called with the call lock held.
    fn forward(&self, id: &PluginId, forward: Option<Event>) {
        if let Some(event) = forward {
            info!(plugin = %id, %event, "forwarding control message to intercom");
            self.intercom.deliver(event);
        }
    }
}

impl Default for CallCoordinator {
    fn default() -> Self {
        Self::new(SignalingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn coordinator() -> CallCoordinator {
        CallCoordinator::new(SignalingConfig::default().with_poll_timeout(Duration::from_millis(50)))
    }

    #[test]
    fn test_answer_forwards_to_intercom() {
        let coordinator = coordinator();
        coordinator.incoming_call("rtsp://door");

        let outcome = coordinator.answer(&PluginId::from("x"));
        assert_eq!(outcome.reply(), Event::Answered);
        assert_eq!(coordinator.snapshot().pending, Some(Event::Answer));
    }

    #[test]
    fn test_refused_operations_forward_nothing() {
        let coordinator = coordinator();
        let x = PluginId::from("x");

        assert_eq!(coordinator.answer(&x).reply(), Event::IncomingFalse);
        assert_eq!(coordinator.cancel(&x), Event::IncomingFalse);
        assert_eq!(coordinator.open(&x), Event::Rejected);
        assert_eq!(coordinator.reject(&x), Event::Rejected);
        assert_eq!(coordinator.snapshot().pending, None);
    }

    #[tokio::test]
    async fn test_poll_during_ring_waits_for_next_broadcast() {
        let coordinator = coordinator();
        let x = PluginId::from("x");
        let y = PluginId::from("y");
        coordinator.incoming_call("rtsp://door");
        coordinator.answer(&x);
        coordinator.open(&x);
        assert!(coordinator.snapshot().ringing);

        // unclaimed ring, but nothing new to report: the poll runs to its deadline
        let started = tokio::time::Instant::now();
        assert_eq!(coordinator.poll_event(&y).await.unwrap(), Event::Timeout);
        assert!(started.elapsed() >= Duration::from_millis(50));
        assert!(coordinator.snapshot().polling_plugins.is_empty());
    }

    #[tokio::test]
    async fn test_repeated_polls_in_one_ring_cycle_do_not_spin() {
        let coordinator = coordinator();
        let x = PluginId::from("x");
        coordinator.incoming_call("rtsp://door");

        let mut replies = 0;
        let _ = tokio::time::timeout(Duration::from_millis(120), async {
            loop {
                coordinator.poll_event(&x).await.unwrap();
                replies += 1;
            }
        })
        .await;
        assert!(replies <= 3, "{} replies in 120ms", replies);
    }

    #[tokio::test]
    async fn test_poll_while_claimed_waits() {
        let coordinator = coordinator();
        coordinator.incoming_call("rtsp://door");
        coordinator.answer(&PluginId::from("x"));

        let event = coordinator.poll_event(&PluginId::from("y")).await.unwrap();
        assert_eq!(event, Event::Timeout);
    }

    #[test]
    fn test_snapshot_reflects_claim() {
        let coordinator = coordinator();
        coordinator.incoming_call("rtsp://door");
        coordinator.answer(&PluginId::from("x"));

        let snapshot = coordinator.snapshot();
        assert!(snapshot.ringing);
        assert_eq!(snapshot.answered_by, Some(PluginId::from("x")));
        assert!(!snapshot.intercom_waiting);

        coordinator.rejected_call();
        let snapshot = coordinator.snapshot();
        assert!(!snapshot.ringing);
        assert_eq!(snapshot.answered_by, None);
    }
}
