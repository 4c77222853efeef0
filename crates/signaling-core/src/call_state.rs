//! Call state machine
//!
//! Pure transitions over [`CallPhase`]. Locking is the caller's job: the
//! coordinator runs every read-decide-write below inside one critical section,
//! which is what makes a ring cycle have exactly one winner.

use crate::types::{Event, PluginId};

/// Phase of the single call the intercom can have
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CallPhase {
    /// Nothing is ringing
    #[default]
    Idle,
    /// Ringing, nobody has picked up
    Ringing { link: String },
    /// Ringing and claimed by one plugin
    Claimed { by: PluginId, link: String },
}

/// Result of an answer attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// The caller won the ring cycle
    Answered { link: String },
    Busy,
    NoIncomingCall,
}

impl AnswerOutcome {
    /// Event reported back to the plugin
    pub fn reply(&self) -> Event {
        match self {
            AnswerOutcome::Answered { .. } => Event::Answered,
            AnswerOutcome::Busy => Event::Busy,
            AnswerOutcome::NoIncomingCall => Event::IncomingFalse,
        }
    }

    /// Video link handed to the winner, empty for everybody else
    pub fn link(&self) -> &str {
        match self {
            AnswerOutcome::Answered { link } => link,
            _ => "",
        }
    }
}

/// Result of cancel/open/reject: the reply for the plugin and the message, if
/// any, that has to reach the intercom device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlOutcome {
    pub reply: Event,
    pub forward: Option<Event>,
}

impl ControlOutcome {
    fn reply(reply: Event) -> Self {
        Self { reply, forward: None }
    }

    fn forward(reply: Event, forward: Event) -> Self {
        Self { reply, forward: Some(forward) }
    }
}

impl CallPhase {
    pub fn is_ringing(&self) -> bool {
        !matches!(self, CallPhase::Idle)
    }

    pub fn answered_by(&self) -> Option<&PluginId> {
        match self {
            CallPhase::Claimed { by, .. } => Some(by),
            _ => None,
        }
    }

    fn is_claimed_by(&self, id: &PluginId) -> bool {
        self.answered_by() == Some(id)
    }

    /// New ring cycle; any previous claim is dropped
    pub fn incoming(&mut self, link: String) {
        *self = CallPhase::Ringing { link };
    }

    /// Administrative force to idle
    pub fn reject_call(&mut self) {
        *self = CallPhase::Idle;
    }

    pub fn answer(&mut self, id: &PluginId) -> AnswerOutcome {
        match self {
            CallPhase::Idle => AnswerOutcome::NoIncomingCall,
            CallPhase::Claimed { .. } => AnswerOutcome::Busy,
            CallPhase::Ringing { link } => {
                let link = std::mem::take(link);
                *self = CallPhase::Claimed { by: id.clone(), link: link.clone() };
                AnswerOutcome::Answered { link }
            }
        }
    }

    /// The answering plugin backs out; the call keeps ringing for others
    pub fn cancel(&mut self, id: &PluginId) -> ControlOutcome {
        if !self.is_ringing() {
            return ControlOutcome::reply(Event::IncomingFalse);
        }
        if !self.is_claimed_by(id) {
            return ControlOutcome::reply(Event::Busy);
        }
        self.release_claim();
        ControlOutcome::forward(Event::Canceled, Event::Cancel)
    }

    /// The answering plugin opens the door; the claim is released
    pub fn open(&mut self, id: &PluginId) -> ControlOutcome {
        if !self.is_ringing() {
            return ControlOutcome::reply(Event::Rejected);
        }
        if !self.is_claimed_by(id) {
            return ControlOutcome::reply(Event::WrongId);
        }
        self.release_claim();
        ControlOutcome::forward(Event::Opened, Event::Open)
    }

    /// The answering plugin declines; the ring cycle ends
    pub fn reject(&mut self, id: &PluginId) -> ControlOutcome {
        if !self.is_ringing() {
            return ControlOutcome::reply(Event::Rejected);
        }
        if !self.is_claimed_by(id) {
            return ControlOutcome::reply(Event::WrongId);
        }
        *self = CallPhase::Idle;
        ControlOutcome::forward(Event::Rejected, Event::Reject)
    }

    fn release_claim(&mut self) {
        if let CallPhase::Claimed { link, .. } = self {
            let link = std::mem::take(link);
            *self = CallPhase::Ringing { link };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ringing() -> CallPhase {
        let mut phase = CallPhase::default();
        phase.incoming("rtsp://door/1".to_string());
        phase
    }

    #[test]
    fn test_answer_claims_ringing_call() {
        let mut phase = ringing();
        let x = PluginId::from("x");

        let outcome = phase.answer(&x);
        assert_eq!(outcome, AnswerOutcome::Answered { link: "rtsp://door/1".to_string() });
        assert_eq!(outcome.reply(), Event::Answered);
        assert_eq!(phase.answered_by(), Some(&x));
        assert!(phase.is_ringing());
    }

    #[test]
    fn test_second_answer_is_busy() {
        let mut phase = ringing();
        phase.answer(&PluginId::from("x"));

        let outcome = phase.answer(&PluginId::from("y"));
        assert_eq!(outcome, AnswerOutcome::Busy);
        assert_eq!(outcome.link(), "");
        assert_eq!(phase.answered_by(), Some(&PluginId::from("x")));
    }

    #[test]
    fn test_idle_operations_do_not_mutate() {
        let mut phase = CallPhase::Idle;
        let x = PluginId::from("x");

        assert_eq!(phase.answer(&x), AnswerOutcome::NoIncomingCall);
        assert_eq!(phase.cancel(&x), ControlOutcome::reply(Event::IncomingFalse));
        assert_eq!(phase.open(&x), ControlOutcome::reply(Event::Rejected));
        assert_eq!(phase.reject(&x), ControlOutcome::reply(Event::Rejected));
        assert_eq!(phase, CallPhase::Idle);
    }

    #[test]
    fn test_cancel_releases_claim_but_keeps_ringing() {
        let mut phase = ringing();
        let x = PluginId::from("x");
        let z = PluginId::from("z");
        phase.answer(&x);

        assert_eq!(phase.cancel(&z), ControlOutcome::reply(Event::Busy));
        assert_eq!(phase.cancel(&x), ControlOutcome::forward(Event::Canceled, Event::Cancel));
        assert!(phase.is_ringing());
        assert_eq!(phase.answered_by(), None);

        // answerable again, same link
        assert_eq!(phase.answer(&z).link(), "rtsp://door/1");
    }

    #[test]
    fn test_open_by_wrong_plugin() {
        let mut phase = ringing();
        phase.answer(&PluginId::from("x"));

        let outcome = phase.open(&PluginId::from("y"));
        assert_eq!(outcome, ControlOutcome::reply(Event::WrongId));
        assert_eq!(phase.answered_by(), Some(&PluginId::from("x")));
    }

    #[test]
    fn test_open_on_unclaimed_ring_is_wrong_id() {
        let mut phase = ringing();
        assert_eq!(phase.open(&PluginId::from("x")).reply, Event::WrongId);
        assert_eq!(phase.reject(&PluginId::from("x")).reply, Event::WrongId);
    }

    #[test]
    fn test_open_releases_claim() {
        let mut phase = ringing();
        let x = PluginId::from("x");
        phase.answer(&x);

        assert_eq!(phase.open(&x), ControlOutcome::forward(Event::Opened, Event::Open));
        assert!(phase.is_ringing());
        assert_eq!(phase.answered_by(), None);
    }

    #[test]
    fn test_reject_ends_ring_cycle() {
        let mut phase = ringing();
        let x = PluginId::from("x");
        phase.answer(&x);

        assert_eq!(phase.reject(&x), ControlOutcome::forward(Event::Rejected, Event::Reject));
        assert_eq!(phase, CallPhase::Idle);
    }

    #[test]
    fn test_incoming_resets_claim() {
        let mut phase = ringing();
        phase.answer(&PluginId::from("x"));
        phase.incoming("rtsp://door/2".to_string());

        assert_eq!(phase, CallPhase::Ringing { link: "rtsp://door/2".to_string() });
        phase.reject_call();
        assert!(!phase.is_ringing());
    }
}
