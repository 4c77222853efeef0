//! Core types for the signaling core

use std::fmt;
use serde::{Deserialize, Serialize};

/// Opaque identity of a plugin, taken from its validated credential
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginId(String);

impl PluginId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PluginId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for PluginId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A signaling message exchanged between the intercom device, the core and plugins.
///
/// Serializes to the bare tag (`"incoming"`, `"wrong-id"`, ...). The timeout
/// sentinel serializes to the empty string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Event {
    /// A call is ringing at the intercom
    Incoming,
    /// Forwarded to the intercom: a plugin picked up
    Answer,
    /// Forwarded to the intercom: the answering plugin backed out
    Cancel,
    /// Forwarded to the intercom: the answering plugin declined the call
    Reject,
    /// Forwarded to the intercom: unlock the door
    Open,
    Answered,
    Canceled,
    Rejected,
    Opened,
    /// Another plugin holds the call
    Busy,
    /// The caller is not the plugin holding the call
    WrongId,
    /// No call is ringing
    IncomingFalse,
    /// Long poll expired without an event
    #[serde(rename = "")]
    Timeout,
}

impl Event {
    /// Wire tag of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::Incoming => "incoming",
            Event::Answer => "answer",
            Event::Cancel => "cancel",
            Event::Reject => "reject",
            Event::Open => "open",
            Event::Answered => "answered",
            Event::Canceled => "canceled",
            Event::Rejected => "rejected",
            Event::Opened => "opened",
            Event::Busy => "busy",
            Event::WrongId => "wrong-id",
            Event::IncomingFalse => "incoming-false",
            Event::Timeout => "",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Event::Timeout)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
