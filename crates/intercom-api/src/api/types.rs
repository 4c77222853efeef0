//! Request and response bodies

use serde::{Deserialize, Serialize};
use smart_intercom_signaling::Event;

/// Body of `/plugin/auth`
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub name: String,
    #[serde(default)]
    pub request_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub jwt: String,
}

/// Body of `/plugin/incoming_call`
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingCallRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub message: Event,
}

impl From<Event> for EventMessage {
    fn from(message: Event) -> Self {
        Self { message }
    }
}

/// Reply to `/plugin/answer`; `link` is empty unless the call was won
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerMessage {
    pub message: Event,
    pub link: String,
}
