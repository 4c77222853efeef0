//! Error types for signaling operations

use thiserror::Error;
use crate::types::PluginId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignalingError {
    #[error("plugin {0} is already polling")]
    PluginAlreadyPolling(PluginId),

    #[error("intercom is already polling")]
    IntercomAlreadyPolling,
}

pub type Result<T> = std::result::Result<T, SignalingError>;
