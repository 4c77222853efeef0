//! # Smart Intercom Signaling
//!
//! Call-signaling core of the smart intercom backend.
//!
//! A doorbell announces a call, plugins long-poll for it and race to answer,
//! and the winner exchanges control messages with the intercom device. All of
//! it runs over stateless HTTP long polls, so this crate provides:
//! - [`mailbox`]: a single-slot hand-off with a bounded wait that never blocks
//!   the producer
//! - [`call_state`]: the ring/claim state machine
//! - [`plugin_registry`]: plugins currently polling, and fan-out of `incoming`
//! - [`intercom`]: the single device waiter with a pending-message fallback
//! - [`coordinator`]: [`CallCoordinator`], which owns all of the above
//!
//! State is in memory only and does not survive a restart.

pub mod error;
pub mod types;
pub mod config;
pub mod mailbox;
pub mod call_state;
pub mod plugin_registry;
pub mod intercom;
pub mod coordinator;

pub use error::{SignalingError, Result};
pub use types::{Event, PluginId};
pub use config::SignalingConfig;
pub use call_state::{AnswerOutcome, CallPhase, ControlOutcome};
pub use coordinator::{CallCoordinator, CoordinatorSnapshot};
