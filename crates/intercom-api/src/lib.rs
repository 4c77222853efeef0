//! # Smart Intercom API
//!
//! HTTP surface of the smart intercom backend.
//!
//! This crate provides:
//! - The `/plugin/*` long-polling routes on top of the signaling core
//! - JWT issuance and bearer authentication for plugins and operators
//! - Configuration loading (file + environment) and logging setup
//!
//! The `smart-intercom` binary wires these together.

pub mod error;
pub mod config;
pub mod logging;
pub mod jwt;
pub mod api;
pub mod server;

pub use error::{ApiError, AuthError, ServerError};
pub use config::ServerConfig;
pub use jwt::{JwtConfig, JwtIssuer, Principal};
pub use api::{create_router, ApiState};
