//! HTTP API for the smart intercom
//!
//! Every route lives under `/plugin` and every failure is a 403 with a
//! plain-text reason.

pub mod auth;
pub mod handlers;
pub mod types;

use std::sync::Arc;

use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use smart_intercom_signaling::CallCoordinator;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::jwt::JwtIssuer;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct ApiState {
    pub coordinator: Arc<CallCoordinator>,
    pub issuer: Arc<JwtIssuer>,
}

impl ApiState {
    pub fn new(coordinator: Arc<CallCoordinator>, issuer: Arc<JwtIssuer>) -> Self {
        Self { coordinator, issuer }
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self, ServerError> {
        let issuer = JwtIssuer::new(config.jwt.clone())?;
        let coordinator = CallCoordinator::new(config.signaling_config());
        Ok(Self::new(Arc::new(coordinator), Arc::new(issuer)))
    }
}

/// Create the API router
pub fn create_router(state: ApiState) -> Router {
    let plugin_routes = Router::new()
        .route("/auth", get(handlers::register_plugin).post(handlers::register_plugin))
        .route("/incoming_call", get(handlers::incoming_call))
        .route("/rejected_call", get(handlers::rejected_call))
        .route("/get_event", get(handlers::get_event))
        .route("/answer", get(handlers::answer))
        .route("/cancel", get(handlers::cancel))
        .route("/open", get(handlers::open))
        .route("/reject", get(handlers::reject))
        .route("/intercom_command", get(handlers::intercom_command))
        .route("/status", get(handlers::status));

    Router::new()
        .nest("/plugin", plugin_routes)
        .layer(middleware::from_fn_with_state(state.clone(), auth::authenticate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
