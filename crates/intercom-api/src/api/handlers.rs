//! Route handlers for `/plugin/*`

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use smart_intercom_signaling::CoordinatorSnapshot;
use crate::api::auth::{OperatorIdentity, PluginIdentity};
use crate::api::types::{AnswerMessage, EventMessage, IncomingCallRequest, LoginRequest, TokenResponse};
use crate::api::ApiState;
use crate::error::{ApiError, Result};

// Bodies arrive on GET requests without a reliable content type, so they are
// parsed by hand rather than through `Json`.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T> {
    serde_json::from_slice(body).map_err(ApiError::InvalidBody)
}

/// `/plugin/auth`: issue a plugin credential for the given name
pub async fn register_plugin(State(state): State<ApiState>, body: Bytes) -> Result<Json<TokenResponse>> {
    let login: LoginRequest = parse_body(&body)?;
    let name = login.name.trim();
    if name.is_empty() {
        return Err(ApiError::EmptyName);
    }

    let jwt = state.issuer.issue_plugin_token(name).map_err(ApiError::TokenIssue)?;
    info!(plugin = %name, request_type = ?login.request_type, "plugin credential issued");
    Ok(Json(TokenResponse { jwt }))
}

pub async fn incoming_call(
    OperatorIdentity(operator): OperatorIdentity,
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<StatusCode> {
    let request: IncomingCallRequest = parse_body(&body)?;
    debug!(%operator, message = %request.message, "incoming call announced");

    let notified = state.coordinator.incoming_call(request.link);
    info!(%operator, notified, "plugins notified of incoming call");
    Ok(StatusCode::OK)
}

pub async fn rejected_call(
    OperatorIdentity(operator): OperatorIdentity,
    State(state): State<ApiState>,
) -> StatusCode {
    debug!(%operator, "call rejected at intercom");
    state.coordinator.rejected_call();
    StatusCode::OK
}

/// Long poll for plugin notifications
pub async fn get_event(
    PluginIdentity(id): PluginIdentity,
    State(state): State<ApiState>,
) -> Result<Json<EventMessage>> {
    let event = state.coordinator.poll_event(&id).await?;
    Ok(Json(event.into()))
}

pub async fn answer(
    PluginIdentity(id): PluginIdentity,
    State(state): State<ApiState>,
) -> Json<AnswerMessage> {
    let outcome = state.coordinator.answer(&id);
    Json(AnswerMessage {
        message: outcome.reply(),
        link: outcome.link().to_string(),
    })
}

pub async fn cancel(PluginIdentity(id): PluginIdentity, State(state): State<ApiState>) -> Json<EventMessage> {
    Json(state.coordinator.cancel(&id).into())
}

pub async fn open(PluginIdentity(id): PluginIdentity, State(state): State<ApiState>) -> Json<EventMessage> {
    Json(state.coordinator.open(&id).into())
}

pub async fn reject(PluginIdentity(id): PluginIdentity, State(state): State<ApiState>) -> Json<EventMessage> {
    Json(state.coordinator.reject(&id).into())
}

/// Long poll for the intercom device
pub async fn intercom_command(
    OperatorIdentity(_device): OperatorIdentity,
    State(state): State<ApiState>,
) -> Result<Json<EventMessage>> {
    let event = state.coordinator.poll_intercom().await?;
    Ok(Json(event.into()))
}

pub async fn status(
    OperatorIdentity(_operator): OperatorIdentity,
    State(state): State<ApiState>,
) -> Json<CoordinatorSnapshot> {
    Json(state.coordinator.snapshot())
}
