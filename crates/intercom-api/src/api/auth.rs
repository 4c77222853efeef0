//! Bearer authentication
//!
//! The middleware resolves `Authorization: Bearer <jwt>` into a [`Principal`]
//! request extension. A request without a bearer credential continues
//! anonymously; a credential that does not validate is refused before any
//! handler runs. Handlers then demand a principal kind through the
//! [`PluginIdentity`] and [`OperatorIdentity`] extractors.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use tracing::trace;

use smart_intercom_signaling::PluginId;
use crate::api::ApiState;
use crate::error::ApiError;
use crate::jwt::Principal;

pub async fn authenticate(
    State(state): State<ApiState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(token) = bearer_token(request.headers()) {
        let principal = state.issuer.validate(token).map_err(ApiError::InvalidToken)?;
        trace!(?principal, "request authenticated");
        request.extensions_mut().insert(principal);
    }
    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// The calling plugin
#[derive(Debug, Clone)]
pub struct PluginIdentity(pub PluginId);

impl<S: Send + Sync> FromRequestParts<S> for PluginIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Principal>() {
            Some(Principal::Plugin(id)) => Ok(PluginIdentity(id.clone())),
            _ => Err(ApiError::AccessDenied),
        }
    }
}

/// An operator credential: the intercom device or operator tooling
#[derive(Debug, Clone)]
pub struct OperatorIdentity(pub String);

impl<S: Send + Sync> FromRequestParts<S> for OperatorIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Principal>() {
            Some(Principal::Operator { subject }) => Ok(OperatorIdentity(subject.clone())),
            _ => Err(ApiError::AccessDenied),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }
}
