//! Credential issuance and validation
//!
//! Plugins get a token from `/plugin/auth`; operator tokens (intercom device,
//! operator tooling) are minted offline with `smart-intercom issue-token`.
//! Both are HS256 JWTs signed with the configured secret.

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use smart_intercom_signaling::PluginId;
use crate::error::AuthError;

/// Secret used when none is configured. Fine for a laptop, nothing else.
pub const DEVELOPMENT_SECRET: &str = "insecure-development-secret";

/// JWT configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub plugin_ttl_seconds: u64,
    pub operator_ttl_seconds: u64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: DEVELOPMENT_SECRET.to_string(),
            issuer: "smart-intercom".to_string(),
            plugin_ttl_seconds: 2592000,    // 30 days
            operator_ttl_seconds: 2592000,  // 30 days; the device has no way to refresh
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Plugin,
    Operator,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,              // plugin name or operator subject
    pub role: Role,
    pub iat: u64,
    pub exp: u64,
    pub jti: String,
}

/// Who is calling, as resolved from the bearer credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Operator { subject: String },
    Plugin(PluginId),
}

pub struct JwtIssuer {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    header: Header,
}

impl JwtIssuer {
    pub fn new(config: JwtConfig) -> Result<Self, AuthError> {
        if config.secret.is_empty() {
            return Err(AuthError::Config("JWT secret must not be empty".to_string()));
        }
        lifetime(config.plugin_ttl_seconds)?;
        lifetime(config.operator_ttl_seconds)?;
        if config.secret == DEVELOPMENT_SECRET {
            warn!("using the built-in development JWT secret; set jwt.secret for deployments");
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            header: Header::new(Algorithm::HS256),
            config,
        })
    }

    pub fn issue_plugin_token(&self, name: &str) -> Result<String, AuthError> {
        self.issue(name, Role::Plugin, self.config.plugin_ttl_seconds)
    }

    pub fn issue_operator_token(&self, subject: &str) -> Result<String, AuthError> {
        self.issue(subject, Role::Operator, self.config.operator_ttl_seconds)
    }

    /// Verify signature, issuer and expiry and resolve the principal
    pub fn validate(&self, token: &str) -> Result<Principal, AuthError> {
        let mut validation = Validation::new(self.header.alg);
        validation.set_issuer(&[self.config.issuer.clone()]);
        validation.validate_exp = true;

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            })?;

        let claims = token_data.claims;
        if claims.sub.is_empty() {
            return Err(AuthError::InvalidToken("empty subject".to_string()));
        }
        Ok(match claims.role {
            Role::Plugin => Principal::Plugin(PluginId::new(claims.sub)),
            Role::Operator => Principal::Operator { subject: claims.sub },
        })
    }

    fn issue(&self, subject: &str, role: Role, ttl_seconds: u64) -> Result<String, AuthError> {
        self.issue_at(subject, role, ttl_seconds, Utc::now())
    }

    fn issue_at(&self, subject: &str, role: Role, ttl_seconds: u64, now: DateTime<Utc>) -> Result<String, AuthError> {
        let exp = now
            .checked_add_signed(lifetime(ttl_seconds)?)
            .ok_or_else(|| out_of_range(ttl_seconds))?;

        let claims = Claims {
            iss: self.config.issuer.clone(),
            sub: subject.to_string(),
            role,
            iat: now.timestamp() as u64,
            exp: exp.timestamp() as u64,
            jti: Uuid::new_v4().to_string(),
        };

        encode(&self.header, &claims, &self.encoding_key).map_err(AuthError::Encoding)
    }
}

fn lifetime(ttl_seconds: u64) -> Result<TimeDelta, AuthError> {
    i64::try_from(ttl_seconds)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .ok_or_else(|| out_of_range(ttl_seconds))
}

fn out_of_range(ttl_seconds: u64) -> AuthError {
    AuthError::Config(format!("credential lifetime of {} seconds is out of range", ttl_seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> JwtIssuer {
        JwtIssuer::new(JwtConfig {
            secret: "test-secret".to_string(),
            ..JwtConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_plugin_token_round_trip() {
        let issuer = issuer();
        let token = issuer.issue_plugin_token("kitchen-tablet").unwrap();

        assert_eq!(
            issuer.validate(&token).unwrap(),
            Principal::Plugin(PluginId::from("kitchen-tablet"))
        );
    }

    #[test]
    fn test_operator_token_round_trip() {
        let issuer = issuer();
        let token = issuer.issue_operator_token("front-door").unwrap();

        assert_eq!(
            issuer.validate(&token).unwrap(),
            Principal::Operator { subject: "front-door".to_string() }
        );
    }

    #[test]
    fn test_foreign_secret_is_rejected() {
        let other = JwtIssuer::new(JwtConfig {
            secret: "other-secret".to_string(),
            ..JwtConfig::default()
        })
        .unwrap();
        let token = other.issue_plugin_token("x").unwrap();

        assert!(matches!(issuer().validate(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let config = JwtConfig {
            secret: "test-secret".to_string(),
            ..JwtConfig::default()
        };
        let issuer = JwtIssuer::new(config.clone()).unwrap();

        let past = chrono::Utc::now().timestamp() as u64 - 3600;
        let claims = Claims {
            iss: config.issuer.clone(),
            sub: "x".to_string(),
            role: Role::Plugin,
            iat: past - 60,
            exp: past,
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap();

        assert!(matches!(issuer.validate(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_device_token_outlives_session_window() {
        let issuer = issuer();
        let issued = Utc::now() - TimeDelta::minutes(16);
        let token = issuer
            .issue_at("front-door", Role::Operator, issuer.config.operator_ttl_seconds, issued)
            .unwrap();

        assert_eq!(
            issuer.validate(&token).unwrap(),
            Principal::Operator { subject: "front-door".to_string() }
        );
    }

    #[test]
    fn test_unrepresentable_lifetime_is_refused() {
        let config = JwtConfig {
            secret: "test-secret".to_string(),
            plugin_ttl_seconds: u64::MAX,
            ..JwtConfig::default()
        };
        assert!(matches!(JwtIssuer::new(config), Err(AuthError::Config(_))));

        // representable as a duration, but not as a point in time
        let issuer = issuer();
        let result = issuer.issue_at("x", Role::Plugin, i64::MAX as u64 / 1000, Utc::now());
        assert!(matches!(result, Err(AuthError::Config(_))));
    }

    #[test]
    fn test_empty_secret_is_refused() {
        let config = JwtConfig {
            secret: String::new(),
            ..JwtConfig::default()
        };
        assert!(matches!(JwtIssuer::new(config), Err(AuthError::Config(_))));
    }
}
