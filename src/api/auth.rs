//! Password login against `/auth/token` and local token inspection

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use super::ApiClient;
use crate::error::ClientError;

/// Shown when login fails for any reason
pub const LOGIN_FAILURE_MESSAGE: &str = "Invalid credentials or server unavailable.";

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

/// Unverified claims read from a JWT payload
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl TokenClaims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().map(|at| at <= now).unwrap_or(false)
    }
}

/// Read the payload segment of a JWT without checking its signature.
///
/// Returns `None` for opaque tokens.
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

impl ApiClient {
    /// Exchange username/password for a bearer token and store it
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ClientError> {
        let form = [
            ("username", username),
            ("password", password),
            ("grant_type", "password"),
        ];

        let response = self
            .http()
            .post(self.url("/auth/token"))
            .form(&form)
            .send()
            .await
            .map_err(ClientError::from)?;

        let status = response.status();
        debug!("POST /auth/token -> {}", status.as_u16());
        if !status.is_success() {
            return Err(ClientError::Api {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(ClientError::from)?;
        let token: TokenResponse = serde_json::from_slice(&body).map_err(ClientError::parse)?;
        self.credentials().set(token.access_token);
        info!("Logged in as {}", username);
        Ok(())
    }

    /// Forget the stored token
    pub fn logout(&self) {
        self.credentials().clear();
    }
}
