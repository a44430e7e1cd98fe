use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use thiserror::Error;

use crate::models::user::Role;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
    pub role: Role,
    pub exp: i64,
    #[serde(default)]
    pub email: Option<String>,
}

impl TokenClaims {
    /// Expired when the expiry instant is at or before `now` (unix seconds).
    pub fn is_expired(&self, now: i64) -> bool {
        self.exp <= now
    }
}

#[derive(Debug, Error)]
pub enum ClaimsError {
    #[error("token is not a three-part JWT")]
    Format,
    #[error("payload is not base64url: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("payload claims are malformed: {0}")]
    Claims(#[from] serde_json::Error),
}

/// Decode JWT claims locally without verifying the signature.
///
/// The portal never grants anything the API would not: every API call still
/// presents the token, and the server validates it. Locally the claims only
/// drive routing, and any decode failure is treated as an expired session.
pub fn decode_claims(token: &str) -> Result<TokenClaims, ClaimsError> {
    let mut parts = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(ClaimsError::Format);
    };

    let payload = general_purpose::URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
    let claims = serde_json::from_slice(&payload)?;

    Ok(claims)
}
