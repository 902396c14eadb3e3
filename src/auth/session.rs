//! Session management for authentication

use jsonwebtoken::{DecodingKey, Validation};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::types::{TokenClaims, TokenResponse};
use crate::error::Error;

/// Session data
#[derive(Debug, Clone)]
pub struct Session {
    /// The access token
    pub access_token: String,

    /// The refresh token
    pub refresh_token: Option<String>,

    /// The id token, used as logout hint
    pub id_token: Option<String>,

    /// Decoded access token claims, when the token is a JWT
    pub claims: Option<TokenClaims>,

    /// The expiry timestamp, unix seconds
    pub expires_at: i64,

    /// Seconds the local clock is ahead of the issuer's
    pub time_skew: i64,
}

impl Session {
    /// Create a new session around an opaque access token
    pub fn new(access_token: String, refresh_token: Option<String>, expires_in: i64) -> Self {
        let claims = decode_claims(&access_token).ok();
        let now = now();

        Self {
            expires_at: claims
                .as_ref()
                .and_then(|c| c.exp)
                .unwrap_or(now + expires_in),
            time_skew: claims
                .as_ref()
                .and_then(|c| c.iat)
                .map(|iat| now - iat)
                .unwrap_or(0),
            access_token,
            refresh_token,
            id_token: None,
            claims,
        }
    }

    /// Build a session from a token endpoint response
    ///
    /// The access token must be a JWT.
    pub fn from_token_response(response: TokenResponse) -> Result<Self, Error> {
        let claims = decode_claims(&response.access_token)?;
        let now = now();

        let expires_at = match (claims.exp, response.expires_in) {
            (Some(exp), _) => exp,
            (None, Some(expires_in)) => now + expires_in,
            (None, None) => return Err(Error::auth("Token carries no expiry")),
        };

        Ok(Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            id_token: response.id_token,
            time_skew: claims.iat.map(|iat| now - iat).unwrap_or(0),
            expires_at,
            claims: Some(claims),
        })
    }

    /// Seconds of validity left, corrected for clock skew
    pub fn remaining_validity(&self) -> i64 {
        self.expires_at - now() + self.time_skew
    }

    /// Whether the token expires within `min_validity`
    pub fn expires_within(&self, min_validity: Duration) -> bool {
        self.remaining_validity() < min_validity.as_secs() as i64
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.remaining_validity() <= 0
    }

    /// Display name from the token claims
    pub fn username(&self) -> Option<String> {
        self.claims.as_ref().and_then(TokenClaims::username)
    }
}

/// Decode token claims without verifying the signature
///
/// The resource server verifies tokens; the client only reads them.
pub fn decode_claims(token: &str) -> Result<TokenClaims, Error> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = jsonwebtoken::decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)?;
    Ok(data.claims)
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs() as i64
}
