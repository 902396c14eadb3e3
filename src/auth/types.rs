//! Types for the identity provider exchange

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::{form_urlencoded, Url};

use crate::error::Error;

/// Lifecycle state of a session manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session; the initial and the terminal state
    Unauthenticated,
    /// The login flow is in progress
    Authenticating,
    /// A token is held and API calls may be made
    Authenticated,
}

/// Token endpoint response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The access token
    pub access_token: String,

    /// The refresh token
    pub refresh_token: Option<String>,

    /// The OpenID Connect id token
    pub id_token: Option<String>,

    /// The token type
    pub token_type: Option<String>,

    /// The access token lifetime in seconds
    pub expires_in: Option<i64>,

    /// The refresh token lifetime in seconds
    pub refresh_expires_in: Option<i64>,
}

/// OAuth error body returned by the token endpoint
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenError {
    pub error: String,
    pub error_description: Option<String>,
}

/// Claims carried by access and id tokens
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject identifier
    pub sub: Option<String>,

    /// Expiry, unix seconds
    pub exp: Option<i64>,

    /// Issue time, unix seconds
    pub iat: Option<i64>,

    /// The login name chosen by the user
    pub preferred_username: Option<String>,

    /// Nonce echoed back from the authorization request
    pub nonce: Option<String>,

    /// Everything else the identity provider put in the token
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl TokenClaims {
    /// Display name: `preferred_username`, or `sub` when that is missing
    pub fn username(&self) -> Option<String> {
        self.preferred_username
            .as_deref()
            .filter(|name| !name.is_empty())
            .or(self.sub.as_deref())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }
}

/// Parameters the identity provider appends to the redirect URI
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationCallback {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl AuthorizationCallback {
    /// Read the callback parameters from the fragment or, failing that, the query
    pub fn parse(url: &Url) -> Self {
        let mut callback = Self::default();

        let fragment_pairs = url
            .fragment()
            .filter(|f| !f.is_empty())
            .map(|f| form_urlencoded::parse(f.as_bytes()).into_owned().collect::<Vec<_>>());
        let pairs =
            fragment_pairs.unwrap_or_else(|| url.query_pairs().into_owned().collect::<Vec<_>>());

        for (key, value) in pairs {
            match key.as_str() {
                "code" => callback.code = Some(value),
                "state" => callback.state = Some(value),
                "error" => callback.error = Some(value),
                "error_description" => callback.error_description = Some(value),
                _ => {}
            }
        }

        callback
    }

    /// Check the callback against the state we sent and return the code
    pub fn into_code(self, expected_state: &str) -> Result<String, Error> {
        if self.state.as_deref() != Some(expected_state) {
            return Err(Error::auth("Invalid state in login callback"));
        }

        if let Some(error) = self.error {
            return Err(match self.error_description {
                Some(description) => Error::auth(format!("{}: {}", error, description)),
                None => Error::auth(error),
            });
        }

        self.code
            .filter(|code| !code.is_empty())
            .ok_or_else(|| Error::auth("Login callback carries no authorization code"))
    }
}
