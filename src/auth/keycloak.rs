//! OpenID Connect endpoints of a Keycloak realm

use log::debug;
use reqwest::Client;
use url::Url;

use super::pkce::PkceChallenge;
use super::types::{TokenError, TokenResponse};
use crate::config::KeycloakConfig;
use crate::error::Error;

/// Client for one Keycloak realm
#[derive(Debug, Clone)]
pub struct Keycloak {
    config: KeycloakConfig,
    http_client: Client,
}

impl Keycloak {
    pub fn new(config: KeycloakConfig, http_client: Client) -> Self {
        Self { config, http_client }
    }

    fn endpoint(&self, name: &str) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/{}",
            self.config.url.trim_end_matches('/'),
            self.config.realm,
            name
        )
    }

    /// URL of the login page the user agent is sent to
    pub fn authorization_url(
        &self,
        redirect_uri: &str,
        state: &str,
        nonce: &str,
        pkce: &PkceChallenge,
    ) -> Result<Url, Error> {
        let url = Url::parse_with_params(
            &self.endpoint("auth"),
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("state", state),
                ("response_mode", "fragment"),
                ("response_type", "code"),
                ("scope", "openid"),
                ("nonce", nonce),
                ("code_challenge", pkce.challenge.as_str()),
                ("code_challenge_method", pkce.method()),
            ],
        )?;
        Ok(url)
    }

    /// Exchange an authorization code for tokens
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, Error> {
        debug!("Exchanging authorization code for tokens");
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("code_verifier", code_verifier),
        ])
        .await
    }

    /// Obtain fresh tokens with a refresh token
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, Error> {
        debug!("Refreshing access token");
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
        ])
        .await
    }

    /// URL that ends the session at the identity provider
    pub fn end_session_url(
        &self,
        redirect_uri: &str,
        id_token_hint: Option<&str>,
    ) -> Result<Url, Error> {
        let mut url = Url::parse_with_params(
            &self.endpoint("logout"),
            &[
                ("client_id", self.config.client_id.as_str()),
                ("post_logout_redirect_uri", redirect_uri),
            ],
        )?;

        if let Some(hint) = id_token_hint {
            url.query_pairs_mut().append_pair("id_token_hint", hint);
        }

        Ok(url)
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse, Error> {
        let response = self
            .http_client
            .post(self.endpoint("token"))
            .form(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<TokenError>(&error_text) {
                Ok(TokenError {
                    error,
                    error_description: Some(description),
                }) => Error::auth(format!("{}: {}", error, description)),
                Ok(TokenError { error, .. }) => Error::auth(error),
                Err(_) => Error::auth(format!(
                    "Token request failed with status {}: {}",
                    status, error_text
                )),
            });
        }

        Ok(response.json::<TokenResponse>().await?)
    }
}
