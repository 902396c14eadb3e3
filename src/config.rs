//! Configuration options for the challenges client

use std::env;
use std::time::Duration;

/// Default base URL of the challenges REST API
pub const DEFAULT_API_URL: &str = "http://localhost/api";

/// Identity provider connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeycloakConfig {
    /// Base URL of the Keycloak server
    pub url: String,

    /// The realm users log into
    pub realm: String,

    /// The public client registered for this application
    pub client_id: String,
}

impl Default for KeycloakConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8180".to_string(),
            realm: "microservices-demo".to_string(),
            client_id: "challenges-app".to_string(),
        }
    }
}

/// Configuration options for the challenges client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Base URL of the challenges REST API
    pub api_url: String,

    /// Identity provider settings
    pub keycloak: KeycloakConfig,

    /// Where the identity provider sends the user back after login
    pub redirect_uri: String,

    /// Where the identity provider sends the user after logout
    pub logout_redirect_uri: String,

    /// How often the renewal task checks the token
    pub renewal_interval: Duration,

    /// Remaining validity below which the token gets refreshed
    pub min_token_validity: Duration,

    /// The request timeout
    pub request_timeout: Option<Duration>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            keycloak: KeycloakConfig::default(),
            redirect_uri: "http://localhost:3000/".to_string(),
            logout_redirect_uri: "http://localhost:3000".to_string(),
            renewal_interval: Duration::from_secs(10),
            min_token_validity: Duration::from_secs(30),
            request_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl ClientOptions {
    /// Build options from the environment, falling back to the defaults
    ///
    /// Recognized variables: `CHALLENGES_API_URL`, `KEYCLOAK_URL`,
    /// `KEYCLOAK_REALM`, `KEYCLOAK_CLIENT_ID`, `CHALLENGES_REDIRECT_URI` and
    /// `CHALLENGES_LOGOUT_REDIRECT_URI`.
    pub fn from_env() -> Self {
        let mut options = Self::default();

        if let Some(value) = var("CHALLENGES_API_URL") {
            options.api_url = value;
        }
        if let Some(value) = var("KEYCLOAK_URL") {
            options.keycloak.url = value;
        }
        if let Some(value) = var("KEYCLOAK_REALM") {
            options.keycloak.realm = value;
        }
        if let Some(value) = var("KEYCLOAK_CLIENT_ID") {
            options.keycloak.client_id = value;
        }
        if let Some(value) = var("CHALLENGES_REDIRECT_URI") {
            options.redirect_uri = value;
        }
        if let Some(value) = var("CHALLENGES_LOGOUT_REDIRECT_URI") {
            options.logout_redirect_uri = value;
        }

        options
    }

    /// Set the API base URL
    pub fn with_api_url(mut self, value: &str) -> Self {
        self.api_url = value.to_string();
        self
    }

    /// Set the identity provider settings
    pub fn with_keycloak(mut self, value: KeycloakConfig) -> Self {
        self.keycloak = value;
        self
    }

    /// Set the login redirect URI
    pub fn with_redirect_uri(mut self, value: &str) -> Self {
        self.redirect_uri = value.to_string();
        self
    }

    /// Set the post-logout redirect URI
    pub fn with_logout_redirect_uri(mut self, value: &str) -> Self {
        self.logout_redirect_uri = value.to_string();
        self
    }

    /// Set the renewal check period
    pub fn with_renewal_interval(mut self, value: Duration) -> Self {
        self.renewal_interval = value;
        self
    }

    /// Set the minimum remaining token validity
    pub fn with_min_token_validity(mut self, value: Duration) -> Self {
        self.min_token_validity = value;
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }
}

fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ClientOptions::default();
        assert_eq!(options.api_url, "http://localhost/api");
        assert_eq!(options.keycloak.realm, "microservices-demo");
        assert_eq!(options.keycloak.client_id, "challenges-app");
        assert_eq!(options.renewal_interval, Duration::from_secs(10));
        assert_eq!(options.min_token_validity, Duration::from_secs(30));
    }

    #[test]
    fn test_builder() {
        let options = ClientOptions::default()
            .with_api_url("https://example.com/api")
            .with_renewal_interval(Duration::from_millis(50))
            .with_request_timeout(None);

        assert_eq!(options.api_url, "https://example.com/api");
        assert_eq!(options.renewal_interval, Duration::from_millis(50));
        assert!(options.request_timeout.is_none());
    }

    #[test]
    fn test_from_env() {
        env::set_var("KEYCLOAK_REALM", "test-realm");
        env::set_var("CHALLENGES_API_URL", " ");

        let options = ClientOptions::from_env();
        assert_eq!(options.keycloak.realm, "test-realm");
        assert_eq!(options.api_url, DEFAULT_API_URL);

        env::remove_var("KEYCLOAK_REALM");
        env::remove_var("CHALLENGES_API_URL");
    }
}
