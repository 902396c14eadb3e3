//! Challenges Rust Client Library
//!
//! A Rust client for the multiplication challenges application: Keycloak
//! login with automatic token renewal, plus access to the challenge, attempt,
//! user and leaderboard endpoints.

pub mod auth;
pub mod challenges;
pub mod config;
pub mod error;
pub mod fetch;
pub mod gamification;

use reqwest::Client;
use std::sync::Arc;

use crate::auth::{Navigator, SessionManager};
use crate::challenges::ChallengesClient;
use crate::config::ClientOptions;
use crate::error::Error;
use crate::gamification::GamificationClient;

/// The main entry point for the challenges client
///
/// Owns the HTTP client and the one session every API client reads its
/// token from.
pub struct ChallengesApp {
    /// HTTP client used for requests
    pub http_client: Client,
    /// Session manager for login, renewal and logout
    pub session: SessionManager,
    /// Client options
    pub options: ClientOptions,
}

impl ChallengesApp {
    /// Create a new client
    ///
    /// # Arguments
    ///
    /// * `options` - API and identity provider settings
    /// * `navigator` - The user agent that performs login and logout redirects
    ///
    /// # Example
    ///
    /// ```
    /// use challenges_client::config::ClientOptions;
    ///
    /// let options = ClientOptions::default().with_api_url("https://example.com/api");
    /// assert_eq!(options.api_url, "https://example.com/api");
    /// ```
    pub fn new(options: ClientOptions, navigator: Arc<dyn Navigator>) -> Result<Self, Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;

        let session = SessionManager::new(&options, http_client.clone(), navigator)?;

        Ok(Self {
            http_client,
            session,
            options,
        })
    }

    /// Get a reference to the session manager
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Create a client for challenges and attempts
    pub fn challenges(&self) -> ChallengesClient {
        ChallengesClient::new(
            &self.options.api_url,
            self.http_client.clone(),
            self.session.clone(),
        )
    }

    /// Create a client for the leaderboard
    pub fn gamification(&self) -> GamificationClient {
        GamificationClient::new(
            &self.options.api_url,
            self.http_client.clone(),
            self.session.clone(),
        )
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::auth::{Navigator, SessionManager, SessionState};
    pub use crate::config::ClientOptions;
    pub use crate::error::Error;
    pub use crate::ChallengesApp;
}
