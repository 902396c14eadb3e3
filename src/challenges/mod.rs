//! Multiplication challenges and attempts

use log::debug;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::auth::SessionManager;
use crate::error::Error;
use crate::fetch::Fetch;

/// Body of a guess submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeAttempt {
    pub alias: String,
    pub factor_a: i64,
    pub factor_b: i64,
    pub guess: i64,
}

/// Client for the challenge and attempt endpoints
pub struct ChallengesClient {
    base_url: String,
    http_client: Client,
    session: SessionManager,
}

impl ChallengesClient {
    pub fn new(base_url: &str, http_client: Client, session: SessionManager) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
            session,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetch a random challenge; needs no login
    pub async fn challenge(&self) -> Result<Value, Error> {
        let challenge = Fetch::get(&self.http_client, &self.url("/challenges/random"))
            .execute::<Value>()
            .await?;
        debug!("Received challenge {}", challenge);
        Ok(challenge)
    }

    /// Submit a guess for `factor_a * factor_b`
    pub async fn send_guess(
        &self,
        alias: &str,
        factor_a: i64,
        factor_b: i64,
        guess: i64,
    ) -> Result<Value, Error> {
        let attempt = ChallengeAttempt {
            alias: alias.to_string(),
            factor_a,
            factor_b,
            guess,
        };

        Fetch::post(&self.http_client, &self.url("/attempts"))
            .bearer_auth(self.session.get_token().as_deref())
            .json(&attempt)?
            .execute::<Value>()
            .await
    }

    /// Attempts made by `alias`
    pub async fn get_attempts(&self, alias: &str) -> Result<Value, Error> {
        debug!("Get attempts for {}", alias);
        Fetch::get(&self.http_client, &self.url("/attempts"))
            .bearer_auth(self.session.get_token().as_deref())
            .query("alias", alias)
            .execute::<Value>()
            .await
    }

    /// User records for the given ids
    pub async fn get_users(&self, user_ids: &[u64]) -> Result<Value, Error> {
        let ids = user_ids
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",");

        Fetch::get(&self.http_client, &self.url(&format!("/users/{}", ids)))
            .bearer_auth(self.session.get_token().as_deref())
            .execute::<Value>()
            .await
    }
}
