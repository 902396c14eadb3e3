//! Gamification: scores and the leaderboard

use reqwest::Client;
use serde_json::Value;

use crate::auth::SessionManager;
use crate::error::Error;
use crate::fetch::Fetch;

/// Client for the gamification endpoints
pub struct GamificationClient {
    base_url: String,
    http_client: Client,
    session: SessionManager,
}

impl GamificationClient {
    pub fn new(base_url: &str, http_client: Client, session: SessionManager) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
            session,
        }
    }

    /// Current leaderboard
    pub async fn leader_board(&self) -> Result<Value, Error> {
        Fetch::get(&self.http_client, &format!("{}/leaders", self.base_url))
            .bearer_auth(self.session.get_token().as_deref())
            .execute::<Value>()
            .await
    }
}
