//! The user agent that visits the identity provider's pages

use async_trait::async_trait;
use url::Url;

use crate::error::Error;

/// Moves the user between this client and the identity provider
///
/// A browser front end navigates the page; a terminal front end prints the
/// URL and asks the user to paste back where they ended up.
#[async_trait]
pub trait Navigator: Send + Sync {
    /// Send the user to `authorization_url` and resolve with the URL the
    /// identity provider redirected back to.
    async fn login(&self, authorization_url: Url) -> Result<Url, Error>;

    /// Send the user to `url` without waiting for them to come back.
    fn redirect(&self, url: Url);
}
