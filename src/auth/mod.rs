//! Authentication and session lifecycle
//!
//! A [`SessionManager`] logs the user in through Keycloak (authorization code
//! flow with PKCE), keeps the access token fresh with a periodic renewal task
//! and ends the session on logout or when renewal fails.

mod keycloak;
mod navigator;
mod pkce;
mod session;
mod types;

use log::{debug, error, info, trace, warn};
use reqwest::Client;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use uuid::Uuid;

use crate::config::ClientOptions;
use crate::error::Error;

pub use keycloak::Keycloak;
pub use navigator::Navigator;
pub use pkce::PkceChallenge;
pub use session::*;
pub use types::*;

struct SessionCell {
    state: SessionState,
    session: Option<Session>,
    initialized: bool,
    // bumped whenever a different session is installed or the current one ends
    generation: u64,
}

impl SessionCell {
    fn install(&mut self, session: Session) {
        self.generation += 1;
        self.session = Some(session);
        self.state = SessionState::Authenticated;
    }
}

struct Inner {
    keycloak: Keycloak,
    navigator: Arc<dyn Navigator>,
    redirect_uri: String,
    logout_redirect_uri: String,
    renewal_interval: Duration,
    min_token_validity: Duration,
    // state and session change together
    cell: RwLock<SessionCell>,
    refresh_lock: tokio::sync::Mutex<()>,
    renewal: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let renewal = self.renewal.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = renewal.take() {
            handle.abort();
        }
    }
}

/// Owner of one authenticated session
///
/// Clones share the same session. The renewal task only keeps a weak
/// reference, so it stops once the last clone is dropped.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    /// Create a session manager in the `Unauthenticated` state
    ///
    /// Fails when the renewal interval is zero.
    pub fn new(
        options: &ClientOptions,
        http_client: Client,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, Error> {
        if options.renewal_interval.is_zero() {
            return Err(Error::general("Token renewal interval must be greater than zero"));
        }

        Ok(Self {
            inner: Arc::new(Inner {
                keycloak: Keycloak::new(options.keycloak.clone(), http_client),
                navigator,
                redirect_uri: options.redirect_uri.clone(),
                logout_redirect_uri: options.logout_redirect_uri.clone(),
                renewal_interval: options.renewal_interval,
                min_token_validity: options.min_token_validity,
                cell: RwLock::new(SessionCell {
                    state: SessionState::Unauthenticated,
                    session: None,
                    initialized: false,
                    generation: 0,
                }),
                refresh_lock: tokio::sync::Mutex::new(()),
                renewal: Mutex::new(None),
            }),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionCell> {
        self.inner.cell.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionCell> {
        self.inner.cell.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn renewal_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.inner.renewal.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Log the user in and start token renewal
    ///
    /// `on_ready` runs once, after the first successful authentication.
    /// Failures are logged and returned; the manager stays unauthenticated
    /// and cannot be initialized again. Dropping the future before login
    /// completes leaves the manager unauthenticated and ready for another
    /// attempt.
    pub async fn initialize<F>(&self, on_ready: F) -> Result<(), Error>
    where
        F: FnOnce() + Send,
    {
        {
            let mut cell = self.write();
            if cell.initialized {
                return Err(Error::AlreadyInitialized);
            }
            cell.initialized = true;
            cell.state = SessionState::Authenticating;
        }

        let pending = PendingLogin { manager: self };
        let result = self.login().await;
        std::mem::forget(pending);

        match result {
            Ok(session) => {
                self.write().install(session);
                info!("User authenticated");
                self.schedule_renewal();
                on_ready();
                Ok(())
            }
            Err(err) => {
                error!("Identity provider initialization failed: {}", err);
                self.write().state = SessionState::Unauthenticated;
                Err(err)
            }
        }
    }

    async fn login(&self) -> Result<Session, Error> {
        let pkce = PkceChallenge::generate();
        let state = Uuid::new_v4().to_string();
        let nonce = Uuid::new_v4().to_string();

        let url = self
            .inner
            .keycloak
            .authorization_url(&self.inner.redirect_uri, &state, &nonce, &pkce)?;
        debug!("Sending user to the login page");

        let callback = self.inner.navigator.login(url).await?;
        let code = AuthorizationCallback::parse(&callback).into_code(&state)?;

        let tokens = self
            .inner
            .keycloak
            .exchange_code(&code, &self.inner.redirect_uri, &pkce.verifier)
            .await?;

        if let Some(id_token) = &tokens.id_token {
            let claims = decode_claims(id_token)?;
            if claims.nonce.as_deref() != Some(nonce.as_str()) {
                return Err(Error::auth("Invalid nonce in id token"));
            }
        }

        Session::from_token_response(tokens)
    }

    /// Start the periodic renewal task, replacing any previous one
    ///
    /// Must be called within a Tokio runtime.
    pub fn schedule_renewal(&self) {
        let period = self.inner.renewal_interval;
        let handle = tokio::spawn(renew_periodically(
            Arc::downgrade(&self.inner),
            Instant::now() + period,
            period,
            self.inner.min_token_validity,
        ));

        if let Some(previous) = self.renewal_slot().replace(handle) {
            previous.abort();
        }
    }

    /// Whether a renewal task is running
    pub fn is_renewal_scheduled(&self) -> bool {
        self.renewal_slot()
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    /// Refresh the token if it expires within `min_validity`
    ///
    /// Returns `Ok(true)` when the token was replaced and `Ok(false)` when it
    /// was still valid, in which case nothing is sent to the identity provider.
    pub async fn update_token(&self, min_validity: Duration) -> Result<bool, Error> {
        let _refreshing = self.inner.refresh_lock.lock().await;

        let (refresh_token, generation) = {
            let cell = self.read();
            let session = match (cell.state, cell.session.as_ref()) {
                (SessionState::Authenticated, Some(session)) => session,
                _ => return Err(Error::NotAuthenticated),
            };

            if !session.expires_within(min_validity) {
                return Ok(false);
            }

            let refresh_token = session
                .refresh_token
                .clone()
                .ok_or_else(|| Error::auth("No refresh token available"))?;
            (refresh_token, cell.generation)
        };

        let tokens = self.inner.keycloak.refresh(&refresh_token).await?;
        let mut renewed = Session::from_token_response(tokens)?;

        let mut guard = self.write();
        let cell = &mut *guard;
        match (cell.state, cell.session.as_mut()) {
            (SessionState::Authenticated, Some(current)) if cell.generation == generation => {
                if renewed.refresh_token.is_none() {
                    renewed.refresh_token = current.refresh_token.take();
                }
                if renewed.id_token.is_none() {
                    renewed.id_token = current.id_token.take();
                }
                *current = renewed;
                Ok(true)
            }
            _ => {
                warn!("Session changed while refreshing, dropping the new token");
                Err(Error::NotAuthenticated)
            }
        }
    }

    /// The current access token
    pub fn get_token(&self) -> Option<String> {
        let cell = self.read();
        match cell.state {
            SessionState::Authenticated => cell.session.as_ref().map(|s| s.access_token.clone()),
            _ => None,
        }
    }

    /// Display name of the logged in user
    pub fn get_username(&self) -> Option<String> {
        let cell = self.read();
        match cell.state {
            SessionState::Authenticated => cell.session.as_ref().and_then(Session::username),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    pub fn state(&self) -> SessionState {
        self.read().state
    }

    /// Get the current session
    pub fn get_session(&self) -> Option<Session> {
        let cell = self.read();
        match cell.state {
            SessionState::Authenticated => cell.session.clone(),
            _ => None,
        }
    }

    /// Set the session
    ///
    /// Installs tokens obtained elsewhere. Renewal is not scheduled.
    pub fn set_session(&self, session: Session) {
        let mut cell = self.write();
        cell.initialized = true;
        cell.install(session);
    }

    /// End the session and send the user to the identity provider's logout page
    ///
    /// Does nothing when there is no authenticated session.
    pub fn logout(&self) -> Result<(), Error> {
        self.end_session(true)
    }

    /// Stop the renewal task, leaving the session as it is
    pub fn shutdown(&self) {
        if let Some(handle) = self.renewal_slot().take() {
            debug!("Stopping token renewal");
            handle.abort();
        }
    }

    fn end_session(&self, cancel_renewal: bool) -> Result<(), Error> {
        let ended = {
            let mut cell = self.write();
            if cell.state != SessionState::Authenticated {
                return Ok(());
            }
            cell.state = SessionState::Unauthenticated;
            cell.generation += 1;
            cell.session.take()
        };

        // a failed renewal task is finishing on its own and only detaches
        if let Some(handle) = self.renewal_slot().take() {
            if cancel_renewal {
                handle.abort();
            }
        }

        let id_token = ended.and_then(|s| s.id_token);
        let url = self
            .inner
            .keycloak
            .end_session_url(&self.inner.logout_redirect_uri, id_token.as_deref())?;

        info!("Session ended, redirecting to logout");
        self.inner.navigator.redirect(url);
        Ok(())
    }
}

/// Resets a login that was abandoned midway
struct PendingLogin<'a> {
    manager: &'a SessionManager,
}

impl Drop for PendingLogin<'_> {
    fn drop(&mut self) {
        let mut cell = self.manager.write();
        if cell.state == SessionState::Authenticating {
            warn!("Login abandoned before completion");
            cell.state = SessionState::Unauthenticated;
            cell.initialized = false;
        }
    }
}

async fn renew_periodically(
    weak: Weak<Inner>,
    start: Instant,
    period: Duration,
    min_validity: Duration,
) {
    let mut ticker = interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let Some(inner) = weak.upgrade() else {
            break;
        };
        let manager = SessionManager { inner };

        match manager.update_token(min_validity).await {
            Ok(true) => info!("Token refreshed"),
            Ok(false) => trace!("Token still valid"),
            Err(err) => {
                error!("Failed to refresh token: {}", err);
                if let Err(err) = manager.end_session(false) {
                    error!("Logout after failed refresh: {}", err);
                }
                break;
            }
        }
    }
}
