// Session manager

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::clock::{Clock, SystemClock};
use super::grant;
use super::types::{mask_secret, AccessGrant, Credentials, Session};
use crate::error::{Result, SwitchError};
use crate::http_client::AdGuardHttpClient;

/// Default safety margin before expiry at which a token is renewed
pub const DEFAULT_REFRESH_MARGIN_SECS: u64 = 60;

/// Largest accepted renewal margin (one day)
pub const MAX_REFRESH_MARGIN_SECS: u64 = 86_400;

/// Session manager
/// Owns the token lifecycle. The session lock is held for the whole
/// check-and-renew sequence, so concurrent callers share a single renewal.
pub struct SessionManager {
    /// Account credentials
    credentials: Credentials,

    /// Current tokens
    session: Mutex<Session>,

    /// HTTP client for token requests
    http: AdGuardHttpClient,

    /// Time source for expiry decisions
    clock: Arc<dyn Clock>,

    /// Renew when `now + refresh_margin` is past the expiry
    refresh_margin: Duration,
}

impl SessionManager {
    /// Create a session manager with an empty session
    pub fn new(credentials: Credentials, http: AdGuardHttpClient) -> Self {
        Self::with_clock(credentials, http, Arc::new(SystemClock))
    }

    /// Create a session manager driven by a custom clock
    pub fn with_clock(
        credentials: Credentials,
        http: AdGuardHttpClient,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            credentials,
            session: Mutex::new(Session::default()),
            http,
            clock,
            refresh_margin: Duration::seconds(DEFAULT_REFRESH_MARGIN_SECS as i64),
        }
    }

    /// Override the renewal margin, capped at `MAX_REFRESH_MARGIN_SECS`
    pub fn with_refresh_margin(mut self, margin_secs: u64) -> Self {
        let capped = margin_secs.min(MAX_REFRESH_MARGIN_SECS);
        if capped != margin_secs {
            tracing::warn!(
                requested = margin_secs,
                applied = capped,
                "Refresh margin too large, capping it"
            );
        }
        self.refresh_margin = i64::try_from(capped)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(self.refresh_margin);
        self
    }

    pub fn refresh_margin(&self) -> Duration {
        self.refresh_margin
    }

    /// Ensure a valid access token is available and return it.
    /// Refreshes when a refresh token is held, otherwise authenticates.
    pub async fn ensure_valid(&self) -> Result<String> {
        let mut session = self.session.lock().await;

        if let Some(token) = session.valid_token(self.clock.now(), self.refresh_margin) {
            return Ok(token.to_string());
        }

        tracing::debug!("Access token is missing or about to expire, fetching new token...");
        if session.refresh_token.is_some() {
            self.refresh(&mut session).await
        } else {
            self.authenticate(&mut session).await
        }
    }

    /// Expiry of the current access token, if any
    pub async fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.session.lock().await.expires_at()
    }

    /// Whether a refresh token is currently held
    pub async fn has_refresh_token(&self) -> bool {
        self.session.lock().await.refresh_token.is_some()
    }

    /// Password grant; replaces the whole session
    async fn authenticate(&self, session: &mut Session) -> Result<String> {
        tracing::debug!("Authenticating with AdGuard DNS API...");

        let token = grant::request_password_grant(&self.http, &self.credentials)
            .await
            .map_err(|failure| {
                tracing::error!(error = %failure, "Failed to authenticate using credentials");
                SwitchError::AuthError(failure)
            })?;

        let expires_at = self.expiry_from(token.expires_in);
        session.access = Some(AccessGrant {
            token: token.access_token.clone(),
            expires_at,
        });
        // An empty refresh token is as good as none
        session.refresh_token = token.refresh_token.filter(|t| !t.is_empty());

        tracing::info!(
            expires_at = %expires_at.to_rfc3339(),
            has_refresh_token = session.refresh_token.is_some(),
            "Got new access token and refresh token"
        );
        Ok(token.access_token)
    }

    /// Refresh grant; replaces the access token, keeps the refresh token
    async fn refresh(&self, session: &mut Session) -> Result<String> {
        let Some(refresh_token) = session.refresh_token.clone() else {
            return self.authenticate(session).await;
        };

        tracing::debug!(
            refresh_token = %mask_secret(&refresh_token),
            "Refreshing AdGuard DNS access token..."
        );

        let token = match grant::request_refresh_grant(&self.http, &refresh_token).await {
            Ok(token) => token,
            Err(failure) => {
                tracing::error!(error = %failure, "Failed to refresh access token");
                if failure.is_rejection() {
                    // Next ensure_valid falls back to the password grant
                    tracing::warn!("Refresh token rejected, discarding it");
                    session.refresh_token = None;
                }
                return Err(SwitchError::RefreshError(failure));
            }
        };

        if token.refresh_token.as_deref().is_some_and(|t| t != refresh_token) {
            tracing::debug!("Refresh response carried a new refresh token; keeping the current one");
        }

        let expires_at = self.expiry_from(token.expires_in);
        session.access = Some(AccessGrant {
            token: token.access_token.clone(),
            expires_at,
        });

        tracing::info!(expires_at = %expires_at.to_rfc3339(), "Access token refreshed");
        Ok(token.access_token)
    }

    /// now + lifetime, saturating for absurd server values
    fn expiry_from(&self, expires_in: u64) -> DateTime<Utc> {
        let now = self.clock.now();
        i64::try_from(expires_in)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
