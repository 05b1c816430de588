// Protection switch
// Host-boundary adapter: async results inside, callbacks at the edge

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use crate::auth::{Clock, Credentials, SessionManager, SystemClock};
use crate::config::Config;
use crate::error::{Result, SwitchError};
use crate::http_client::AdGuardHttpClient;
use crate::protection::ProtectionController;

/// A single on/off switch bound to one AdGuard DNS server
pub struct ProtectionSwitch {
    name: String,
    sessions: Arc<SessionManager>,
    controller: ProtectionController,
}

impl ProtectionSwitch {
    /// Build the switch from configuration. Validates first; performs no network I/O.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Same as `from_config`, with a custom time source for token expiry
    pub fn with_clock(config: &Config, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let http = AdGuardHttpClient::new(
            &config.api_base_url,
            config.http_connect_timeout,
            config.http_request_timeout,
        )?;

        let credentials = Credentials::new(
            config.username.clone(),
            config.password.clone(),
            config.mfa_token.clone(),
        );
        let sessions = Arc::new(
            SessionManager::with_clock(credentials, http.clone(), clock)
                .with_refresh_margin(config.refresh_margin_secs),
        );
        let controller =
            ProtectionController::new(sessions.clone(), http, config.dns_server_id.clone());

        tracing::debug!(
            name = %config.name,
            dns_server_id = %config.dns_server_id,
            "Protection switch configured"
        );

        Ok(Self {
            name: config.name.clone(),
            sessions,
            controller,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dns_server_id(&self) -> &str {
        self.controller.dns_server_id()
    }

    /// Expiry of the current access token, if one has been obtained
    pub async fn token_expires_at(&self) -> Option<DateTime<Utc>> {
        self.sessions.expires_at().await
    }

    /// Authenticate in the background so the first get/set finds a token.
    /// A failure is logged; the next operation retries through `ensure_valid`.
    pub fn spawn_initial_authentication(&self) -> JoinHandle<()> {
        let sessions = self.sessions.clone();
        let span = tracing::info_span!("initial_auth", switch = %self.name);

        tokio::spawn(
            async move {
                match sessions.ensure_valid().await {
                    Ok(_) => tracing::info!("Authenticated with AdGuard DNS API."),
                    Err(e) => tracing::error!(error = %e, "Authentication error"),
                }
            }
            .instrument(span),
        )
    }

    /// Read the remote protection flag
    pub async fn current_state(&self) -> Result<bool> {
        self.controller
            .get_state()
            .instrument(self.operation_span("get"))
            .await
    }

    /// Write the remote protection flag
    pub async fn apply_state(&self, on: bool) -> Result<()> {
        let span = self.operation_span("set");
        async {
            tracing::debug!(desired = on, "Toggling protection_enabled");
            self.controller.set_state(on).await?;
            if on {
                tracing::info!("protection_enabled was ENABLED (switch ON)");
            } else {
                tracing::info!("protection_enabled was DISABLED (switch OFF)");
            }
            Ok::<_, SwitchError>(())
        }
        .instrument(span)
        .await
    }

    /// Flip the remote protection flag and return the new value
    pub async fn toggle(&self) -> Result<bool> {
        let current = self.current_state().await?;
        self.apply_state(!current).await?;
        Ok(!current)
    }

    /// Callback-style read for hosts that expect `(error, value)` callbacks
    pub async fn handle_get<F>(&self, callback: F)
    where
        F: FnOnce(Result<bool>),
    {
        let result = self.current_state().await;
        match result {
            Ok(enabled) => tracing::debug!("Current protection_enabled value is {}", enabled),
            Err(ref e) => tracing::error!(error = %e, "Error getting protection_enabled"),
        }
        callback(result);
    }

    /// Callback-style write for hosts that expect an `(error)` callback
    pub async fn handle_set<F>(&self, value: bool, callback: F)
    where
        F: FnOnce(Result<()>),
    {
        let result = self.apply_state(value).await;
        if let Err(ref e) = result {
            tracing::error!(error = %e, "Error setting protection_enabled");
        }
        callback(result);
    }

    fn operation_span(&self, operation: &'static str) -> tracing::Span {
        tracing::info_span!(
            "protection",
            switch = %self.name,
            operation,
            operation_id = %Uuid::new_v4()
        )
    }
}
