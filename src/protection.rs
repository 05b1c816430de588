// Protection controller
// Reads and writes `protection_enabled` on one DNS server

use reqwest::{header, Method};
use std::sync::Arc;

use crate::auth::SessionManager;
use crate::error::{Result, SwitchError};
use crate::http_client::AdGuardHttpClient;
use crate::models::{DnsServer, SettingsUpdate};

/// Get/set of the protection flag, each guarded by `SessionManager::ensure_valid`.
/// The flag is never cached: every call goes to the API.
pub struct ProtectionController {
    sessions: Arc<SessionManager>,
    http: AdGuardHttpClient,
    dns_server_id: String,
}

impl ProtectionController {
    pub fn new(sessions: Arc<SessionManager>, http: AdGuardHttpClient, dns_server_id: String) -> Self {
        Self {
            sessions,
            http,
            dns_server_id,
        }
    }

    pub fn dns_server_id(&self) -> &str {
        &self.dns_server_id
    }

    /// Current value of `settings.protection_enabled`
    pub async fn get_state(&self) -> Result<bool> {
        let token = self.sessions.ensure_valid().await?;

        let request = self
            .http
            .request(Method::GET, &["dns_servers", &self.dns_server_id])
            .bearer_auth(token);

        let server: DnsServer = self
            .http
            .execute_json(request)
            .await
            .map_err(SwitchError::ApiError)?;

        let enabled = server.settings.protection_enabled;
        tracing::debug!(protection_enabled = enabled, "Read protection state");
        Ok(enabled)
    }

    /// Write `protection_enabled`. The remote state is not read back.
    pub async fn set_state(&self, desired: bool) -> Result<()> {
        let token = self.sessions.ensure_valid().await?;

        let payload = SettingsUpdate {
            protection_enabled: desired,
        };
        tracing::debug!(payload = ?payload, "Writing protection state");

        let request = self
            .http
            .request(
                Method::PUT,
                &["dns_servers", &self.dns_server_id, "settings"],
            )
            .bearer_auth(token)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&payload);

        self.http
            .execute(request)
            .await
            .map_err(SwitchError::ApiError)?;

        Ok(())
    }
}
