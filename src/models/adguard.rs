// AdGuard DNS API wire types

use serde::{Deserialize, Serialize};

/// `/oauth_token` response for both the password and the refresh grant
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,

    /// Only issued by the password grant
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Token lifetime in seconds
    pub expires_in: u64,
}

/// `GET /dns_servers/{id}` response; fields we do not read are ignored
#[derive(Debug, Clone, Deserialize)]
pub struct DnsServer {
    pub settings: DnsServerSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DnsServerSettings {
    pub protection_enabled: bool,
}

/// `PUT /dns_servers/{id}/settings` body
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct SettingsUpdate {
    pub protection_enabled: bool,
}
