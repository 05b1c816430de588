// Data models for the AdGuard DNS API

pub mod adguard;

pub use adguard::{DnsServer, DnsServerSettings, SettingsUpdate, TokenResponse};
