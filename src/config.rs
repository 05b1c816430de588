// Configuration
// Merges CLI flags, environment and a JSON accessory block

use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::auth::{DEFAULT_REFRESH_MARGIN_SECS, MAX_REFRESH_MARGIN_SECS};
use crate::error::SwitchError;
use crate::http_client::DEFAULT_API_BASE_URL;

/// Display name used when none is configured
pub const DEFAULT_SWITCH_NAME: &str = "AdGuard DNS Protection";

/// AdGuard DNS protection switch
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// JSON accessory config file (homebridge-style accessory block)
    #[arg(short = 'c', long, env = "ADGUARD_SWITCH_CONFIG")]
    pub config: Option<String>,

    /// AdGuard DNS server identifier
    #[arg(short = 's', long, env = "ADGUARD_DNS_SERVER_ID")]
    pub dns_server_id: Option<String>,

    /// AdGuard account username
    #[arg(short = 'u', long, env = "ADGUARD_USERNAME")]
    pub username: Option<String>,

    /// AdGuard account password
    #[arg(short = 'p', long, env = "ADGUARD_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// One-time multi-factor code sent with the password grant
    #[arg(long, env = "ADGUARD_MFA_TOKEN", hide_env_values = true)]
    pub mfa_token: Option<String>,

    /// Switch display name
    #[arg(short = 'n', long, env = "ADGUARD_SWITCH_NAME")]
    pub name: Option<String>,

    /// Enable debug logging
    #[arg(long, env = "ADGUARD_DEBUG")]
    pub debug: bool,

    /// AdGuard DNS API base URL
    #[arg(long, env = "ADGUARD_API_BASE_URL")]
    pub api_base_url: Option<String>,

    /// Seconds before expiry at which the access token is renewed
    #[arg(long = "refresh-margin", env = "TOKEN_REFRESH_MARGIN", default_value_t = DEFAULT_REFRESH_MARGIN_SECS)]
    pub refresh_margin_secs: u64,

    /// HTTP connect timeout in seconds (transport default when unset)
    #[arg(long, env = "HTTP_CONNECT_TIMEOUT")]
    pub http_connect_timeout: Option<u64>,

    /// HTTP request timeout in seconds (transport default when unset)
    #[arg(long = "http-timeout", env = "HTTP_REQUEST_TIMEOUT")]
    pub http_request_timeout: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print whether DNS protection is enabled
    Get,
    /// Turn DNS protection on or off
    Set {
        #[arg(value_enum)]
        state: SwitchState,
    },
    /// Flip DNS protection and print the new state
    Toggle,
    /// Print the protection state and session details
    Status,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchState {
    On,
    Off,
}

impl SwitchState {
    pub fn as_bool(self) -> bool {
        matches!(self, SwitchState::On)
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Accessory block as found in a homebridge config.json
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessoryConfig {
    pub name: Option<String>,
    pub dns_server_id: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(alias = "mfa_token")]
    pub mfa_token: Option<String>,
    pub debug: Option<bool>,
    pub api_base_url: Option<String>,
}

impl AccessoryConfig {
    /// Read an accessory block from a JSON file
    pub fn load(path: &Path) -> Result<Self, SwitchError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SwitchError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            SwitchError::ConfigError(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })
    }
}

#[derive(Clone)]
pub struct Config {
    // Switch
    pub name: String,
    pub dns_server_id: String,

    // Account
    pub username: String,
    pub password: String,
    pub mfa_token: Option<String>,

    // API
    pub api_base_url: String,
    pub refresh_margin_secs: u64,

    // HTTP client
    pub http_connect_timeout: Option<u64>,
    pub http_request_timeout: Option<u64>,

    // Logging
    pub debug: bool,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: DEFAULT_SWITCH_NAME.to_string(),
            dns_server_id: String::new(),
            username: String::new(),
            password: String::new(),
            mfa_token: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            refresh_margin_secs: DEFAULT_REFRESH_MARGIN_SECS,
            http_connect_timeout: None,
            http_request_timeout: None,
            debug: false,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

impl Config {
    /// Load configuration with priority: CLI > ENV (.env included) > config file > defaults
    pub fn load(args: &CliArgs) -> Result<Self, SwitchError> {
        let file = match args.config {
            Some(ref path) => Some(AccessoryConfig::load(&expand_tilde(path))?),
            None => None,
        };
        let config = Self::from_sources(args, file.unwrap_or_default());
        config.validate()?;
        Ok(config)
    }

    /// Merge CLI/env values over an accessory block. Empty strings count as unset.
    pub fn from_sources(args: &CliArgs, file: AccessoryConfig) -> Self {
        let defaults = Config::default();

        Config {
            name: pick(args.name.clone(), file.name).unwrap_or(defaults.name),
            dns_server_id: pick(args.dns_server_id.clone(), file.dns_server_id).unwrap_or_default(),
            username: pick(args.username.clone(), file.username).unwrap_or_default(),
            password: pick(args.password.clone(), file.password).unwrap_or_default(),
            mfa_token: pick(args.mfa_token.clone(), file.mfa_token),
            api_base_url: pick(args.api_base_url.clone(), file.api_base_url)
                .unwrap_or(defaults.api_base_url),
            refresh_margin_secs: args.refresh_margin_secs,
            http_connect_timeout: args.http_connect_timeout,
            http_request_timeout: args.http_request_timeout,
            debug: args.debug || file.debug.unwrap_or(false),
            log_level: args.log_level.clone(),
            log_format: args.log_format,
        }
    }

    /// Fail fast on missing required fields or out-of-range values, before any network activity
    pub fn validate(&self) -> Result<(), SwitchError> {
        let missing: Vec<&str> = [
            ("dnsServerId", self.dns_server_id.as_str()),
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect();

        if !missing.is_empty() {
            return Err(SwitchError::ConfigError(format!(
                "dnsServerId, username, and password are required (missing: {})",
                missing.join(", ")
            )));
        }

        if self.refresh_margin_secs > MAX_REFRESH_MARGIN_SECS {
            return Err(SwitchError::ConfigError(format!(
                "refresh margin must be at most {} seconds (got {})",
                MAX_REFRESH_MARGIN_SECS, self.refresh_margin_secs
            )));
        }

        Ok(())
    }

    /// Level for the tracing filter; the debug flag raises it to `debug`
    pub fn effective_log_level(&self) -> String {
        if self.debug && !matches!(self.log_level.to_lowercase().as_str(), "trace" | "debug") {
            "debug".to_string()
        } else {
            self.log_level.to_lowercase()
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("name", &self.name)
            .field("dns_server_id", &self.dns_server_id)
            .field("username", &self.username)
            .field("password", &"***")
            .field("mfa_token", &self.mfa_token.as_ref().map(|_| "***"))
            .field("api_base_url", &self.api_base_url)
            .field("refresh_margin_secs", &self.refresh_margin_secs)
            .field("http_connect_timeout", &self.http_connect_timeout)
            .field("http_request_timeout", &self.http_request_timeout)
            .field("debug", &self.debug)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .finish()
    }
}

fn pick(primary: Option<String>, fallback: Option<String>) -> Option<String> {
    primary
        .filter(|v| !v.is_empty())
        .or_else(|| fallback.filter(|v| !v.is_empty()))
}

/// Expand tilde (~) in file paths to user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
