// Authentication types

use chrono::{DateTime, Duration, Utc};
use std::fmt;

/// Account credentials, fixed for the lifetime of the process
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub mfa_token: Option<String>,
}

impl Credentials {
    pub fn new(username: String, password: String, mfa_token: Option<String>) -> Self {
        Self {
            username,
            password,
            mfa_token: mfa_token.filter(|t| !t.is_empty()),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .field("mfa_token", &self.mfa_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Access token together with its expiry.
/// Keeping both in one value means a token can never exist without an expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessGrant {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for AccessGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessGrant")
            .field("token", &mask_secret(&self.token))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Mutable session state owned by the session manager
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub access: Option<AccessGrant>,
    pub refresh_token: Option<String>,
}

impl Session {
    /// True when there is no access token, or `now + margin` is past its expiry
    pub fn needs_renewal(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        match self.access {
            None => true,
            Some(ref grant) => now + margin > grant.expires_at,
        }
    }

    /// The access token, unless it needs renewal
    pub fn valid_token(&self, now: DateTime<Utc>, margin: Duration) -> Option<&str> {
        if self.needs_renewal(now, margin) {
            None
        } else {
            self.access_token()
        }
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access.as_ref().map(|g| g.token.as_str())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.access.as_ref().map(|g| g.expires_at)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access", &self.access)
            .field("refresh_token", &self.refresh_token.as_deref().map(mask_secret))
            .finish()
    }
}

/// Keep only a short prefix of a secret for logs
pub fn mask_secret(secret: &str) -> String {
    let prefix: String = secret.chars().take(6).collect();
    if prefix.len() == secret.len() {
        "***".to_string()
    } else {
        format!("{}...", prefix)
    }
}
