// Authentication module
// Manages the OAuth2 token lifecycle against the AdGuard DNS token endpoint

mod clock;
mod grant;
mod manager;
mod types;

pub use clock::{Clock, SystemClock};
pub use manager::{SessionManager, DEFAULT_REFRESH_MARGIN_SECS, MAX_REFRESH_MARGIN_SECS};
pub use types::{mask_secret, AccessGrant, Credentials, Session};
