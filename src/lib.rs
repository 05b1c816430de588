// AdGuard DNS protection switch - library root

pub mod accessory;
pub mod auth;
pub mod config;
pub mod error;
pub mod http_client;
pub mod models;
pub mod protection;

pub use accessory::ProtectionSwitch;
pub use error::{HttpFailure, SwitchError};
