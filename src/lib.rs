pub mod api;
pub mod config;
pub mod engine;
pub mod reporter;
pub mod state;
pub mod tick;
pub mod types;

/// ImmobilienScout24 exposé base URL — listing links are derived from this
/// and must reproduce it byte for byte.
pub const EXPOSE_BASE_URL: &str = "https://www.immobilienscout24.de/expose";

/// Telegram Bot API base URL.
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
