//! Google Calendar as the destination store for mirrored feed events.

pub mod api;
pub mod app_config;
pub mod auth;
mod convert;
pub mod session;
mod types;

pub use api::GoogleCalendar;

/// Private extended property holding the owning feed's tag
pub const OWNER_PROPERTY: &str = "webcal-sync-feed";

/// Private extended property holding the event's identity key
pub const KEY_PROPERTY: &str = "webcal-sync-key";
