//! Core infrastructure for Agora.
//!
//! Hosts the typed site-settings engine together with the pieces it is wired
//! to: the process-local message bus, the shared response cache, the global
//! (environment/file) settings layer and the application state.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod app;
pub mod core_settings;
pub mod extensions;
pub mod extract;
pub mod global_settings;
pub mod mem_meta_adapter;
pub mod message_bus;
pub mod prelude;
pub mod settings;
pub mod shared_cache;

pub use app::{App, AppState};
pub use extract::{Auth, OptionalAuth, Site};
pub use message_bus::LocalMessageBus;

pub fn register_settings(
	registry: &mut settings::SettingsRegistry,
) -> agora_types::error::ClResult<()> {
	core_settings::register_settings(registry)
}

// vim: ts=4
