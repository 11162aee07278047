//! Agora is the settings and permission core of a forum platform.
//!
//! # Features
//!
//! - Typed site settings
//!     - declared types, defaults and validation
//!     - per-site overrides with an in-memory cache
//!     - cross-process invalidation over a message bus
//!     - global (file/environment) shadowing
//! - Categories
//!     - group permissions with read restriction
//!     - one level of nesting with compatible parent/child permissions
//!     - permission scoped listings

// Re-export shared types and adapter traits from agora-types
pub use agora_types::error;
pub use agora_types::message_bus;
pub use agora_types::meta_adapter;
pub use agora_types::types;

// Feature crate re-exports
pub use agora_admin as admin;
pub use agora_category as category;
pub use agora_core::settings;

// Local modules
pub mod app;
pub mod auth;
pub mod prelude;
pub mod routes;

pub use crate::app::{App, AppBuilder};

// vim: ts=4
