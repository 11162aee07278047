//! Shared types, adapter traits, and core utilities for Agora.
//!
//! This crate contains the foundational types that are shared between the
//! engine crates and all adapter implementations.

pub mod error;
pub mod message_bus;
pub mod meta_adapter;
pub mod prelude;
pub mod types;

// vim: ts=4
