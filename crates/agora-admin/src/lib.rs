//! Admin API handlers for site administration

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod group;
pub mod perm;

mod prelude;

// vim: ts=4
