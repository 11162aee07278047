pub use agora_core::prelude::*;

// vim: ts=4
