//! Utility modules shared across the crate.

pub mod minify;
pub mod slug;
pub mod xml;
