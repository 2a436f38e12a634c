//! Core Utilities

mod hashing;

pub use hashing::{content_hash, short_hash};
