//! Security primitives shared across crates.

pub mod encryption;

pub use encryption::{generate_encryption_key, SecureString};
