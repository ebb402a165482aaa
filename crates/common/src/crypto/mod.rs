//! Symmetric encryption primitives used to encrypt OAuth credentials at rest.

pub mod encryption;

pub use encryption::{EncryptedData, EncryptionService};
