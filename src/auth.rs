//! Credential models: consumer keys, OAuth tokens, and redacted secrets.

pub mod credential;
pub mod secret;

pub use credential::*;
pub use secret::*;
