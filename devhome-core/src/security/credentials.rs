//! Zeroizing container for database passwords.
//!
//! # Security
//! - The value lives in a `Zeroizing<String>` and is cleared on drop
//! - `Debug` never prints the value
//! - Deserializable from configuration, never serialized back out

use serde::Deserialize;
use zeroize::Zeroizing;

/// A secret string that is wiped from memory when dropped.
///
/// # Example
///
/// ```rust
/// use devhome_core::security::Secret;
///
/// let password = Secret::new("s3cret");
/// assert_eq!(password.expose(), "s3cret");
/// assert_eq!(format!("{:?}", password), "Secret(****)");
/// ```
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub struct Secret(Zeroizing<String>);

impl Secret {
    /// Wraps a value in a zeroizing container.
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// Returns the raw value. Never log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the secret is the empty string.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(****)")
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
