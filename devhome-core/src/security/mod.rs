//! Security utilities for path validation, process arguments and credentials.
//!
//! # Module Structure
//! - `paths`: entry-name validation and canonical containment checks
//! - `shell`: POSIX shell quoting for binary paths taken from configuration
//! - `credentials`: zeroizing container for database passwords

mod credentials;
mod paths;
mod shell;

pub use credentials::Secret;
pub use paths::{ensure_contained, validate_entry_name};
pub use shell::shell_quote;
