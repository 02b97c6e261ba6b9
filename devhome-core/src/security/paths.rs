//! Entry-name validation and canonical containment checks.
//!
//! Name validation is applied to every candidate regardless of the scan's
//! path-safety level; containment is the additional strict-mode check.

use crate::error::DevhomeError;
use crate::Result;
use std::path::Path;

/// Rejects names that could address anything outside the scanned directory.
///
/// # Errors
/// Returns [`DevhomeError::PathRejected`] for empty names, `.`/`..`, names
/// containing `..`, path separators or NUL bytes.
pub fn validate_entry_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(DevhomeError::path_rejected(name, "empty name"));
    }
    if name == "." || name == ".." {
        return Err(DevhomeError::path_rejected(name, "dot entry"));
    }
    if name.contains("..") {
        return Err(DevhomeError::path_rejected(name, "contains '..'"));
    }
    if name.contains(['/', '\\']) {
        return Err(DevhomeError::path_rejected(name, "contains a path separator"));
    }
    if name.contains('\0') {
        return Err(DevhomeError::path_rejected(name, "contains NUL"));
    }
    Ok(())
}

/// Verifies that `candidate` resolves to a location under `canonical_root`.
///
/// `canonical_root` must already be canonicalized. Candidates that cannot be
/// canonicalized (for example dangling symlinks) are rejected.
///
/// # Errors
/// Returns [`DevhomeError::PathRejected`] when the resolved path escapes the root.
pub fn ensure_contained(canonical_root: &Path, candidate: &Path) -> Result<()> {
    let name = candidate
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let resolved = candidate
        .canonicalize()
        .map_err(|e| DevhomeError::path_rejected(&name, format!("cannot resolve: {}", e)))?;

    if resolved.starts_with(canonical_root) && resolved != canonical_root {
        Ok(())
    } else {
        Err(DevhomeError::path_rejected(
            name,
            "resolves outside the scanned directory",
        ))
    }
}
