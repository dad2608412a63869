//! Startup version gate.
//!
//! Compares the server version against `version.txt` in the cache directory
//! to decide whether the first scan must rebuild from scratch.

use std::path::Path;

/// Whether the next `index_all` should clear the hash store first.
///
/// `dev` never forces (keeps iterative development fast). A missing or
/// unreadable `version.txt` counts as a first run and forces. The current
/// version is always written back; if the cache directory is inaccessible
/// the gate is skipped with a warning.
pub fn should_force_reindex(cache_dir: &Path, version: &str) -> bool {
    if version.is_empty() || version == "dev" {
        return false;
    }

    let version_file = cache_dir.join("version.txt");
    let force = match std::fs::read_to_string(&version_file) {
        Ok(previous) => previous.trim() != version,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => true,
        Err(err) => {
            tracing::warn!("version gate skipped, cannot read {:?}: {}", version_file, err);
            return false;
        }
    };

    if let Err(err) = std::fs::write(&version_file, version) {
        tracing::warn!("failed to write {:?}: {}", version_file, err);
    }

    force
}
