//! Temporary SSH key file guard.
//!
//! The private key fetched from the secret store is written to a
//! restrictively-permissioned temp file whose path is threaded through every
//! subsequent subprocess call. The file is the one resource requiring
//! guaranteed release on every exit path: removal happens on `Drop`, and
//! [`SshKeyFile::remove`] is idempotent so the signal path can call it
//! synchronously before the process exits.

use crate::error::{CoreError, Result};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct SshKeyFile {
    path: PathBuf,
}

impl SshKeyFile {
    /// Write the key material to a fresh 0600 temp file.
    pub fn materialize(key_material: &str) -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix("maestro_vps_ssh_key_")
            .tempfile()?;
        fs::set_permissions(file.path(), fs::Permissions::from_mode(0o600))?;
        fs::write(file.path(), normalize_key_material(key_material))?;

        let path = file
            .into_temp_path()
            .keep()
            .map_err(|e| CoreError::Io(e.error))?;
        debug!(path = %path.display(), "Materialized SSH key file");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the key file. Safe to call more than once.
    pub fn remove(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed SSH key file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), "Failed to remove SSH key file: {e}"),
        }
    }
}

impl Drop for SshKeyFile {
    fn drop(&mut self) {
        self.remove();
    }
}

/// Normalize escaped newlines, strip CRs, and ensure a trailing newline for
/// OpenSSH.
fn normalize_key_material(raw: &str) -> String {
    let mut key = raw.replace("\\n", "\n").replace('\r', "");
    if !key.ends_with('\n') {
        key.push('\n');
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_key_material() {
        assert_eq!(normalize_key_material("a\\nb"), "a\nb\n");
        assert_eq!(normalize_key_material("a\r\nb\n"), "a\nb\n");
        assert_eq!(normalize_key_material("a\n"), "a\n");
    }

    #[test]
    fn test_materialize_writes_restricted_file() {
        let key = SshKeyFile::materialize("-----BEGIN KEY-----\\nbody").unwrap();
        let content = fs::read_to_string(key.path()).unwrap();
        assert_eq!(content, "-----BEGIN KEY-----\nbody\n");

        let mode = fs::metadata(key.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_removed_on_drop() {
        let key = SshKeyFile::materialize("material").unwrap();
        let path = key.path().to_path_buf();
        assert!(path.exists());
        drop(key);
        assert!(!path.exists());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let key = SshKeyFile::materialize("material").unwrap();
        key.remove();
        key.remove();
        assert!(!key.path().exists());
    }
}
