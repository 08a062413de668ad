//! Bearer credential and its optional on-disk copy.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::errors::FabricatorError;

/// A GitHub bearer token. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wraps a token, trimming surrounding whitespace.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into().trim().to_string())
    }

    /// Returns the raw token for the `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns true if the token is blank.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// A plain-text file holding one token.
#[derive(Debug, Clone)]
pub struct CredentialFile {
    path: PathBuf,
}

impl CredentialFile {
    /// Creates a handle for `path`. Nothing is read yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored token. A missing or blank file yields `None`.
    pub fn load(&self) -> Result<Option<Credential>, FabricatorError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => {
                let credential = Credential::new(raw);
                Ok((!credential.is_empty()).then_some(credential))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Stores the token, creating parent directories.
    pub fn save(&self, credential: &Credential) -> Result<(), FabricatorError> {
        if credential.is_empty() {
            return Err(FabricatorError::validation("token", "Refusing to store an empty token"));
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, credential.expose())?;
        restrict_permissions(&self.path)?;
        tracing::info!(path = %self.path.display(), "Stored GitHub token");
        Ok(())
    }

    /// Removes the stored token. Returns false if there was none.
    pub fn clear(&self) -> Result<bool, FabricatorError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts() {
        let credential = Credential::new("ghp_secret");
        assert_eq!(format!("{credential:?}"), "Credential(***)");
        assert_eq!(credential.expose(), "ghp_secret");
    }

    #[test]
    fn test_trims_whitespace() {
        assert_eq!(Credential::new("  ghp_x\n").expose(), "ghp_x");
        assert!(Credential::new(" \n").is_empty());
    }

    #[test]
    fn test_save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let file = CredentialFile::new(dir.path().join("nested").join("token"));

        assert!(file.load().unwrap().is_none());
        file.save(&Credential::new("ghp_stored")).unwrap();
        assert_eq!(file.load().unwrap(), Some(Credential::new("ghp_stored")));

        assert!(file.clear().unwrap());
        assert!(!file.clear().unwrap());
        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn test_refuses_empty_token() {
        let dir = tempfile::tempdir().unwrap();
        let file = CredentialFile::new(dir.path().join("token"));
        assert!(file.save(&Credential::new("")).is_err());
    }
}
