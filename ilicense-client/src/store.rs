//! File-backed persistence of the raw activation code.

use crate::error::{LicenseError, LicenseResult};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

/// Stores the activation code as plain text at a fixed path.
///
/// An absent file means "not activated".
#[derive(Debug, Clone)]
pub struct ActivationStore {
    path: PathBuf,
}

impl ActivationStore {
    /// Creates a store at `path`. Nothing is touched on disk.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The storage file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored activation code, or `None` if no file exists.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Persistence`] if the file exists but cannot be read.
    pub fn load(&self) -> LicenseResult<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(code) => Ok(Some(code)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("license file does not exist: {}", self.path.display());
                Ok(None)
            }
            Err(source) => Err(LicenseError::Persistence {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Writes `activation_code` verbatim, creating parent directories as needed.
    ///
    /// The code is written to a temporary file next to the target and renamed
    /// over it, so a failed save leaves any previously stored code intact.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Persistence`] if a directory or the file cannot
    /// be written.
    pub fn save(&self, activation_code: &str) -> LicenseResult<()> {
        let persistence = |source| LicenseError::Persistence {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            Some(dir) => {
                std::fs::create_dir_all(dir).map_err(persistence)?;
                dir
            }
            None => Path::new("."),
        };

        let mut staged = NamedTempFile::new_in(dir).map_err(persistence)?;
        staged
            .write_all(activation_code.as_bytes())
            .and_then(|()| staged.as_file().sync_all())
            .map_err(persistence)?;
        staged
            .persist(&self.path)
            .map_err(|e| persistence(e.error))?;

        info!("license saved: {}", self.path.display());
        Ok(())
    }
}
