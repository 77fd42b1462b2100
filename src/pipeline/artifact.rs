//! Temporary artifact store: the upload and the translated result on disk.
//!
//! Each artifact lives in a uniquely named file under the store root for as
//! long as its [`ArtifactHandle`] is alive. Names follow
//! `<role>-<unix-millis>-<random>[.<ext>]` and files are created exclusively,
//! so two concurrent requests can never share one.
//!
//! Release happens through [`ArtifactHandle::release`] or, failing that, on
//! `Drop`. Either way a removal failure is logged and swallowed: cleanup must
//! never mask the outcome of the translation itself.

use crate::error::TranslateError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::TempPath;
use tracing::{debug, warn};

/// Random characters appended after the timestamp.
const RANDOM_LEN: usize = 10;

/// What an artifact holds. Used as the file-name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactRole {
    Input,
    Output,
}

impl fmt::Display for ArtifactRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactRole::Input => f.write_str("input"),
            ArtifactRole::Output => f.write_str("output"),
        }
    }
}

/// Creates and reads temporary artifacts under one root directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl Default for ArtifactStore {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `bytes` to a fresh artifact and return its handle.
    ///
    /// `extension` (without dot) is preserved when given so that anything
    /// inspecting the file by name sees the right type.
    pub async fn stash(
        &self,
        role: ArtifactRole,
        bytes: &[u8],
        extension: Option<&str>,
    ) -> Result<ArtifactHandle, TranslateError> {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let prefix = format!("{role}-{millis}-");
        let suffix = extension.map(|e| format!(".{e}")).unwrap_or_default();

        let file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(&suffix)
            .rand_bytes(RANDOM_LEN)
            .tempfile_in(&self.root)
            .map_err(|e| TranslateError::Artifact {
                path: self.root.clone(),
                source: e,
            })?;
        let path = file.into_temp_path();

        if let Err(e) = tokio::fs::write(&path, bytes).await {
            let failed_at = path.to_path_buf();
            // `path` is dropped here, which removes the partial file.
            return Err(TranslateError::Artifact {
                path: failed_at,
                source: e,
            });
        }

        debug!("Stashed {} artifact ({} bytes) at {}", role, bytes.len(), path.display());
        Ok(ArtifactHandle {
            role,
            path: Some(path),
        })
    }

    /// Read an artifact's bytes back.
    pub async fn retrieve(&self, handle: &ArtifactHandle) -> Result<Vec<u8>, TranslateError> {
        let path = handle.path().ok_or_else(|| {
            TranslateError::Internal(format!("{} artifact was already released", handle.role))
        })?;
        tokio::fs::read(path)
            .await
            .map_err(|e| TranslateError::Artifact {
                path: path.to_path_buf(),
                source: e,
            })
    }

    /// Remove an artifact. Idempotent; failures are logged, not returned.
    pub fn release(&self, handle: &mut ArtifactHandle) {
        handle.release();
    }
}

/// Ownership of one temporary file. Dropping the handle removes the file.
pub struct ArtifactHandle {
    role: ArtifactRole,
    path: Option<TempPath>,
}

impl ArtifactHandle {
    pub fn role(&self) -> ArtifactRole {
        self.role
    }

    /// Path of the backing file, or `None` once released.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_released(&self) -> bool {
        self.path.is_none()
    }

    /// Delete the backing file. Safe to call more than once.
    pub fn release(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };
        let shown = path.to_path_buf();
        match path.close() {
            Ok(()) => debug!("Released {} artifact {}", self.role, shown.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("{} artifact {} was already gone", self.role, shown.display())
            }
            Err(e) => warn!(
                "Failed to remove {} artifact {}: {}",
                self.role,
                shown.display(),
                e
            ),
        }
    }
}

impl Drop for ArtifactHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for ArtifactHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactHandle")
            .field("role", &self.role)
            .field("path", &self.path())
            .finish()
    }
}
