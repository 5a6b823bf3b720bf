//! The stable output location for rendered themes.
//!
//! The first successful render allocates a temporary `.html` path; every
//! later render overwrites that same path so the host only ever needs to
//! reload it. Writes go through a staging file and a rename, so a failure
//! part way through leaves the previous render intact.

use std::path::{Path, PathBuf};

use tempfile::TempPath;

use crate::error::{LoaderError, Result};

#[derive(Debug, Default)]
enum Slot {
    /// Nothing rendered yet
    #[default]
    Unallocated,
    /// Temporary file, removed when the slot is dropped
    Temporary(TempPath),
    /// Caller-chosen or kept file, never removed by the slot
    Fixed(PathBuf),
}

/// Owner of the rendered document's path.
#[derive(Debug, Default)]
pub struct OutputSlot {
    slot: Slot,
}

impl OutputSlot {
    /// A slot that allocates a temporary file on first write.
    pub fn temporary() -> Self {
        Self::default()
    }

    /// A slot that always writes to `path`.
    pub fn fixed(path: PathBuf) -> Self {
        Self {
            slot: Slot::Fixed(path),
        }
    }

    /// Current output path, if one has been allocated.
    pub fn path(&self) -> Option<&Path> {
        match self.slot {
            Slot::Unallocated => None,
            Slot::Temporary(ref path) => Some(&**path),
            Slot::Fixed(ref path) => Some(path.as_path()),
        }
    }

    /// Stop the temporary file from being deleted when the slot is dropped.
    ///
    /// Returns `None` if nothing has been rendered yet, or if the file could
    /// not be kept; in that case the slot still owns it.
    pub fn keep(&mut self) -> Option<PathBuf> {
        match std::mem::take(&mut self.slot) {
            Slot::Unallocated => None,
            Slot::Fixed(path) => {
                self.slot = Slot::Fixed(path.clone());
                Some(path)
            }
            Slot::Temporary(temp) => match temp.keep() {
                Ok(path) => {
                    self.slot = Slot::Fixed(path.clone());
                    Some(path)
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to keep rendered theme {:?}: {}",
                        e.path.to_path_buf(),
                        e.error
                    );
                    self.slot = Slot::Temporary(e.path);
                    None
                }
            },
        }
    }

    /// Write `contents` to the slot's path, allocating it on first use.
    pub async fn write(&mut self, contents: &str) -> Result<PathBuf> {
        if matches!(self.slot, Slot::Unallocated) {
            let temp = tempfile::Builder::new()
                .prefix("conkie-")
                .suffix(".html")
                .tempfile()
                .map_err(|source| LoaderError::RenderWriteFailed {
                    path: std::env::temp_dir(),
                    source,
                })?
                .into_temp_path();
            tracing::info!("Setup temp file {:?}", temp.to_path_buf());
            self.slot = Slot::Temporary(temp);
        }

        let path = self
            .path()
            .map(Path::to_path_buf)
            .unwrap_or_else(std::env::temp_dir);
        write_atomic(&path, contents).await?;
        Ok(path)
    }
}

async fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "conkie.html".to_string());
    let staging = path.with_file_name(format!(".{}.partial", file_name));

    let written = match tokio::fs::write(&staging, contents).await {
        Ok(()) => tokio::fs::rename(&staging, path).await,
        Err(e) => Err(e),
    };
    if let Err(source) = written {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(LoaderError::RenderWriteFailed {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}
