//! File-like access to objects through a local staging copy
//!
//! [`CachedFile`] is a scoped resource: opening acquires (creates the
//! staging file, eagerly downloads for reads), an explicit [`close`]
//! publishes staged writes, and dropping without close releases without
//! publishing. Partial or abandoned content is never uploaded; the
//! staging file is deleted on every exit path.
//!
//! Downloads are eager rather than lazy: the whole object lands in the
//! staging file before `open` returns, and reads afterwards are ordinary
//! local file reads.
//!
//! [`close`]: CachedFile::close

use std::path::{Path, PathBuf};

use bytes::Bytes;
use tempfile::TempPath;

use crate::copy::{Copier, CopyOptions};
use crate::error::{Error, Result};
use crate::location::Location;

/// How the caller intends to use the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Existing content, read-only
    Read,
    /// New content, replacing whatever exists
    Write,
    /// New content; the destination must not exist, checked again at
    /// commit time
    Exclusive,
    /// Existing content, read and updated in place
    ReadWrite,
}

/// A file handle backed by a local staging copy of an object
///
/// For local locations this degrades to direct file access (no staging
/// indirection), with parent directories created for the writing modes.
pub struct CachedFile {
    location: Location,
    mode: OpenMode,
    copier: Copier,
    /// Delete-on-drop staging path; `None` when accessing a local file
    /// directly
    staging: Option<TempPath>,
    path: PathBuf,
    dirty: bool,
}

impl CachedFile {
    /// Open `location` for the given mode
    ///
    /// Fails `NotFound` (Read with an absent source), `AlreadyExists`
    /// (Exclusive with a present destination), or `InvalidMode`
    /// (ReadWrite against a remote object that does not exist yet:
    /// there is nothing to read first).
    pub async fn open(copier: &Copier, location: &Location, mode: OpenMode) -> Result<CachedFile> {
        if location.is_local() {
            Self::open_local(copier, location, mode).await
        } else {
            Self::open_remote(copier, location, mode).await
        }
    }

    async fn open_local(copier: &Copier, location: &Location, mode: OpenMode) -> Result<CachedFile> {
        let path = location.as_path().to_path_buf();

        match mode {
            OpenMode::Read => {
                if !tokio::fs::try_exists(&path).await? {
                    return Err(Error::NotFound(location.to_string()));
                }
            }
            OpenMode::Write => {
                ensure_parent(&path).await?;
                tokio::fs::File::create(&path).await?;
            }
            OpenMode::Exclusive => {
                ensure_parent(&path).await?;
                tokio::fs::OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(&path)
                    .await
                    .map_err(|e| {
                        if e.kind() == std::io::ErrorKind::AlreadyExists {
                            Error::AlreadyExists(location.to_string())
                        } else {
                            Error::Io(e)
                        }
                    })?;
            }
            OpenMode::ReadWrite => {
                ensure_parent(&path).await?;
                tokio::fs::OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .truncate(false)
                    .open(&path)
                    .await?;
            }
        }

        Ok(CachedFile {
            location: location.clone(),
            mode,
            copier: copier.clone(),
            staging: None,
            path,
            dirty: false,
        })
    }

    async fn open_remote(
        copier: &Copier,
        location: &Location,
        mode: OpenMode,
    ) -> Result<CachedFile> {
        match mode {
            OpenMode::Exclusive => {
                // Single lookup, no consistency retry: a miss here must
                // not be papered over. The real guard is the force=false
                // commit, which re-detects a concurrent creator.
                if copier.object_ref(location)?.exists().await? {
                    return Err(Error::AlreadyExists(location.to_string()));
                }
            }
            OpenMode::ReadWrite => {
                if !copier.object_ref(location)?.exists().await? {
                    return Err(Error::InvalidMode(format!(
                        "cannot open {location} read-write: object does not exist"
                    )));
                }
            }
            OpenMode::Read | OpenMode::Write => {}
        }

        let staging = tempfile::NamedTempFile::new()?.into_temp_path();
        let path = staging.to_path_buf();

        if matches!(mode, OpenMode::Read | OpenMode::ReadWrite) {
            let options = CopyOptions {
                force: true, // the staging file already exists
                ..Default::default()
            };
            copier
                .copy(location, &Location::local(&path), &options)
                .await
                .map_err(|e| match e {
                    Error::SourceNotFound(what) => Error::NotFound(what),
                    other => other,
                })?;
        }

        Ok(CachedFile {
            location: location.clone(),
            mode,
            copier: copier.clone(),
            staging: Some(staging),
            path,
            // The writing modes exist to publish new content
            dirty: matches!(mode, OpenMode::Write | OpenMode::Exclusive),
        })
    }

    /// Local path backing this handle
    ///
    /// Callers writing through this path directly (rather than
    /// [`CachedFile::write_all`]) must call [`CachedFile::mark_dirty`]
    /// for ReadWrite handles, or the close will not publish.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Entire current content
    pub async fn read(&self) -> Result<Bytes> {
        Ok(tokio::fs::read(&self.path).await?.into())
    }

    /// Replace the content
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        tokio::fs::write(&self.path, data).await?;
        self.dirty = true;
        Ok(())
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Publish staged writes (if any) and release the staging file
    ///
    /// For remote writing modes this uploads the staging content:
    /// `force=true` for Write and ReadWrite, `force=false` for Exclusive
    /// so a concurrent creator is detected at commit time and surfaces
    /// as `AlreadyExists`. The staging file is deleted whether or not
    /// the upload succeeds; a failed upload leaves the remote object
    /// unmodified and propagates.
    ///
    /// Dropping without close never uploads; it only deletes the
    /// staging file. Error paths in the caller therefore cannot publish
    /// partial content.
    pub async fn close(mut self) -> Result<()> {
        let staging = self.staging.take();

        let result = if self.location.is_remote()
            && self.dirty
            && matches!(
                self.mode,
                OpenMode::Write | OpenMode::Exclusive | OpenMode::ReadWrite
            ) {
            let options = CopyOptions {
                force: self.mode != OpenMode::Exclusive,
                ..Default::default()
            };
            self.copier
                .copy(&Location::local(&self.path), &self.location, &options)
                .await
                .map(|_| ())
                .map_err(|e| match e {
                    Error::DestinationExists(what) if self.mode == OpenMode::Exclusive => {
                        Error::AlreadyExists(what)
                    }
                    other => other,
                })
        } else {
            Ok(())
        };

        if let Some(staging) = staging {
            if let Err(e) = staging.close() {
                tracing::debug!(error = %e, "could not remove staging file");
            }
        }

        result
    }
}

impl std::fmt::Debug for CachedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedFile")
            .field("location", &self.location.to_string())
            .field("mode", &self.mode)
            .field("dirty", &self.dirty)
            .finish()
    }
}

async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}
