//! Single-transfer orchestration
//!
//! A copy runs the state machine Init → Transferring → Verifying →
//! Committing → Done, failing over to Failed from any state. The
//! guarantees on failure: the destination is exactly what it was before
//! the operation started (local writes always go through a sibling temp
//! file and an atomic rename, never in place), and no temp file survives.
//!
//! Remote destinations are verified unconditionally: the staged body's
//! content-MD5 is compared against the provider-reported etag, since
//! corruption in the object store is costlier than the extra hash.
//! Local destinations trust the filesystem unless `validate` asks for a
//! re-read.

use std::io::Write;
use std::sync::Arc;

use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;

use crate::config::{ConsistencyConfig, RetryConfig};
use crate::error::{Error, Result};
use crate::location::Location;
use crate::object::ObjectRef;
use crate::store::{Acl, ObjectStore, PutOptions};

/// Content type applied to uploads when none is given or guessed
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Per-copy configuration; immutable once constructed
#[derive(Debug, Clone)]
pub struct CopyOptions {
    /// Overwrite an existing destination
    pub force: bool,
    /// Silently skip when the destination exists; `force` wins if both
    /// are set
    pub skip: bool,
    /// Canned ACL for a remote destination
    pub acl: Option<Acl>,
    /// Reapply the source ACL on a remote-to-remote copy
    pub preserve_acl: bool,
    /// Explicit content type for uploads
    pub content_type: Option<String>,
    /// Explicit content encoding for uploads
    pub content_encoding: Option<String>,
    /// Guess the content type from the source extension
    pub guess_content_type: bool,
    /// Gzip the body before upload, forcing content encoding `gzip`
    pub gzip: bool,
    /// Server-side encryption for uploads; on by default
    pub encrypt: bool,
    /// Verify local destinations by re-reading them
    pub validate: bool,
    /// Callers may render transfer progress
    pub progress: bool,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            force: false,
            skip: false,
            acl: None,
            preserve_acl: false,
            content_type: None,
            content_encoding: None,
            guess_content_type: false,
            gzip: false,
            encrypt: true,
            validate: false,
            progress: false,
        }
    }
}

/// How a copy concluded; skip is an expected outcome, not an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    Copied,
    Skipped,
}

/// States of one copy operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyState {
    Init,
    Transferring,
    Verifying,
    Committing,
    Done,
    Failed,
}

/// Executes copies between any combination of local and remote endpoints
///
/// Holds the store handle and retry tuning; one `Copier` serves any
/// number of copies. Construct with [`Copier::local`] when only local
/// paths are involved.
#[derive(Clone)]
pub struct Copier {
    store: Option<Arc<dyn ObjectStore>>,
    retry: RetryConfig,
    consistency: ConsistencyConfig,
}

impl Copier {
    /// A copier bound to an object store
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store: Some(store),
            retry: RetryConfig::default(),
            consistency: ConsistencyConfig::default(),
        }
    }

    /// A copier for local-only transfers
    pub fn local() -> Self {
        Self {
            store: None,
            retry: RetryConfig::default(),
            consistency: ConsistencyConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_consistency(mut self, consistency: ConsistencyConfig) -> Self {
        self.consistency = consistency;
        self
    }

    pub fn retry(&self) -> &RetryConfig {
        &self.retry
    }

    pub fn consistency(&self) -> &ConsistencyConfig {
        &self.consistency
    }

    /// The store handle, required as soon as a remote location appears
    pub fn store(&self) -> Result<Arc<dyn ObjectStore>> {
        self.store
            .clone()
            .ok_or_else(|| Error::Config("no object store configured".to_string()))
    }

    /// Bind a remote location to this copier's store and retry policy
    pub fn object_ref(&self, location: &Location) -> Result<ObjectRef> {
        ObjectRef::new(self.store()?, location, self.retry.clone())
    }

    /// Copy `source` onto `destination` under `options`
    pub async fn copy(
        &self,
        source: &Location,
        destination: &Location,
        options: &CopyOptions,
    ) -> Result<CopyOutcome> {
        let mut op = CopyOperation {
            copier: self,
            source: source.clone(),
            destination: destination.clone(),
            options: options.clone(),
            state: CopyState::Init,
        };
        let result = op.run().await;
        if result.is_err() {
            op.transition(CopyState::Failed);
        }
        result
    }
}

/// One transfer in flight; created per call, discarded after completion
struct CopyOperation<'a> {
    copier: &'a Copier,
    source: Location,
    destination: Location,
    options: CopyOptions,
    state: CopyState,
}

impl CopyOperation<'_> {
    fn transition(&mut self, to: CopyState) {
        tracing::debug!(
            source = %self.source,
            destination = %self.destination,
            from = ?self.state,
            to = ?to,
            "copy state"
        );
        self.state = to;
    }

    async fn run(&mut self) -> Result<CopyOutcome> {
        self.check_options()?;

        // Init: confirm the source, resolve directory intent, apply the
        // overwrite policy.
        let source_meta = self.stat_source().await?;
        self.resolve_destination().await?;

        let dest_existed = self.destination_exists().await?;
        if dest_existed {
            if self.options.force {
                // overwrite
            } else if self.options.skip {
                tracing::warn!(
                    source = %self.source,
                    destination = %self.destination,
                    "destination exists, skipping copy"
                );
                self.transition(CopyState::Done);
                return Ok(CopyOutcome::Skipped);
            } else {
                return Err(Error::DestinationExists(self.destination.to_string()));
            }
        }

        self.transition(CopyState::Transferring);
        match (self.source.is_local(), self.destination.is_local()) {
            (true, true) => self.local_to_local().await?,
            (true, false) => self.upload(dest_existed).await?,
            (false, true) => self.download(&source_meta).await?,
            (false, false) => self.server_side_copy().await?,
        }

        self.transition(CopyState::Done);
        Ok(CopyOutcome::Copied)
    }

    fn check_options(&self) -> Result<()> {
        let opts = &self.options;
        if (opts.acl.is_some() || opts.preserve_acl) && self.destination.is_local() {
            return Err(Error::InvalidOption(
                "ACL options apply only to remote destinations".to_string(),
            ));
        }
        if opts.preserve_acl && self.source.is_local() {
            return Err(Error::InvalidOption(
                "preserve-acl requires a remote source".to_string(),
            ));
        }
        if opts.preserve_acl && opts.acl.is_some() {
            return Err(Error::InvalidOption(
                "preserve-acl and an explicit ACL are mutually exclusive".to_string(),
            ));
        }
        if opts.gzip && !(self.source.is_local() && self.destination.is_remote()) {
            return Err(Error::InvalidOption(
                "gzip applies only to uploads".to_string(),
            ));
        }
        Ok(())
    }

    /// Source metadata; etag is carried for download verification
    async fn stat_source(&self) -> Result<SourceMeta> {
        if self.source.is_local() {
            let path = self.source.as_path();
            let meta = tokio::fs::metadata(path).await.map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::SourceNotFound(self.source.to_string())
                } else {
                    Error::Io(e)
                }
            })?;
            if meta.is_dir() {
                return Err(Error::InvalidOption(format!(
                    "{} is a directory (use sync)",
                    self.source
                )));
            }
            Ok(SourceMeta { etag: None })
        } else {
            let meta = self
                .copier
                .object_ref(&self.source)?
                .head()
                .await
                .map_err(|e| match e {
                    Error::NotFound(what) => Error::SourceNotFound(what),
                    other => other,
                })?;
            Ok(SourceMeta { etag: meta.etag })
        }
    }

    /// A directory-like destination gets the source basename appended
    async fn resolve_destination(&mut self) -> Result<()> {
        let dir_intent = if self.destination.is_local() {
            self.destination.has_trailing_slash()
                || tokio::fs::metadata(self.destination.as_path())
                    .await
                    .map(|m| m.is_dir())
                    .unwrap_or(false)
        } else {
            self.destination.has_trailing_slash() || self.destination.path().is_empty()
        };

        if dir_intent {
            let name = self.source.basename().ok_or_else(|| {
                Error::InvalidLocation(format!("cannot derive a name from {}", self.source))
            })?;
            self.destination = self.destination.join(&name);
        }
        Ok(())
    }

    async fn destination_exists(&self) -> Result<bool> {
        if self.destination.is_local() {
            Ok(tokio::fs::try_exists(self.destination.as_path()).await?)
        } else {
            self.copier.object_ref(&self.destination)?.exists().await
        }
    }

    async fn local_to_local(&mut self) -> Result<()> {
        let body = tokio::fs::read(self.source.as_path()).await?;

        if self.options.validate {
            self.transition(CopyState::Verifying);
        }
        self.commit_local(&body).await
    }

    async fn upload(&mut self, dest_existed: bool) -> Result<()> {
        let raw = tokio::fs::read(self.source.as_path()).await?;

        let (body, encoding) = if self.options.gzip {
            (gzip_bytes(&raw)?, Some("gzip".to_string()))
        } else {
            (raw, self.options.content_encoding.clone())
        };
        let content_md5 = format!("{:x}", md5::compute(&body));

        let put = PutOptions {
            content_type: Some(self.resolve_content_type()),
            content_encoding: encoding,
            acl: self.options.acl,
            encrypt: self.options.encrypt,
        };

        let dest_ref = self.copier.object_ref(&self.destination)?;
        let etag = dest_ref.put(Bytes::from(body), put).await?;

        self.transition(CopyState::Verifying);
        self.verify_remote(&dest_ref, &etag, &content_md5, dest_existed)
            .await?;

        // Provider PUT is atomic whole-object; nothing left to commit
        // beyond waiting out the consistency window for our own write.
        self.transition(CopyState::Committing);
        dest_ref.head_fresh(self.copier.consistency()).await?;
        Ok(())
    }

    async fn download(&mut self, source_meta: &SourceMeta) -> Result<()> {
        let body = self.copier.object_ref(&self.source)?.get().await?;

        if self.options.validate {
            self.transition(CopyState::Verifying);
            let content_md5 = format!("{:x}", md5::compute(&body));
            if let Some(etag) = &source_meta.etag
                && let Some(false) = etag_matches(etag, &content_md5)
            {
                return Err(Error::Integrity(format!(
                    "etag does not match for {}",
                    self.source
                )));
            }
        }

        self.commit_local(&body).await
    }

    async fn server_side_copy(&mut self) -> Result<()> {
        let src_ref = self.copier.object_ref(&self.source)?;
        let dest_ref = self.copier.object_ref(&self.destination)?;

        src_ref
            .copy_to(&dest_ref, self.options.preserve_acl, self.options.acl)
            .await
            .map_err(|e| match e {
                Error::NotFound(what) => Error::SourceNotFound(what),
                other => other,
            })?;

        // No bytes passed through this process; the provider's copy is
        // atomic. Confirm our own write became visible.
        self.transition(CopyState::Committing);
        dest_ref.head_fresh(self.copier.consistency()).await?;
        Ok(())
    }

    /// Stage `body` in a sibling temp file, optionally re-read and
    /// verify, then atomically rename onto the final path
    async fn commit_local(&mut self, body: &[u8]) -> Result<()> {
        let dest = self.destination.as_path().to_path_buf();
        let parent = dest
            .parent()
            .ok_or_else(|| {
                Error::InvalidLocation(format!("{} has no parent directory", self.destination))
            })?
            .to_path_buf();
        tokio::fs::create_dir_all(&parent).await?;

        // Same directory as the destination: same filesystem, so the
        // final rename is atomic. The temp file is removed on drop on
        // every failure path.
        let temp = tempfile::NamedTempFile::new_in(&parent)?;
        temp.as_file().write_all(body)?;
        temp.as_file().sync_all()?;

        if self.options.validate {
            let reread = std::fs::read(temp.path())?;
            if md5::compute(&reread) != md5::compute(body) {
                return Err(Error::Integrity(format!(
                    "re-read does not match staged content for {}",
                    self.destination
                )));
            }
        }

        self.transition(CopyState::Committing);
        temp.persist(&dest).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    /// Compare the staged body's MD5 against the provider etag
    async fn verify_remote(
        &self,
        dest_ref: &ObjectRef,
        etag: &str,
        content_md5: &str,
        dest_existed: bool,
    ) -> Result<()> {
        match etag_matches(etag, content_md5) {
            Some(true) => Ok(()),
            None => {
                tracing::debug!(
                    destination = %self.destination,
                    etag,
                    "etag is not a content MD5, skipping verification"
                );
                Ok(())
            }
            Some(false) => {
                // A previously absent destination can at least be put
                // back to absent; an overwritten one cannot be restored.
                if !dest_existed && let Err(e) = dest_ref.delete().await {
                    tracing::warn!(
                        destination = %self.destination,
                        error = %e,
                        "could not remove corrupt upload"
                    );
                }
                Err(Error::Integrity(format!(
                    "etag does not match for {}",
                    self.destination
                )))
            }
        }
    }

    fn resolve_content_type(&self) -> String {
        if let Some(ct) = &self.options.content_type {
            ct.clone()
        } else if self.options.guess_content_type {
            mime_guess::from_path(self.source.as_path())
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        } else {
            DEFAULT_CONTENT_TYPE.to_string()
        }
    }
}

struct SourceMeta {
    etag: Option<String>,
}

/// `Some(matched)` when the etag is a plain content MD5; `None` for
/// multipart-style etags that cannot be checked
fn etag_matches(etag: &str, md5_hex: &str) -> Option<bool> {
    let trimmed = etag.trim_matches('"');
    if trimmed.contains('-') {
        return None;
    }
    Some(trimmed.eq_ignore_ascii_case(md5_hex))
}

fn gzip_bytes(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_etag_matches() {
        assert_eq!(etag_matches("abc123", "abc123"), Some(true));
        assert_eq!(etag_matches("\"abc123\"", "abc123"), Some(true));
        assert_eq!(etag_matches("abc123", "def456"), Some(false));
        assert_eq!(etag_matches("abc123-4", "abc123"), None);
    }

    #[test]
    fn test_gzip_round_trip() {
        use std::io::Read;

        let compressed = gzip_bytes(b"squeeze me").unwrap();
        let mut decoder = flate2::read::GzDecoder::new(compressed.as_slice());
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"squeeze me");
    }

    #[test]
    fn test_copy_options_defaults() {
        let opts = CopyOptions::default();
        assert!(opts.encrypt);
        assert!(!opts.force);
        assert!(!opts.skip);
        assert!(!opts.validate);
    }

    #[tokio::test]
    async fn test_local_copy_and_overwrite_guard() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.txt");
        let dst = dir.path().join("dst.txt");
        std::fs::write(&src, b"payload").unwrap();

        let copier = Copier::local();
        let source = Location::local(&src);
        let destination = Location::local(&dst);

        let outcome = copier
            .copy(&source, &destination, &CopyOptions::default())
            .await
            .unwrap();
        assert_eq!(outcome, CopyOutcome::Copied);
        assert_eq!(std::fs::read(&dst).unwrap(), b"payload");

        // Second copy without force or skip trips the guard
        let err = copier
            .copy(&source, &destination, &CopyOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DestinationExists(_)));
    }

    #[tokio::test]
    async fn test_local_copy_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("name.txt");
        std::fs::write(&src, b"x").unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();

        let copier = Copier::local();
        copier
            .copy(
                &Location::local(&src),
                &Location::local(&sub),
                &CopyOptions::default(),
            )
            .await
            .unwrap();
        assert!(sub.join("name.txt").is_file());
    }

    #[tokio::test]
    async fn test_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let copier = Copier::local();
        let err = copier
            .copy(
                &Location::local(dir.path().join("ghost")),
                &Location::local(dir.path().join("dst")),
                &CopyOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SourceNotFound(_)));
    }

    #[tokio::test]
    async fn test_acl_for_local_destination_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::write(&src, b"x").unwrap();

        let options = CopyOptions {
            acl: Some(Acl::PublicRead),
            ..Default::default()
        };
        let err = Copier::local()
            .copy(
                &Location::local(&src),
                &Location::local(dir.path().join("dst")),
                &options,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOption(_)));
    }
}
