//! Bound object handle with transient-error retry
//!
//! An [`ObjectRef`] ties one `{bucket, key}` pair to a store handle and a
//! retry policy. Every operation retries transient provider errors
//! (timeouts, 5xx, throttling) up to the configured bound with
//! exponential backoff; definitive errors (404, 403, precondition
//! failures) surface immediately.
//!
//! Retry is bounded on purpose: once the budget is spent the transient
//! error propagates so the caller can make its own retry decision instead
//! of this layer masking a systemic outage.

use std::sync::Arc;

use bytes::Bytes;

use crate::config::{ConsistencyConfig, RetryConfig};
use crate::consistency::wait_until_visible;
use crate::error::{Error, Result};
use crate::location::Location;
use crate::retry::retry_with_backoff;
use crate::store::{Acl, ObjectMeta, ObjectStore, PutOptions};

/// A handle bound to one `{bucket, key}` pair
#[derive(Clone)]
pub struct ObjectRef {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    key: String,
    retry: RetryConfig,
}

impl ObjectRef {
    /// Bind a remote location to a store handle
    pub fn new(store: Arc<dyn ObjectStore>, location: &Location, retry: RetryConfig) -> Result<Self> {
        if !location.is_remote() {
            return Err(Error::InvalidLocation(format!(
                "not a remote location: {location}"
            )));
        }
        Ok(Self {
            store,
            bucket: location.bucket().to_string(),
            key: location.key().to_string(),
            retry,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn describe(&self) -> String {
        format!("{}/{}", self.bucket, self.key)
    }

    /// Metadata for this object, failing `NotFound` if absent
    ///
    /// A single existence probe: no consistency retry. Use
    /// [`ObjectRef::head_fresh`] when confirming a write this handle just
    /// performed.
    pub async fn head(&self) -> Result<ObjectMeta> {
        let meta = retry_with_backoff(
            &self.retry,
            || self.store.head(&self.bucket, &self.key),
            Error::is_retryable,
        )
        .await?;
        meta.ok_or_else(|| Error::NotFound(self.describe()))
    }

    /// Whether the object exists (single probe)
    pub async fn exists(&self) -> Result<bool> {
        let meta = retry_with_backoff(
            &self.retry,
            || self.store.head(&self.bucket, &self.key),
            Error::is_retryable,
        )
        .await?;
        Ok(meta.is_some())
    }

    /// Metadata for an object this handle just wrote, waiting out the
    /// provider's consistency window
    pub async fn head_fresh(&self, consistency: &ConsistencyConfig) -> Result<ObjectMeta> {
        let what = self.describe();
        wait_until_visible(consistency, &what, || {
            retry_with_backoff(
                &self.retry,
                || self.store.head(&self.bucket, &self.key),
                Error::is_retryable,
            )
        })
        .await
    }

    /// Full contents
    pub async fn get(&self) -> Result<Bytes> {
        retry_with_backoff(
            &self.retry,
            || self.store.get(&self.bucket, &self.key),
            Error::is_retryable,
        )
        .await
    }

    /// Upload a body, returning the provider etag
    pub async fn put(&self, body: Bytes, options: PutOptions) -> Result<String> {
        retry_with_backoff(
            &self.retry,
            || {
                self.store
                    .put(&self.bucket, &self.key, body.clone(), options.clone())
            },
            Error::is_retryable,
        )
        .await
    }

    /// Server-side copy onto `dest`
    ///
    /// `preserve_acl` reads this object's ACL first and reapplies it;
    /// passing an explicit `acl` at the same time is a contradiction and
    /// fails `InvalidOption`.
    pub async fn copy_to(
        &self,
        dest: &ObjectRef,
        preserve_acl: bool,
        acl: Option<Acl>,
    ) -> Result<()> {
        if preserve_acl && acl.is_some() {
            return Err(Error::InvalidOption(
                "preserve-acl and an explicit ACL are mutually exclusive".to_string(),
            ));
        }

        let effective_acl = if preserve_acl {
            Some(self.acl().await?)
        } else {
            acl
        };

        retry_with_backoff(
            &self.retry,
            || {
                self.store.copy(
                    &self.bucket,
                    &self.key,
                    &dest.bucket,
                    &dest.key,
                    effective_acl,
                )
            },
            Error::is_retryable,
        )
        .await
    }

    /// Delete this object, failing `NotFound` if it was already absent
    ///
    /// Deliberately not idempotent: callers (sync's deletion counting
    /// among them) rely on delete confirming that something existed.
    pub async fn delete(&self) -> Result<()> {
        let deleted = retry_with_backoff(
            &self.retry,
            || self.store.delete(&self.bucket, &self.key),
            Error::is_retryable,
        )
        .await?;
        if !deleted {
            return Err(Error::NotFound(self.describe()));
        }
        Ok(())
    }

    /// Current ACL
    pub async fn acl(&self) -> Result<Acl> {
        retry_with_backoff(
            &self.retry,
            || self.store.get_acl(&self.bucket, &self.key),
            Error::is_retryable,
        )
        .await
    }

    /// Replace the ACL
    pub async fn set_acl(&self, acl: Acl) -> Result<()> {
        retry_with_backoff(
            &self.retry,
            || self.store.set_acl(&self.bucket, &self.key, acl),
            Error::is_retryable,
        )
        .await
    }
}

impl std::fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectRef")
            .field("bucket", &self.bucket)
            .field("key", &self.key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockObjectStore;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            initial_backoff_ms: 1,
            max_backoff_ms: 10,
        }
    }

    fn bound(store: MockObjectStore) -> ObjectRef {
        let location = Location::parse("s3://bucket/key").unwrap();
        ObjectRef::new(Arc::new(store), &location, fast_retry()).unwrap()
    }

    #[test]
    fn test_new_rejects_local_location() {
        let store = MockObjectStore::new();
        let location = Location::parse("/tmp/file").unwrap();
        assert!(matches!(
            ObjectRef::new(Arc::new(store), &location, fast_retry()),
            Err(Error::InvalidLocation(_))
        ));
    }

    #[tokio::test]
    async fn test_head_retries_transient_then_succeeds() {
        let mut store = MockObjectStore::new();
        let calls = std::sync::Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        store.expect_head().times(2).returning(move |_, _| {
            if calls_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(Error::Network("timeout".to_string()))
            } else {
                Ok(Some(ObjectMeta {
                    size: 3,
                    ..Default::default()
                }))
            }
        });

        let meta = bound(store).head().await.unwrap();
        assert_eq!(meta.size, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_head_absent_is_not_found_without_retry() {
        let mut store = MockObjectStore::new();
        store.expect_head().times(1).returning(|_, _| Ok(None));

        assert!(matches!(
            bound(store).head().await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_put_exhausts_and_propagates() {
        let mut store = MockObjectStore::new();
        store
            .expect_put()
            .times(3)
            .returning(|_, _, _, _| Err(Error::Network("503 service unavailable".to_string())));

        let result = bound(store)
            .put(Bytes::from_static(b"x"), PutOptions::default())
            .await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_delete_absent_fails() {
        let mut store = MockObjectStore::new();
        store.expect_delete().times(1).returning(|_, _| Ok(false));

        assert!(matches!(
            bound(store).delete().await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_copy_to_rejects_contradictory_acl_options() {
        let store = MockObjectStore::new();
        let dest_store = MockObjectStore::new();
        let src = bound(store);
        let dest = bound(dest_store);

        let result = src.copy_to(&dest, true, Some(Acl::PublicRead)).await;
        assert!(matches!(result, Err(Error::InvalidOption(_))));
    }

    #[tokio::test]
    async fn test_head_fresh_waits_out_staleness() {
        let mut store = MockObjectStore::new();
        let calls = std::sync::Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        store.expect_head().returning(move |_, _| {
            if calls_clone.fetch_add(1, Ordering::SeqCst) < 1 {
                Ok(None)
            } else {
                Ok(Some(ObjectMeta::default()))
            }
        });

        let consistency = ConsistencyConfig {
            max_attempts: 3,
            backoff_ms: 1,
        };
        bound(store).head_fresh(&consistency).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
