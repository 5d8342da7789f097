//! Backend capability surface
//!
//! [`ObjectStore`] is the narrow trait every backend implements: bucket
//! listing, key head/get/put, server-side copy, delete, and ACL access.
//! The core stays independent of any specific SDK; adapters live in their
//! own crates and an in-memory implementation backs the tests.
//!
//! Handles are passed in explicitly (no process-wide connection state),
//! so each call path owns its own client reference.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Canned access policy for an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Acl {
    Private,
    BucketOwnerRead,
    PublicRead,
}

impl std::fmt::Display for Acl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Acl::Private => write!(f, "private"),
            Acl::BucketOwnerRead => write!(f, "bucket-owner-read"),
            Acl::PublicRead => write!(f, "public-read"),
        }
    }
}

impl std::str::FromStr for Acl {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "private" => Ok(Acl::Private),
            "bucket-owner-read" => Ok(Acl::BucketOwnerRead),
            "public-read" => Ok(Acl::PublicRead),
            _ => Err(format!("Invalid ACL: {s}")),
        }
    }
}

/// Read-only metadata snapshot from a HEAD-equivalent query
///
/// May be stale: the backend is only eventually consistent.
#[derive(Debug, Clone, Default)]
pub struct ObjectMeta {
    pub size: u64,
    pub etag: Option<String>,
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub encrypted: bool,
    /// Filled in by backends that can report it from a head; others
    /// leave it unset and serve ACLs through `get_acl`
    pub acl: Option<Acl>,
    pub last_modified: Option<jiff::Timestamp>,
}

/// One entry from a listing
#[derive(Debug, Clone)]
pub struct ListEntry {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<jiff::Timestamp>,
    pub etag: Option<String>,
    /// Common-prefix entry from a delimited (non-recursive) listing
    pub is_dir: bool,
}

/// Options for a listing request
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Without this, listing is delimited at `/` and directories come
    /// back as common prefixes
    pub recursive: bool,
    pub max_keys: Option<i32>,
    pub continuation_token: Option<String>,
}

/// One page of a listing
#[derive(Debug, Clone)]
pub struct ListResult {
    pub entries: Vec<ListEntry>,
    pub truncated: bool,
    pub continuation_token: Option<String>,
}

/// Options applied to an upload
#[derive(Debug, Clone)]
pub struct PutOptions {
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub acl: Option<Acl>,
    /// Server-side encryption; on by default for every upload
    pub encrypt: bool,
}

impl Default for PutOptions {
    fn default() -> Self {
        Self {
            content_type: None,
            content_encoding: None,
            acl: None,
            encrypt: true,
        }
    }
}

/// The object-store capability consumed by the core
///
/// Implementations map provider errors into the crate taxonomy:
/// absence comes back as `Ok(None)` / `Ok(false)` where the signature
/// allows it, transient faults as [`crate::Error::Network`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List keys under a prefix; one page per call
    async fn list(&self, bucket: &str, prefix: &str, options: ListOptions) -> Result<ListResult>;

    /// Metadata for one key, `None` if absent
    async fn head(&self, bucket: &str, key: &str) -> Result<Option<ObjectMeta>>;

    /// Full contents of one object
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes>;

    /// Store an object, returning the provider etag
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        options: PutOptions,
    ) -> Result<String>;

    /// Server-side copy; no bytes pass through the client
    async fn copy(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
        acl: Option<Acl>,
    ) -> Result<()>;

    /// Delete a key, reporting whether anything existed to delete
    async fn delete(&self, bucket: &str, key: &str) -> Result<bool>;

    async fn get_acl(&self, bucket: &str, key: &str) -> Result<Acl>;

    async fn set_acl(&self, bucket: &str, key: &str, acl: Acl) -> Result<()>;
}

/// Drain every page of a listing into one deduplicated, sorted set
pub async fn list_all(
    store: &dyn ObjectStore,
    bucket: &str,
    prefix: &str,
) -> Result<Vec<ListEntry>> {
    let mut entries: Vec<ListEntry> = Vec::new();
    let mut continuation_token: Option<String> = None;

    loop {
        let options = ListOptions {
            recursive: true,
            max_keys: Some(1000),
            continuation_token: continuation_token.clone(),
        };
        let page = store.list(bucket, prefix, options).await?;
        entries.extend(page.entries.into_iter().filter(|e| !e.is_dir));

        if page.truncated {
            continuation_token = page.continuation_token;
        } else {
            break;
        }
    }

    entries.sort_by(|a, b| a.key.cmp(&b.key));
    entries.dedup_by(|a, b| a.key == b.key);
    Ok(entries)
}
