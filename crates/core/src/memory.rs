//! In-process object store
//!
//! A complete [`ObjectStore`] over a `HashMap`, used by the stateful
//! copy/open/sync tests and available as an ephemeral backend. Etags are
//! content-MD5 hex, matching what a real provider returns for a
//! single-part upload.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{Error, Result};
use crate::store::{Acl, ListEntry, ListOptions, ListResult, ObjectMeta, ObjectStore, PutOptions};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    etag: String,
    content_type: Option<String>,
    content_encoding: Option<String>,
    encrypted: bool,
    acl: Acl,
    last_modified: jiff::Timestamp,
}

/// In-memory object store
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<(String, String), StoredObject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> std::sync::MutexGuard<'_, HashMap<(String, String), StoredObject>> {
        self.objects.lock().expect("memory store lock poisoned")
    }

    /// Number of stored objects, across all buckets
    pub fn len(&self) -> usize {
        self.locked().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locked().is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list(&self, bucket: &str, prefix: &str, options: ListOptions) -> Result<ListResult> {
        let objects = self.locked();

        let mut keys: Vec<&(String, String)> = objects
            .keys()
            .filter(|(b, k)| b == bucket && k.starts_with(prefix))
            .collect();
        keys.sort();

        let start = match &options.continuation_token {
            Some(token) => keys.partition_point(|(_, k)| k.as_str() <= token.as_str()),
            None => 0,
        };
        let page_size = options.max_keys.unwrap_or(1000).max(1) as usize;

        let mut entries = Vec::new();
        let mut seen_prefixes: Vec<String> = Vec::new();
        let mut last_key: Option<String> = None;
        let mut taken = 0;

        for (_, key) in keys.iter().skip(start) {
            if taken >= page_size {
                break;
            }
            taken += 1;
            last_key = Some(key.clone());

            if !options.recursive {
                // Delimit at '/', folding deeper keys into common prefixes
                let rest = &key[prefix.len()..];
                if let Some(idx) = rest.find('/') {
                    let dir = format!("{prefix}{}", &rest[..=idx]);
                    if !seen_prefixes.contains(&dir) {
                        seen_prefixes.push(dir.clone());
                        entries.push(ListEntry {
                            key: dir,
                            size: 0,
                            last_modified: None,
                            etag: None,
                            is_dir: true,
                        });
                    }
                    continue;
                }
            }

            let obj = &objects[&(bucket.to_string(), key.clone())];
            entries.push(ListEntry {
                key: key.clone(),
                size: obj.data.len() as u64,
                last_modified: Some(obj.last_modified),
                etag: Some(obj.etag.clone()),
                is_dir: false,
            });
        }

        let truncated = start + taken < keys.len();
        Ok(ListResult {
            entries,
            truncated,
            continuation_token: if truncated { last_key } else { None },
        })
    }

    async fn head(&self, bucket: &str, key: &str) -> Result<Option<ObjectMeta>> {
        let objects = self.locked();
        Ok(objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|obj| ObjectMeta {
                size: obj.data.len() as u64,
                etag: Some(obj.etag.clone()),
                content_type: obj.content_type.clone(),
                content_encoding: obj.content_encoding.clone(),
                encrypted: obj.encrypted,
                acl: Some(obj.acl),
                last_modified: Some(obj.last_modified),
            }))
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let objects = self.locked();
        objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|obj| obj.data.clone())
            .ok_or_else(|| Error::NotFound(format!("{bucket}/{key}")))
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        options: PutOptions,
    ) -> Result<String> {
        let etag = format!("{:x}", md5::compute(&body));
        let mut objects = self.locked();
        objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                data: body,
                etag: etag.clone(),
                content_type: options.content_type,
                content_encoding: options.content_encoding,
                encrypted: options.encrypt,
                acl: options.acl.unwrap_or(Acl::Private),
                last_modified: jiff::Timestamp::now(),
            },
        );
        Ok(etag)
    }

    async fn copy(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
        acl: Option<Acl>,
    ) -> Result<()> {
        let mut objects = self.locked();
        let mut copied = objects
            .get(&(src_bucket.to_string(), src_key.to_string()))
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("{src_bucket}/{src_key}")))?;

        // Server-side copy keeps the source's encryption state; the
        // encrypt-by-default rule applies to uploads only.
        copied.acl = acl.unwrap_or(Acl::Private);
        copied.last_modified = jiff::Timestamp::now();
        objects.insert((dst_bucket.to_string(), dst_key.to_string()), copied);
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<bool> {
        let mut objects = self.locked();
        Ok(objects
            .remove(&(bucket.to_string(), key.to_string()))
            .is_some())
    }

    async fn get_acl(&self, bucket: &str, key: &str) -> Result<Acl> {
        let objects = self.locked();
        objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|obj| obj.acl)
            .ok_or_else(|| Error::NotFound(format!("{bucket}/{key}")))
    }

    async fn set_acl(&self, bucket: &str, key: &str, acl: Acl) -> Result<()> {
        let mut objects = self.locked();
        let obj = objects
            .get_mut(&(bucket.to_string(), key.to_string()))
            .ok_or_else(|| Error::NotFound(format!("{bucket}/{key}")))?;
        obj.acl = acl;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::list_all;

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let store = MemoryStore::new();
        let etag = store
            .put("b", "k", Bytes::from_static(b"hello"), PutOptions::default())
            .await
            .unwrap();

        assert_eq!(etag, format!("{:x}", md5::compute(b"hello")));
        assert_eq!(store.get("b", "k").await.unwrap(), Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn test_head_absent_is_none() {
        let store = MemoryStore::new();
        assert!(store.head("b", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let store = MemoryStore::new();
        store
            .put("b", "k", Bytes::from_static(b"x"), PutOptions::default())
            .await
            .unwrap();

        assert!(store.delete("b", "k").await.unwrap());
        assert!(!store.delete("b", "k").await.unwrap());
    }

    #[tokio::test]
    async fn test_copy_preserves_encryption_state() {
        let store = MemoryStore::new();
        let options = PutOptions {
            encrypt: false,
            ..Default::default()
        };
        store
            .put("b", "plain", Bytes::from_static(b"x"), options)
            .await
            .unwrap();

        store.copy("b", "plain", "b", "copy", None).await.unwrap();
        let meta = store.head("b", "copy").await.unwrap().unwrap();
        assert!(!meta.encrypted);
    }

    #[tokio::test]
    async fn test_list_pagination() {
        let store = MemoryStore::new();
        for i in 0..25 {
            store
                .put(
                    "b",
                    &format!("pre/{i:02}"),
                    Bytes::from_static(b"x"),
                    PutOptions::default(),
                )
                .await
                .unwrap();
        }

        let page = store
            .list(
                "b",
                "pre/",
                ListOptions {
                    recursive: true,
                    max_keys: Some(10),
                    continuation_token: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(page.entries.len(), 10);
        assert!(page.truncated);

        let all = list_all(&store, "b", "pre/").await.unwrap();
        assert_eq!(all.len(), 25);
    }

    #[tokio::test]
    async fn test_list_delimited() {
        let store = MemoryStore::new();
        for key in ["a/one", "a/two", "b/deep/three", "top"] {
            store
                .put("b", key, Bytes::from_static(b"x"), PutOptions::default())
                .await
                .unwrap();
        }

        let page = store
            .list("b", "", ListOptions::default())
            .await
            .unwrap();
        let dirs: Vec<&str> = page
            .entries
            .iter()
            .filter(|e| e.is_dir)
            .map(|e| e.key.as_str())
            .collect();
        let files: Vec<&str> = page
            .entries
            .iter()
            .filter(|e| !e.is_dir)
            .map(|e| e.key.as_str())
            .collect();

        assert_eq!(dirs, vec!["a/", "b/"]);
        assert_eq!(files, vec!["top"]);
    }

    #[tokio::test]
    async fn test_acl_round_trip() {
        let store = MemoryStore::new();
        store
            .put("b", "k", Bytes::from_static(b"x"), PutOptions::default())
            .await
            .unwrap();

        assert_eq!(store.get_acl("b", "k").await.unwrap(), Acl::Private);
        store.set_acl("b", "k", Acl::PublicRead).await.unwrap();
        assert_eq!(store.get_acl("b", "k").await.unwrap(), Acl::PublicRead);
    }
}
