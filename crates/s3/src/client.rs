//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the ObjectStore trait from
//! strand-core.

use async_trait::async_trait;

use bytes::Bytes;
use strand_core::{
    Acl, Error, ListEntry, ListOptions, ListResult, ObjectMeta, ObjectStore, Profile, PutOptions,
    Result,
};

/// S3 client wrapper
pub struct S3Client {
    inner: aws_sdk_s3::Client,
    #[allow(dead_code)]
    profile: Profile,
}

impl S3Client {
    /// Create a new S3 client from a profile configuration
    pub async fn new(profile: Profile) -> Result<Self> {
        let endpoint = profile.endpoint.clone();
        let region = profile.region.clone();
        let access_key = profile.access_key.clone();
        let secret_key = profile.secret_key.clone();

        // Build credentials provider
        let credentials = aws_credential_types::Credentials::new(
            access_key,
            secret_key,
            None, // session token
            None, // expiry
            "strand-static-credentials",
        );

        // Build SDK config
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(region))
            .endpoint_url(&endpoint)
            .load()
            .await;

        // Build S3 client with path-style addressing for compatibility
        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(profile.bucket_lookup == "path" || profile.bucket_lookup == "auto")
            .build();

        let client = aws_sdk_s3::Client::from_conf(s3_config);

        Ok(Self {
            inner: client,
            profile,
        })
    }

    /// Get the underlying aws-sdk-s3 client
    pub fn inner(&self) -> &aws_sdk_s3::Client {
        &self.inner
    }

    /// Format AWS SDK error into a detailed error message
    fn format_sdk_error<E: std::fmt::Display>(error: &aws_sdk_s3::error::SdkError<E>) -> String {
        match error {
            aws_sdk_s3::error::SdkError::ServiceError(service_err) => {
                let err = service_err.err();
                let meta = service_err.raw();
                let mut msg = format!("Service error: {}", err);
                // Try to extract additional error information from headers
                if let Some(code) = meta.headers().get("x-amz-error-code")
                    && let Ok(code_str) = std::str::from_utf8(code.as_bytes())
                {
                    msg.push_str(&format!(" (code: {})", code_str));
                }
                msg
            }
            aws_sdk_s3::error::SdkError::ConstructionFailure(err) => {
                format!("Request construction failed: {:?}", err)
            }
            aws_sdk_s3::error::SdkError::TimeoutError(_) => "Request timeout".to_string(),
            aws_sdk_s3::error::SdkError::DispatchFailure(err) => {
                format!("Network dispatch error: {:?}", err)
            }
            aws_sdk_s3::error::SdkError::ResponseError(err) => {
                format!("Response error: {:?}", err)
            }
            _ => error.to_string(),
        }
    }

    /// Classify a formatted SDK error message into the core taxonomy
    fn classify(what: &str, err_str: String) -> Error {
        if err_str.contains("AccessDenied") || err_str.contains("403") {
            Error::Auth(err_str)
        } else if err_str.contains("NotFound")
            || err_str.contains("NoSuchKey")
            || err_str.contains("NoSuchBucket")
        {
            Error::NotFound(what.to_string())
        } else {
            Error::Network(err_str)
        }
    }
}

fn canned_acl(acl: Acl) -> aws_sdk_s3::types::ObjectCannedAcl {
    use aws_sdk_s3::types::ObjectCannedAcl;
    match acl {
        Acl::Private => ObjectCannedAcl::Private,
        Acl::BucketOwnerRead => ObjectCannedAcl::BucketOwnerRead,
        Acl::PublicRead => ObjectCannedAcl::PublicRead,
    }
}

fn timestamp_from(dt: &aws_sdk_s3::primitives::DateTime) -> Option<jiff::Timestamp> {
    jiff::Timestamp::from_second(dt.secs()).ok()
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn list(&self, bucket: &str, prefix: &str, options: ListOptions) -> Result<ListResult> {
        let mut request = self.inner.list_objects_v2().bucket(bucket);

        if !prefix.is_empty() {
            request = request.prefix(prefix);
        }

        // Set delimiter (for non-recursive listing)
        if !options.recursive {
            request = request.delimiter("/");
        }

        if let Some(max) = options.max_keys {
            request = request.max_keys(max);
        }

        if let Some(token) = &options.continuation_token {
            request = request.continuation_token(token);
        }

        let response = request.send().await.map_err(|e| {
            Self::classify(&format!("{bucket}/{prefix}"), Self::format_sdk_error(&e))
        })?;

        let mut entries = Vec::new();

        // Common prefixes come back as directory entries
        for common in response.common_prefixes() {
            if let Some(p) = common.prefix() {
                entries.push(ListEntry {
                    key: p.to_string(),
                    size: 0,
                    last_modified: None,
                    etag: None,
                    is_dir: true,
                });
            }
        }

        for object in response.contents() {
            entries.push(ListEntry {
                key: object.key().unwrap_or_default().to_string(),
                size: object.size().unwrap_or(0).max(0) as u64,
                last_modified: object.last_modified().and_then(timestamp_from),
                etag: object.e_tag().map(|s| s.trim_matches('"').to_string()),
                is_dir: false,
            });
        }

        Ok(ListResult {
            entries,
            truncated: response.is_truncated().unwrap_or(false),
            continuation_token: response.next_continuation_token().map(|s| s.to_string()),
        })
    }

    async fn head(&self, bucket: &str, key: &str) -> Result<Option<ObjectMeta>> {
        let response = match self
            .inner
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                let err_str = Self::format_sdk_error(&e);
                if err_str.contains("NotFound") || err_str.contains("NoSuchKey") {
                    return Ok(None);
                }
                return Err(Self::classify(&format!("{bucket}/{key}"), err_str));
            }
        };

        Ok(Some(ObjectMeta {
            size: response.content_length().unwrap_or(0).max(0) as u64,
            etag: response.e_tag().map(|s| s.trim_matches('"').to_string()),
            content_type: response.content_type().map(|s| s.to_string()),
            content_encoding: response.content_encoding().map(|s| s.to_string()),
            encrypted: response.server_side_encryption().is_some(),
            // HEAD does not carry grants; serve ACLs through get_acl
            acl: None,
            last_modified: response.last_modified().and_then(timestamp_from),
        }))
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let response = self
            .inner
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                Self::classify(&format!("{bucket}/{key}"), Self::format_sdk_error(&e))
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| Error::Network(e.to_string()))?
            .into_bytes();

        Ok(data)
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        options: PutOptions,
    ) -> Result<String> {
        let stream = aws_sdk_s3::primitives::ByteStream::from(body);

        let mut request = self
            .inner
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(stream);

        if let Some(ct) = &options.content_type {
            request = request.content_type(ct);
        }
        if let Some(ce) = &options.content_encoding {
            request = request.content_encoding(ce);
        }
        if let Some(acl) = options.acl {
            request = request.acl(canned_acl(acl));
        }
        if options.encrypt {
            request = request
                .server_side_encryption(aws_sdk_s3::types::ServerSideEncryption::Aes256);
        }

        let response = request.send().await.map_err(|e| {
            Self::classify(&format!("{bucket}/{key}"), Self::format_sdk_error(&e))
        })?;

        Ok(response
            .e_tag()
            .map(|s| s.trim_matches('"').to_string())
            .unwrap_or_default())
    }

    async fn copy(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
        acl: Option<Acl>,
    ) -> Result<()> {
        // Build copy source: bucket/key
        let copy_source = format!("{src_bucket}/{src_key}");

        let mut request = self
            .inner
            .copy_object()
            .copy_source(&copy_source)
            .bucket(dst_bucket)
            .key(dst_key);

        if let Some(acl) = acl {
            request = request.acl(canned_acl(acl));
        }

        request.send().await.map_err(|e| {
            Self::classify(
                &format!("{src_bucket}/{src_key}"),
                Self::format_sdk_error(&e),
            )
        })?;

        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<bool> {
        // S3's DeleteObject reports success for absent keys; probe first
        // so callers get delete-confirms-existed semantics
        let existed = self.head(bucket, key).await?.is_some();
        if !existed {
            return Ok(false);
        }

        self.inner
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                Self::classify(&format!("{bucket}/{key}"), Self::format_sdk_error(&e))
            })?;

        Ok(true)
    }

    async fn get_acl(&self, bucket: &str, key: &str) -> Result<Acl> {
        use aws_sdk_s3::types::{Permission, Type};

        let response = self
            .inner
            .get_object_acl()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                Self::classify(&format!("{bucket}/{key}"), Self::format_sdk_error(&e))
            })?;

        // Reduce the grant list back to the nearest canned ACL
        for grant in response.grants() {
            let Some(grantee) = grant.grantee() else {
                continue;
            };
            if grantee.r#type() == &Type::Group
                && grantee.uri() == Some("http://acs.amazonaws.com/groups/global/AllUsers")
                && matches!(grant.permission(), Some(Permission::Read))
            {
                return Ok(Acl::PublicRead);
            }
        }

        Ok(Acl::Private)
    }

    async fn set_acl(&self, bucket: &str, key: &str, acl: Acl) -> Result<()> {
        self.inner
            .put_object_acl()
            .bucket(bucket)
            .key(key)
            .acl(canned_acl(acl))
            .send()
            .await
            .map_err(|e| {
                Self::classify(&format!("{bucket}/{key}"), Self::format_sdk_error(&e))
            })?;

        Ok(())
    }
}
