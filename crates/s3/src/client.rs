//! S3 backend implementation
//!
//! Wraps aws-sdk-s3 and implements the ObjectStore trait from pail-core.
//! All protocol concerns (signing, multipart, retry, connection pooling)
//! stay inside the SDK.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_smithy_types::byte_stream::Length;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

use pail_core::{
    BucketInfo, Error, ListOptions, ListResult, MultipartUploadInfo, ObjectBody, ObjectInfo,
    ObjectStore, Owner, Result, Store, StoreConfig,
};

/// S3 client wrapper
#[derive(Debug)]
pub struct S3Backend {
    inner: aws_sdk_s3::Client,
}

impl S3Backend {
    /// Create a new backend from a store configuration
    pub async fn new(config: &StoreConfig) -> Result<Self> {
        config.validate()?;

        // Build credentials provider
        let credentials = aws_credential_types::Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None, // session token
            None, // expiry
            "pail-static-credentials",
        );

        // Build SDK config
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint)
            .load()
            .await;

        // Path-style addressing for S3-compatible servers
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.path_style)
            .build();

        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
        })
    }

    /// Get the underlying aws-sdk-s3 client
    pub fn inner(&self) -> &aws_sdk_s3::Client {
        &self.inner
    }
}

/// Connect to a storage endpoint and open the configured bucket, creating
/// the bucket when absent.
pub async fn connect(config: StoreConfig) -> Result<Store<S3Backend>> {
    tracing::debug!(
        endpoint = %config.endpoint,
        bucket = %config.bucket,
        "connecting to object storage"
    );
    let backend = S3Backend::new(&config).await?;
    Store::open(backend, config.bucket).await
}

/// Render an SDK failure, preferring the service-level message when one
/// is present.
fn render_sdk_err<E, R>(err: &SdkError<E, R>) -> String
where
    E: std::fmt::Display,
{
    match err.as_service_error() {
        Some(service_err) => service_err.to_string(),
        None => err.to_string(),
    }
}

/// Map an SDK failure onto the facade taxonomy.
///
/// Transport-level failures (endpoint unreachable, timeout) become
/// connection errors; everything else goes through `fallback`.
fn map_sdk_err<E, R>(err: SdkError<E, R>, fallback: fn(String) -> Error) -> Error
where
    E: std::fmt::Display,
{
    let transport = matches!(
        err,
        SdkError::ConstructionFailure(_) | SdkError::DispatchFailure(_) | SdkError::TimeoutError(_)
    );
    let rendered = render_sdk_err(&err);
    if transport {
        Error::Connection(rendered)
    } else {
        fallback(rendered)
    }
}

fn map_owner(display_name: Option<&str>, id: Option<&str>) -> Owner {
    Owner {
        display_name: display_name.unwrap_or_default().to_string(),
        id: id.unwrap_or_default().to_string(),
    }
}

fn timestamp_from(date: &aws_smithy_types::DateTime) -> Option<jiff::Timestamp> {
    jiff::Timestamp::from_second(date.secs()).ok()
}

#[async_trait]
impl ObjectStore for S3Backend {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        match self.inner.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.as_service_error().is_some_and(|se| se.is_not_found()) {
                    Ok(false)
                } else {
                    Err(map_sdk_err(e, Error::Bucket))
                }
            }
        }
    }

    async fn make_bucket(&self, bucket: &str) -> Result<()> {
        match self.inner.create_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(()),
            Err(e) => {
                // creating a bucket that already exists is not an error
                let already_exists = e.as_service_error().is_some_and(|se| {
                    se.is_bucket_already_exists() || se.is_bucket_already_owned_by_you()
                });
                if already_exists {
                    Ok(())
                } else {
                    Err(map_sdk_err(e, Error::Bucket))
                }
            }
        }
    }

    async fn list_buckets(&self) -> Result<Vec<BucketInfo>> {
        let response = self
            .inner
            .list_buckets()
            .send()
            .await
            .map_err(|e| map_sdk_err(e, Error::Storage))?;

        let buckets = response
            .buckets()
            .iter()
            .map(|b| BucketInfo {
                name: b.name().unwrap_or_default().to_string(),
                created: b.creation_date().and_then(timestamp_from),
            })
            .collect();

        Ok(buckets)
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: ObjectBody,
        content_type: Option<&str>,
    ) -> Result<ObjectInfo> {
        let (stream, size) = match body {
            ObjectBody::Bytes(data) => {
                let size = data.len() as i64;
                (ByteStream::from(data), size)
            }
            ObjectBody::File(mut file) => {
                // stream from the current cursor position to end of file
                let len = file.metadata().await?.len();
                let pos = file.stream_position().await?;
                let remaining = len.saturating_sub(pos);
                let stream = ByteStream::read_from()
                    .file(file)
                    .length(Length::Exact(remaining))
                    .build()
                    .await
                    .map_err(|e| Error::Storage(e.to_string()))?;
                (stream, remaining as i64)
            }
        };

        let mut request = self
            .inner
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(stream);

        if let Some(ct) = content_type {
            request = request.content_type(ct);
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_sdk_err(e, Error::Storage))?;

        let mut info = ObjectInfo::new(key, size);
        if let Some(etag) = response.e_tag() {
            info.etag = Some(etag.trim_matches('"').to_string());
        }
        info.last_modified = Some(jiff::Timestamp::now());

        Ok(info)
    }

    async fn get_object_to_path(&self, bucket: &str, key: &str, dest: &Path) -> Result<()> {
        let response = self
            .inner
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    Error::NotFound(key.to_string())
                } else {
                    map_sdk_err(e, Error::Storage)
                }
            })?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut body = response.body.into_async_read();
        tokio::io::copy(&mut body, &mut file).await?;
        file.flush().await?;

        Ok(())
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> Result<ObjectInfo> {
        let response = self
            .inner
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_not_found()) {
                    Error::NotFound(key.to_string())
                } else {
                    map_sdk_err(e, Error::Storage)
                }
            })?;

        let mut info = ObjectInfo::new(key, response.content_length().unwrap_or(0));
        info.last_modified = response.last_modified().and_then(timestamp_from);
        if let Some(etag) = response.e_tag() {
            info.etag = Some(etag.trim_matches('"').to_string());
        }
        info.content_type = response.content_type().map(str::to_string);
        info.storage_class = response.storage_class().map(|sc| sc.as_str().to_string());
        if let Some(metadata) = response.metadata() {
            info.metadata = metadata.clone();
        }

        Ok(info)
    }

    async fn remove_object(&self, bucket: &str, key: &str) -> Result<()> {
        // deleting a missing key is a success on S3-compatible backends
        self.inner
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_err(e, Error::Storage))?;

        Ok(())
    }

    async fn list_objects(&self, bucket: &str, options: ListOptions) -> Result<ListResult> {
        let mut request = self.inner.list_objects_v2().bucket(bucket).fetch_owner(true);

        if let Some(prefix) = &options.prefix {
            request = request.prefix(prefix);
        }

        if let Some(max) = options.max_keys {
            request = request.max_keys(max);
        }

        if let Some(token) = &options.continuation_token {
            request = request.continuation_token(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_sdk_err(e, Error::Storage))?;

        let mut items = Vec::new();
        for object in response.contents() {
            let key = object.key().unwrap_or_default().to_string();
            let size = object.size().unwrap_or(0);
            let mut info = ObjectInfo::new(&key, size);

            info.last_modified = object.last_modified().and_then(timestamp_from);

            if let Some(etag) = object.e_tag() {
                info.etag = Some(etag.trim_matches('"').to_string());
            }

            if let Some(sc) = object.storage_class() {
                info.storage_class = Some(sc.as_str().to_string());
            }

            if let Some(owner) = object.owner() {
                info.owner = Some(map_owner(owner.display_name(), owner.id()));
            }

            items.push(info);
        }

        Ok(ListResult {
            items,
            truncated: response.is_truncated().unwrap_or(false),
            continuation_token: response.next_continuation_token().map(|s| s.to_string()),
        })
    }

    async fn list_multipart_uploads(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<MultipartUploadInfo>> {
        let response = self
            .inner
            .list_multipart_uploads()
            .bucket(bucket)
            .prefix(prefix)
            .send()
            .await
            .map_err(|e| map_sdk_err(e, Error::Storage))?;

        let uploads = response
            .uploads()
            .iter()
            .map(|u| MultipartUploadInfo {
                key: u.key().unwrap_or_default().to_string(),
                upload_id: u.upload_id().unwrap_or_default().to_string(),
                initiated: u.initiated().and_then(timestamp_from),
                initiator: u
                    .initiator()
                    .map(|i| map_owner(i.display_name(), i.id())),
                owner: u.owner().map(|o| map_owner(o.display_name(), o.id())),
                storage_class: u.storage_class().map(|sc| sc.as_str().to_string()),
            })
            .collect();

        Ok(uploads)
    }

    async fn presigned_get(&self, bucket: &str, key: &str, expires: Duration) -> Result<String> {
        let presign_config =
            PresigningConfig::expires_in(expires).map_err(|e| Error::Storage(e.to_string()))?;

        let request = self
            .inner
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(|e| map_sdk_err(e, Error::Storage))?;

        Ok(request.uri().to_string())
    }
}
