//! ObjectStore trait definition
//!
//! This trait defines the interface for S3-compatible storage operations.
//! It allows the facade to be decoupled from the specific S3 SDK
//! implementation and tested against an in-memory backend.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{BucketInfo, MultipartUploadInfo, ObjectInfo};

/// Payload source for an upload
///
/// The size is implicit: buffer length for [`ObjectBody::Bytes`], file
/// metadata for [`ObjectBody::File`].
#[derive(Debug)]
pub enum ObjectBody {
    /// In-memory buffer
    Bytes(Vec<u8>),

    /// Open file handle, streamed from its current position
    File(tokio::fs::File),
}

impl From<Vec<u8>> for ObjectBody {
    fn from(data: Vec<u8>) -> Self {
        ObjectBody::Bytes(data)
    }
}

impl From<tokio::fs::File> for ObjectBody {
    fn from(file: tokio::fs::File) -> Self {
        ObjectBody::File(file)
    }
}

/// Options for one page of a list operation
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Prefix to filter by
    pub prefix: Option<String>,

    /// Maximum number of keys to return for this page
    pub max_keys: Option<i32>,

    /// Continuation token from the previous page
    pub continuation_token: Option<String>,
}

/// One page of a list operation
#[derive(Debug, Clone)]
pub struct ListResult {
    /// Listed objects
    pub items: Vec<ObjectInfo>,

    /// Whether the result is truncated (more items available)
    pub truncated: bool,

    /// Continuation token for the next page
    pub continuation_token: Option<String>,
}

/// Trait for S3-compatible storage operations
///
/// Implemented by backend adapters. Enumeration is page-based: a page fetch
/// either yields its items or fails as a whole, so callers never observe
/// metadata from a failed enumeration step.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Check if a bucket exists
    async fn bucket_exists(&self, bucket: &str) -> Result<bool>;

    /// Create a bucket in the backend's configured region
    async fn make_bucket(&self, bucket: &str) -> Result<()>;

    /// List buckets
    async fn list_buckets(&self) -> Result<Vec<BucketInfo>>;

    /// Upload an object body, overwriting any existing object of the same key
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: ObjectBody,
        content_type: Option<&str>,
    ) -> Result<ObjectInfo>;

    /// Download an object into a local file, creating or overwriting it
    async fn get_object_to_path(&self, bucket: &str, key: &str, dest: &Path) -> Result<()>;

    /// Get object metadata without fetching the body
    async fn stat_object(&self, bucket: &str, key: &str) -> Result<ObjectInfo>;

    /// Remove an object
    async fn remove_object(&self, bucket: &str, key: &str) -> Result<()>;

    /// List one page of objects under a prefix, recursively
    async fn list_objects(&self, bucket: &str, options: ListOptions) -> Result<ListResult>;

    /// List incomplete multipart uploads under a prefix
    async fn list_multipart_uploads(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<MultipartUploadInfo>>;

    /// Generate a time-limited URL for retrieving an object without
    /// further credentials
    async fn presigned_get(&self, bucket: &str, key: &str, expires: Duration) -> Result<String>;
}
