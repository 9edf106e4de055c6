//! Bucket-scoped storage facade
//!
//! [`Store`] pairs an [`ObjectStore`] backend with a target bucket and
//! exposes high-level file operations: upload from a path, an open file or a
//! byte buffer, download to a path, delete, recursive prefix listing and
//! presigned URL generation. Every operation is a single call into the
//! backend plus a one-line diagnostic on failure; errors are returned to the
//! caller unmodified. No retry, no caching, no concurrency control.

use std::path::Path;
use std::time::Duration;

use tracing::warn;

use crate::error::{Error, Result};
use crate::traits::{ListOptions, ObjectBody, ObjectStore};
use crate::types::{BucketInfo, MultipartUploadInfo, ObjectInfo};

/// Default expiry for presigned URLs
pub const DEFAULT_PRESIGN_EXPIRY: Duration = Duration::from_secs(24 * 60 * 60);

/// Page size used when enumerating objects
const LIST_PAGE_SIZE: i32 = 1000;

/// A bucket-scoped handle over an object storage backend
///
/// Created once at startup via [`Store::open`] and held for the process
/// lifetime. Holds no mutable state of its own; concurrent use is as safe as
/// the backend implementation.
pub struct Store<B> {
    backend: B,
    bucket: String,
}

impl<B: ObjectStore> Store<B> {
    /// Open a store against `bucket`, creating the bucket when absent.
    ///
    /// An existing bucket is left untouched; no duplicate create call is
    /// issued.
    pub async fn open(backend: B, bucket: impl Into<String>) -> Result<Self> {
        let bucket = bucket.into();

        let exists = backend.bucket_exists(&bucket).await.map_err(|e| {
            warn!("bucket existence check for '{bucket}' failed: {e}");
            e
        })?;

        if !exists {
            backend.make_bucket(&bucket).await.map_err(|e| {
                warn!("bucket creation for '{bucket}' failed: {e}");
                e
            })?;
        }

        Ok(Self { backend, bucket })
    }

    /// The target bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Get the underlying backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Upload the file at `path` under `key`, overwriting any existing
    /// object of the same key.
    ///
    /// The file is opened for the duration of this call only and closed on
    /// every exit path. The content type is guessed from the local path.
    pub async fn put_path(&self, key: &str, path: impl AsRef<Path>) -> Result<ObjectInfo> {
        let path = path.as_ref();

        let file = tokio::fs::File::open(path).await.map_err(|e| {
            warn!("failed to open {}: {e}", path.display());
            Error::Io(e)
        })?;

        let content_type = guess_content_type(path);
        self.backend
            .put_object(&self.bucket, key, ObjectBody::File(file), content_type.as_deref())
            .await
            .map_err(|e| {
                warn!("upload of '{key}' from {} failed: {e}", path.display());
                e
            })
    }

    /// Upload an already-open file under `key`.
    ///
    /// The handle stays owned by the caller and is not closed; the upload
    /// reads from the current cursor position to end of file, advancing the
    /// cursor. The content type is guessed from the key.
    pub async fn put_file(&self, key: &str, file: &mut tokio::fs::File) -> Result<ObjectInfo> {
        let reader = file.try_clone().await.map_err(|e| {
            warn!("failed to clone file handle for '{key}': {e}");
            Error::Io(e)
        })?;

        let content_type = guess_content_type(Path::new(key));
        self.backend
            .put_object(&self.bucket, key, ObjectBody::File(reader), content_type.as_deref())
            .await
            .map_err(|e| {
                warn!("upload of '{key}' failed: {e}");
                e
            })
    }

    /// Upload an in-memory buffer under `key`; the object size is the
    /// buffer length.
    pub async fn put_bytes(&self, key: &str, data: Vec<u8>) -> Result<ObjectInfo> {
        let content_type = guess_content_type(Path::new(key));
        self.backend
            .put_object(&self.bucket, key, ObjectBody::Bytes(data), content_type.as_deref())
            .await
            .map_err(|e| {
                warn!("upload of '{key}' failed: {e}");
                e
            })
    }

    /// Download the object under `key` into the local file at `path`,
    /// creating or overwriting it.
    pub async fn get_to_path(&self, key: &str, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.backend
            .get_object_to_path(&self.bucket, key, path)
            .await
            .map_err(|e| {
                warn!("download of '{key}' to {} failed: {e}", path.display());
                e
            })
    }

    /// Get metadata for the object under `key`
    pub async fn stat(&self, key: &str) -> Result<ObjectInfo> {
        self.backend
            .stat_object(&self.bucket, key)
            .await
            .map_err(|e| {
                warn!("stat of '{key}' failed: {e}");
                e
            })
    }

    /// Remove the object under `key`.
    ///
    /// Removing a key that does not exist succeeds; S3-compatible backends
    /// treat delete as idempotent.
    pub async fn remove(&self, key: &str) -> Result<()> {
        self.backend
            .remove_object(&self.bucket, key)
            .await
            .map_err(|e| {
                warn!("remove of '{key}' failed: {e}");
                e
            })
    }

    /// List all object keys under `prefix`, traversing sub-prefixes
    /// recursively.
    ///
    /// Enumeration aborts on the first page error: the error is returned and
    /// keys accumulated so far are discarded, never a partial list.
    pub async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let options = ListOptions {
                prefix: Some(prefix.to_string()),
                max_keys: Some(LIST_PAGE_SIZE),
                continuation_token: continuation_token.clone(),
            };

            let page = self
                .backend
                .list_objects(&self.bucket, options)
                .await
                .map_err(|e| {
                    warn!("listing of prefix '{prefix}' failed: {e}");
                    e
                })?;

            keys.extend(page.items.into_iter().map(|info| info.key));

            if page.truncated {
                continuation_token = page.continuation_token;
            } else {
                break;
            }
        }

        Ok(keys)
    }

    /// List buckets visible at the endpoint
    pub async fn buckets(&self) -> Result<Vec<BucketInfo>> {
        self.backend.list_buckets().await.map_err(|e| {
            warn!("bucket listing failed: {e}");
            e
        })
    }

    /// List incomplete multipart uploads under `prefix`
    pub async fn incomplete_uploads(&self, prefix: &str) -> Result<Vec<MultipartUploadInfo>> {
        self.backend
            .list_multipart_uploads(&self.bucket, prefix)
            .await
            .map_err(|e| {
                warn!("multipart upload listing for prefix '{prefix}' failed: {e}");
                e
            })
    }

    /// Generate a presigned GET URL for the object under `key`.
    ///
    /// `expires` defaults to 24 hours when omitted.
    pub async fn presigned_url(&self, key: &str, expires: Option<Duration>) -> Result<String> {
        let expires = expires.unwrap_or(DEFAULT_PRESIGN_EXPIRY);
        self.backend
            .presigned_get(&self.bucket, key, expires)
            .await
            .map_err(|e| {
                warn!("presign of '{key}' failed: {e}");
                e
            })
    }
}

fn guess_content_type(path: &Path) -> Option<String> {
    mime_guess::from_path(path)
        .first()
        .map(|m| m.essence_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use tokio::io::AsyncReadExt;

    use crate::traits::ListResult;

    #[derive(Default)]
    struct State {
        buckets: BTreeSet<String>,
        objects: BTreeMap<String, Vec<u8>>,
        content_types: BTreeMap<String, Option<String>>,
        exists_calls: usize,
        create_calls: usize,
        page_size: usize,
        fail_at_index: Option<usize>,
    }

    /// In-memory ObjectStore used to exercise the facade without a server
    #[derive(Clone)]
    struct MemoryBackend {
        state: Arc<Mutex<State>>,
    }

    impl MemoryBackend {
        fn new() -> Self {
            Self {
                state: Arc::new(Mutex::new(State {
                    page_size: 1000,
                    ..State::default()
                })),
            }
        }

        fn with_bucket(self, name: &str) -> Self {
            self.state.lock().unwrap().buckets.insert(name.to_string());
            self
        }

        fn with_page_size(self, page_size: usize) -> Self {
            self.state.lock().unwrap().page_size = page_size;
            self
        }

        fn failing_at_index(self, index: usize) -> Self {
            self.state.lock().unwrap().fail_at_index = Some(index);
            self
        }

        fn exists_calls(&self) -> usize {
            self.state.lock().unwrap().exists_calls
        }

        fn create_calls(&self) -> usize {
            self.state.lock().unwrap().create_calls
        }

        fn has_bucket(&self, name: &str) -> bool {
            self.state.lock().unwrap().buckets.contains(name)
        }
    }

    #[async_trait]
    impl ObjectStore for MemoryBackend {
        async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
            let mut state = self.state.lock().unwrap();
            state.exists_calls += 1;
            Ok(state.buckets.contains(bucket))
        }

        async fn make_bucket(&self, bucket: &str) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            state.create_calls += 1;
            state.buckets.insert(bucket.to_string());
            Ok(())
        }

        async fn list_buckets(&self) -> Result<Vec<BucketInfo>> {
            let state = self.state.lock().unwrap();
            Ok(state
                .buckets
                .iter()
                .map(|name| BucketInfo {
                    name: name.clone(),
                    created: None,
                })
                .collect())
        }

        async fn put_object(
            &self,
            _bucket: &str,
            key: &str,
            body: ObjectBody,
            content_type: Option<&str>,
        ) -> Result<ObjectInfo> {
            let data = match body {
                ObjectBody::Bytes(data) => data,
                ObjectBody::File(mut file) => {
                    let mut buf = Vec::new();
                    file.read_to_end(&mut buf).await?;
                    buf
                }
            };

            let mut info = ObjectInfo::new(key, data.len() as i64);
            info.content_type = content_type.map(str::to_string);

            let mut state = self.state.lock().unwrap();
            state
                .content_types
                .insert(key.to_string(), content_type.map(str::to_string));
            state.objects.insert(key.to_string(), data);
            Ok(info)
        }

        async fn get_object_to_path(&self, _bucket: &str, key: &str, dest: &Path) -> Result<()> {
            let data = {
                let state = self.state.lock().unwrap();
                state
                    .objects
                    .get(key)
                    .cloned()
                    .ok_or_else(|| Error::NotFound(key.to_string()))?
            };
            tokio::fs::write(dest, data).await?;
            Ok(())
        }

        async fn stat_object(&self, _bucket: &str, key: &str) -> Result<ObjectInfo> {
            let state = self.state.lock().unwrap();
            let data = state
                .objects
                .get(key)
                .ok_or_else(|| Error::NotFound(key.to_string()))?;
            let mut info = ObjectInfo::new(key, data.len() as i64);
            info.content_type = state.content_types.get(key).cloned().flatten();
            Ok(info)
        }

        async fn remove_object(&self, _bucket: &str, key: &str) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            state.objects.remove(key);
            state.content_types.remove(key);
            Ok(())
        }

        async fn list_objects(&self, _bucket: &str, options: ListOptions) -> Result<ListResult> {
            let state = self.state.lock().unwrap();
            let prefix = options.prefix.unwrap_or_default();

            let matching: Vec<(&String, usize)> = state
                .objects
                .iter()
                .filter(|(key, _)| key.starts_with(&prefix))
                .map(|(key, data)| (key, data.len()))
                .collect();

            let start = options
                .continuation_token
                .as_deref()
                .and_then(|token| token.parse::<usize>().ok())
                .unwrap_or(0);
            let end = (start + state.page_size).min(matching.len());

            if let Some(fail) = state.fail_at_index {
                if (start..end).contains(&fail) {
                    return Err(Error::Storage("injected enumeration failure".into()));
                }
            }

            let items = matching[start..end]
                .iter()
                .map(|(key, size)| ObjectInfo::new(key.as_str(), *size as i64))
                .collect();

            let truncated = end < matching.len();
            Ok(ListResult {
                items,
                truncated,
                continuation_token: truncated.then(|| end.to_string()),
            })
        }

        async fn list_multipart_uploads(
            &self,
            _bucket: &str,
            _prefix: &str,
        ) -> Result<Vec<MultipartUploadInfo>> {
            Ok(Vec::new())
        }

        async fn presigned_get(
            &self,
            bucket: &str,
            key: &str,
            expires: Duration,
        ) -> Result<String> {
            Ok(format!(
                "http://localhost:9000/{bucket}/{key}?X-Amz-Algorithm=AWS4-HMAC-SHA256&X-Amz-Expires={}",
                expires.as_secs()
            ))
        }
    }

    async fn memory_store(bucket: &str) -> Store<MemoryBackend> {
        Store::open(MemoryBackend::new().with_bucket(bucket), bucket)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_open_existing_bucket_does_not_create() {
        let backend = MemoryBackend::new().with_bucket("uploads");
        let probe = backend.clone();

        let store = Store::open(backend, "uploads").await.unwrap();

        assert_eq!(store.bucket(), "uploads");
        assert_eq!(probe.exists_calls(), 1);
        assert_eq!(probe.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_open_missing_bucket_creates_it_once() {
        let backend = MemoryBackend::new();
        let probe = backend.clone();

        Store::open(backend, "uploads").await.unwrap();

        assert_eq!(probe.create_calls(), 1);
        assert!(probe.has_bucket("uploads"));
    }

    #[tokio::test]
    async fn test_put_path_get_to_path_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let src = dir.path().join("payload.bin");
        let dst = dir.path().join("fetched.bin");
        let payload = b"round trip payload \x00\x01\xfe".to_vec();
        std::fs::write(&src, &payload).unwrap();

        let store = memory_store("uploads").await;
        store.put_path("data/payload.bin", &src).await.unwrap();
        store.get_to_path("data/payload.bin", &dst).await.unwrap();

        assert_eq!(std::fs::read(&dst).unwrap(), payload);
    }

    #[tokio::test]
    async fn test_put_bytes_empty_round_trips_zero_length() {
        let dir = tempfile::TempDir::new().unwrap();
        let dst = dir.path().join("empty.bin");

        let store = memory_store("uploads").await;
        store.put_bytes("empty.bin", Vec::new()).await.unwrap();
        store.get_to_path("empty.bin", &dst).await.unwrap();

        assert_eq!(std::fs::metadata(&dst).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_put_file_leaves_handle_with_caller() {
        let dir = tempfile::TempDir::new().unwrap();
        let src = dir.path().join("notes.txt");
        std::fs::write(&src, b"handle upload").unwrap();

        let store = memory_store("uploads").await;
        let mut file = tokio::fs::File::open(&src).await.unwrap();
        let info = store.put_file("notes.txt", &mut file).await.unwrap();
        assert_eq!(info.size_bytes, 13);

        // still usable after the upload
        assert_eq!(file.metadata().await.unwrap().len(), 13);
    }

    #[tokio::test]
    async fn test_put_path_missing_file_is_io_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = memory_store("uploads").await;

        let err = store
            .put_path("k", dir.path().join("missing.bin"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[tokio::test]
    async fn test_get_to_path_missing_key_is_not_found() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = memory_store("uploads").await;

        let err = store
            .get_to_path("ghost.bin", dir.path().join("out.bin"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_remove_then_list_excludes_key() {
        let store = memory_store("uploads").await;
        store.put_bytes("logs/a.txt", b"a".to_vec()).await.unwrap();
        store.put_bytes("logs/b.txt", b"b".to_vec()).await.unwrap();

        store.remove("logs/a.txt").await.unwrap();

        let keys = store.list("logs/").await.unwrap();
        assert_eq!(keys, vec!["logs/b.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_remove_missing_key_succeeds() {
        let store = memory_store("uploads").await;
        store.remove("never-existed").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_empty_prefix_returns_empty_vec() {
        let store = memory_store("uploads").await;
        store.put_bytes("logs/a.txt", b"a".to_vec()).await.unwrap();

        let keys = store.list("reports/").await.unwrap();
        assert!(keys.is_empty());
    }

    #[tokio::test]
    async fn test_list_walks_continuation_pages() {
        let backend = MemoryBackend::new().with_bucket("uploads").with_page_size(2);
        let store = Store::open(backend, "uploads").await.unwrap();

        for name in ["a", "b", "c", "d", "e"] {
            store
                .put_bytes(&format!("logs/{name}.txt"), vec![0u8; 4])
                .await
                .unwrap();
        }

        let keys = store.list("logs/").await.unwrap();
        assert_eq!(keys.len(), 5);
        assert_eq!(keys[0], "logs/a.txt");
        assert_eq!(keys[4], "logs/e.txt");
    }

    #[tokio::test]
    async fn test_list_aborts_on_enumeration_error_without_partial_keys() {
        // five objects, failure injected at the third; the first page of two
        // succeeds but its keys must not leak out
        let backend = MemoryBackend::new()
            .with_bucket("uploads")
            .with_page_size(2)
            .failing_at_index(2);
        let store = Store::open(backend, "uploads").await.unwrap();

        for name in ["a", "b", "c", "d", "e"] {
            store
                .put_bytes(&format!("logs/{name}.txt"), vec![0u8; 4])
                .await
                .unwrap();
        }

        let err = store.list("logs/").await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[tokio::test]
    async fn test_stat_reports_guessed_content_type() {
        let store = memory_store("uploads").await;
        store
            .put_bytes("logs/a.txt", b"hello".to_vec())
            .await
            .unwrap();

        let info = store.stat("logs/a.txt").await.unwrap();
        assert_eq!(info.size_bytes, 5);
        assert_eq!(info.content_type.as_deref(), Some("text/plain"));
    }

    #[tokio::test]
    async fn test_presigned_url_default_expiry_is_24_hours() {
        let store = memory_store("uploads").await;
        let url = store.presigned_url("report.pdf", None).await.unwrap();
        assert!(url.contains("X-Amz-Expires=86400"), "url: {url}");
    }

    #[tokio::test]
    async fn test_presigned_url_explicit_expiry() {
        let store = memory_store("uploads").await;
        let url = store
            .presigned_url("report.pdf", Some(Duration::from_secs(600)))
            .await
            .unwrap();
        assert!(url.contains("X-Amz-Expires=600"), "url: {url}");
    }

    #[tokio::test]
    async fn test_buckets_lists_endpoint_buckets() {
        let store = memory_store("uploads").await;
        let buckets = store.buckets().await.unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].name, "uploads");
    }

    #[tokio::test]
    async fn test_incomplete_uploads_empty() {
        let store = memory_store("uploads").await;
        let uploads = store.incomplete_uploads("").await.unwrap();
        assert!(uploads.is_empty());
    }
}
