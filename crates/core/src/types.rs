//! Metadata records returned by storage backends
//!
//! These records are constructed by backend adapters only and passed through
//! to callers unchanged. The facade never synthesizes metadata of its own.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Owning principal of an object or multipart upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    /// Display name of the owner
    pub display_name: String,

    /// Canonical owner ID
    pub id: String,
}

/// Metadata for a stored object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Object key
    pub key: String,

    /// Size in bytes
    pub size_bytes: i64,

    /// Human-readable size
    pub size_human: String,

    /// Last modified timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<jiff::Timestamp>,

    /// ETag (usually MD5 for single-part uploads)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    /// Content type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Storage class
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,

    /// Owning principal, when the backend reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<Owner>,

    /// Extended attributes (x-amz-meta-*), populated by stat
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl ObjectInfo {
    /// Create a new ObjectInfo with key and size; remaining fields are
    /// filled in from backend responses.
    pub fn new(key: impl Into<String>, size: i64) -> Self {
        Self {
            key: key.into(),
            size_bytes: size,
            size_human: humansize::format_size(size.max(0) as u64, humansize::BINARY),
            last_modified: None,
            etag: None,
            content_type: None,
            storage_class: None,
            owner: None,
            metadata: HashMap::new(),
        }
    }
}

/// Bucket name and creation time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketInfo {
    /// Bucket name
    pub name: String,

    /// Date the bucket was created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<jiff::Timestamp>,
}

/// An incomplete multipart upload reported by the backend
///
/// Listing only; initiating, resuming or aborting multipart uploads is the
/// backend library's business.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultipartUploadInfo {
    /// Key of the object for which the upload was initiated
    pub key: String,

    /// Upload ID that identifies the multipart upload
    pub upload_id: String,

    /// When the upload was initiated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initiated: Option<jiff::Timestamp>,

    /// Principal that initiated the upload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initiator: Option<Owner>,

    /// Owning principal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<Owner>,

    /// Storage class the parts are stored under
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_info_new() {
        let info = ObjectInfo::new("docs/readme.md", 1024);
        assert_eq!(info.key, "docs/readme.md");
        assert_eq!(info.size_bytes, 1024);
        assert_eq!(info.size_human, "1 KiB");
        assert!(info.last_modified.is_none());
        assert!(info.metadata.is_empty());
    }

    #[test]
    fn test_object_info_json_skips_empty_fields() {
        let info = ObjectInfo::new("a.txt", 3);
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["key"], "a.txt");
        assert_eq!(json["size_bytes"], 3);
        assert!(json.get("etag").is_none());
        assert!(json.get("owner").is_none());
        assert!(json.get("metadata").is_none());
    }

    #[test]
    fn test_bucket_info_json_round_trip() {
        let bucket = BucketInfo {
            name: "uploads".into(),
            created: None,
        };
        let json = serde_json::to_string(&bucket).unwrap();
        let back: BucketInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, "uploads");
        assert!(back.created.is_none());
    }
}
