//! pail-core: SDK-independent core for the pail storage facade
//!
//! This crate provides the core functionality of pail, including:
//! - The bucket-scoped [`Store`] facade
//! - The [`ObjectStore`] trait for S3-compatible storage operations
//! - Endpoint configuration
//! - Error taxonomy and backend metadata records
//!
//! This crate is designed to be independent of any specific S3 SDK,
//! allowing the facade to be tested against an in-memory backend and
//! potential future support for other backends.

pub mod config;
pub mod error;
pub mod store;
pub mod traits;
pub mod types;

pub use config::StoreConfig;
pub use error::{Error, Result};
pub use store::{DEFAULT_PRESIGN_EXPIRY, Store};
pub use traits::{ListOptions, ListResult, ObjectBody, ObjectStore};
pub use types::{BucketInfo, MultipartUploadInfo, ObjectInfo, Owner};
