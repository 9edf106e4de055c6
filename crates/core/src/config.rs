//! Storage endpoint configuration
//!
//! Connection parameters for an S3-compatible endpoint plus the target
//! bucket. Plain data, serde-derived so callers can embed it in their own
//! configuration; pail does not persist configuration itself.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Connection parameters for a storage endpoint and target bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Endpoint URL, e.g. http://localhost:9000
    pub endpoint: String,

    /// Access key ID
    pub access_key: String,

    /// Secret access key
    pub secret_key: String,

    /// Target bucket name
    pub bucket: String,

    /// Region used for the client and for bucket creation
    #[serde(default = "default_region")]
    pub region: String,

    /// Use path-style addressing (bucket in the path, not the host);
    /// required by most S3-compatible servers
    #[serde(default = "default_path_style")]
    pub path_style: bool,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_path_style() -> bool {
    true
}

impl StoreConfig {
    /// Create a new configuration with required fields
    pub fn new(
        endpoint: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            bucket: bucket.into(),
            region: default_region(),
            path_style: default_path_style(),
        }
    }

    /// Validate the configuration before a client is built from it
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.endpoint)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(Error::Config(format!(
                "endpoint must be http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.bucket.len() < 3 || self.bucket.len() > 63 {
            return Err(Error::Config(
                "bucket name must be between 3 and 63 characters".into(),
            ));
        }

        Ok(())
    }
}
