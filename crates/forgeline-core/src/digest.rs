//! Content digests and download resource naming.
//!
//! Resource names are derived purely from a digest and an optional
//! instance-name namespace qualifier; identical identities always produce
//! identical names.

use sha2::{Digest as _, Sha256};

use crate::wire::Digest;

impl Digest {
    /// Computes the digest of a byte slice: SHA-256, lowercase hex.
    #[must_use]
    pub fn of_bytes(content: &[u8]) -> Self {
        let hash = Sha256::digest(content);
        Self {
            hash: hex::encode(hash),
            size_bytes: content.len() as i64,
        }
    }
}

/// A content digest qualified by an instance name.
///
/// The instance name namespaces resource names between tenants sharing one
/// service; an empty instance name selects the default instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceDigest {
    /// Instance-name namespace qualifier; empty for the default instance.
    pub instance_name: String,

    /// The content digest.
    pub digest: Digest,
}

impl InstanceDigest {
    /// Creates an instance-qualified digest.
    #[must_use]
    pub fn new(digest: Digest, instance_name: impl Into<String>) -> Self {
        Self {
            instance_name: instance_name.into(),
            digest,
        }
    }

    /// Returns the download resource name for this identity.
    #[must_use]
    pub fn download_resource_name(&self) -> String {
        download_resource_name(&self.digest, &self.instance_name)
    }
}

/// Derives the globally unique download resource name for a digest.
///
/// The instance segment is omitted entirely for the default instance.
#[must_use]
pub fn download_resource_name(digest: &Digest, instance_name: &str) -> String {
    if instance_name.is_empty() {
        format!("blobs/{}/{}", digest.hash, digest.size_bytes)
    } else {
        format!("{}/blobs/{}/{}", instance_name, digest.hash, digest.size_bytes)
    }
}
