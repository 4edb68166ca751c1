//! Storage backend abstraction
//!
//! The pipeline talks to object storage only through these two traits, so any
//! backend (S3, an S3-compatible service, or an in-memory fake) can drive it.
//!
//! - [`StorageProvider`]: the credentialed client factory. It discovers bucket
//!   regions and hands out clients bound to a region.
//! - [`RegionClient`]: a region-bound client that lists pages and fetches byte ranges.

use crate::error::Result;
use crate::location::ObjectRef;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use std::io;
use std::ops::Range;
use std::sync::Arc;

/// Region used to bootstrap region discovery when nothing else is configured
pub const DEFAULT_FALLBACK_REGION: &str = "us-east-1";

/// One batch of listing results
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    /// Objects in the order the backend returned them
    pub objects: Vec<ObjectRef>,
    /// Cursor for the next page; `None` on the last page
    pub next_continuation: Option<String>,
}

/// Body stream of a ranged fetch
pub type PartBody = BoxStream<'static, io::Result<Bytes>>;

/// Result of fetching one byte range of an object
pub struct ObjectPart {
    /// Full length of the object (not of this part)
    pub total_size: u64,
    /// Bytes of the requested range, delivered in order
    pub body: PartBody,
}

impl std::fmt::Debug for ObjectPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectPart")
            .field("total_size", &self.total_size)
            .finish_non_exhaustive()
    }
}

/// Authenticated, region-bindable storage client factory.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Confirm that usable credentials exist. Called before any other network call.
    ///
    /// Returns `CcatError::Credentials` when none are found.
    async fn check_credentials(&self) -> Result<()>;

    /// Ask the backend which region hosts `bucket`, bootstrapping the lookup
    /// through `fallback_region`. The returned region is authoritative.
    ///
    /// Returns `CcatError::BucketNotFound` when the bucket does not exist and
    /// `CcatError::Resolve` for every other failure.
    async fn bucket_region(&self, bucket: &str, fallback_region: &str) -> Result<String>;

    /// Create a client bound to `region`.
    async fn bind(&self, region: &str) -> Result<Arc<dyn RegionClient>>;
}

/// A storage client bound to one region.
#[async_trait]
pub trait RegionClient: Send + Sync {
    /// Fetch one listing page of `bucket` under `prefix`.
    ///
    /// `continuation` is `None` for the first page and the previous page's
    /// cursor afterwards.
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<Page>;

    /// Fetch `range` (end exclusive) of `object`.
    ///
    /// A range starting at or past the end of an object is clamped to an empty
    /// body; a zero-length object answers its first fetch with `total_size == 0`.
    async fn get_part(&self, object: &ObjectRef, range: Range<u64>) -> Result<ObjectPart>;
}
