//! Bucket region discovery.

use crate::backend::{StorageProvider, DEFAULT_FALLBACK_REGION};
use crate::cancel::cancellable;
use crate::error::{CcatError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A bucket together with the region that serves it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoint {
    pub bucket: String,
    pub region: String,
}

/// Resolves the region of a bucket through a [`StorageProvider`].
///
/// Each lookup is bootstrapped through the fallback region; the backend's
/// answer is used as-is. Answers are remembered for the lifetime of the
/// resolver only, so one resolver per run gives one lookup per bucket per run.
pub struct RegionResolver {
    provider: Arc<dyn StorageProvider>,
    fallback_region: String,
    cache: HashMap<String, String>,
}

impl RegionResolver {
    pub fn new(provider: Arc<dyn StorageProvider>, fallback_region: impl Into<String>) -> Self {
        Self {
            provider,
            fallback_region: fallback_region.into(),
            cache: HashMap::new(),
        }
    }

    /// Resolver bootstrapping through `us-east-1`.
    pub fn with_default_region(provider: Arc<dyn StorageProvider>) -> Self {
        Self::new(provider, DEFAULT_FALLBACK_REGION)
    }

    pub fn fallback_region(&self) -> &str {
        &self.fallback_region
    }

    /// Region hosting `bucket`.
    ///
    /// `BucketNotFound` is returned untouched; any other backend failure is
    /// reported as `CcatError::Resolve` naming the bucket.
    pub async fn resolve(&mut self, bucket: &str, cancel: &CancellationToken) -> Result<String> {
        if let Some(region) = self.cache.get(bucket) {
            debug!(bucket, region = %region, "region cached");
            return Ok(region.clone());
        }

        debug!(bucket, hint = %self.fallback_region, "getting bucket region");
        let region = cancellable(
            cancel,
            self.provider.bucket_region(bucket, &self.fallback_region),
        )
        .await
        .map_err(|err| match err {
            e @ (CcatError::BucketNotFound(_)
            | CcatError::Resolve { .. }
            | CcatError::Cancelled) => e,
            other => CcatError::resolve(bucket, other),
        })?;

        debug!(bucket, region = %region, "bucket region resolved");
        self.cache.insert(bucket.to_string(), region.clone());
        Ok(region)
    }

    /// Like [`resolve`](Self::resolve), returning the bucket alongside its region.
    pub async fn resolve_endpoint(
        &mut self,
        bucket: &str,
        cancel: &CancellationToken,
    ) -> Result<ResolvedEndpoint> {
        let region = self.resolve(bucket, cancel).await?;
        Ok(ResolvedEndpoint {
            bucket: bucket.to_string(),
            region,
        })
    }
}
