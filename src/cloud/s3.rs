//! AWS S3 backend.
//!
//! - Region discovery uses `HeadBucket`, which reports `x-amz-bucket-region`
//!   on success and on cross-region redirects alike.
//! - Listing uses `ListObjectsV2`, following continuation tokens.
//! - Downloads use ranged `GetObject` calls; the total object size comes from
//!   the `Content-Range` response header.
//!
//! ## Example
//!
//! ```no_run
//! use ccat::backend::StorageProvider;
//! use ccat::cloud::S3Provider;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = S3Provider::builder()
//!     .endpoint_url("http://localhost:9000")
//!     .fallback_region("us-east-1")
//!     .build()
//!     .await;
//!
//! provider.check_credentials().await?;
//! let region = provider.bucket_region("my-bucket", "us-east-1").await?;
//! println!("my-bucket lives in {}", region);
//! # Ok(())
//! # }
//! ```

use crate::backend::{ObjectPart, Page, RegionClient, StorageProvider, DEFAULT_FALLBACK_REGION};
use crate::error::{CcatError, Result};
use crate::location::ObjectRef;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::head_bucket::HeadBucketError;
use aws_sdk_s3::Client;
use futures_util::stream::{self, StreamExt};
use std::ops::Range;
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tracing::debug;

/// Response header carrying the region of a bucket
const BUCKET_REGION_HEADER: &str = "x-amz-bucket-region";

/// S3 client factory bound to one credentials profile.
///
/// Clients for individual regions are derived from the same loaded SDK
/// configuration, so credentials are resolved once per provider.
#[derive(Clone)]
pub struct S3Provider {
    sdk_config: SdkConfig,
    endpoint_url: Option<String>,
}

/// Builder for [`S3Provider`].
pub struct S3ProviderBuilder {
    profile: Option<String>,
    endpoint_url: Option<String>,
    fallback_region: String,
}

impl S3Provider {
    /// Create a builder for configuring the provider.
    pub fn builder() -> S3ProviderBuilder {
        S3ProviderBuilder {
            profile: None,
            endpoint_url: None,
            fallback_region: DEFAULT_FALLBACK_REGION.to_string(),
        }
    }

    /// Provider using the default credential chain and no custom endpoint.
    pub async fn from_env() -> Self {
        Self::builder().build().await
    }

    /// Build an S3 client for `region`.
    fn client(&self, region: &str) -> Client {
        let mut builder = aws_sdk_s3::config::Builder::from(&self.sdk_config)
            .region(Region::new(region.to_string()));
        if let Some(endpoint) = &self.endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        Client::from_conf(builder.build())
    }
}

impl S3ProviderBuilder {
    /// Use a named profile from the shared AWS config/credentials files.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Talk to an S3-compatible endpoint instead of AWS.
    pub fn endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    /// Region the SDK configuration is loaded with (default: us-east-1).
    pub fn fallback_region(mut self, region: impl Into<String>) -> Self {
        self.fallback_region = region.into();
        self
    }

    /// Load the SDK configuration.
    pub async fn build(self) -> S3Provider {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(self.fallback_region));
        if let Some(profile) = &self.profile {
            loader = loader.profile_name(profile);
        }
        let sdk_config = loader.load().await;

        S3Provider {
            sdk_config,
            endpoint_url: self.endpoint_url,
        }
    }
}

#[async_trait]
impl StorageProvider for S3Provider {
    async fn check_credentials(&self) -> Result<()> {
        let provider = self
            .sdk_config
            .credentials_provider()
            .ok_or_else(|| CcatError::Credentials("no credentials provider configured".into()))?;
        provider
            .provide_credentials()
            .await
            .map_err(|e| CcatError::Credentials(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }

    async fn bucket_region(&self, bucket: &str, fallback_region: &str) -> Result<String> {
        let client = self.client(fallback_region);

        match client.head_bucket().bucket(bucket).send().await {
            Ok(resp) => match resp.bucket_region().filter(|r| !r.is_empty()) {
                Some(region) => Ok(region.to_string()),
                None => {
                    // S3-compatible services may omit the header; the bucket
                    // answered through the fallback region, so it is served there.
                    debug!(
                        bucket,
                        region = fallback_region,
                        "no region header, using fallback"
                    );
                    Ok(fallback_region.to_string())
                }
            },
            Err(err) => {
                if let Some(region) = region_from_sdk_error(&err) {
                    return Ok(region);
                }
                if is_bucket_not_found(&err) {
                    Err(CcatError::BucketNotFound(bucket.to_string()))
                } else {
                    Err(CcatError::resolve(bucket, DisplayErrorContext(&err).to_string()))
                }
            }
        }
    }

    async fn bind(&self, region: &str) -> Result<Arc<dyn RegionClient>> {
        Ok(Arc::new(S3RegionClient {
            client: self.client(region),
            region: region.to_string(),
        }))
    }
}

/// S3 client bound to a single region.
#[derive(Clone)]
pub struct S3RegionClient {
    client: Client,
    region: String,
}

impl S3RegionClient {
    pub fn region(&self) -> &str {
        &self.region
    }
}

#[async_trait]
impl RegionClient for S3RegionClient {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<Page> {
        let mut req = self.client.list_objects_v2().bucket(bucket).prefix(prefix);
        if let Some(token) = continuation {
            req = req.continuation_token(token);
        }
        let resp = req.send().await.map_err(|e| {
            CcatError::enumeration(bucket, prefix, DisplayErrorContext(&e).to_string())
        })?;

        let objects = resp
            .contents()
            .iter()
            .filter_map(|obj| obj.key())
            .map(|key| ObjectRef::new(bucket, key))
            .collect();

        let next_continuation = if resp.is_truncated().unwrap_or(false) {
            resp.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        Ok(Page {
            objects,
            next_continuation,
        })
    }

    async fn get_part(&self, object: &ObjectRef, range: Range<u64>) -> Result<ObjectPart> {
        let header = format!("bytes={}-{}", range.start, range.end.saturating_sub(1));
        let result = self
            .client
            .get_object()
            .bucket(&object.bucket)
            .key(&object.key)
            .range(header)
            .send()
            .await;

        let resp = match result {
            Ok(resp) => resp,
            Err(err) if range.start == 0 && is_invalid_range(&err) => {
                // Zero-byte objects reject every range, including bytes=0-N.
                return Ok(ObjectPart {
                    total_size: 0,
                    body: stream::empty().boxed(),
                });
            }
            Err(err) => {
                return Err(CcatError::transfer(
                    &object.bucket,
                    &object.key,
                    DisplayErrorContext(&err).to_string(),
                ))
            }
        };

        let total_size = resp
            .content_range()
            .and_then(total_from_content_range)
            .or_else(|| {
                resp.content_length()
                    .map(|len| range.start + u64::try_from(len).unwrap_or(0))
            })
            .ok_or_else(|| {
                CcatError::transfer(
                    &object.bucket,
                    &object.key,
                    "response carried neither Content-Range nor Content-Length",
                )
            })?;

        let body = ReaderStream::new(resp.body.into_async_read()).boxed();

        Ok(ObjectPart { total_size, body })
    }
}

/// Extract `x-amz-bucket-region` from the raw HTTP response inside an SDK error.
fn region_from_sdk_error<E>(err: &SdkError<E>) -> Option<String> {
    let headers = match err {
        SdkError::ServiceError(e) => e.raw().headers(),
        SdkError::ResponseError(e) => e.raw().headers(),
        _ => return None,
    };
    headers
        .get(BUCKET_REGION_HEADER)
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

fn status_of<E>(err: &SdkError<E>) -> Option<u16> {
    err.raw_response().map(|r| r.status().as_u16())
}

fn is_bucket_not_found(err: &SdkError<HeadBucketError>) -> bool {
    err.as_service_error()
        .map(|e| e.is_not_found())
        .unwrap_or(false)
        || status_of(err) == Some(404)
}

fn is_invalid_range<E: ProvideErrorMetadata>(err: &SdkError<E>) -> bool {
    status_of(err) == Some(416)
        || err
            .as_service_error()
            .and_then(|e| e.code())
            .map(|code| code == "InvalidRange")
            .unwrap_or(false)
}

/// Total length from a `Content-Range` value such as `bytes 0-99/1234`.
fn total_from_content_range(value: &str) -> Option<u64> {
    let (_, total) = value.rsplit_once('/')?;
    total.trim().parse().ok()
}
