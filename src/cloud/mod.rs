//! Cloud storage backends for the streaming pipeline.
//!
//! Each backend implements [`StorageProvider`](crate::backend::StorageProvider)
//! and [`RegionClient`](crate::backend::RegionClient).
//!
//! ## Available Backends
//!
//! - **S3** - AWS S3 via `aws-sdk-s3` (requires `cloud-s3` feature)
//!
//! ## S3-Compatible Services
//!
//! The S3 backend also talks to MinIO, Cloudflare R2, DigitalOcean Spaces and
//! other S3-compatible services through a custom endpoint URL. Path-style
//! addressing is switched on whenever an endpoint is set.
//!
//! ## Example Usage
//!
//! ```no_run
//! # #[cfg(feature = "cloud-s3")]
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use ccat::cloud::S3Provider;
//! use ccat::{PipelineConfig, SequentialSink, StreamingPipeline};
//! use std::sync::Arc;
//!
//! let provider = S3Provider::builder().profile("default").build().await;
//! let mut pipeline = StreamingPipeline::new(Arc::new(provider), PipelineConfig::default());
//!
//! let mut sink = SequentialSink::stdout();
//! pipeline
//!     .run(["s3://my-bucket/logs/2024/", "s3://my-bucket/summary.txt"], &mut sink)
//!     .await?;
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "cloud-s3")]
pub mod s3;

#[cfg(feature = "cloud-s3")]
pub use s3::{S3Provider, S3ProviderBuilder, S3RegionClient};
