//! # ccat: cloud cat
//!
//! `ccat` streams objects from S3 to standard output, in exactly the order
//! they were requested, without temp files or in-memory buffering of whole
//! objects.
//!
//! ## Features
//!
//! - **Two location grammars**: `s3://bucket/key` and path-style
//!   `https://<endpoint>/bucket/key` URLs (percent-decoded)
//! - **Prefix streaming**: `s3://bucket/prefix/` streams every object under the
//!   prefix, page by page, in listing order
//! - **Region discovery**: each bucket's region is looked up once per run
//! - **Byte-exact output**: objects are concatenated with no separators, and
//!   stdout never carries anything but object bytes
//! - **Fail-fast**: the first error ends the run; bytes already streamed stay
//!   streamed
//!
//! ## Quick Start
//!
//! ```no_run
//! # #[cfg(feature = "cloud-s3")]
//! # async fn example() -> ccat::Result<()> {
//! use ccat::cloud::S3Provider;
//! use ccat::{PipelineConfig, SequentialSink, StreamingPipeline};
//! use std::sync::Arc;
//!
//! let provider = S3Provider::from_env().await;
//! let mut pipeline = StreamingPipeline::new(Arc::new(provider), PipelineConfig::default());
//!
//! let mut stdout = SequentialSink::stdout();
//! let summary = pipeline
//!     .run(
//!         [
//!             "s3://my-bucket/header.csv",
//!             "https://s3-us-west-2.amazonaws.com/other-bucket/rows/",
//!         ],
//!         &mut stdout,
//!     )
//!     .await?;
//! eprintln!("{} objects, {} bytes", summary.objects, summary.bytes);
//! # Ok(())
//! # }
//! ```
//!
//! ### Parsing locations
//!
//! ```
//! use ccat::location::parse;
//!
//! let loc = parse("https://s3.amazonaws.com/my-bucket/dir%2Ffile%20a.txt")?;
//! assert_eq!(loc.bucket(), "my-bucket");
//! assert_eq!(loc.key(), "dir/file a.txt");
//! # Ok::<(), ccat::CcatError>(())
//! ```
//!
//! ### Custom backends
//!
//! The pipeline only sees the [`StorageProvider`] and [`RegionClient`] traits,
//! so any object store (or an in-memory fake in tests) can be plugged in.

pub mod backend;
pub(crate) mod cancel;
pub mod download;
pub mod enumerate;
pub mod error;
pub mod location;
pub mod pipeline;
pub mod region;
pub mod sink;

#[cfg(feature = "cloud-s3")]
pub mod cloud;

pub use backend::{ObjectPart, Page, RegionClient, StorageProvider};
pub use download::{DownloadConfig, Downloader};
pub use error::{CcatError, Result};
pub use location::{Location, ObjectRef};
pub use pipeline::{PipelineConfig, RunSummary, StreamingPipeline};
pub use region::{RegionResolver, ResolvedEndpoint};
pub use sink::{SequentialSink, WriteAt};

pub use tokio_util::sync::CancellationToken;

/// Install the stderr log subscriber used by the `ccat` binary.
///
/// Without `verbose` every event is suppressed. With it, `RUST_LOG` is
/// honoured and falls back to `ccat=debug`.
pub fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ccat=debug"))
    } else {
        tracing_subscriber::EnvFilter::new("off")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
