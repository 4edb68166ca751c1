//! The streaming pipeline: parse, resolve, enumerate and download, in order.
//!
//! Every location is processed to completion before the next one is even
//! parsed, and every object is fully written before the next one is
//! requested. All bytes go through a single [`SequentialSink`], so the output
//! is the exact concatenation of the objects in resolution order.
//!
//! Failures are fail-fast: the first error ends the run, and bytes already
//! written stay written.

use crate::backend::{RegionClient, StorageProvider, DEFAULT_FALLBACK_REGION};
use crate::cancel::cancellable;
use crate::download::{DownloadConfig, Downloader};
use crate::enumerate::enumerate;
use crate::error::{CcatError, Result};
use crate::location::{self, Location, ObjectRef};
use crate::region::RegionResolver;
use crate::sink::SequentialSink;
use futures_util::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Configuration for a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Region used to bootstrap bucket region discovery (default: us-east-1)
    pub fallback_region: String,
    /// Per-object download settings
    pub download: DownloadConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fallback_region: DEFAULT_FALLBACK_REGION.to_string(),
            download: DownloadConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Set the fallback region
    pub fn with_fallback_region(mut self, region: impl Into<String>) -> Self {
        self.fallback_region = region.into();
        self
    }

    /// Set the download part size
    pub fn with_part_size(mut self, part_size: u64) -> Self {
        self.download = self.download.with_part_size(part_size);
        self
    }
}

/// Totals for a successful run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Locations processed
    pub locations: usize,
    /// Objects streamed
    pub objects: u64,
    /// Bytes written to the sink
    pub bytes: u64,
}

/// Drives locations through region discovery, enumeration and download.
///
/// Region answers and region-bound clients are cached for the lifetime of the
/// pipeline value; build one pipeline per run.
pub struct StreamingPipeline {
    provider: Arc<dyn StorageProvider>,
    resolver: RegionResolver,
    downloader: Downloader,
    clients: HashMap<String, Arc<dyn RegionClient>>,
    cancel: CancellationToken,
}

impl StreamingPipeline {
    pub fn new(provider: Arc<dyn StorageProvider>, config: PipelineConfig) -> Self {
        Self {
            resolver: RegionResolver::new(provider.clone(), config.fallback_region),
            provider,
            downloader: Downloader::new(config.download),
            clients: HashMap::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Use `token` to interrupt the run.
    ///
    /// Cancelling mid-object leaves that object truncated in the sink.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels this pipeline's run.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stream every location, in order, into `sink`.
    ///
    /// Credentials are checked before anything else. Each raw location is
    /// parsed only once the previous one has been fully streamed, so a bad
    /// argument aborts the run after the output for earlier arguments.
    ///
    /// The sink is flushed before returning, on failure as well as success.
    pub async fn run<I, S, W>(
        &mut self,
        locations: I,
        sink: &mut SequentialSink<W>,
    ) -> Result<RunSummary>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        W: AsyncWrite + Unpin + Send,
    {
        let result = self.run_inner(locations, sink).await;
        match result {
            Ok(summary) => {
                sink.flush().await?;
                info!(
                    locations = summary.locations,
                    objects = summary.objects,
                    bytes = summary.bytes,
                    "run complete"
                );
                Ok(summary)
            }
            Err(err) => {
                // Partial output is kept; push it out before reporting.
                if let Err(flush_err) = sink.flush().await {
                    debug!(error = %flush_err, "flush after failure failed");
                }
                Err(err)
            }
        }
    }

    async fn run_inner<I, S, W>(
        &mut self,
        locations: I,
        sink: &mut SequentialSink<W>,
    ) -> Result<RunSummary>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        W: AsyncWrite + Unpin + Send,
    {
        cancellable(&self.cancel, self.provider.check_credentials()).await?;

        let mut summary = RunSummary::default();
        for raw in locations {
            let raw = raw.as_ref();
            let location = location::parse(raw).map_err(|e| CcatError::InvalidLocation {
                input: raw.to_string(),
                source: Box::new(e),
            })?;
            debug!(bucket = %location.bucket(), key = %location.key(), "parsed location");

            let (objects, bytes) = self.stream_location(&location, sink).await?;
            summary.locations += 1;
            summary.objects += objects;
            summary.bytes += bytes;
        }
        Ok(summary)
    }

    /// Stream one location, returning `(objects, bytes)`.
    pub async fn stream_location<W>(
        &mut self,
        location: &Location,
        sink: &mut SequentialSink<W>,
    ) -> Result<(u64, u64)>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let client = self.client_for(location.bucket()).await?;

        if let Some(object) = location.object() {
            let bytes = self.stream_object(client.as_ref(), &object, sink).await?;
            return Ok((1, bytes));
        }

        let mut objects = enumerate(client.clone(), location.bucket(), location.key());
        let mut count = 0u64;
        let mut bytes = 0u64;
        while let Some(object) =
            cancellable(&self.cancel, async { objects.next().await.transpose() }).await?
        {
            bytes += self.stream_object(client.as_ref(), &object, sink).await?;
            count += 1;
        }

        if count == 0 {
            warn!(location = %location, "prefix matched no objects");
        }
        Ok((count, bytes))
    }

    async fn stream_object<W>(
        &self,
        client: &dyn RegionClient,
        object: &ObjectRef,
        sink: &mut SequentialSink<W>,
    ) -> Result<u64>
    where
        W: AsyncWrite + Unpin + Send,
    {
        info!(object = %object, "streaming");
        let bytes = self
            .downloader
            .download(client, object, sink, &self.cancel)
            .await?;
        debug!(object = %object, bytes, "object streamed");
        Ok(bytes)
    }

    /// Region-bound client for `bucket`, resolving and binding on first use.
    async fn client_for(&mut self, bucket: &str) -> Result<Arc<dyn RegionClient>> {
        let region = self.resolver.resolve(bucket, &self.cancel).await?;
        if let Some(client) = self.clients.get(&region) {
            return Ok(client.clone());
        }

        debug!(region = %region, "creating client");
        let client = cancellable(&self.cancel, self.provider.bind(&region)).await?;
        self.clients.insert(region, client.clone());
        Ok(client)
    }
}
