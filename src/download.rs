//! Sequential ranged download of a single object.
//!
//! The object is fetched in consecutive byte-range parts of
//! [`DownloadConfig::part_size`] bytes. Exactly one part is in flight at any
//! time, so every chunk handed to [`WriteAt::write_at`] starts where the
//! previous one ended. That ordering is what lets a
//! [`SequentialSink`](crate::sink::SequentialSink) drop the offsets.

use crate::backend::RegionClient;
use crate::cancel::cancellable;
use crate::error::{CcatError, Result};
use crate::location::ObjectRef;
use crate::sink::WriteAt;
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Default part size (5MB, same as the AWS transfer managers)
pub const DEFAULT_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Configuration for object downloads
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Bytes requested per ranged GET (default: 5MB)
    pub part_size: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            part_size: DEFAULT_PART_SIZE,
        }
    }
}

impl DownloadConfig {
    /// Set the part size.
    ///
    /// # Panics
    ///
    /// Panics if `part_size` is zero.
    pub fn with_part_size(mut self, part_size: u64) -> Self {
        assert!(part_size > 0, "part_size must be at least 1 byte");
        self.part_size = part_size;
        self
    }
}

/// Single-worker downloader writing through an offset-addressed sink.
#[derive(Debug, Clone, Default)]
pub struct Downloader {
    config: DownloadConfig,
}

impl Downloader {
    pub fn new(config: DownloadConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    /// Stream `object` into `sink`, returning the number of bytes written.
    ///
    /// Bytes written before a failure stay in the sink.
    pub async fn download<S>(
        &self,
        client: &dyn RegionClient,
        object: &ObjectRef,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<u64>
    where
        S: WriteAt + ?Sized,
    {
        let part_size = self.config.part_size;
        let mut offset = 0u64;
        let mut total_size: Option<u64> = None;
        let mut part_number = 0u64;

        loop {
            part_number += 1;
            let range = offset..offset.saturating_add(part_size);
            trace!(object = %object, start = range.start, end = range.end, "fetching part");

            let part = cancellable(cancel, client.get_part(object, range)).await?;
            let total = *total_size.get_or_insert(part.total_size);
            let part_start = offset;

            let mut body = part.body;
            while let Some(chunk) = cancellable(cancel, async {
                body.next()
                    .await
                    .transpose()
                    .map_err(|e| CcatError::transfer(&object.bucket, &object.key, e))
            })
            .await?
            {
                let written = sink.write_at(&chunk, offset).await?;
                offset += written as u64;
            }

            debug!(
                object = %object,
                part = part_number,
                bytes = offset - part_start,
                total,
                "part streamed"
            );

            if offset >= total {
                break;
            }
            if offset == part_start {
                return Err(CcatError::transfer(
                    &object.bucket,
                    &object.key,
                    format!(
                        "body ended at byte {} of {} with no data for part {}",
                        offset, total, part_number
                    ),
                ));
            }
        }

        Ok(offset)
    }
}
