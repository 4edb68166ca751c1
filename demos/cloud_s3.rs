//! S3-compatible endpoint example
//!
//! Streams a prefix from a MinIO (or any S3-compatible) server into memory
//! and prints what was fetched.
//!
//! Run with:
//! ```bash
//! docker run -p 9000:9000 minio/minio server /data
//! export AWS_ACCESS_KEY_ID="minioadmin"
//! export AWS_SECRET_ACCESS_KEY="minioadmin"
//! export CCAT_ENDPOINT="http://localhost:9000"
//! export CCAT_LOCATION="s3://demo-bucket/logs/"
//! cargo run --example cloud_s3 --features cloud-s3
//! ```

use ccat::cloud::S3Provider;
use ccat::{PipelineConfig, SequentialSink, StreamingPipeline};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let endpoint =
        std::env::var("CCAT_ENDPOINT").unwrap_or_else(|_| "http://localhost:9000".to_string());
    let location =
        std::env::var("CCAT_LOCATION").unwrap_or_else(|_| "s3://demo-bucket/".to_string());

    println!("Endpoint: {}", endpoint);
    println!("Location: {}\n", location);

    // Path-style addressing is switched on with the custom endpoint
    let provider = S3Provider::builder()
        .endpoint_url(&endpoint)
        .fallback_region("us-east-1")
        .build()
        .await;

    let config = PipelineConfig::default().with_part_size(1024 * 1024);
    let mut pipeline = StreamingPipeline::new(Arc::new(provider), config);

    let mut sink = SequentialSink::new(Vec::new());
    let summary = pipeline.run([location.as_str()], &mut sink).await?;

    println!(
        "Streamed {} object(s), {} bytes",
        summary.objects, summary.bytes
    );

    let data = sink.into_inner();
    let preview = String::from_utf8_lossy(&data[..data.len().min(256)]);
    println!("\nFirst bytes:\n{}", preview);

    Ok(())
}
