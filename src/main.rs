//! ccat - cloud cat
//!
//! Stream objects from S3 to STDOUT.

use ccat::backend::DEFAULT_FALLBACK_REGION;
use ccat::cloud::S3Provider;
use ccat::download::DEFAULT_PART_SIZE;
use ccat::{init_tracing, PipelineConfig, SequentialSink, StreamingPipeline};
use clap::{CommandFactory, Parser};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::warn;

#[derive(Parser, Debug)]
#[command(name = "ccat", version)]
#[command(about = "cloud cat\n\nStream objects from S3 to STDOUT")]
#[command(
    after_help = "Example:\n  ccat s3://your-bucket/your-key https://s3-us-west-2.amazonaws.com/your-bucket/your-other-key"
)]
struct Args {
    /// Objects or prefixes: s3://bucket/key, s3://bucket/prefix/ or https://<endpoint>/bucket/key
    #[arg(value_name = "LOCATION")]
    locations: Vec<String>,

    /// AWS credentials profile
    #[arg(short, long, env = "AWS_PROFILE")]
    profile: Option<String>,

    /// Log verbosely to stderr
    #[arg(long)]
    verbose: bool,

    /// Region used to bootstrap bucket region discovery
    #[arg(long, value_name = "REGION", default_value = DEFAULT_FALLBACK_REGION)]
    region_hint: String,

    /// Custom S3-compatible endpoint (MinIO, R2, ...); enables path-style addressing
    #[arg(long, value_name = "URL")]
    endpoint_url: Option<String>,

    /// Bytes fetched per ranged GET
    #[arg(
        long,
        value_name = "BYTES",
        default_value_t = DEFAULT_PART_SIZE,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    part_size: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if args.locations.is_empty() {
        let _ = Args::command().print_help();
        return ExitCode::SUCCESS;
    }

    // stdout is reserved for object bytes
    init_tracing(args.verbose);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("there was an error trying to stream objects: {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut builder = S3Provider::builder().fallback_region(args.region_hint.clone());
    if let Some(profile) = &args.profile {
        builder = builder.profile(profile);
    }
    if let Some(endpoint) = &args.endpoint_url {
        builder = builder.endpoint_url(endpoint);
    }
    let provider = builder.build().await;

    let config = PipelineConfig::default()
        .with_fallback_region(args.region_hint)
        .with_part_size(args.part_size);
    let mut pipeline = StreamingPipeline::new(Arc::new(provider), config);

    let cancel = pipeline.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping after the current read");
            cancel.cancel();
        }
    });

    let mut sink = SequentialSink::stdout();
    pipeline.run(&args.locations, &mut sink).await?;
    Ok(())
}
