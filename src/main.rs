use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tonic::metadata::MetadataMap;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use vision_helpers::batch::feature_spec;
use vision_helpers::rpc::BatchAnnotateImagesResponse;
use vision_helpers::{
    batch_to_json, build_batch, connect, feature, CallOptions, ClientConfig, FeatureRequest,
    ImageReference,
};

#[derive(Parser, Debug)]
#[command(name = "vision", about = "Annotate images with the Cloud Vision API")]
struct Cli {
    /// Config file (defaults to ./vision.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured endpoint
    #[arg(long, global = true)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the feature methods
    Features {
        /// Print the table as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run one feature over a batch of images
    Annotate {
        /// Feature method name, e.g. `face_detection`
        feature: String,

        /// Local paths, http(s):// URLs or gs:// URLs
        #[arg(required = true)]
        images: Vec<String>,

        #[arg(long)]
        max_results: Option<i32>,

        /// Per-call deadline in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Extra request metadata as KEY=VALUE
        #[arg(long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,

        /// Print the request batch as JSON instead of sending it
        #[arg(long)]
        dry_run: bool,
    },
}

fn parse_header(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got {s:?}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ClientConfig::load(cli.config.as_deref())?;
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = endpoint;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("vision_helpers={0},vision={0}", config.log_level))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
    debug!("loaded config {config:?}");

    match cli.command {
        Command::Features { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(feature::registry())?);
                return Ok(());
            }
            for method in feature::registry() {
                println!("{:<32} {}", method.name, method.kind.as_str_name());
            }
            Ok(())
        }
        Command::Annotate {
            feature: name,
            images,
            max_results,
            timeout_ms,
            headers,
            dry_run,
        } => {
            let method = feature::lookup(&name)
                .ok_or_else(|| anyhow!("unknown feature {name:?}, see `vision features`"))?;

            let mut options = CallOptions {
                timeout: config.request_timeout(),
                metadata: headers,
            };
            if let Some(ms) = timeout_ms {
                options.timeout = Some(Duration::from_millis(ms));
            }

            if dry_run {
                let spec = feature_spec(method.kind, max_results)?;
                let images = images.into_iter().map(ImageReference::from).collect();
                let batch = build_batch(images, &spec)?;
                println!("{}", serde_json::to_string_pretty(&batch_to_json(&batch))?);
                return Ok(());
            }

            let mut request = FeatureRequest::new().images(images).options(options);
            request.max_results = max_results;

            let mut annotator = connect(&config).await?;
            let response = annotator
                .call(
                    &method.name,
                    request,
                    Some(|_: &BatchAnnotateImagesResponse, metadata: &MetadataMap| {
                        debug!("response metadata: {metadata:?}");
                    }),
                )
                .await?;

            info!("received {} image responses", response.responses.len());
            println!("{response:#?}");
            Ok(())
        }
    }
}
