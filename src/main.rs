//! Pixelchain Mining Client - Main Application
//!
//! Fetches a pixel's state from the canvas server, mines a proof-of-work for
//! the requested placement, and submits the result.

use pixelchain_mining_client::{
    client::{CanvasClient, CanvasInfo, PixelSubmission},
    config::Config,
    crypto::HashAlgorithm,
    utils::{decode_hex, format_hash_rate},
    worker::{CpuWorker, MiningJob, MiningStats, MiningWorker},
    Error, Nonce, PixelRequest, Result, APP_NAME, APP_VERSION,
};

use std::str::FromStr;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().await?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    if config.info {
        print_info();
        return Ok(());
    }

    if config.print_config {
        print_configuration(&config)?;
        return Ok(());
    }

    info!("Starting {} v{}", APP_NAME, APP_VERSION);

    let request = config.request()?;
    info!("Placing pixel {}", request);

    let client = CanvasClient::new(
        config.node_url(),
        config.http_timeout_duration(),
        config.insecure,
    )?;

    let canvas = client.get_info().await?;
    let algorithm = check_canvas(&canvas, &request)?;

    place_pixel(&config, &client, request, algorithm).await
}

/// Validate the request against the canvas and resolve the hash algorithm
fn check_canvas(canvas: &CanvasInfo, request: &PixelRequest) -> Result<HashAlgorithm> {
    if request.x() as u32 >= canvas.width || request.y() as u32 >= canvas.height {
        return Err(Error::config(format!(
            "Pixel ({}, {}) is outside the {}x{} canvas",
            request.x(),
            request.y(),
            canvas.width,
            canvas.height
        )));
    }

    HashAlgorithm::from_str(&canvas.hash)
}

/// Fetch the pixel's state, mine the placement, and submit it
async fn place_pixel(
    config: &Config,
    client: &CanvasClient,
    request: PixelRequest,
    algorithm: HashAlgorithm,
) -> Result<()> {
    let pixel = client.get_pixel(request.x(), request.y()).await?;
    info!(
        "Current pixel color: #{:06x}, required difficulty: {}",
        pixel.rgb, pixel.required_difficulty
    );

    let job = MiningJob {
        previous_block: decode_hex(&pixel.last_block)?,
        payload: request.encode(),
        required_difficulty: pixel.mining_target(&request),
        algorithm,
        initial_nonce: Nonce::new(rand::random()),
    };
    debug!("Payload: {}", job.payload);

    // Cancel mining on Ctrl-C
    let cancellation = CancellationToken::new();
    let ctrlc_cancellation = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping the search");
            ctrlc_cancellation.cancel();
        }
    });

    // Periodic hash-rate reporting
    let (stats_tx, mut stats_rx) = mpsc::unbounded_channel::<MiningStats>();
    let stats_handle = tokio::spawn(async move {
        while let Some(stats) = stats_rx.recv().await {
            info!(
                "Mining: {} hashes, {}",
                stats.total_hashes,
                format_hash_rate(stats.current_hash_rate)
            );
        }
    });

    let mut worker = CpuWorker::new(config.thread_count);
    let solution = worker.mine(job, cancellation, Some(stats_tx)).await?;
    stats_handle.abort();

    info!(
        "Found nonce {} (digest {}, achieved difficulty {})",
        solution.nonce, solution.digest, solution.achieved_difficulty
    );

    let submission = PixelSubmission::new(&request, solution.nonce, pixel.last_block.clone());
    match client
        .submit_pixel(request.x(), request.y(), &submission)
        .await
    {
        Ok(()) => {
            info!("Pixel placed successfully");
            Ok(())
        }
        Err(e @ Error::Conflict { .. }) => {
            warn!("Pixel changed while mining; rerun to try again against the new block");
            Err(e)
        }
        Err(e) => Err(e),
    }
}

/// Print basic program information
fn print_info() {
    println!("{} v{}", APP_NAME, APP_VERSION);
    println!("Proof-of-work mining client for collaborative pixelchain canvases");
}

/// Print current configuration
fn print_configuration(config: &Config) -> Result<()> {
    let config_yaml = serde_yaml::to_string(config)?;
    println!("{}", config_yaml);
    Ok(())
}
