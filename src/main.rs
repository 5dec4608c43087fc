//! OD Threshold - Mask an image by weighted optical density.
//!
//! This binary loads an image, runs it through the threshold pipeline and
//! writes the resulting mask.

use clap::Parser;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use od_threshold::{Config, InMemorySlide, OdThresholdAlgorithm, TileFactory};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    // Initialize logging
    init_logging(config.verbose);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let image = match image::open(&config.input) {
        Ok(image) => image,
        Err(e) => {
            error!("Failed to open {}: {}", config.input.display(), e);
            return ExitCode::FAILURE;
        }
    };
    let (width, height) = (image.width(), image.height());

    let slide = match InMemorySlide::from_image(&image, config.tile_size) {
        Ok(slide) => slide,
        Err(e) => {
            error!("Failed to build slide: {}", e);
            return ExitCode::FAILURE;
        }
    };
    drop(image);

    info!("Configuration:");
    info!("  Input: {} ({}x{})", config.input.display(), width, height);
    info!("  Pyramid levels: {}", slide.level_count());
    info!(
        "  Threshold: {} ({:?}, {:?})",
        config.threshold, config.retain, config.threshold_type
    );
    info!(
        "  Weights: R={} G={} B={}",
        config.red_weight, config.green_weight, config.blue_weight
    );
    info!("  Cache: {} tiles per stage", config.cache_tiles);

    let source: Arc<dyn TileFactory> = Arc::new(slide);
    let mut algorithm = OdThresholdAlgorithm::new(config.cache_tiles);
    algorithm.init(source);
    config.apply(algorithm.settings_mut(), width, height);

    let stop = AtomicBool::new(false);
    let outcome = match algorithm.run(&stop).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Rendering failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let Some(mask) = outcome.display else {
        error!("Nothing was rendered");
        return ExitCode::FAILURE;
    };

    if let Err(e) = mask.save(&config.output) {
        error!("Failed to write {}: {}", config.output.display(), e);
        return ExitCode::FAILURE;
    }
    info!(
        "Wrote {}x{} mask to {}",
        mask.width(),
        mask.height(),
        config.output.display()
    );

    if let Some(region) = outcome.region {
        let path = config.output.with_extension("roi.png");
        if let Err(e) = region.save(&path) {
            error!("Failed to write {}: {}", path.display(), e);
            return ExitCode::FAILURE;
        }
        info!("Wrote region of interest to {}", path.display());
    }

    if config.json {
        let cache_stats = match algorithm.pipeline() {
            Some(pipeline) => pipeline.cache_stats().await,
            None => Vec::new(),
        };
        let retained = mask.pixels().filter(|p| p.0[..3] != [0, 0, 0]).count();

        let json = serde_json::json!({
            "input": config.input,
            "output": config.output,
            "width": mask.width(),
            "height": mask.height(),
            "threshold": config.threshold,
            "display": algorithm.settings().display_area(),
            "kernel": {
                "threshold": config.threshold / 100.0,
                "weights": algorithm.settings().kernel_parameters().weights,
                "retention": format!("{:?}", algorithm.settings().behavior()),
            },
            "retained_pixels": retained,
            "caches": cache_stats,
        });
        match serde_json::to_string_pretty(&json) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                error!("Failed to serialize summary: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "od_threshold=debug"
    } else {
        "od_threshold=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
