//! # OD Threshold
//!
//! Optical density thresholding for whole-slide images, evaluated lazily
//! through a tiled, cached pipeline.
//!
//! Each pixel's red, green and blue intensities are converted to optical
//! density, combined with per-channel weights and compared against a
//! threshold. Pixels on the retained side keep their color; everything else
//! becomes black. Output tiles are computed only when requested and are
//! memoized, so any region can be rendered at any resolution without
//! recomputing the whole slide.
//!
//! ## Architecture
//!
//! - [`od`] - Optical density lookup and the threshold kernel
//! - [`tile`] - Tile buffers, geometry and the LRU tile cache
//! - [`slide`] - The `TileFactory` interface and an in-memory pyramidal source
//! - [`pipeline`] - Filter, region and cache stages plus the pipeline builder
//! - [`render`] - Compositor and the algorithm driver
//! - [`config`] - CLI configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//!
//! use od_threshold::{InMemorySlide, OdThresholdAlgorithm, TileFactory};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let image = image::open("slide.png")?;
//!     let source: Arc<dyn TileFactory> = Arc::new(InMemorySlide::from_image(&image, 256)?);
//!
//!     let mut algorithm = OdThresholdAlgorithm::default();
//!     algorithm.init(source);
//!     algorithm.settings_mut().set_threshold(50.0);
//!
//!     let outcome = algorithm.run(&AtomicBool::new(false)).await?;
//!     if let Some(mask) = outcome.display {
//!         mask.save("mask.png")?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod od;
pub mod pipeline;
pub mod render;
pub mod slide;
pub mod tile;

// Re-export commonly used types
pub use config::{Config, Retain, ThresholdTypeArg};
pub use error::TileError;
pub use od::{Behavior, KernelParameters, OpticalDensityLookup, ThresholdKernel};
pub use pipeline::{
    CacheStage, CacheStats, DisplayArea, FilterStage, Pipeline, PipelineBuilder, RegionStage,
    ThresholdSettings, ThresholdType,
};
pub use render::{Compositor, OdThresholdAlgorithm, RunOutcome};
pub use slide::{InMemorySlide, LevelInfo, TileFactory};
pub use tile::{
    ColorModel, ColorSpace, PixelOrder, Point, Rect, RegionOfInterest, Tile, TileCache,
    TileRequest,
};
