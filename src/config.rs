//! Command-line configuration for the `od-threshold` binary.
//!
//! Every option can also be set through an environment variable with the
//! `OD_` prefix:
//!
//! - `OD_INPUT` - Source image path (required)
//! - `OD_OUTPUT` - Output PNG path (default: mask.png)
//! - `OD_THRESHOLD` - Threshold in OD x 100 (default: 20)
//! - `OD_RETAIN` - `lower` or `higher` (default: higher)
//! - `OD_THRESHOLD_TYPE` - `average` or `weighted` (default: weighted)
//! - `OD_RED_WEIGHT`, `OD_GREEN_WEIGHT`, `OD_BLUE_WEIGHT` - Channel weights (default: 1.0)
//! - `OD_ROI` - Region of interest as `x,y,width,height`
//! - `OD_WIDTH`, `OD_HEIGHT` - Output size (default: image size)
//! - `OD_TILE_SIZE` - Pyramid tile size (default: 256)
//! - `OD_CACHE_TILES` - Tiles held by each cache stage (default: 30)

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::pipeline::{
    DisplayArea, ThresholdSettings, ThresholdType, DEFAULT_THRESHOLD, MAX_THRESHOLD, MAX_WEIGHT,
};
use crate::slide::DEFAULT_TILE_SIZE;
use crate::tile::{Rect, RegionOfInterest, DEFAULT_TILE_CACHE_CAPACITY};

/// Default output path.
pub const DEFAULT_OUTPUT: &str = "mask.png";

/// Which pixels survive the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Retain {
    /// Pixels at or below the threshold
    Lower,
    /// Pixels at or above the threshold
    Higher,
}

impl Retain {
    /// Index of this choice among the retention options.
    pub fn option_index(self) -> usize {
        match self {
            Retain::Lower => 0,
            Retain::Higher => 1,
        }
    }
}

/// How channel optical densities are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ThresholdTypeArg {
    /// Equal weights
    Average,
    /// User-supplied R/G/B weights
    Weighted,
}

impl From<ThresholdTypeArg> for ThresholdType {
    fn from(arg: ThresholdTypeArg) -> Self {
        match arg {
            ThresholdTypeArg::Average => ThresholdType::Average,
            ThresholdTypeArg::Weighted => ThresholdType::WeightedAverage,
        }
    }
}

/// Parse `x,y,width,height` into a rectangle.
pub fn parse_roi(value: &str) -> Result<Rect, String> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(format!("Expected x,y,width,height but got '{}'", value));
    }

    let mut numbers = [0u32; 4];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .map_err(|_| format!("Invalid ROI component '{}'", part))?;
    }
    let rect = Rect::new(numbers[0], numbers[1], numbers[2], numbers[3]);
    if !rect.edges_fit() {
        return Err(format!("ROI '{}' extends past the largest pixel coordinate", value));
    }
    Ok(rect)
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// OD Threshold - Mask an image by weighted optical density.
///
/// Thresholds every pixel of the input image by its weighted optical density
/// and writes an RGBA mask where retained pixels keep their color and the
/// rest are black.
#[derive(Parser, Debug, Clone)]
#[command(name = "od-threshold")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Input / Output
    // =========================================================================
    /// Source image to threshold.
    #[arg(short, long, env = "OD_INPUT")]
    pub input: PathBuf,

    /// Where to write the mask PNG.
    #[arg(short, long, default_value = DEFAULT_OUTPUT, env = "OD_OUTPUT")]
    pub output: PathBuf,

    // =========================================================================
    // Threshold Parameters
    // =========================================================================
    /// Threshold in optical density x 100 (0-300).
    #[arg(short, long, default_value_t = DEFAULT_THRESHOLD, env = "OD_THRESHOLD")]
    pub threshold: f64,

    /// Which side of the threshold to keep.
    #[arg(long, value_enum, default_value_t = Retain::Higher, env = "OD_RETAIN")]
    pub retain: Retain,

    /// How channel optical densities are combined.
    #[arg(long, value_enum, default_value_t = ThresholdTypeArg::Weighted, env = "OD_THRESHOLD_TYPE")]
    pub threshold_type: ThresholdTypeArg,

    /// Red channel weight (0-10).
    #[arg(long, default_value_t = 1.0, env = "OD_RED_WEIGHT")]
    pub red_weight: f64,

    /// Green channel weight (0-10).
    #[arg(long, default_value_t = 1.0, env = "OD_GREEN_WEIGHT")]
    pub green_weight: f64,

    /// Blue channel weight (0-10).
    #[arg(long, default_value_t = 1.0, env = "OD_BLUE_WEIGHT")]
    pub blue_weight: f64,

    /// Region of interest as `x,y,width,height` in image pixels.
    ///
    /// Everything outside it is transparent in the output.
    #[arg(long, value_parser = parse_roi, env = "OD_ROI")]
    pub roi: Option<Rect>,

    // =========================================================================
    // Rendering
    // =========================================================================
    /// Output width in pixels. Defaults to the image width.
    #[arg(long, env = "OD_WIDTH")]
    pub width: Option<u32>,

    /// Output height in pixels. Defaults to the image height.
    #[arg(long, env = "OD_HEIGHT")]
    pub height: Option<u32>,

    /// Edge length of pyramid tiles.
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE, env = "OD_TILE_SIZE")]
    pub tile_size: u32,

    /// Maximum number of tiles held by each cache stage.
    #[arg(long, default_value_t = DEFAULT_TILE_CACHE_CAPACITY, env = "OD_CACHE_TILES")]
    pub cache_tiles: usize,

    // =========================================================================
    // Output Configuration
    // =========================================================================
    /// Print a JSON summary to stdout.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=MAX_THRESHOLD).contains(&self.threshold) {
            return Err(format!(
                "threshold must be between 0 and {}, got {}",
                MAX_THRESHOLD, self.threshold
            ));
        }

        for (name, weight) in [
            ("red_weight", self.red_weight),
            ("green_weight", self.green_weight),
            ("blue_weight", self.blue_weight),
        ] {
            if !(0.0..=MAX_WEIGHT).contains(&weight) {
                return Err(format!(
                    "{} must be between 0 and {}, got {}",
                    name, MAX_WEIGHT, weight
                ));
            }
        }

        if self.tile_size == 0 {
            return Err("tile_size must be greater than 0".to_string());
        }
        if self.cache_tiles == 0 {
            return Err("cache_tiles must be greater than 0".to_string());
        }
        if self.width == Some(0) || self.height == Some(0) {
            return Err("Output width and height must be greater than 0".to_string());
        }
        if self.roi.is_some_and(|roi| roi.is_empty()) {
            return Err("ROI width and height must be greater than 0".to_string());
        }
        if self.roi.is_some_and(|roi| !roi.edges_fit()) {
            return Err("ROI extends past the largest pixel coordinate".to_string());
        }

        Ok(())
    }

    /// Output size for an image of the given dimensions.
    pub fn output_size(&self, image_width: u32, image_height: u32) -> (u32, u32) {
        (
            self.width.unwrap_or(image_width),
            self.height.unwrap_or(image_height),
        )
    }

    /// Copy the threshold parameters into `settings`.
    pub fn apply(&self, settings: &mut ThresholdSettings, image_width: u32, image_height: u32) {
        settings.set_threshold(self.threshold);
        settings.set_retention(self.retain.option_index());
        settings.set_threshold_type(self.threshold_type.into());
        settings.set_weights([self.red_weight, self.green_weight, self.blue_weight]);
        settings.set_region(self.roi.map(RegionOfInterest::Rectangle));
        settings.set_display_area(DisplayArea::new(
            Rect::new(0, 0, image_width, image_height),
            self.output_size(image_width, image_height),
        ));
    }
}

// =============================================================================
// Tests
// =============================================================================
