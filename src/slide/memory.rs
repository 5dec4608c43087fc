//! In-memory pyramidal slide.
//!
//! Holds every pyramid level as a full raster. Level 0 is the image supplied
//! by the caller; each further level halves the previous one with a box
//! filter until the whole level fits in a single tile.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use image::DynamicImage;
use tracing::debug;

use crate::error::TileError;
use crate::tile::{ChannelType, ColorModel, ColorSpace, PixelOrder, Tile, TileRequest};

use super::factory::{validate_request, LevelInfo, TileFactory};

/// Default edge length of a grid tile.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// A slide whose pyramid levels live in memory.
#[derive(Debug)]
pub struct InMemorySlide {
    /// Level rasters with their metadata, highest resolution first
    levels: Vec<(LevelInfo, Tile)>,

    /// Number of tile reads served
    reads: AtomicUsize,
}

impl InMemorySlide {
    /// Build a pyramid from a level-0 raster.
    pub fn new(base: Tile, tile_size: u32) -> Self {
        let tile_size = tile_size.max(1);
        let (full_width, _) = base.size();
        let mut levels = Vec::new();
        let mut current = base;

        loop {
            let downsample = full_width as f64 / current.width().max(1) as f64;
            let info = LevelInfo::new(current.width(), current.height(), tile_size, downsample);
            let fits = current.width() <= tile_size && current.height() <= tile_size;
            let next = (!fits).then(|| current.downsample_by_two());
            levels.push((info, current));
            match next {
                Some(next) => current = next,
                None => break,
            }
        }

        debug!(levels = levels.len(), tile_size, "Built in-memory slide pyramid");

        Self {
            levels,
            reads: AtomicUsize::new(0),
        }
    }

    /// A slide with only level 0.
    pub fn single_level(base: Tile, tile_size: u32) -> Self {
        let info = LevelInfo::new(base.width(), base.height(), tile_size, 1.0);
        Self {
            levels: vec![(info, base)],
            reads: AtomicUsize::new(0),
        }
    }

    /// Build a pyramid from a decoded image.
    ///
    /// 8- and 16-bit grayscale, RGB and RGBA images keep their layout; any
    /// other pixel format is converted to 8-bit RGB.
    pub fn from_image(image: &DynamicImage, tile_size: u32) -> Result<Self, TileError> {
        let (width, height) = (image.width(), image.height());
        let (model, channel, data) = match image {
            DynamicImage::ImageLuma8(img) => {
                (ColorModel::Grayscale, ChannelType::UInt8, img.as_raw().clone())
            }
            DynamicImage::ImageRgb8(img) => {
                (ColorModel::Rgb, ChannelType::UInt8, img.as_raw().clone())
            }
            DynamicImage::ImageRgba8(img) => {
                (ColorModel::Rgba, ChannelType::UInt8, img.as_raw().clone())
            }
            DynamicImage::ImageLuma16(img) => {
                (ColorModel::Grayscale, ChannelType::UInt16, le_bytes(img.as_raw()))
            }
            DynamicImage::ImageRgb16(img) => {
                (ColorModel::Rgb, ChannelType::UInt16, le_bytes(img.as_raw()))
            }
            DynamicImage::ImageRgba16(img) => {
                (ColorModel::Rgba, ChannelType::UInt16, le_bytes(img.as_raw()))
            }
            other => (
                ColorModel::Rgb,
                ChannelType::UInt8,
                other.to_rgb8().into_raw(),
            ),
        };

        let base = Tile::from_samples(
            width,
            height,
            ColorSpace::new(model, channel),
            PixelOrder::Interleaved,
            data,
        )?;
        Ok(Self::new(base, tile_size))
    }

    /// Number of tile reads served so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

fn le_bytes(samples: &[u16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

#[async_trait]
impl TileFactory for InMemorySlide {
    fn color_space(&self) -> ColorSpace {
        self.levels[0].1.color_space()
    }

    fn pixel_order(&self) -> PixelOrder {
        self.levels[0].1.order()
    }

    fn level_count(&self) -> usize {
        self.levels.len()
    }

    fn level_info(&self, level: usize) -> Option<LevelInfo> {
        self.levels.get(level).map(|(info, _)| *info)
    }

    async fn tile(&self, request: &TileRequest) -> Result<Tile, TileError> {
        validate_request(self, request)?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.levels[request.level].1.crop(request.region)
    }
}

// =============================================================================
// Tests
// =============================================================================
