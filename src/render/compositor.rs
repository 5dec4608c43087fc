//! Stitches pipeline tiles into images.
//!
//! A render request names a level-0 region and an output size. The
//! compositor picks the pyramid level closest to the implied downsample,
//! fetches the grid tiles covering the region at that level concurrently,
//! pastes them onto a canvas, then resizes the canvas to the output size.
//!
//! Tiles are always requested at grid positions, never clipped to the
//! region, so successive renders over overlapping areas hit the same cache
//! keys.

use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::RgbaImage;
use tokio::task::JoinSet;
use tracing::debug;

use crate::error::TileError;
use crate::slide::TileFactory;
use crate::tile::{ColorSpace, Rect, Tile, TileRequest};

/// Renders regions of a tile factory that produces RGBA8 tiles.
#[derive(Clone)]
pub struct Compositor {
    factory: Arc<dyn TileFactory>,
}

impl Compositor {
    pub fn new(factory: Arc<dyn TileFactory>) -> Self {
        Self { factory }
    }

    /// Render `region` (level-0 pixels) at `output_size`.
    ///
    /// Parts of the region outside the image are transparent. An empty
    /// output size yields an empty image.
    pub async fn get_image(
        &self,
        region: Rect,
        output_size: (u32, u32),
    ) -> Result<RgbaImage, TileError> {
        let (out_width, out_height) = output_size;
        if out_width == 0 || out_height == 0 || region.is_empty() {
            return Ok(RgbaImage::new(out_width, out_height));
        }

        let downsample = (region.width as f64 / out_width as f64)
            .min(region.height as f64 / out_height as f64)
            .max(1.0);
        let level = self.factory.best_level_for_downsample(downsample);
        let info = self.factory.level_info(level).ok_or(TileError::InvalidLevel {
            level,
            max_levels: self.factory.level_count(),
        })?;

        debug!(level, downsample, "Compositing region");

        let scaled = region.scaled(info.downsample);
        let canvas = self.get_level_image(level, scaled).await?;

        if canvas.dimensions() == output_size {
            return Ok(canvas);
        }
        Ok(imageops::resize(
            &canvas,
            out_width,
            out_height,
            FilterType::Nearest,
        ))
    }

    /// Render `rect` of `level` at native resolution.
    ///
    /// Parts of `rect` outside the level are transparent.
    pub async fn get_level_image(&self, level: usize, rect: Rect) -> Result<RgbaImage, TileError> {
        let info = self.factory.level_info(level).ok_or(TileError::InvalidLevel {
            level,
            max_levels: self.factory.level_count(),
        })?;

        let mut canvas = RgbaImage::new(rect.width, rect.height);
        let Some(visible) = rect.intersection(&info.bounds()) else {
            return Ok(canvas);
        };

        let first_x = visible.x / info.tile_width;
        let first_y = visible.y / info.tile_height;
        let last_x = (visible.right() - 1) / info.tile_width;
        let last_y = (visible.bottom() - 1) / info.tile_height;

        let mut tasks = JoinSet::new();
        for tile_y in first_y..=last_y {
            for tile_x in first_x..=last_x {
                let factory = Arc::clone(&self.factory);
                let request = TileRequest::new(level, info.tile_rect(tile_x, tile_y));
                tasks.spawn(async move {
                    let tile = factory.tile(&request).await;
                    (request.region, tile)
                });
            }
        }

        while let Some(joined) = tasks.join_next().await {
            let (tile_rect, tile) = match joined {
                Ok(result) => result,
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(_) => return Err(TileError::Cancelled),
            };
            let tile = tile?;

            let Some(overlap) = tile_rect.intersection(&rect) else {
                continue;
            };
            let local = Rect::new(
                overlap.x - tile_rect.x,
                overlap.y - tile_rect.y,
                overlap.width,
                overlap.height,
            );
            let patch = to_rgba_image(&tile.crop(local)?)?;
            imageops::replace(
                &mut canvas,
                &patch,
                (overlap.x - rect.x) as i64,
                (overlap.y - rect.y) as i64,
            );
        }

        Ok(canvas)
    }
}

/// Convert an RGBA8 tile to an image buffer.
pub fn to_rgba_image(tile: &Tile) -> Result<RgbaImage, TileError> {
    if tile.color_space() != ColorSpace::rgba8() {
        return Err(TileError::UnsupportedColorSpace(tile.color_space()));
    }
    let interleaved = tile.to_interleaved();
    let data = interleaved.data().to_vec();
    let actual = data.len();
    RgbaImage::from_raw(tile.width(), tile.height(), data).ok_or(TileError::BufferSize {
        expected: tile.pixel_count() * 4,
        actual,
    })
}

// =============================================================================
// Tests
// =============================================================================
