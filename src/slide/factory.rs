//! `TileFactory` trait for anything that produces tiles.
//!
//! Image sources and every pipeline stage implement the same trait, so a
//! stage can wrap a source or another stage without knowing which it is.
//! Stages hold their upstream as `Arc<dyn TileFactory>`; the chain lives as
//! long as its longest-surviving holder.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TileError;
use crate::tile::{ColorSpace, PixelOrder, Rect, Tile, TileRequest};

// =============================================================================
// Level Information
// =============================================================================

/// Information about a single pyramid level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelInfo {
    /// Width of this level in pixels
    pub width: u32,

    /// Height of this level in pixels
    pub height: u32,

    /// Width of each tile in pixels
    pub tile_width: u32,

    /// Height of each tile in pixels
    pub tile_height: u32,

    /// Number of tiles in X direction
    pub tiles_x: u32,

    /// Number of tiles in Y direction
    pub tiles_y: u32,

    /// Downsample factor relative to level 0
    ///
    /// Level 0 has downsample 1.0, level 1 might have 2.0, etc.
    pub downsample: f64,
}

impl LevelInfo {
    /// Build level info for a `width` x `height` level cut into square tiles.
    pub fn new(width: u32, height: u32, tile_size: u32, downsample: f64) -> Self {
        let tile_size = tile_size.max(1);
        Self {
            width,
            height,
            tile_width: tile_size,
            tile_height: tile_size,
            tiles_x: width.div_ceil(tile_size),
            tiles_y: height.div_ceil(tile_size),
            downsample,
        }
    }

    /// Full extent of the level.
    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    /// Region of the grid tile at `(tile_x, tile_y)`; edge tiles are clipped.
    pub fn tile_rect(&self, tile_x: u32, tile_y: u32) -> Rect {
        let x = tile_x * self.tile_width;
        let y = tile_y * self.tile_height;
        Rect::from_bounds(
            x,
            y,
            (x + self.tile_width).min(self.width),
            (y + self.tile_height).min(self.height),
        )
    }
}

// =============================================================================
// TileFactory Trait
// =============================================================================

/// Produces the tile covering a region of one pyramid level.
///
/// # Example
///
/// ```ignore
/// use od_threshold::slide::TileFactory;
/// use od_threshold::tile::{Rect, TileRequest};
///
/// async fn first_tile<F: TileFactory>(factory: &F) -> Result<Tile, TileError> {
///     let info = factory.level_info(0).expect("level 0");
///     factory.tile(&TileRequest::new(0, info.tile_rect(0, 0))).await
/// }
/// ```
#[async_trait]
pub trait TileFactory: Send + Sync {
    /// Color space of every tile this factory produces.
    fn color_space(&self) -> ColorSpace;

    /// Sample layout of every tile this factory produces.
    fn pixel_order(&self) -> PixelOrder {
        PixelOrder::Interleaved
    }

    /// Get the number of pyramid levels.
    ///
    /// Level 0 is always the highest resolution (full size).
    fn level_count(&self) -> usize;

    /// Get complete information about a level.
    ///
    /// Returns `None` if level is out of range.
    fn level_info(&self, level: usize) -> Option<LevelInfo>;

    /// Get dimensions of the full-resolution (level 0) image.
    fn dimensions(&self) -> Option<(u32, u32)> {
        self.level_info(0).map(|info| (info.width, info.height))
    }

    /// Find the level to render at for a given downsample factor.
    ///
    /// Returns the lowest-resolution level whose downsample does not exceed
    /// the requested factor, so rendering only ever shrinks pixels. Falls
    /// back to level 0.
    fn best_level_for_downsample(&self, downsample: f64) -> usize {
        let mut best = 0;
        for level in 0..self.level_count() {
            match self.level_info(level) {
                Some(info) if info.downsample <= downsample + 1e-9 => best = level,
                _ => break,
            }
        }
        best
    }

    /// Produce the tile for `request`.
    ///
    /// # Errors
    ///
    /// Returns an error if the level does not exist, the region lies outside
    /// the level, or the underlying source fails.
    async fn tile(&self, request: &TileRequest) -> Result<Tile, TileError>;
}

#[async_trait]
impl<F: TileFactory + ?Sized> TileFactory for Arc<F> {
    fn color_space(&self) -> ColorSpace {
        (**self).color_space()
    }

    fn pixel_order(&self) -> PixelOrder {
        (**self).pixel_order()
    }

    fn level_count(&self) -> usize {
        (**self).level_count()
    }

    fn level_info(&self, level: usize) -> Option<LevelInfo> {
        (**self).level_info(level)
    }

    fn best_level_for_downsample(&self, downsample: f64) -> usize {
        (**self).best_level_for_downsample(downsample)
    }

    async fn tile(&self, request: &TileRequest) -> Result<Tile, TileError> {
        (**self).tile(request).await
    }
}

/// Check a request against a factory's levels.
///
/// Returns the level's info when the level exists and the region lies
/// inside it.
pub fn validate_request<F: TileFactory + ?Sized>(
    factory: &F,
    request: &TileRequest,
) -> Result<LevelInfo, TileError> {
    let info = factory
        .level_info(request.level)
        .ok_or(TileError::InvalidLevel {
            level: request.level,
            max_levels: factory.level_count(),
        })?;

    if !info.bounds().contains(&request.region) {
        return Err(TileError::RegionOutOfBounds {
            level: request.level,
            region: request.region,
            width: info.width,
            height: info.height,
        });
    }

    Ok(info)
}

// =============================================================================
// Tests
// =============================================================================
