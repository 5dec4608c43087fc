//! Region stage: constrains output to a region of interest.
//!
//! Only the bounding box of the region is honored. For each request the
//! stage intersects the request with the box (scaled to the requested level):
//!
//! - fully inside: the request passes through unchanged
//! - partially inside: only the overlap is pulled from upstream and placed
//!   into an otherwise transparent tile of the requested size
//! - fully outside: a transparent tile, without touching upstream

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::TileError;
use crate::slide::{validate_request, LevelInfo, TileFactory};
use crate::tile::{ColorSpace, PixelOrder, Rect, RegionOfInterest, Tile, TileBuffer, TileRequest};

/// Clips upstream tiles to a region's bounding box.
pub struct RegionStage {
    upstream: Arc<dyn TileFactory>,

    /// Bounding box of the region in level-0 pixels
    bounds: Rect,
}

impl RegionStage {
    /// Constrain `upstream` to the bounding box of `region`.
    ///
    /// The region itself is not retained; only its bounding box is.
    pub fn new(upstream: Arc<dyn TileFactory>, region: &RegionOfInterest) -> Self {
        Self {
            upstream,
            bounds: region.bounding_rect(),
        }
    }

    /// Bounding box in the pixel space of a level with the given info.
    pub fn bounds_at(&self, info: &LevelInfo) -> Rect {
        self.bounds.scaled(info.downsample)
    }

    fn transparent(&self, width: u32, height: u32) -> Tile {
        Tile::new_filled(
            width,
            height,
            self.upstream.color_space(),
            self.upstream.pixel_order(),
            0,
        )
    }
}

#[async_trait]
impl TileFactory for RegionStage {
    fn color_space(&self) -> ColorSpace {
        self.upstream.color_space()
    }

    fn pixel_order(&self) -> PixelOrder {
        self.upstream.pixel_order()
    }

    fn level_count(&self) -> usize {
        self.upstream.level_count()
    }

    fn level_info(&self, level: usize) -> Option<LevelInfo> {
        self.upstream.level_info(level)
    }

    async fn tile(&self, request: &TileRequest) -> Result<Tile, TileError> {
        let info = validate_request(self, request)?;
        let clip = self.bounds_at(&info);
        let region = request.region;

        let Some(overlap) = region.intersection(&clip) else {
            debug!(level = request.level, "Request outside region of interest");
            return Ok(self.transparent(region.width, region.height));
        };

        if overlap == region {
            return self.upstream.tile(request).await;
        }

        let inner = self
            .upstream
            .tile(&TileRequest::new(request.level, overlap))
            .await?;
        let mut buffer = TileBuffer::new_filled(
            region.width,
            region.height,
            inner.color_space(),
            inner.order(),
            0,
        );
        buffer.blit(&inner, overlap.x - region.x, overlap.y - region.y)?;
        Ok(buffer.freeze())
    }
}

// =============================================================================
// Tests
// =============================================================================
