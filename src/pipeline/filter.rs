//! Filter stage: applies the threshold kernel to upstream tiles.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::TileError;
use crate::od::ThresholdKernel;
use crate::slide::{LevelInfo, TileFactory};
use crate::tile::{ColorSpace, PixelOrder, Tile, TileRequest};

/// Pulls a tile from upstream and thresholds it.
///
/// The kernel runs on Tokio's blocking pool so CPU-bound thresholding does
/// not stall other requests. A panic inside the kernel (a color-space
/// invariant violation) is re-raised in the caller rather than turned into
/// an error value.
pub struct FilterStage {
    upstream: Arc<dyn TileFactory>,
    kernel: Arc<ThresholdKernel>,
}

impl FilterStage {
    pub fn new(upstream: Arc<dyn TileFactory>, kernel: Arc<ThresholdKernel>) -> Self {
        Self { upstream, kernel }
    }

}

#[async_trait]
impl TileFactory for FilterStage {
    fn color_space(&self) -> ColorSpace {
        self.kernel.output_color_space()
    }

    /// The kernel writes its output in the order of its input.
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
        let source = self.upstream.tile(request).await?;
        debug!(
            level = request.level,
            x = request.region.x,
            y = request.region.y,
            "Thresholding tile"
        );

        let kernel = Arc::clone(&self.kernel);
        match tokio::task::spawn_blocking(move || kernel.process(&source)).await {
            Ok(tile) => Ok(tile),
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(TileError::Cancelled),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
