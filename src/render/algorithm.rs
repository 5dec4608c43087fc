//! Driver that ties settings, the pipeline builder and the compositor together.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::RgbaImage;
use tracing::{debug, info};

use crate::error::TileError;
use crate::pipeline::{DisplayArea, Pipeline, PipelineBuilder, ThresholdSettings};
use crate::slide::TileFactory;

use super::compositor::Compositor;

/// Result of one [`OdThresholdAlgorithm::run`].
#[derive(Debug, Default)]
pub struct RunOutcome {
    /// Whether the pipeline was rebuilt
    pub rebuilt: bool,

    /// Display area rendered through the pipeline, if it had to be redrawn
    pub display: Option<RgbaImage>,

    /// Containing rectangle of the region of interest, rendered at the
    /// display output size
    pub region: Option<RgbaImage>,
}

/// Optical density threshold algorithm over one image source.
pub struct OdThresholdAlgorithm {
    source: Option<Arc<dyn TileFactory>>,
    settings: ThresholdSettings,
    builder: PipelineBuilder,
}

impl OdThresholdAlgorithm {
    /// An algorithm with no source bound; `cache_capacity` sizes each cache
    /// stage.
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            source: None,
            settings: ThresholdSettings::new(),
            builder: PipelineBuilder::new(cache_capacity),
        }
    }

    /// Bind an image source. The display area is reset to the whole image
    /// at full resolution.
    pub fn init(&mut self, source: Arc<dyn TileFactory>) {
        if let Some((width, height)) = source.dimensions() {
            self.settings.set_display_area(DisplayArea::full(width, height));
        }
        self.source = Some(source);
        self.builder.release();
    }

    pub fn settings(&self) -> &ThresholdSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut ThresholdSettings {
        &mut self.settings
    }

    pub fn pipeline(&self) -> Option<&Pipeline> {
        self.builder.pipeline()
    }

    /// Update the pipeline and render whatever changed.
    ///
    /// Setting `stop` prevents further rendering and releases the pipeline
    /// before returning.
    pub async fn run(&mut self, stop: &AtomicBool) -> Result<RunOutcome, TileError> {
        let display_changed = self.settings.display_area_changed();
        let rebuilt = self.builder.build(self.source.as_ref(), &mut self.settings);

        let mut outcome = RunOutcome {
            rebuilt,
            ..RunOutcome::default()
        };

        let Some(pipeline) = self.builder.pipeline() else {
            debug!("No source bound; nothing to render");
            return Ok(outcome);
        };
        let compositor = Compositor::new(pipeline.output());
        let display = self.settings.display_area();

        if (rebuilt || display_changed) && !stop.load(Ordering::SeqCst) {
            if let Some(area) = display {
                outcome.display =
                    Some(compositor.get_image(area.source_region, area.output_size).await?);

                if let Some(region) = self.settings.region() {
                    if !stop.load(Ordering::SeqCst) {
                        let rect = region.bounding_rect();
                        outcome.region = Some(compositor.get_image(rect, area.output_size).await?);
                    }
                }
            }
        }

        if stop.load(Ordering::SeqCst) {
            info!("Stop requested; releasing pipeline");
            self.builder.release();
        }

        Ok(outcome)
    }
}

impl Default for OdThresholdAlgorithm {
    fn default() -> Self {
        Self::new(crate::tile::DEFAULT_TILE_CACHE_CAPACITY)
    }
}

// =============================================================================
// Tests
// =============================================================================
