//! Pipeline assembly and rebuild decisions.
//!
//! A pipeline is never mutated in place. When any parameter changes the
//! builder throws the old chain away, caches included, and assembles a new
//! one:
//!
//! ```text
//! source → FilterStage → CacheStage [→ RegionStage → CacheStage]
//! ```

use std::sync::Arc;

use tracing::{info, warn};

use crate::od::{Behavior, ThresholdKernel};
use crate::slide::TileFactory;
use crate::tile::DEFAULT_TILE_CACHE_CAPACITY;

use super::cache::{CacheStage, CacheStats};
use super::filter::FilterStage;
use super::region::RegionStage;
use super::settings::ThresholdSettings;

// =============================================================================
// Pipeline
// =============================================================================

/// One assembled chain of stages.
pub struct Pipeline {
    output: Arc<dyn TileFactory>,
    caches: Vec<Arc<CacheStage>>,
    generation: u64,
}

impl Pipeline {
    /// The last stage of the chain.
    pub fn output(&self) -> Arc<dyn TileFactory> {
        Arc::clone(&self.output)
    }

    /// Counters of every cache stage, upstream first.
    pub async fn cache_stats(&self) -> Vec<CacheStats> {
        let mut stats = Vec::with_capacity(self.caches.len());
        for cache in &self.caches {
            stats.push(cache.stats().await);
        }
        stats
    }

    /// Build counter; increases by one with every rebuild.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

// =============================================================================
// PipelineBuilder
// =============================================================================

/// Owns the threshold kernel and the current pipeline.
pub struct PipelineBuilder {
    kernel: ThresholdKernel,
    cache_capacity: usize,
    pipeline: Option<Pipeline>,
    generation: u64,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_TILE_CACHE_CAPACITY)
    }
}

impl PipelineBuilder {
    /// A builder whose cache stages each hold `cache_capacity` tiles.
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            kernel: ThresholdKernel::with_equal_weights(0.0, Behavior::NoAction),
            cache_capacity,
            pipeline: None,
            generation: 0,
        }
    }

    pub fn kernel(&self) -> &ThresholdKernel {
        &self.kernel
    }

    pub fn pipeline(&self) -> Option<&Pipeline> {
        self.pipeline.as_ref()
    }

    /// Drop the current pipeline and its caches.
    pub fn release(&mut self) {
        if self.pipeline.take().is_some() {
            info!("Released pipeline");
        }
    }

    /// Bring the pipeline up to date with `settings`.
    ///
    /// Without a source nothing happens and the settings' change flags are
    /// left for the next call. Otherwise the change flags are consumed and
    /// the chain is rebuilt if anything changed or no chain exists yet.
    ///
    /// Returns whether a rebuild happened.
    pub fn build(
        &mut self,
        source: Option<&Arc<dyn TileFactory>>,
        settings: &mut ThresholdSettings,
    ) -> bool {
        let Some(source) = source else {
            return false;
        };

        let params = settings.kernel_parameters();
        self.kernel.set_threshold(params.threshold);
        self.kernel.set_behavior(params.behavior);
        self.kernel.set_weights(params.weights);
        let kernel_changed = self.kernel.take_stale();
        let changes = settings.take_changes();

        if !changes.any() && !kernel_changed && self.pipeline.is_some() {
            return false;
        }

        if params.weights.iter().all(|&w| w == 0.0) {
            warn!("All channel weights are zero; every pixel has OD 0");
        }

        let filter = FilterStage::new(Arc::clone(source), Arc::new(self.kernel.clone()));
        let filter_cache = Arc::new(CacheStage::new(Arc::new(filter), self.cache_capacity));
        let mut caches = vec![Arc::clone(&filter_cache)];
        let mut output: Arc<dyn TileFactory> = filter_cache;

        if let Some(region) = settings.region() {
            if region.bounding_rect().is_empty() {
                warn!("Region of interest is empty; output will be transparent");
            }
            let region_stage = RegionStage::new(output, region);
            let region_cache =
                Arc::new(CacheStage::new(Arc::new(region_stage), self.cache_capacity));
            caches.push(Arc::clone(&region_cache));
            output = region_cache;
        }

        self.generation += 1;
        info!(
            generation = self.generation,
            threshold = params.threshold,
            behavior = ?params.behavior,
            weights = ?params.weights,
            region = settings.region().is_some(),
            "Rebuilt threshold pipeline"
        );

        self.pipeline = Some(Pipeline {
            output,
            caches,
            generation: self.generation,
        });
        true
    }
}

// =============================================================================
// Tests
// =============================================================================
