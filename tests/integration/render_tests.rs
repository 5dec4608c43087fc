//! Rendering integration tests.
//!
//! Tests verify:
//! - Compositor stitches pipeline tiles across tile and level boundaries
//! - Repeated renders reuse grid-aligned cache entries
//! - The algorithm driver renders, idles, re-renders on change and stops

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use od_threshold::pipeline::DisplayArea;
use od_threshold::render::{Compositor, OdThresholdAlgorithm};
use od_threshold::slide::{InMemorySlide, TileFactory};
use od_threshold::tile::{Rect, RegionOfInterest};

use super::test_utils::{gray_2x2, gray_ramp, solid_rgb, TrackingSource};

// =============================================================================
// Compositor
// =============================================================================

#[tokio::test]
async fn test_render_matches_kernel_output() {
    let source = Arc::new(TrackingSource::new(gray_ramp(40, 24), 16));
    let mut algorithm = OdThresholdAlgorithm::default();
    algorithm.init(source.clone());
    algorithm.settings_mut().set_threshold(0.0);
    algorithm.settings_mut().set_retention(0);

    let outcome = algorithm.run(&AtomicBool::new(false)).await.unwrap();
    let image = outcome.display.unwrap();
    assert_eq!(image.dimensions(), (40, 24));

    // Only intensity 255 has OD 0; nothing in a 0..40 ramp reaches it
    for (x, y, pixel) in image.enumerate_pixels() {
        assert_eq!(pixel.0, [0, 0, 0, 255], "pixel ({}, {})", x, y);
    }

    // 3 x 2 grid at level 0
    assert_eq!(source.request_count(), 6);
}

#[tokio::test]
async fn test_repeated_render_hits_cache() {
    let source = Arc::new(TrackingSource::new(gray_ramp(64, 64), 16));
    let mut algorithm = OdThresholdAlgorithm::default();
    algorithm.init(source.clone());

    let stop = AtomicBool::new(false);
    algorithm.run(&stop).await.unwrap();
    let first_reads = source.request_count();
    assert_eq!(first_reads, 16);

    // Moving the display area rebuilds the pipeline
    algorithm
        .settings_mut()
        .set_display_area(DisplayArea::new(Rect::new(5, 5, 20, 20), (20, 20)));
    let outcome = algorithm.run(&stop).await.unwrap();
    assert!(outcome.rebuilt);
    assert!(outcome.display.is_some());

    // Rebuild discarded the caches, so the 2 x 2 covering tiles are read again
    assert_eq!(source.request_count(), first_reads + 4);

    // Any render within those grid tiles is now served from the cache
    let compositor = Compositor::new(algorithm.pipeline().unwrap().output());
    compositor
        .get_image(Rect::new(0, 0, 32, 32), (32, 32))
        .await
        .unwrap();
    assert_eq!(source.request_count(), first_reads + 4);
}

#[tokio::test]
async fn test_downsampled_render_uses_pyramid() {
    let slide = Arc::new(InMemorySlide::new(solid_rgb(64, 64, [10, 10, 10]), 16));
    let mut algorithm = OdThresholdAlgorithm::default();
    algorithm.init(slide.clone());
    algorithm
        .settings_mut()
        .set_display_area(DisplayArea::new(Rect::new(0, 0, 64, 64), (16, 16)));

    let outcome = algorithm.run(&AtomicBool::new(false)).await.unwrap();
    let image = outcome.display.unwrap();
    assert_eq!(image.dimensions(), (16, 16));
    // Dark pixels have high OD and the default keeps the higher side
    assert_eq!(image.get_pixel(8, 8).0, [10, 10, 10, 255]);
    // The 16x16 top level is a single tile
    assert_eq!(slide.read_count(), 1);
}

// =============================================================================
// Algorithm Driver
// =============================================================================

#[tokio::test]
async fn test_region_render_and_clipping() {
    let source: Arc<dyn TileFactory> = Arc::new(TrackingSource::new(gray_2x2(), 256));
    let mut algorithm = OdThresholdAlgorithm::default();
    algorithm.init(source);
    algorithm.settings_mut().set_threshold(50.0);
    algorithm.settings_mut().set_retention(0);
    algorithm
        .settings_mut()
        .set_region(Some(RegionOfInterest::Rectangle(Rect::new(1, 0, 1, 2))));

    let outcome = algorithm.run(&AtomicBool::new(false)).await.unwrap();
    let display = outcome.display.unwrap();
    assert_eq!(display.get_pixel(0, 0).0, [0, 0, 0, 0]);
    assert_eq!(display.get_pixel(1, 0).0, [128, 128, 128, 255]);
    assert_eq!(display.get_pixel(0, 1).0, [0, 0, 0, 0]);
    assert_eq!(display.get_pixel(1, 1).0, [255, 255, 255, 255]);

    let region = outcome.region.unwrap();
    assert_eq!(region.dimensions(), (2, 2));
    assert_eq!(region.get_pixel(0, 1).0, [255, 255, 255, 255]);
}

#[tokio::test]
async fn test_stop_releases_and_next_run_rebuilds() {
    let source: Arc<dyn TileFactory> = Arc::new(TrackingSource::new(gray_2x2(), 256));
    let mut algorithm = OdThresholdAlgorithm::default();
    algorithm.init(source);

    let outcome = algorithm.run(&AtomicBool::new(true)).await.unwrap();
    assert!(outcome.display.is_none());
    assert!(algorithm.pipeline().is_none());

    let outcome = algorithm.run(&AtomicBool::new(false)).await.unwrap();
    assert!(outcome.rebuilt);
    assert!(outcome.display.is_some());
}
