//! Pipeline assembly integration tests.
//!
//! Tests verify:
//! - Parameter changes rebuild the chain with empty caches
//! - Unchanged parameters reuse the chain and its caches
//! - Region of interest clipping through the full chain
//! - Source failures propagate and are not cached

use std::sync::Arc;

use od_threshold::pipeline::{PipelineBuilder, ThresholdSettings, ThresholdType};
use od_threshold::slide::TileFactory;
use od_threshold::tile::{Point, Rect, RegionOfInterest, TileRequest};
use od_threshold::TileError;

use super::test_utils::{gray_ramp, solid_rgb, tracking};

fn full_request() -> TileRequest {
    TileRequest::new(0, Rect::new(0, 0, 8, 8))
}

// =============================================================================
// Rebuild Semantics
// =============================================================================

#[tokio::test]
async fn test_weight_change_repopulates_cache() {
    let source = tracking(solid_rgb(8, 8, [60, 120, 180]), 8);
    let dyn_source: Arc<dyn TileFactory> = source.clone();
    let mut settings = ThresholdSettings::new();
    let mut builder = PipelineBuilder::default();

    builder.build(Some(&dyn_source), &mut settings);
    let first = builder.pipeline().unwrap().output();
    first.tile(&full_request()).await.unwrap();
    first.tile(&full_request()).await.unwrap();
    assert_eq!(source.request_count(), 1);

    settings.set_weights([2.0, 1.0, 1.0]);
    assert!(builder.build(Some(&dyn_source), &mut settings));

    let pipeline = builder.pipeline().unwrap();
    assert_eq!(pipeline.generation(), 2);
    assert_eq!(pipeline.cache_stats().await[0].entries, 0);

    pipeline.output().tile(&full_request()).await.unwrap();
    assert_eq!(source.request_count(), 2);
    assert_eq!(pipeline.cache_stats().await[0].misses, 1);
}

#[tokio::test]
async fn test_unchanged_settings_keep_cache() {
    let source = tracking(gray_ramp(8, 8), 8);
    let dyn_source: Arc<dyn TileFactory> = source.clone();
    let mut settings = ThresholdSettings::new();
    let mut builder = PipelineBuilder::default();

    builder.build(Some(&dyn_source), &mut settings);
    builder
        .pipeline()
        .unwrap()
        .output()
        .tile(&full_request())
        .await
        .unwrap();

    // Same values again are not changes
    settings.set_threshold(20.0);
    settings.set_weights([1.0, 1.0, 1.0]);
    assert!(!builder.build(Some(&dyn_source), &mut settings));

    builder
        .pipeline()
        .unwrap()
        .output()
        .tile(&full_request())
        .await
        .unwrap();
    assert_eq!(source.request_count(), 1);
}

#[tokio::test]
async fn test_every_parameter_triggers_rebuild() {
    let source: Arc<dyn TileFactory> = tracking(gray_ramp(8, 8), 8);
    let mut settings = ThresholdSettings::new();
    let mut builder = PipelineBuilder::default();
    builder.build(Some(&source), &mut settings);

    settings.set_threshold(75.0);
    assert!(builder.build(Some(&source), &mut settings));

    settings.set_retention(0);
    assert!(builder.build(Some(&source), &mut settings));

    settings.set_threshold_type(ThresholdType::Average);
    assert!(builder.build(Some(&source), &mut settings));

    settings.set_weights([1.0, 0.5, 1.0]);
    assert!(builder.build(Some(&source), &mut settings));

    settings.set_region(Some(RegionOfInterest::Rectangle(Rect::new(0, 0, 2, 2))));
    assert!(builder.build(Some(&source), &mut settings));

    settings.set_display_area(od_threshold::DisplayArea::full(8, 8));
    assert!(builder.build(Some(&source), &mut settings));

    assert_eq!(builder.pipeline().unwrap().generation(), 7);
}

// =============================================================================
// Region of Interest
// =============================================================================

#[tokio::test]
async fn test_region_clips_thresholded_output() {
    let source: Arc<dyn TileFactory> = tracking(solid_rgb(8, 8, [255, 255, 255]), 8);
    let mut settings = ThresholdSettings::new();
    settings.set_threshold(0.0);
    settings.set_retention(0);
    settings.set_region(Some(RegionOfInterest::Polygon(vec![
        Point::new(2.0, 2.0),
        Point::new(5.0, 2.0),
        Point::new(4.0, 6.0),
    ])));

    let mut builder = PipelineBuilder::default();
    builder.build(Some(&source), &mut settings);
    let tile = builder
        .pipeline()
        .unwrap()
        .output()
        .tile(&full_request())
        .await
        .unwrap();

    // Bounding box of the triangle is (2, 2) .. (5, 6)
    assert_eq!(tile.pixel(1, 1), vec![0, 0, 0, 0]);
    assert_eq!(tile.pixel(2, 2), vec![255, 255, 255, 255]);
    assert_eq!(tile.pixel(4, 5), vec![255, 255, 255, 255]);
    assert_eq!(tile.pixel(5, 5), vec![0, 0, 0, 0]);
    assert_eq!(tile.pixel(4, 6), vec![0, 0, 0, 0]);
}

#[tokio::test]
async fn test_region_outside_skips_source() {
    let source = tracking(gray_ramp(8, 8), 4);
    let dyn_source: Arc<dyn TileFactory> = source.clone();
    let mut settings = ThresholdSettings::new();
    settings.set_region(Some(RegionOfInterest::Rectangle(Rect::new(0, 0, 4, 4))));

    let mut builder = PipelineBuilder::default();
    builder.build(Some(&dyn_source), &mut settings);
    let tile = builder
        .pipeline()
        .unwrap()
        .output()
        .tile(&TileRequest::new(0, Rect::new(4, 4, 4, 4)))
        .await
        .unwrap();

    assert!(tile.data().iter().all(|&b| b == 0));
    assert_eq!(source.request_count(), 0);
}

// =============================================================================
// Error Propagation
// =============================================================================

#[tokio::test]
async fn test_source_failure_is_not_cached() {
    let source = tracking(gray_ramp(8, 8), 8);
    let dyn_source: Arc<dyn TileFactory> = source.clone();
    let mut settings = ThresholdSettings::new();
    let mut builder = PipelineBuilder::default();
    builder.build(Some(&dyn_source), &mut settings);
    let output = builder.pipeline().unwrap().output();

    source.set_failing(true);
    let result = output.tile(&full_request()).await;
    assert!(matches!(result, Err(TileError::Source(_))));

    source.set_failing(false);
    assert!(output.tile(&full_request()).await.is_ok());
    assert_eq!(source.request_count(), 2);
}

#[tokio::test]
async fn test_invalid_request_errors() {
    let source: Arc<dyn TileFactory> = tracking(gray_ramp(8, 8), 8);
    let mut settings = ThresholdSettings::new();
    let mut builder = PipelineBuilder::default();
    builder.build(Some(&source), &mut settings);
    let output = builder.pipeline().unwrap().output();

    let result = output.tile(&TileRequest::new(5, Rect::new(0, 0, 1, 1))).await;
    assert!(matches!(result, Err(TileError::InvalidLevel { level: 5, .. })));

    let result = output.tile(&TileRequest::new(0, Rect::new(6, 6, 4, 4))).await;
    assert!(matches!(result, Err(TileError::RegionOutOfBounds { .. })));
}
