//! Threshold kernel integration tests.
//!
//! Tests verify:
//! - The grayscale 2x2 scenario through a full pipeline
//! - BGR and RGB sources of the same color produce the same mask
//! - Zero weights and negative thresholds
//! - Every output alpha is opaque

use std::sync::Arc;

use od_threshold::od::{Behavior, OpticalDensityLookup, ThresholdKernel};
use od_threshold::pipeline::{PipelineBuilder, ThresholdSettings};
use od_threshold::slide::TileFactory;
use od_threshold::tile::{ChannelType, ColorModel, ColorSpace, PixelOrder, Rect, Tile, TileRequest};

use super::test_utils::{gray_2x2, gray_ramp, solid_rgb, tracking};

// =============================================================================
// End-to-End Scenario
// =============================================================================

#[tokio::test]
async fn test_gray_scenario_through_pipeline() {
    let source: Arc<dyn TileFactory> = tracking(gray_2x2(), 256);
    let mut settings = ThresholdSettings::new();
    settings.set_threshold(50.0);
    settings.set_retention(0);
    settings.set_weights([1.0, 1.0, 1.0]);

    let mut builder = PipelineBuilder::default();
    assert!(builder.build(Some(&source), &mut settings));

    let output = builder.pipeline().unwrap().output();
    let tile = output
        .tile(&TileRequest::new(0, Rect::new(0, 0, 2, 2)))
        .await
        .unwrap();

    assert_eq!(tile.color_space(), ColorSpace::rgba8());
    assert_eq!(tile.pixel(0, 0), vec![0, 0, 0, 255]);
    assert_eq!(tile.pixel(1, 0), vec![128, 128, 128, 255]);
    assert_eq!(tile.pixel(0, 1), vec![200, 200, 200, 255]);
    assert_eq!(tile.pixel(1, 1), vec![255, 255, 255, 255]);
}

#[tokio::test]
async fn test_retain_higher_keeps_dark_pixels() {
    let source: Arc<dyn TileFactory> = tracking(gray_2x2(), 256);
    let mut settings = ThresholdSettings::new();
    settings.set_threshold(20.0);
    settings.set_retention(1);

    let mut builder = PipelineBuilder::default();
    builder.build(Some(&source), &mut settings);
    let tile = builder
        .pipeline()
        .unwrap()
        .output()
        .tile(&TileRequest::new(0, Rect::new(0, 0, 2, 2)))
        .await
        .unwrap();

    // OD: 0 -> ~8.4, 128 -> ~0.30, 200 -> ~0.11, 255 -> 0
    assert_eq!(tile.pixel(0, 0), vec![0, 0, 0, 255]);
    assert_eq!(tile.pixel(1, 0), vec![128, 128, 128, 255]);
    assert_eq!(tile.pixel(0, 1), vec![0, 0, 0, 255]);
    assert_eq!(tile.pixel(1, 1), vec![0, 0, 0, 255]);
}

// =============================================================================
// Kernel Properties
// =============================================================================

#[test]
fn test_bgr_matches_rgb() {
    let kernel = ThresholdKernel::new(0.1, Behavior::RetainHigher, [3.0, 1.0, 0.0]);

    let rgb = solid_rgb(3, 3, [40, 120, 220]);
    let bgr_data: Vec<u8> = (0..9).flat_map(|_| [220u8, 120, 40]).collect();
    let bgr = Tile::from_samples(
        3,
        3,
        ColorSpace::new(ColorModel::Bgr, ChannelType::UInt8),
        PixelOrder::Interleaved,
        bgr_data,
    )
    .unwrap();

    let from_rgb = kernel.process(&rgb);
    let from_bgr = kernel.process(&bgr);
    assert_eq!(from_rgb.data(), from_bgr.data());
    assert_eq!(from_rgb.pixel(1, 1), vec![40, 120, 220, 255]);
}

#[test]
fn test_zero_weights_make_od_zero() {
    let tile = gray_ramp(16, 4);

    let keep_all = ThresholdKernel::new(0.0, Behavior::RetainLower, [0.0; 3]).process(&tile);
    for pixel in 0..tile.pixel_count() {
        assert_eq!(keep_all.sample(pixel * 4), tile.sample(pixel));
    }

    let keep_none = ThresholdKernel::new(-0.01, Behavior::RetainLower, [0.0; 3]).process(&tile);
    for pixel in 0..tile.pixel_count() {
        assert_eq!(keep_none.pixel((pixel % 16) as u32, (pixel / 16) as u32), vec![0, 0, 0, 255]);
    }
}

#[test]
fn test_alpha_always_opaque() {
    let tile = gray_ramp(300, 2);
    for behavior in [Behavior::RetainLower, Behavior::RetainHigher, Behavior::NoAction] {
        let output = ThresholdKernel::with_equal_weights(0.3, behavior).process(&tile);
        for pixel in 0..output.pixel_count() {
            assert_eq!(output.sample(pixel * 4 + 3), 255);
        }
    }
}

#[test]
fn test_threshold_boundary_matches_lookup() {
    let lookup = OpticalDensityLookup::shared();
    let threshold = (lookup.convert(99) + lookup.convert(100)) / 2.0;
    let tile = gray_ramp(256, 1);

    let output = ThresholdKernel::with_equal_weights(threshold, Behavior::RetainLower).process(&tile);
    // OD falls as intensity rises: intensities from 100 upward are retained
    assert_eq!(output.pixel(99, 0), vec![0, 0, 0, 255]);
    assert_eq!(output.pixel(100, 0), vec![100, 100, 100, 255]);
    assert_eq!(output.pixel(255, 0), vec![255, 255, 255, 255]);
    assert_eq!(lookup.intensity_for_od(threshold), 100);
}
