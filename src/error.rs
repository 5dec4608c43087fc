use thiserror::Error;

use crate::tile::{ColorSpace, Rect};

/// Errors that can occur while producing a tile anywhere in the pipeline.
///
/// Invariant violations between the image source and the threshold kernel
/// (unknown pixel layout, channel mapping past the source's channel count)
/// are not represented here: they panic, since no tile computed under them
/// can be trusted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TileError {
    /// Requested pyramid level does not exist
    #[error("Invalid level {level}: slide has {max_levels} levels")]
    InvalidLevel { level: usize, max_levels: usize },

    /// Requested region extends beyond the level bounds
    #[error("Region {region:?} out of bounds for level {level} ({width}x{height})")]
    RegionOutOfBounds {
        level: usize,
        region: Rect,
        width: u32,
        height: u32,
    },

    /// Sample buffer length does not match the tile geometry
    #[error("Buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSize { expected: usize, actual: usize },

    /// Two tiles that must share a color space do not
    #[error("Color space mismatch: expected {expected:?}, got {actual:?}")]
    ColorSpaceMismatch {
        expected: ColorSpace,
        actual: ColorSpace,
    },

    /// Operation requires a color space this tile does not have
    #[error("Unsupported color space: {0:?}")]
    UnsupportedColorSpace(ColorSpace),

    /// Error reported by the underlying image source
    #[error("Source error: {0}")]
    Source(String),

    /// The runtime dropped a tile computation before it finished
    #[error("Tile computation cancelled")]
    Cancelled,
}
