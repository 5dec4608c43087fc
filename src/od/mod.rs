//! Optical density conversion and thresholding.
//!
//! - [`OpticalDensityLookup`]: Precomputed 8-bit intensity → OD table, shared process-wide
//! - [`ThresholdKernel`]: Turns a source tile into an opaque RGBA retention mask

mod kernel;
mod lookup;

pub use kernel::{channel_mapping, Behavior, KernelParameters, ThresholdKernel, COMPARISON_CHANNELS};
pub use lookup::{
    intensity_to_od, od_to_intensity, OpticalDensityLookup, MAX_INTENSITY, MIN_INTENSITY,
    TABLE_SIZE,
};
