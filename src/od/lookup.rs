//! Intensity to optical density conversion.
//!
//! Optical density of a transmitted-light channel value `i` on an 8-bit scale
//! is `-log10(i / 255)`. The logarithm is evaluated once per intensity when
//! the table is built; every later conversion is an array read.

use std::sync::OnceLock;

/// Maximum value of the 8-bit intensity scale.
pub const MAX_INTENSITY: u8 = u8::MAX;

/// Number of entries in the lookup table (one per 8-bit intensity).
pub const TABLE_SIZE: usize = MAX_INTENSITY as usize + 1;

/// Intensity substituted for zero so that `log10(0)` is never taken.
pub const MIN_INTENSITY: f64 = 1e-6;

/// Convert an intensity on the 0-255 scale to optical density.
///
/// Zero (or below) is treated as [`MIN_INTENSITY`], giving a large finite OD
/// rather than infinity. Intensities above the scale clamp to an OD of 0.
pub fn intensity_to_od(intensity: f64) -> f64 {
    let scale_max = MAX_INTENSITY as f64;
    let intensity = if intensity <= 0.0 {
        MIN_INTENSITY
    } else {
        intensity
    };
    let od = -(intensity / scale_max).log10();
    od.max(0.0)
}

/// Convert an optical density back to the nearest intensity on the 0-255 scale.
pub fn od_to_intensity(od: f64) -> f64 {
    let scale_max = MAX_INTENSITY as f64;
    let od = od.max(0.0);
    (scale_max * 10f64.powf(-od)).round().clamp(0.0, scale_max)
}

/// Precomputed intensity → optical density table.
///
/// The process-wide instance from [`OpticalDensityLookup::shared`] is built
/// on first use and read concurrently without locking afterwards.
#[derive(Debug, Clone)]
pub struct OpticalDensityLookup {
    table: [f64; TABLE_SIZE],
}

impl OpticalDensityLookup {
    /// Build a new table.
    pub fn new() -> Self {
        let mut table = [0.0; TABLE_SIZE];
        for (intensity, od) in table.iter_mut().enumerate() {
            *od = intensity_to_od(intensity as f64);
        }
        Self { table }
    }

    /// The shared, lazily built table.
    pub fn shared() -> &'static OpticalDensityLookup {
        static TABLE: OnceLock<OpticalDensityLookup> = OnceLock::new();
        TABLE.get_or_init(OpticalDensityLookup::new)
    }

    /// Optical density of an 8-bit intensity.
    #[inline]
    pub fn convert(&self, intensity: u8) -> f64 {
        self.table[intensity as usize]
    }

    /// Smallest intensity whose optical density does not exceed `od`.
    ///
    /// The table is monotonically non-increasing, so this is a binary search.
    pub fn intensity_for_od(&self, od: f64) -> u8 {
        let index = self.table.partition_point(|&value| value > od);
        index.min(MAX_INTENSITY as usize) as u8
    }
}

impl Default for OpticalDensityLookup {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
