//! Optical density threshold kernel.
//!
//! Produces a retention mask from a source tile: each pixel's channels are
//! converted to optical density, combined into a weighted average, and
//! compared against a threshold. Retained pixels keep their (mapped) color;
//! everything else is black. The output is always fully opaque RGBA8.
//!
//! # Channel Mapping
//!
//! The weighted average is always taken over red, green and blue, in that
//! order. [`channel_mapping`] translates those three comparison channels to
//! source channel indices:
//!
//! | Source                     | Mapping     |
//! |----------------------------|-------------|
//! | Grayscale or one channel   | `[0, 0, 0]` |
//! | BGR / BGRA                 | `[2, 1, 0]` |
//! | anything else              | `[0, 1, 2]` |

use tracing::trace;

use crate::tile::{ChannelType, ColorModel, ColorSpace, Tile, TileBuffer};

use super::lookup::OpticalDensityLookup;

/// Number of channels that contribute to the weighted optical density.
pub const COMPARISON_CHANNELS: usize = 3;

/// Which side of the threshold is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Behavior {
    /// Keep pixels whose weighted OD is at or below the threshold (lighter pixels)
    RetainLower,
    /// Keep pixels whose weighted OD is at or above the threshold (darker pixels)
    RetainHigher,
    /// Keep nothing
    NoAction,
}

/// Parameters of a [`ThresholdKernel`].
#[derive(Debug, Clone, PartialEq)]
pub struct KernelParameters {
    /// Optical density threshold (already scaled to OD units)
    pub threshold: f64,

    /// Retention direction
    pub behavior: Behavior,

    /// Red, green and blue weights of the combined OD
    pub weights: [f64; COMPARISON_CHANNELS],
}

impl KernelParameters {
    /// Divisor of the weighted OD sum. Falls back to 1.0 when the weights
    /// sum to exactly zero, which makes the combined OD zero.
    pub fn weight_denominator(&self) -> f64 {
        let sum: f64 = self.weights.iter().sum();
        if sum == 0.0 {
            1.0
        } else {
            sum
        }
    }
}

/// Map the red, green and blue comparison channels to source channel indices.
pub fn channel_mapping(model: ColorModel, channels: usize) -> [usize; COMPARISON_CHANNELS] {
    if model == ColorModel::Grayscale || channels == 1 {
        [0, 0, 0]
    } else if model.is_reversed() {
        [2, 1, 0]
    } else {
        [0, 1, 2]
    }
}

/// Reduce a source sample to the 8-bit scale of the lookup table.
#[inline]
fn to_8bit(sample: u16, channel: ChannelType) -> u8 {
    match channel {
        ChannelType::UInt8 => sample as u8,
        ChannelType::UInt16 => (sample >> 8) as u8,
    }
}

// =============================================================================
// Threshold Kernel
// =============================================================================

/// Thresholds tiles by weighted optical density.
///
/// Setters are value-compared: assigning the current value is a no-op,
/// anything else updates the parameter and marks the kernel stale so the
/// owner knows tiles computed with the old parameters are invalid.
#[derive(Debug, Clone)]
pub struct ThresholdKernel {
    params: KernelParameters,
    stale: bool,
}

impl ThresholdKernel {
    /// Create a kernel. A new kernel is not stale.
    pub fn new(threshold: f64, behavior: Behavior, weights: [f64; COMPARISON_CHANNELS]) -> Self {
        Self {
            params: KernelParameters {
                threshold,
                behavior,
                weights,
            },
            stale: false,
        }
    }

    /// Create a kernel that averages red, green and blue equally.
    pub fn with_equal_weights(threshold: f64, behavior: Behavior) -> Self {
        Self::new(threshold, behavior, [1.0; COMPARISON_CHANNELS])
    }

    pub fn parameters(&self) -> &KernelParameters {
        &self.params
    }

    /// Set the OD threshold. Returns whether the value changed.
    pub fn set_threshold(&mut self, threshold: f64) -> bool {
        if self.params.threshold == threshold {
            return false;
        }
        self.params.threshold = threshold;
        self.stale = true;
        true
    }

    /// Set the retention direction. Returns whether the value changed.
    pub fn set_behavior(&mut self, behavior: Behavior) -> bool {
        if self.params.behavior == behavior {
            return false;
        }
        self.params.behavior = behavior;
        self.stale = true;
        true
    }

    /// Set the channel weights. Returns whether any weight changed.
    pub fn set_weights(&mut self, weights: [f64; COMPARISON_CHANNELS]) -> bool {
        if self.params.weights == weights {
            return false;
        }
        self.params.weights = weights;
        self.stale = true;
        true
    }

    /// Whether a parameter changed since the last [`take_stale`](Self::take_stale).
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Read and clear the stale flag.
    pub fn take_stale(&mut self) -> bool {
        std::mem::take(&mut self.stale)
    }

    /// Color space of every tile this kernel produces.
    pub fn output_color_space(&self) -> ColorSpace {
        ColorSpace::rgba8()
    }

    /// Apply the threshold to `source`, returning a new RGBA8 tile of the
    /// same size and pixel order.
    ///
    /// # Panics
    ///
    /// Panics if the channel mapping refers to a channel the source does not
    /// have, which means the source's color model and channel count disagree.
    pub fn process(&self, source: &Tile) -> Tile {
        let color_space = source.color_space();
        let source_channels = source.channels();
        let mapping = channel_mapping(color_space.model, source_channels);
        for &channel in &mapping {
            assert!(
                channel < source_channels,
                "channel mapping {mapping:?} out of range for {source_channels}-channel source {color_space:?}"
            );
        }

        let order = source.order();
        let num_pixels = source.pixel_count();
        let output_space = self.output_color_space();
        let output_channels = output_space.channels();
        let alpha_channel = output_channels - 1;
        let opaque = output_space.max_channel_value();

        let mut output = TileBuffer::new_filled(
            source.width(),
            source.height(),
            output_space,
            order,
            0,
        );

        let lookup = OpticalDensityLookup::shared();
        let weights = self.params.weights;
        let denominator = self.params.weight_denominator();
        let threshold = self.params.threshold;
        let behavior = self.params.behavior;

        let mut retained = 0usize;
        for pixel in 0..num_pixels {
            let mut values = [0u8; COMPARISON_CHANNELS];
            let mut weighted = 0.0;
            for (ch, &src_ch) in mapping.iter().enumerate() {
                let index = order.sample_index(pixel, src_ch, source_channels, num_pixels);
                let value = to_8bit(source.sample(index), color_space.channel);
                values[ch] = value;
                weighted += weights[ch] * lookup.convert(value);
            }
            let od = weighted / denominator;

            let retain = match behavior {
                Behavior::RetainLower => od <= threshold,
                Behavior::RetainHigher => od >= threshold,
                Behavior::NoAction => false,
            };

            if retain {
                retained += 1;
                for (ch, &value) in values.iter().enumerate() {
                    let index = order.sample_index(pixel, ch, output_channels, num_pixels);
                    output.set_sample(index, value as u16);
                }
            }

            let alpha = order.sample_index(pixel, alpha_channel, output_channels, num_pixels);
            output.set_sample(alpha, opaque);
        }

        trace!(
            width = source.width(),
            height = source.height(),
            retained,
            "Thresholded tile"
        );

        output.freeze()
    }
}

// =============================================================================
// Tests
// =============================================================================
