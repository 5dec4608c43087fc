//! Change-tracked algorithm parameters.
//!
//! Every parameter remembers whether it changed since it was last consumed.
//! The builder consumes those flags to decide whether the pipeline has to be
//! rebuilt.

use serde::Serialize;

use crate::od::{Behavior, KernelParameters};
use crate::tile::{Rect, RegionOfInterest};

/// Default threshold in user units (OD x 100).
pub const DEFAULT_THRESHOLD: f64 = 20.0;

/// Largest accepted threshold in user units.
pub const MAX_THRESHOLD: f64 = 300.0;

/// Largest accepted channel weight.
pub const MAX_WEIGHT: f64 = 10.0;

/// Labels of the selectable retention options, in option-index order.
pub const RETENTION_OPTIONS: [&str; 2] = ["Lower OD", "Higher OD"];

/// Option index selected when nothing else is chosen.
pub const DEFAULT_RETENTION: usize = 1;

/// Map a retention option index to a kernel behavior.
///
/// Indices past the selectable options fall back to [`Behavior::NoAction`].
pub fn behavior_for_option(option: usize) -> Behavior {
    match option {
        0 => Behavior::RetainLower,
        1 => Behavior::RetainHigher,
        _ => Behavior::NoAction,
    }
}

// =============================================================================
// Tracked
// =============================================================================

/// A value that remembers whether it changed since last checked.
#[derive(Debug, Clone)]
pub struct Tracked<T> {
    value: T,
    changed: bool,
}

impl<T: PartialEq> Tracked<T> {
    /// New values start out changed so the first build sees them.
    pub fn new(value: T) -> Self {
        Self {
            value,
            changed: true,
        }
    }

    /// Replace the value; marks it changed only if it differs.
    pub fn set(&mut self, value: T) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        self.changed = true;
        true
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Read and clear the changed flag.
    pub fn take_changed(&mut self) -> bool {
        std::mem::replace(&mut self.changed, false)
    }
}

// =============================================================================
// Parameter types
// =============================================================================

/// How channel ODs are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdType {
    /// Plain mean of the three channels; user weights are ignored
    Average,

    /// Mean weighted by the user's R/G/B weights
    #[default]
    WeightedAverage,
}

/// The level-0 region to display and the size to render it at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DisplayArea {
    pub source_region: Rect,
    pub output_size: (u32, u32),
}

impl DisplayArea {
    pub fn new(source_region: Rect, output_size: (u32, u32)) -> Self {
        Self {
            source_region,
            output_size,
        }
    }

    /// Show the full image at full resolution.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(Rect::new(0, 0, width, height), (width, height))
    }
}

/// Which parameters changed since the previous build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Changes {
    pub threshold: bool,
    pub retention: bool,
    pub threshold_type: bool,
    pub weights: bool,
    pub region: bool,
    pub display_area: bool,
}

impl Changes {
    pub fn any(&self) -> bool {
        self.threshold
            || self.retention
            || self.threshold_type
            || self.weights
            || self.region
            || self.display_area
    }
}

// =============================================================================
// ThresholdSettings
// =============================================================================

/// User-facing parameters of the OD threshold algorithm.
///
/// Values are clamped on the way in: the threshold to `[0, MAX_THRESHOLD]`
/// and weights to `[0, MAX_WEIGHT]`. NaN inputs become 0.
#[derive(Debug, Clone)]
pub struct ThresholdSettings {
    threshold: Tracked<f64>,
    retention: Tracked<usize>,
    threshold_type: Tracked<ThresholdType>,
    red_weight: Tracked<f64>,
    green_weight: Tracked<f64>,
    blue_weight: Tracked<f64>,
    region: Tracked<Option<RegionOfInterest>>,
    display_area: Tracked<Option<DisplayArea>>,
}

impl Default for ThresholdSettings {
    fn default() -> Self {
        Self {
            threshold: Tracked::new(DEFAULT_THRESHOLD),
            retention: Tracked::new(DEFAULT_RETENTION),
            threshold_type: Tracked::new(ThresholdType::default()),
            red_weight: Tracked::new(1.0),
            green_weight: Tracked::new(1.0),
            blue_weight: Tracked::new(1.0),
            region: Tracked::new(None),
            display_area: Tracked::new(None),
        }
    }
}

fn clamp(value: f64, max: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, max)
    }
}

impl ThresholdSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Threshold in user units (OD x 100).
    pub fn threshold(&self) -> f64 {
        *self.threshold.get()
    }

    pub fn set_threshold(&mut self, value: f64) -> bool {
        self.threshold.set(clamp(value, MAX_THRESHOLD))
    }

    /// Selected retention option index.
    pub fn retention(&self) -> usize {
        *self.retention.get()
    }

    pub fn set_retention(&mut self, option: usize) -> bool {
        self.retention.set(option)
    }

    pub fn behavior(&self) -> Behavior {
        behavior_for_option(self.retention())
    }

    pub fn threshold_type(&self) -> ThresholdType {
        *self.threshold_type.get()
    }

    pub fn set_threshold_type(&mut self, threshold_type: ThresholdType) -> bool {
        self.threshold_type.set(threshold_type)
    }

    /// User weights as `[red, green, blue]`.
    pub fn weights(&self) -> [f64; 3] {
        [
            *self.red_weight.get(),
            *self.green_weight.get(),
            *self.blue_weight.get(),
        ]
    }

    /// Set all three weights; returns whether any of them changed.
    pub fn set_weights(&mut self, [red, green, blue]: [f64; 3]) -> bool {
        // No short-circuit: every weight must be applied
        self.red_weight.set(clamp(red, MAX_WEIGHT))
            | self.green_weight.set(clamp(green, MAX_WEIGHT))
            | self.blue_weight.set(clamp(blue, MAX_WEIGHT))
    }

    pub fn region(&self) -> Option<&RegionOfInterest> {
        self.region.get().as_ref()
    }

    pub fn set_region(&mut self, region: Option<RegionOfInterest>) -> bool {
        self.region.set(region)
    }

    pub fn display_area(&self) -> Option<DisplayArea> {
        *self.display_area.get()
    }

    pub fn set_display_area(&mut self, area: DisplayArea) -> bool {
        self.display_area.set(Some(area))
    }

    /// Whether the display area changed, without consuming the flag.
    pub fn display_area_changed(&self) -> bool {
        self.display_area.is_changed()
    }

    /// Parameters handed to the kernel.
    ///
    /// The threshold is scaled from user units down to OD.
    pub fn kernel_parameters(&self) -> KernelParameters {
        let weights = match self.threshold_type() {
            ThresholdType::Average => [1.0; 3],
            ThresholdType::WeightedAverage => self.weights(),
        };
        KernelParameters {
            threshold: self.threshold() / 100.0,
            behavior: self.behavior(),
            weights,
        }
    }

    /// Read and clear every changed flag.
    pub fn take_changes(&mut self) -> Changes {
        Changes {
            threshold: self.threshold.take_changed(),
            retention: self.retention.take_changed(),
            threshold_type: self.threshold_type.take_changed(),
            weights: self.red_weight.take_changed()
                | self.green_weight.take_changed()
                | self.blue_weight.take_changed(),
            region: self.region.take_changed(),
            display_area: self.display_area.take_changed(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
