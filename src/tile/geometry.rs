//! Pixel-space geometry shared by tile requests and regions of interest.

use serde::Serialize;

// =============================================================================
// Rect
// =============================================================================

/// An axis-aligned rectangle in the pixel space of one pyramid level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Rect {
    /// Left edge (inclusive)
    pub x: u32,

    /// Top edge (inclusive)
    pub y: u32,

    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,
}

impl Rect {
    /// Create a new rectangle.
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle from its edges. Inverted edges give an empty rect.
    pub fn from_bounds(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            x: left,
            y: top,
            width: right.saturating_sub(left),
            height: bottom.saturating_sub(top),
        }
    }

    /// Right edge (exclusive), saturating at `u32::MAX`.
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Bottom edge (exclusive), saturating at `u32::MAX`.
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    /// Whether both far edges are representable in `u32`.
    pub fn edges_fit(&self) -> bool {
        self.x.checked_add(self.width).is_some() && self.y.checked_add(self.height).is_some()
    }

    /// Number of pixels covered.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Check whether `other` lies entirely inside this rectangle.
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Overlap of two rectangles, or `None` when they do not overlap.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        let rect = Rect::from_bounds(left, top, right, bottom);
        if rect.is_empty() {
            None
        } else {
            Some(rect)
        }
    }

    /// Map a level-0 rectangle into a level with the given downsample factor.
    ///
    /// The origin is floored and the far edge ceiled, so the result always
    /// covers every level pixel touched by the original rectangle.
    pub fn scaled(&self, downsample: f64) -> Rect {
        if downsample == 1.0 {
            return *self;
        }
        let left = (self.x as f64 / downsample).floor() as u32;
        let top = (self.y as f64 / downsample).floor() as u32;
        let right = (self.right() as f64 / downsample).ceil() as u32;
        let bottom = (self.bottom() as f64 / downsample).ceil() as u32;
        Rect::from_bounds(left, top, right, bottom)
    }
}

// =============================================================================
// Region of Interest
// =============================================================================

/// A point in level-0 pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Geometric constraint on the area a pipeline may produce.
///
/// Coordinates are in level-0 pixel space. Only the bounding box is used for
/// clipping, so disconnected or concave shapes never need special handling.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionOfInterest {
    Rectangle(Rect),
    Polygon(Vec<Point>),
}

impl RegionOfInterest {
    /// Smallest integer rectangle containing the region.
    ///
    /// Negative coordinates are clamped to zero. A polygon with no vertices
    /// has an empty bounding box.
    pub fn bounding_rect(&self) -> Rect {
        match self {
            RegionOfInterest::Rectangle(rect) => *rect,
            RegionOfInterest::Polygon(points) => {
                if points.is_empty() {
                    return Rect::default();
                }
                let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
                let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
                for p in points {
                    min_x = min_x.min(p.x);
                    min_y = min_y.min(p.y);
                    max_x = max_x.max(p.x);
                    max_y = max_y.max(p.y);
                }
                let clamp = |v: f64| v.max(0.0);
                Rect::from_bounds(
                    clamp(min_x.floor()) as u32,
                    clamp(min_y.floor()) as u32,
                    clamp(max_x.ceil()) as u32,
                    clamp(max_y.ceil()) as u32,
                )
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
