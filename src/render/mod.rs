//! Rendering on top of the tile pipeline.
//!
//! - [`Compositor`]: stitches grid tiles into an image of any region and size
//! - [`OdThresholdAlgorithm`]: keeps the pipeline current and renders the display area

mod algorithm;
mod compositor;

pub use algorithm::{OdThresholdAlgorithm, RunOutcome};
pub use compositor::{to_rgba_image, Compositor};
