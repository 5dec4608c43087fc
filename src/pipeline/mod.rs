//! Lazy tile pipeline.
//!
//! Stages implement [`TileFactory`](crate::slide::TileFactory) and wrap their
//! upstream, so a request entering the last stage travels up the chain until
//! a cache answers it or the source is reached.
//!
//! - [`FilterStage`]: thresholds upstream tiles
//! - [`RegionStage`]: clips output to a region of interest
//! - [`CacheStage`]: LRU memoization with one computation per key in flight
//! - [`PipelineBuilder`]: assembles the chain and rebuilds it on parameter change

mod builder;
mod cache;
mod filter;
mod region;
mod settings;

pub use builder::{Pipeline, PipelineBuilder};
pub use cache::{CacheStage, CacheStats};
pub use filter::FilterStage;
pub use region::RegionStage;
pub use settings::{
    behavior_for_option, Changes, DisplayArea, ThresholdSettings, ThresholdType, Tracked,
    DEFAULT_RETENTION, DEFAULT_THRESHOLD, MAX_THRESHOLD, MAX_WEIGHT, RETENTION_OPTIONS,
};
