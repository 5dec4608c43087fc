//! Tile data model and caching.
//!
//! This module holds the pieces every pipeline stage exchanges: raw pixel
//! tiles with their color-space metadata, the request descriptor that names
//! a tile, the geometry used to describe regions, and the LRU tile cache.
//!
//! # Components
//!
//! - [`Tile`]: Immutable raw samples plus color space and pixel order
//! - [`TileBuffer`]: Mutable form of a tile, frozen once written
//! - [`TileRequest`]: Pyramid level + region; identifies a tile and keys the cache
//! - [`Rect`], [`Point`], [`RegionOfInterest`]: Pixel-space geometry
//! - [`TileCache`]: Bounded LRU cache with recency-of-access eviction

mod cache;
mod geometry;
mod raw;

pub use cache::{TileCache, DEFAULT_TILE_CACHE_CAPACITY};
pub use geometry::{Point, Rect, RegionOfInterest};
pub use raw::{ChannelType, ColorModel, ColorSpace, PixelOrder, Tile, TileBuffer, TileRequest};
