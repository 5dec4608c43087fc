//! Slide abstraction layer.
//!
//! This module defines the [`TileFactory`] interface shared by image sources
//! and pipeline stages, plus an in-memory pyramidal source.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        Pipeline stages (filter,         │
//! │        region, cache)                   │
//! └────────────────────┬────────────────────┘
//!                      │ TileFactory
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │           TileFactory Trait             │
//! │  (level metadata + tile(request))       │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │            InMemorySlide                │
//! │  (pyramid built from a decoded image)   │
//! └─────────────────────────────────────────┘
//! ```

mod factory;
mod memory;

pub use factory::{validate_request, LevelInfo, TileFactory};
pub use memory::{InMemorySlide, DEFAULT_TILE_SIZE};
