//! Tile cache for computed pipeline tiles.
//!
//! This module provides a bounded LRU cache of [`Tile`]s keyed by the
//! [`TileRequest`] that produced them, so a repeated request for the same
//! region and level never recomputes the tile.
//!
//! # Cache Key
//!
//! Tiles are cached by the full request descriptor:
//! - Pyramid level
//! - Region (origin and size in that level's pixel space)
//!
//! # Count-Based Eviction
//!
//! Capacity is a fixed number of entries chosen at construction. When the
//! cache is full, inserting a new key evicts the least-recently *accessed*
//! entry; both `get` hits and `put` count as an access.

use std::num::NonZeroUsize;

use lru::LruCache;
use tokio::sync::RwLock;

use super::raw::{Tile, TileRequest};

/// Default cache capacity: 30 tiles
pub const DEFAULT_TILE_CACHE_CAPACITY: usize = 30;

// =============================================================================
// Tile Cache
// =============================================================================

/// LRU cache of computed tiles with a fixed entry capacity.
///
/// # Thread Safety
///
/// The cache is thread-safe and can be shared across async tasks via `Arc`.
///
/// # Example
///
/// ```
/// use od_threshold::tile::{
///     ColorSpace, PixelOrder, Rect, Tile, TileCache, TileRequest,
/// };
///
/// #[tokio::main]
/// async fn main() {
///     let cache = TileCache::with_capacity(30);
///
///     let key = TileRequest::new(0, Rect::new(0, 0, 256, 256));
///     let tile = Tile::new_filled(256, 256, ColorSpace::rgba8(), PixelOrder::Interleaved, 0);
///
///     cache.put(key, tile.clone()).await;
///     assert_eq!(cache.get(&key).await, Some(tile));
/// }
/// ```
pub struct TileCache {
    /// The underlying LRU cache
    cache: RwLock<LruCache<TileRequest, Tile>>,

    /// Maximum number of entries
    capacity: usize,
}

impl TileCache {
    /// Create a new tile cache with the default capacity (30 tiles).
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_TILE_CACHE_CAPACITY)
    }

    /// Create a new tile cache holding at most `capacity` tiles.
    ///
    /// A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: RwLock::new(LruCache::new(capacity)),
            capacity: capacity.get(),
        }
    }

    /// Get a tile from the cache.
    ///
    /// Returns `Some(tile)` if the tile is cached, `None` otherwise.
    /// This operation marks the entry as recently used.
    pub async fn get(&self, key: &TileRequest) -> Option<Tile> {
        let mut cache = self.cache.write().await;
        cache.get(key).cloned()
    }

    /// Check if a tile is in the cache without updating LRU order.
    pub async fn contains(&self, key: &TileRequest) -> bool {
        let cache = self.cache.read().await;
        cache.contains(key)
    }

    /// Store a tile in the cache.
    ///
    /// If the key is new and the cache is full, the least-recently-used
    /// entry is evicted and its key returned. If the key already exists, its
    /// tile is replaced and marked as recently used.
    pub async fn put(&self, key: TileRequest, tile: Tile) -> Option<TileRequest> {
        let mut cache = self.cache.write().await;
        match cache.push(key, tile) {
            Some((evicted, _)) if evicted != key => Some(evicted),
            _ => None,
        }
    }

    /// Remove a tile from the cache.
    pub async fn remove(&self, key: &TileRequest) -> Option<Tile> {
        let mut cache = self.cache.write().await;
        cache.pop(key)
    }

    /// Clear all entries from the cache.
    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        cache.clear();
    }

    /// Keys from most to least recently used.
    pub async fn keys(&self) -> Vec<TileRequest> {
        let cache = self.cache.read().await;
        cache.iter().map(|(key, _)| *key).collect()
    }

    /// Get the current number of cached tiles.
    pub async fn len(&self) -> usize {
        let cache = self.cache.read().await;
        cache.len()
    }

    /// Check if the cache is empty.
    pub async fn is_empty(&self) -> bool {
        let cache = self.cache.read().await;
        cache.is_empty()
    }

    /// Get the maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for TileCache {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
