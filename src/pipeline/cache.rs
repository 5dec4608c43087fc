//! Cache stage: memoizes the tiles of its upstream.
//!
//! # Singleflight
//!
//! Concurrent requests for the same key share one computation. The first
//! request for a missing key registers an in-flight cell; later requests for
//! that key await the same cell instead of pulling from upstream again.
//! Only successful tiles enter the cache. Errors are handed to the requests
//! that were waiting on them and then forgotten.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

use crate::error::TileError;
use crate::slide::{LevelInfo, TileFactory};
use crate::tile::{ColorSpace, PixelOrder, Tile, TileCache, TileRequest};

type InFlight = Arc<OnceCell<Result<Tile, TileError>>>;

/// Counters describing one cache stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    /// Requests answered from the cache
    pub hits: u64,

    /// Requests that computed a tile from upstream
    pub misses: u64,

    /// Tiles currently cached
    pub entries: usize,

    /// Maximum number of cached tiles
    pub capacity: usize,
}

/// Wraps any factory with a bounded LRU tile cache.
pub struct CacheStage {
    upstream: Arc<dyn TileFactory>,
    cache: TileCache,
    in_flight: Mutex<HashMap<TileRequest, InFlight>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStage {
    /// Cache up to `capacity` tiles of `upstream`.
    pub fn new(upstream: Arc<dyn TileFactory>, capacity: usize) -> Self {
        Self {
            upstream,
            cache: TileCache::with_capacity(capacity),
            in_flight: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// The underlying tile cache.
    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::SeqCst),
            misses: self.misses.load(Ordering::SeqCst),
            entries: self.cache.len().await,
            capacity: self.cache.capacity(),
        }
    }

    /// Pull from upstream and cache the result on success.
    async fn compute(&self, request: &TileRequest) -> Result<Tile, TileError> {
        self.misses.fetch_add(1, Ordering::SeqCst);
        debug!(
            level = request.level,
            x = request.region.x,
            y = request.region.y,
            "Tile cache miss"
        );

        let tile = self.upstream.tile(request).await?;
        if let Some(evicted) = self.cache.put(*request, tile.clone()).await {
            debug!(
                level = evicted.level,
                x = evicted.region.x,
                y = evicted.region.y,
                "Evicted least recently used tile"
            );
        }
        Ok(tile)
    }
}

#[async_trait]
impl TileFactory for CacheStage {
    fn color_space(&self) -> ColorSpace {
        self.upstream.color_space()
    }

    fn pixel_order(&self) -> PixelOrder {
        self.upstream.pixel_order()
    }

    fn level_count(&self) -> usize {
        self.upstream.level_count()
    }

    fn level_info(&self, level: usize) -> Option<LevelInfo> {
        self.upstream.level_info(level)
    }

    async fn tile(&self, request: &TileRequest) -> Result<Tile, TileError> {
        // Fast path: check cache
        if let Some(tile) = self.cache.get(request).await {
            self.hits.fetch_add(1, Ordering::SeqCst);
            return Ok(tile);
        }

        // Slow path: join the in-flight computation or start one
        let cell = {
            let mut in_flight = self.in_flight.lock().await;
            Arc::clone(in_flight.entry(*request).or_default())
        };

        let result = cell
            .get_or_init(|| async {
                // A computation may have finished between the cache check and
                // registering the cell
                if let Some(tile) = self.cache.get(request).await {
                    self.hits.fetch_add(1, Ordering::SeqCst);
                    return Ok(tile);
                }
                self.compute(request).await
            })
            .await
            .clone();

        {
            let mut in_flight = self.in_flight.lock().await;
            if in_flight
                .get(request)
                .is_some_and(|current| Arc::ptr_eq(current, &cell))
            {
                in_flight.remove(request);
            }
        }

        result
    }
}

// =============================================================================
// Tests
// =============================================================================
