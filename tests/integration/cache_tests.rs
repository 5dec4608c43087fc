//! Cache effectiveness integration tests.
//!
//! Tests verify:
//! - Concurrent requests for one tile cause a single source read
//! - Concurrent requests for distinct tiles do not block each other's reads
//! - LRU eviction at the default capacity of 30
//! - Cached tiles are identical to freshly computed ones

use std::sync::Arc;
use std::time::Duration;

use od_threshold::od::{Behavior, ThresholdKernel};
use od_threshold::pipeline::{CacheStage, FilterStage};
use od_threshold::slide::TileFactory;
use od_threshold::tile::{Rect, TileCache, TileRequest, DEFAULT_TILE_CACHE_CAPACITY};

use super::test_utils::{gray_ramp, TrackingSource};

fn kernel() -> Arc<ThresholdKernel> {
    Arc::new(ThresholdKernel::with_equal_weights(0.2, Behavior::RetainHigher))
}

// =============================================================================
// Singleflight
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_read_source_once() {
    let source =
        Arc::new(TrackingSource::new(gray_ramp(64, 64), 16).with_delay(Duration::from_millis(50)));
    let filter = FilterStage::new(source.clone(), kernel());
    let cache = Arc::new(CacheStage::new(Arc::new(filter), DEFAULT_TILE_CACHE_CAPACITY));

    let request = TileRequest::new(0, Rect::new(16, 16, 16, 16));
    let mut handles = Vec::new();
    for _ in 0..32 {
        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(async move { cache.tile(&request).await }));
    }

    let mut tiles = Vec::new();
    for handle in handles {
        tiles.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(source.request_count(), 1);
    assert!(tiles.windows(2).all(|pair| pair[0] == pair[1]));

    let stats = cache.stats().await;
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.entries, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_distinct_keys_each_read_once() {
    let source =
        Arc::new(TrackingSource::new(gray_ramp(64, 64), 16).with_delay(Duration::from_millis(20)));
    let cache = Arc::new(CacheStage::new(source.clone(), DEFAULT_TILE_CACHE_CAPACITY));

    let mut handles = Vec::new();
    for _ in 0..3 {
        for tx in 0..4u32 {
            let cache = Arc::clone(&cache);
            let request = TileRequest::new(0, Rect::new(tx * 16, 0, 16, 16));
            handles.push(tokio::spawn(async move { cache.tile(&request).await }));
        }
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(source.request_count(), 4);
    let mut requested = source.get_requests().await;
    requested.sort_by_key(|r| r.region.x);
    let xs: Vec<u32> = requested.iter().map(|r| r.region.x).collect();
    assert_eq!(xs, vec![0, 16, 32, 48]);
}

// =============================================================================
// LRU Eviction
// =============================================================================

#[tokio::test]
async fn test_capacity_thirty_evicts_least_recent() {
    let source = Arc::new(TrackingSource::new(gray_ramp(64, 64), 64));
    let cache = CacheStage::new(source.clone(), DEFAULT_TILE_CACHE_CAPACITY);
    let key = |i: u32| TileRequest::new(0, Rect::new(i, 0, 1, 1));

    for i in 0..30 {
        cache.tile(&key(i)).await.unwrap();
    }
    // Touch key 0 so key 1 becomes least recently used
    cache.tile(&key(0)).await.unwrap();
    cache.tile(&key(30)).await.unwrap();
    assert_eq!(source.request_count(), 31);

    assert!(cache.cache().contains(&key(0)).await);
    assert!(!cache.cache().contains(&key(1)).await);
    assert_eq!(cache.cache().len().await, 30);

    source.reset_tracking();
    cache.tile(&key(1)).await.unwrap();
    assert_eq!(source.request_count(), 1);
}

#[tokio::test]
async fn test_tile_cache_direct() {
    let cache = TileCache::new();
    assert_eq!(cache.capacity(), 30);

    let source = TrackingSource::new(gray_ramp(8, 8), 8);
    let request = TileRequest::new(0, Rect::new(0, 0, 8, 8));
    let tile = source.tile(&request).await.unwrap();

    assert!(cache.put(request, tile.clone()).await.is_none());
    assert_eq!(cache.get(&request).await, Some(tile));
}

#[tokio::test]
async fn test_cached_tile_matches_fresh_computation() {
    let source = Arc::new(TrackingSource::new(gray_ramp(32, 32), 32));
    let filter: Arc<dyn TileFactory> = Arc::new(FilterStage::new(source.clone(), kernel()));
    let cache = CacheStage::new(Arc::clone(&filter), DEFAULT_TILE_CACHE_CAPACITY);
    let request = TileRequest::new(0, Rect::new(0, 0, 32, 32));

    let cached = {
        cache.tile(&request).await.unwrap();
        cache.tile(&request).await.unwrap()
    };
    let fresh = filter.tile(&request).await.unwrap();
    assert_eq!(cached, fresh);
}
