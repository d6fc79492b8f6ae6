//! Spatial helpers: haversine distance between H3 cells with an LRU memo.
//!
//! Positions are H3 cells at resolution 9 (~240m), the granularity the
//! driver locator reports. Distances repeat heavily across ranking passes
//! over the same neighborhoods, so results are cached process-wide.

use std::num::NonZeroUsize;
use std::sync::{Mutex, OnceLock};

use h3o::CellIndex;
use lru::LruCache;

const DISTANCE_CACHE_CAPACITY: usize = 50_000;

fn distance_km_uncached(a: CellIndex, b: CellIndex) -> f64 {
    let a: h3o::LatLng = a.into();
    let b: h3o::LatLng = b.into();
    let (lat1, lon1) = (a.lat().to_radians(), a.lng().to_radians());
    let (lat2, lon2) = (b.lat().to_radians(), b.lng().to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let sin_dlat = (dlat * 0.5).sin();
    let sin_dlon = (dlon * 0.5).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    6371.0 * c
}

fn distance_cache() -> &'static Mutex<LruCache<(CellIndex, CellIndex), f64>> {
    static CACHE: OnceLock<Mutex<LruCache<(CellIndex, CellIndex), f64>>> = OnceLock::new();
    CACHE.get_or_init(|| {
        Mutex::new(LruCache::new(
            NonZeroUsize::new(DISTANCE_CACHE_CAPACITY).expect("capacity is non-zero"),
        ))
    })
}

/// Haversine distance in kilometers between two cell centroids.
pub fn distance_km_between_cells(a: CellIndex, b: CellIndex) -> f64 {
    if a == b {
        return 0.0;
    }
    // Distance is symmetric; normalize the key so both directions hit.
    let key = if a < b { (a, b) } else { (b, a) };
    let mut cache = distance_cache().lock().expect("distance cache poisoned");
    if let Some(distance) = cache.get(&key) {
        return *distance;
    }
    let distance = distance_km_uncached(a, b);
    cache.put(key, distance);
    distance
}
