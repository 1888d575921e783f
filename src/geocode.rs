//! Geocoder collaborator: reverse geocoding for address-change segmentation.
//!
//! The engine queries one address per location fix and cuts a segment
//! wherever the street-level part of the address changes. Lookups are
//! expected to be slow; [`CachedGeocoder`] wraps any backend with an
//! exact-coordinate LRU cache so repeated fixes at the same position resolve
//! once.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use log::debug;

/// Reverse geocoding capability.
///
/// Returns a human-readable address line for a coordinate, or `None` when
/// the position cannot be resolved. Absence of this collaborator silently
/// disables geocoding-based segmentation.
pub trait Geocoder {
    fn address_for(&self, latitude: f64, longitude: f64) -> Option<String>;
}

/// Strip the house-number token from an address line.
///
/// Addresses look like `"Sutthauser Str. 52, 49124 Georgsmarienhütte"`: a
/// street, a house number, then a comma and postal code. Everything matters
/// for cut detection except the house number — a changed street name is a
/// new road, a changed number along the same street is not. The token
/// removed is the last run of digits that directly precedes a comma and
/// postal code.
pub fn normalize_address(line: &str) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut strip: Option<(usize, usize)> = None;
    for i in 0..chars.len() {
        if !chars[i].is_whitespace() {
            continue;
        }
        let mut j = i + 1;
        while j < chars.len() && chars[j].is_ascii_digit() {
            j += 1;
        }
        let has_digits = j > i + 1;
        let followed_by_postal = j + 2 < chars.len()
            && chars[j] == ','
            && chars[j + 1].is_whitespace()
            && chars[j + 2].is_ascii_digit();
        if has_digits && followed_by_postal && i > 0 {
            strip = Some((i, j));
        }
    }
    match strip {
        Some((start, end)) => chars[..start]
            .iter()
            .chain(chars[end..].iter())
            .collect(),
        None => line.to_string(),
    }
}

/// Request accounting for a [`CachedGeocoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeocoderStats {
    /// Total lookups made through the wrapper
    pub requests: u64,
    /// Lookups answered from the cache
    pub cache_hits: u64,
    /// Addresses currently cached
    pub cached_addresses: usize,
}

struct CacheEntry {
    address: String,
    last_access: u64,
}

/// Exact-coordinate address cache with LRU eviction.
///
/// Keys are the coordinate bit patterns: the recorder replays identical
/// coordinates for consecutive fixes, and only those exact repeats are worth
/// caching. The linear eviction scan is fine at the capacities involved.
struct AddressCache {
    capacity: usize,
    entries: HashMap<(u64, u64), CacheEntry>,
    access_counter: u64,
}

impl AddressCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            access_counter: 0,
        }
    }

    fn key(latitude: f64, longitude: f64) -> (u64, u64) {
        (latitude.to_bits(), longitude.to_bits())
    }

    fn get(&mut self, latitude: f64, longitude: f64) -> Option<String> {
        let key = Self::key(latitude, longitude);
        if let Some(entry) = self.entries.get_mut(&key) {
            self.access_counter += 1;
            entry.last_access = self.access_counter;
            Some(entry.address.clone())
        } else {
            None
        }
    }

    fn insert(&mut self, latitude: f64, longitude: f64, address: String) {
        let key = Self::key(latitude, longitude);
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&key) {
            self.evict_oldest();
        }
        self.access_counter += 1;
        self.entries.insert(
            key,
            CacheEntry {
                address,
                last_access: self.access_counter,
            },
        );
    }

    fn evict_oldest(&mut self) {
        let oldest_key = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(k, _)| *k);
        if let Some(key) = oldest_key {
            self.entries.remove(&key);
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Wraps a [`Geocoder`] with an exact-coordinate LRU cache and request
/// accounting.
pub struct CachedGeocoder<G> {
    inner: G,
    cache: Mutex<AddressCache>,
    requests: AtomicU64,
    hits: AtomicU64,
}

impl<G: Geocoder> CachedGeocoder<G> {
    /// Wrap a backend with the default cache capacity of 4096 addresses.
    pub fn new(inner: G) -> Self {
        Self::with_capacity(inner, 4096)
    }

    pub fn with_capacity(inner: G, capacity: usize) -> Self {
        Self {
            inner,
            cache: Mutex::new(AddressCache::new(capacity)),
            requests: AtomicU64::new(0),
            hits: AtomicU64::new(0),
        }
    }

    pub fn stats(&self) -> GeocoderStats {
        let cached_addresses = match self.cache.lock() {
            Ok(cache) => cache.len(),
            Err(_) => 0,
        };
        GeocoderStats {
            requests: self.requests.load(Ordering::Relaxed),
            cache_hits: self.hits.load(Ordering::Relaxed),
            cached_addresses,
        }
    }
}

impl<G: Geocoder> Geocoder for CachedGeocoder<G> {
    fn address_for(&self, latitude: f64, longitude: f64) -> Option<String> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut cache) = self.cache.lock() {
            if let Some(address) = cache.get(latitude, longitude) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(address);
            }
        }
        let resolved = self.inner.address_for(latitude, longitude);
        if let Some(ref address) = resolved {
            debug!("[Geocode] resolved ({latitude}, {longitude}) to \"{address}\"");
            if let Ok(mut cache) = self.cache.lock() {
                cache.insert(latitude, longitude, address.clone());
            }
        }
        resolved
    }
}
