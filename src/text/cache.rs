//! Bounded first-in-first-out width cache.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use serde::Serialize;
use tracing::debug;

/// Identifies one measurement: text, size and source family.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    text: String,
    /// Font size as raw bits so the key can be hashed.
    size_bits: u64,
    family: String,
}

impl CacheKey {
    pub fn new(text: &str, font_size: f64, family: &str) -> Self {
        Self {
            text: text.to_string(),
            size_bits: font_size.to_bits(),
            family: family.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
}

#[derive(Debug, Default)]
struct Entries {
    widths: HashMap<CacheKey, f64>,
    order: VecDeque<CacheKey>,
}

/// Width cache with a fixed capacity.
///
/// Inserting a new key into a full cache evicts the oldest key first. The
/// lookup table and insertion order are updated under a single lock, so a
/// re-entrant estimate can never observe one without the other.
#[derive(Debug)]
pub struct WidthCache {
    capacity: usize,
    entries: Mutex<Entries>,
}

impl Default for WidthCache {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl WidthCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(Entries::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Entries> {
        // Both halves are updated together, so a poisoned lock is still consistent.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, key: &CacheKey) -> Option<f64> {
        self.lock().widths.get(key).copied()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.lock().widths.contains_key(key)
    }

    pub fn insert(&self, key: CacheKey, width: f64) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.lock();
        if let Some(existing) = entries.widths.get_mut(&key) {
            *existing = width;
            return;
        }
        while entries.order.len() >= self.capacity {
            if let Some(oldest) = entries.order.pop_front() {
                debug!(text = %oldest.text, "evicting oldest width cache entry");
                entries.widths.remove(&oldest);
            }
        }
        entries.order.push_back(key.clone());
        entries.widths.insert(key, width);
    }

    pub fn clear(&self) {
        let mut entries = self.lock();
        entries.widths.clear();
        entries.order.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.lock().widths.len(),
            max_size: self.capacity,
        }
    }
}
